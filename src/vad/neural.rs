//! Neural VAD engine: recurrent state + bounded window accumulation.
//!
//! Converts irregularly-sized batches of new samples into the fixed-size
//! windows the speech model expects. The engine only ever evaluates the most
//! recent `window_size` mono samples; the accumulator is trimmed from the
//! front and never grows past that bound.

use std::collections::VecDeque;

use tracing::warn;

use crate::inference::{ModelHandle, RecurrentState};
use crate::vad::downmix;

pub struct NeuralVadEngine {
    model: ModelHandle,
    state: RecurrentState,
    accumulator: VecDeque<f32>,
    window_size: usize,
    threshold: f32,
}

impl NeuralVadEngine {
    pub fn new(model: ModelHandle, threshold: f32) -> Self {
        let window_size = model.0.lock().window_size();
        Self {
            model,
            state: RecurrentState::zeroed(),
            accumulator: VecDeque::with_capacity(window_size),
            window_size,
            threshold,
        }
    }

    /// Hard reset: zero the recurrent state and drop all buffered samples.
    /// Called at session start and whenever the strategy is (re)selected.
    pub fn reset(&mut self) {
        self.state = RecurrentState::zeroed();
        self.accumulator.clear();
    }

    /// Soft reset: scale the recurrent state by `factor` in [0, 1]. Cheaper
    /// than a hard reset after a long silence: the model's memory fades
    /// without a full discontinuity.
    ///
    /// The controller never calls this on its own; it is exposed for
    /// consumers that keep a model loaded across sessions and want to soften
    /// its carried-over state instead of zeroing it.
    pub fn decay(&mut self, factor: f32) {
        self.state.decay(factor);
    }

    /// Append new interleaved samples, downmixed to mono. The accumulator is
    /// trimmed from the front so it never exceeds `window_size`.
    pub fn ingest(&mut self, samples: &[f32], channels: u16) {
        for s in downmix(samples, channels) {
            self.accumulator.push_back(s);
        }
        while self.accumulator.len() > self.window_size {
            self.accumulator.pop_front();
        }
    }

    /// True once a full window has accumulated.
    pub fn ready(&self) -> bool {
        self.accumulator.len() == self.window_size
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score the current window, replacing the engine's recurrent state with
    /// the model's updated state on success.
    ///
    /// Returns `None` (no decision) when the window is not yet full or the
    /// model evaluation fails — a VAD false-negative beats crashing an
    /// active capture session.
    pub fn evaluate(&mut self) -> Option<f32> {
        if !self.ready() {
            return None;
        }
        let window: Vec<f32> = self.accumulator.iter().copied().collect();
        match self.model.0.lock().evaluate(&window, &self.state) {
            Ok((probability, next_state)) => {
                self.state = next_state;
                Some(probability)
            }
            Err(e) => {
                warn!("neural VAD evaluation failed: {e}");
                None
            }
        }
    }

    /// Score `samples` against an independent state copy without touching
    /// the engine's own state or accumulator. Used for speculative
    /// evaluation paths; `external_state` is advanced in place on success.
    ///
    /// The samples are downmixed to mono and must then be exactly one
    /// window long, otherwise no decision is made.
    pub fn evaluate_with_external_state(
        &self,
        samples: &[f32],
        channels: u16,
        external_state: &mut RecurrentState,
    ) -> Option<f32> {
        let mono = downmix(samples, channels);
        if mono.len() != self.window_size {
            warn!(
                got = mono.len(),
                expected = self.window_size,
                "external-state evaluation skipped: malformed window"
            );
            return None;
        }
        match self.model.0.lock().evaluate(&mono, external_state) {
            Ok((probability, next_state)) => {
                *external_state = next_state;
                Some(probability)
            }
            Err(e) => {
                warn!("external-state VAD evaluation failed: {e}");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &RecurrentState {
        &self.state
    }
}
