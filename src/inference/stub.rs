//! `StubModel` — deterministic backend without real inference.
//!
//! Scores a window by its RMS level, so loud test signals read as speech and
//! silence reads as 0. The returned state is a fixed recurrence over the
//! previous state and the window, which keeps state-threading observable in
//! tests without model weights.

use tracing::debug;

use crate::error::{LoopcapError, Result};
use crate::inference::{RecurrentState, SpeechModel};

pub struct StubModel {
    window_size: usize,
    gain: f32,
}

impl StubModel {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            gain: 4.0,
        }
    }
}

impl SpeechModel for StubModel {
    fn warm_up(&mut self) -> Result<()> {
        debug!("StubModel::warm_up — no-op");
        Ok(())
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn evaluate(&mut self, window: &[f32], state: &RecurrentState) -> Result<(f32, RecurrentState)> {
        if window.len() != self.window_size {
            return Err(LoopcapError::Inference(format!(
                "window has {} samples, expected {}",
                window.len(),
                self.window_size
            )));
        }

        let energy = (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt();
        let probability = (energy * self.gain).clamp(0.0, 1.0);

        let next: Vec<f32> = state
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| 0.6 * v + 0.4 * window[i % window.len()])
            .collect();

        Ok((probability, RecurrentState::from_values(next)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loud_window_scores_high_and_silence_scores_zero() {
        let mut model = StubModel::new(512);
        let state = RecurrentState::zeroed();

        let (loud, _) = model.evaluate(&vec![0.5; 512], &state).unwrap();
        assert!(loud > 0.9, "loud={loud}");

        let (quiet, _) = model.evaluate(&vec![0.0; 512], &state).unwrap();
        assert_eq!(quiet, 0.0);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut model = StubModel::new(64);
        let state = RecurrentState::zeroed();
        let window: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin() * 0.2).collect();

        let a = model.evaluate(&window, &state).unwrap();
        let b = model.evaluate(&window, &state).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn wrong_window_length_is_an_error() {
        let mut model = StubModel::new(512);
        let state = RecurrentState::zeroed();
        assert!(model.evaluate(&[0.0; 100], &state).is_err());
    }
}
