//! VAD orchestration: strategy dispatch + speech/silence state machine.
//!
//! The controller owns its own read cursor (independent of the chunk
//! segmenter's), gates decisions by a minimum amount of new audio, tracks
//! the silence timer, and raises the stop-on-silence request.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::buffering::{buffered_len, distance, SampleSource};
use crate::config::RecordingConfig;
use crate::vad::{downmix, NeuralVadEngine, SimpleVad, VadDecision};

/// The active detection strategy. Selected at session start, never switched
/// mid-session.
pub enum VadStrategy {
    Simple(SimpleVad),
    Neural(NeuralVadEngine),
}

impl VadStrategy {
    fn reset(&mut self) {
        if let VadStrategy::Neural(engine) = self {
            engine.reset();
        }
    }
}

/// Instruction to stop the session, produced after sustained silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRequest {
    /// Trailing seconds to trim from the final recording (0 when
    /// drop-trailing-silence is disabled).
    pub drop_secs: f32,
}

/// Result of one controller poll.
#[derive(Debug, Default)]
pub struct VadPoll {
    /// `Some(new_decision)` only on a transition edge.
    pub changed: Option<bool>,
    /// Set when the silence timeout elapsed with stop-on-silence enabled.
    pub stop: Option<StopRequest>,
}

pub struct VadController {
    strategy: VadStrategy,
    channels: u16,
    update_rate_samples: usize,
    context_samples: usize,
    last_vad_pos: usize,
    decision: VadDecision,
    silence_since: Option<Instant>,
    stop_on_silence: bool,
    silence_timeout: Duration,
    drop_trailing_silence: bool,
}

impl VadController {
    pub fn new(strategy: VadStrategy, config: &RecordingConfig) -> Self {
        Self {
            strategy,
            channels: config.channels,
            update_rate_samples: config.seconds_to_samples(config.vad.update_rate_secs).max(1),
            context_samples: config.seconds_to_samples(config.vad.context_secs),
            last_vad_pos: 0,
            decision: VadDecision::Silence,
            silence_since: None,
            stop_on_silence: config.vad.stop_on_silence,
            silence_timeout: config.silence_timeout(),
            drop_trailing_silence: config.vad.drop_trailing_silence,
        }
    }

    /// Rewind cursors and state for a fresh recording. Initial state is
    /// silence/undetected.
    pub fn reset(&mut self) {
        self.strategy.reset();
        self.last_vad_pos = 0;
        self.decision = VadDecision::Silence;
        self.silence_since = None;
    }

    /// Current decision.
    pub fn decision(&self) -> VadDecision {
        self.decision
    }

    /// Run one tick: classify if enough new audio accumulated, then check
    /// the silence timer.
    pub fn poll(
        &mut self,
        write_pos: usize,
        made_loop_lap: bool,
        source: &dyn SampleSource,
        now: Instant,
    ) -> VadPoll {
        let mut outcome = VadPoll::default();
        let cap = source.capacity();

        let fresh = distance(self.last_vad_pos, write_pos, cap);
        if fresh >= self.update_rate_samples {
            if let Some(decision) = self.classify(write_pos, made_loop_lap, fresh, source) {
                self.apply(decision, now, &mut outcome);
            }
            // Advance even without a decision so the same samples are never
            // ingested twice.
            self.last_vad_pos = write_pos;
        }

        // The timer fires on any tick, not only on decision ticks.
        if self.stop_on_silence && !self.decision.is_speech() {
            if let Some(since) = self.silence_since {
                if now.duration_since(since) > self.silence_timeout {
                    let drop_secs = if self.drop_trailing_silence {
                        self.silence_timeout.as_secs_f32()
                    } else {
                        0.0
                    };
                    debug!(drop_secs, "silence timeout elapsed — requesting stop");
                    outcome.stop = Some(StopRequest { drop_secs });
                }
            }
        }

        outcome
    }

    /// Force the decision to silence (stop path). Returns whether it was
    /// speech, so the caller can emit the final transition notification.
    pub fn force_silence(&mut self) -> bool {
        let was_speaking = self.decision.is_speech();
        self.decision = VadDecision::Silence;
        self.silence_since = None;
        was_speaking
    }

    fn classify(
        &mut self,
        write_pos: usize,
        made_loop_lap: bool,
        fresh: usize,
        source: &dyn SampleSource,
    ) -> Option<VadDecision> {
        let cap = source.capacity();
        match &mut self.strategy {
            VadStrategy::Simple(simple) => {
                let available = buffered_len(write_pos, made_loop_lap, cap);
                let want = self.context_samples.min(available);
                if want == 0 {
                    return None;
                }
                let start = (write_pos + cap - want) % cap;
                let window = source.read(start, want);
                let mono = downmix(&window, self.channels);
                Some(VadDecision::from_bool(simple.detect(&mono)))
            }
            VadStrategy::Neural(engine) => {
                let take = fresh.min(cap);
                let start = (write_pos + cap - take) % cap;
                let new_samples = source.read(start, take);
                engine.ingest(&new_samples, self.channels);
                engine
                    .evaluate()
                    .map(|probability| VadDecision::from_bool(probability > engine.threshold()))
            }
        }
    }

    fn apply(&mut self, decision: VadDecision, now: Instant, outcome: &mut VadPoll) {
        if decision != self.decision {
            self.decision = decision;
            outcome.changed = Some(decision.is_speech());
            self.silence_since = if decision.is_speech() {
                None
            } else {
                Some(now)
            };
            debug!(speaking = decision.is_speech(), "voice activity changed");
        } else if !decision.is_speech() && self.silence_since.is_none() {
            // First decision of the session is silence: that is when
            // silence began.
            self.silence_since = Some(now);
        }
    }
}
