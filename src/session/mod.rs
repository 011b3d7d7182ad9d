//! `RecordingSession` — top-level lifecycle owner.
//!
//! ## Lifecycle
//!
//! ```text
//! RecordingSession::new(config, source)
//!     └─► start()                 → cursors + VAD reset, recording
//!         └─► update(write_pos)   → loop-lap check, chunk poll, VAD poll
//!             └─► stop(drop_secs) → final slice extracted, Stopped event
//! ```
//!
//! `start()` on a running session and `stop()` on a stopped one are
//! idempotent no-ops. The session is single-threaded and tick-driven: an
//! external driver calls `update` with the current write cursor once per
//! tick, and every state transition happens synchronously inside that call.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::{
    buffering::{buffered_len, chunk::AudioChunk, segmenter::ChunkSegmenter, SampleSource},
    config::{RecordingConfig, VadStrategyKind},
    error::{LoopcapError, Result},
    events::SessionEvent,
    inference::ModelHandle,
    vad::{controller::VadController, NeuralVadEngine, SimpleVad, VadStrategy},
};

/// Fire-and-forget visual/audio indicator toggled on every VAD transition.
pub type ActivityIndicator = Box<dyn FnMut(bool) + Send>;

pub struct RecordingSession {
    config: RecordingConfig,
    source: Arc<dyn SampleSource>,
    segmenter: ChunkSegmenter,
    vad: Option<VadController>,
    recording: bool,
    last_write_pos: usize,
    made_loop_lap: bool,
    seq: u64,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    indicator: Option<ActivityIndicator>,
}

impl RecordingSession {
    /// Build a session over an externally-written sample source.
    ///
    /// With the Neural strategy configured, the model is loaded from
    /// `config.vad.model_path` (requires the `onnx` feature); load or
    /// warm-up failure falls back to the Simple strategy with a warning.
    ///
    /// # Errors
    /// Returns `LoopcapError::InvalidConfig` for invalid settings or an
    /// empty source.
    pub fn new(config: RecordingConfig, source: Arc<dyn SampleSource>) -> Result<Self> {
        Self::build(config, source, None)
    }

    /// Like [`RecordingSession::new`] but with an explicit neural model,
    /// bypassing the path-based loader.
    pub fn with_model(
        config: RecordingConfig,
        source: Arc<dyn SampleSource>,
        model: ModelHandle,
    ) -> Result<Self> {
        Self::build(config, source, Some(model))
    }

    fn build(
        config: RecordingConfig,
        source: Arc<dyn SampleSource>,
        model: Option<ModelHandle>,
    ) -> Result<Self> {
        config.validate()?;
        if source.capacity() == 0 {
            return Err(LoopcapError::InvalidConfig(
                "sample source has zero capacity".into(),
            ));
        }

        let segmenter = ChunkSegmenter::new(
            config.chunk_length_samples(),
            config.sample_rate,
            config.channels,
        );
        let vad = if config.vad.enabled {
            Some(VadController::new(build_strategy(&config, model), &config))
        } else {
            None
        };

        let (events_tx, events_rx) = unbounded();
        Ok(Self {
            config,
            source,
            segmenter,
            vad,
            recording: false,
            last_write_pos: 0,
            made_loop_lap: false,
            seq: 0,
            events_tx,
            events_rx,
            indicator: None,
        })
    }

    /// Receiver for session notifications. Intended for a single consumer —
    /// clones share (and steal from) the same queue.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Register an indicator toggled on every voice-activity transition.
    pub fn set_activity_indicator(&mut self, indicator: ActivityIndicator) {
        self.indicator = Some(indicator);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn made_loop_lap(&self) -> bool {
        self.made_loop_lap
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Begin a recording. No-op when already recording.
    pub fn start(&mut self) {
        if self.recording {
            debug!("start ignored — already recording");
            return;
        }
        self.recording = true;
        self.last_write_pos = 0;
        self.made_loop_lap = false;
        self.segmenter.reset();
        if let Some(vad) = &mut self.vad {
            vad.reset();
        }
        info!(
            capacity = self.source.capacity(),
            sample_rate = self.config.sample_rate,
            channels = self.config.channels,
            "recording started"
        );
    }

    /// One driver tick: `write_pos` is the capture source's current write
    /// cursor. Returns the final recording when this tick stopped the
    /// session (loop-lap with looping disallowed, or silence timeout).
    pub fn update(&mut self, write_pos: usize) -> Option<AudioChunk> {
        self.update_at(write_pos, Instant::now())
    }

    /// [`RecordingSession::update`] with an explicit clock, for drivers and
    /// tests that own time.
    pub fn update_at(&mut self, write_pos: usize, now: Instant) -> Option<AudioChunk> {
        if !self.recording {
            return None;
        }
        let cap = self.source.capacity();
        let write_pos = write_pos % cap;

        if write_pos < self.last_write_pos {
            if !self.config.loop_on_overflow {
                warn!("capture wrapped with looping disallowed — stopping");
                return self.stop(0.0);
            }
            self.made_loop_lap = true;
        }
        self.last_write_pos = write_pos;

        // Chunks first: they carry the decision as of this tick's start, and
        // a decision for a position is never made before its chunk.
        let voice = self
            .vad
            .as_ref()
            .map(|vad| vad.decision().is_speech())
            .unwrap_or(false);
        for chunk in self.segmenter.poll(write_pos, self.source.as_ref(), voice) {
            let seq = self.next_seq();
            self.emit(SessionEvent::ChunkReady { seq, chunk });
        }

        if let Some(vad) = &mut self.vad {
            let poll = vad.poll(write_pos, self.made_loop_lap, self.source.as_ref(), now);
            if let Some(speaking) = poll.changed {
                if let Some(indicator) = &mut self.indicator {
                    indicator(speaking);
                }
                let seq = self.next_seq();
                self.emit(SessionEvent::VoiceActivity { seq, speaking });
            }
            if let Some(stop) = poll.stop {
                return self.stop(stop.drop_secs);
            }
        }
        None
    }

    /// Stop the recording, trimming `drop_secs` of trailing audio, and hand
    /// back the final buffer. No-op (returns `None`) when not recording.
    pub fn stop(&mut self, drop_secs: f32) -> Option<AudioChunk> {
        if !self.recording {
            return None;
        }
        self.recording = false;

        let cap = self.source.capacity();
        let recorded = buffered_len(self.last_write_pos, self.made_loop_lap, cap);
        let dropped = self.config.seconds_to_samples(drop_secs).min(recorded);
        let final_len = recorded - dropped;

        // Once lapped, the oldest surviving sample sits at the write cursor.
        let start = if self.made_loop_lap {
            self.last_write_pos
        } else {
            0
        };
        let samples = if final_len > 0 {
            self.source.read(start, final_len)
        } else {
            Vec::new()
        };

        if let Some(vad) = &mut self.vad {
            if vad.force_silence() {
                if let Some(indicator) = &mut self.indicator {
                    indicator(false);
                }
                let seq = self.next_seq();
                self.emit(SessionEvent::VoiceActivity {
                    seq,
                    speaking: false,
                });
            }
        }

        let recording = AudioChunk::new(samples, self.config.sample_rate, self.config.channels, false);
        info!(
            samples = recording.samples.len(),
            dropped,
            looped = self.made_loop_lap,
            "recording stopped"
        );
        let seq = self.next_seq();
        self.emit(SessionEvent::Stopped {
            seq,
            recording: recording.clone(),
        });
        Some(recording)
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn emit(&self, event: SessionEvent) {
        // Delivery is best-effort: a dropped receiver must not kill capture.
        let _ = self.events_tx.send(event);
    }
}

/// Build the configured strategy, degrading Neural → Simple when the model
/// cannot be loaded or warmed up.
fn build_strategy(config: &RecordingConfig, model: Option<ModelHandle>) -> VadStrategy {
    let simple = || {
        VadStrategy::Simple(SimpleVad::new(
            config.sample_rate,
            config.vad.context_secs,
            config.vad.energy_threshold,
            config.vad.freq_threshold,
        ))
    };

    match config.vad.strategy {
        VadStrategyKind::Simple => simple(),
        VadStrategyKind::Neural => {
            let handle = match model.map(Ok).unwrap_or_else(|| load_model(config)) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("neural VAD unavailable ({e}), falling back to simple VAD");
                    return simple();
                }
            };
            if let Err(e) = handle.0.lock().warm_up() {
                warn!("neural VAD warm-up failed ({e}), falling back to simple VAD");
                return simple();
            }
            let model_window = handle.0.lock().window_size();
            if model_window != config.vad.model_window {
                warn!(
                    model = model_window,
                    configured = config.vad.model_window,
                    "model window does not match the configured window, falling back to simple VAD"
                );
                return simple();
            }
            info!(
                threshold = config.vad.model_threshold,
                "using neural VAD strategy"
            );
            VadStrategy::Neural(NeuralVadEngine::new(handle, config.vad.model_threshold))
        }
    }
}

#[cfg(feature = "onnx")]
fn load_model(config: &RecordingConfig) -> Result<ModelHandle> {
    use crate::inference::onnx::SileroModel;

    let path = config.vad.model_path.as_ref().ok_or_else(|| {
        LoopcapError::InvalidConfig("neural strategy requires vad.model_path".into())
    })?;
    Ok(ModelHandle::new(SileroModel::new(
        path,
        config.sample_rate,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn load_model(_config: &RecordingConfig) -> Result<ModelHandle> {
    Err(LoopcapError::Inference(
        "compiled without the onnx feature".into(),
    ))
}
