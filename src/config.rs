//! Session configuration.
//!
//! All durations are given in seconds and converted to sample counts against
//! the session's fixed sample rate and channel count. The sample rate never
//! changes during a recording session — resampling is out of scope.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LoopcapError, Result};

/// Which VAD strategy a session uses. Fixed at session start, never switched
/// mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VadStrategyKind {
    /// Energy + dominant-frequency heuristic. Cheap, stateless.
    Simple,
    /// Recurrent neural model scoring fixed-size windows.
    Neural,
}

/// Configuration for a [`crate::RecordingSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    /// Ring buffer length in seconds. Capacity =
    /// `max_length_secs × sample_rate × channels`. Default: 30.
    pub max_length_secs: f32,
    /// Whether the capture may wrap and overwrite the oldest audio.
    /// When `false`, a wrap is treated as an implicit stop. Default: true.
    pub loop_on_overflow: bool,
    /// Sample rate in Hz, fixed for the session. Default: 16000.
    pub sample_rate: u32,
    /// Channel count of the interleaved buffer. Default: 1 (mono).
    pub channels: u16,
    /// Emitted chunk length in seconds. `<= 0` disables chunk emission.
    /// Default: 0.5.
    pub chunk_length_secs: f32,
    /// Preferred input device name for the capture glue.
    /// `None` selects the system default input.
    pub preferred_input_device: Option<String>,
    /// Voice activity detection settings.
    pub vad: VadConfig,
}

/// Voice activity detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VadConfig {
    /// Master switch. When `false` the session only segments chunks.
    pub enabled: bool,
    /// Active strategy. Default: `Simple`.
    pub strategy: VadStrategyKind,
    /// Minimum amount of new audio (seconds) between VAD decisions.
    /// Default: 0.1.
    pub update_rate_secs: f32,
    /// Trailing context window fed to the simple detector (seconds).
    /// Default: 0.5. Simple strategy only.
    pub context_secs: f32,
    /// RMS energy threshold of the simple detector. Default: 0.01.
    pub energy_threshold: f32,
    /// Dominant-frequency threshold of the simple detector (Hz).
    /// Default: 100.
    pub freq_threshold: f32,
    /// Path to the neural VAD model file. Neural strategy only.
    pub model_path: Option<PathBuf>,
    /// Speech probability threshold of the neural model in [0, 1].
    /// Default: 0.5.
    pub model_threshold: f32,
    /// Fixed window size (mono samples) the neural model evaluates.
    /// Must match the loaded model's window; a mismatch falls back to the
    /// simple strategy with a warning. Default: 512.
    pub model_window: usize,
    /// Stop the session automatically after sustained silence.
    pub stop_on_silence: bool,
    /// When auto-stopping, trim the trailing silence from the final
    /// recording.
    pub drop_trailing_silence: bool,
    /// Silence duration (seconds) that triggers the auto-stop. Default: 3.
    pub silence_timeout_secs: f32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_length_secs: 30.0,
            loop_on_overflow: true,
            sample_rate: 16_000,
            channels: 1,
            chunk_length_secs: 0.5,
            preferred_input_device: None,
            vad: VadConfig::default(),
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: VadStrategyKind::Simple,
            update_rate_secs: 0.1,
            context_secs: 0.5,
            energy_threshold: 0.01,
            freq_threshold: 100.0,
            model_path: None,
            model_threshold: 0.5,
            model_window: 512,
            stop_on_silence: false,
            drop_trailing_silence: false,
            silence_timeout_secs: 3.0,
        }
    }
}

impl RecordingConfig {
    /// Validate the configuration before a session is built.
    ///
    /// # Errors
    /// Returns `LoopcapError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(LoopcapError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.channels == 0 {
            return Err(LoopcapError::InvalidConfig("channels must be > 0".into()));
        }
        if self.max_length_secs <= 0.0 {
            return Err(LoopcapError::InvalidConfig(
                "max_length_secs must be > 0".into(),
            ));
        }
        if self.vad.enabled {
            if self.vad.update_rate_secs <= 0.0 {
                return Err(LoopcapError::InvalidConfig(
                    "vad.update_rate_secs must be > 0".into(),
                ));
            }
            if self.vad.model_window == 0 && self.vad.strategy == VadStrategyKind::Neural {
                return Err(LoopcapError::InvalidConfig(
                    "vad.model_window must be > 0 for the neural strategy".into(),
                ));
            }
            if self.vad.stop_on_silence && self.vad.silence_timeout_secs <= 0.0 {
                return Err(LoopcapError::InvalidConfig(
                    "vad.silence_timeout_secs must be > 0 when stop_on_silence is set".into(),
                ));
            }
        }
        Ok(())
    }

    /// Ring buffer capacity in samples (all channels interleaved).
    pub fn capacity_samples(&self) -> usize {
        self.seconds_to_samples(self.max_length_secs)
    }

    /// Chunk length in samples; 0 disables segmentation.
    pub fn chunk_length_samples(&self) -> usize {
        if self.chunk_length_secs > 0.0 {
            self.seconds_to_samples(self.chunk_length_secs)
        } else {
            0
        }
    }

    /// Convert a duration in seconds to an interleaved sample count.
    pub fn seconds_to_samples(&self, secs: f32) -> usize {
        if secs <= 0.0 {
            return 0;
        }
        (secs * self.sample_rate as f32) as usize * self.channels as usize
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.vad.silence_timeout_secs.max(0.0))
    }
}
