//! Typed audio chunk handed from the segmenter to consumers.

use serde::{Deserialize, Serialize};

/// A fixed slice of interleaved PCM samples at a known sample rate.
///
/// Immutable once emitted; ownership transfers to the consumer with the
/// `ChunkReady` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunk {
    /// Interleaved f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
    /// Channel count of the interleaved data.
    pub channels: u16,
    /// VAD decision in effect when the chunk was emitted.
    pub voice_detected: bool,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16, voice_detected: bool) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            voice_detected,
        }
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() as f64 / self.channels.max(1) as f64;
        frames / self.sample_rate as f64
    }

    /// Returns true if the chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_divides_by_channel_count() {
        let chunk = AudioChunk::new(vec![0.0; 32_000], 16_000, 2, false);
        assert!((chunk.duration_secs() - 1.0).abs() < 1e-9);
    }
}
