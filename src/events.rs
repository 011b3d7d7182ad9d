//! Events emitted by a recording session.
//!
//! Each event is delivered at most once, in tick order, over the session's
//! `crossbeam_channel`. Once a stop has been requested no further chunks are
//! produced; the stop itself emits at most one final voice-activity
//! notification (speech forced off) followed by the `Stopped` event.

use serde::{Deserialize, Serialize};

use crate::buffering::chunk::AudioChunk;

/// A notification from [`crate::RecordingSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    /// The VAD decision flipped (speech started or stopped).
    #[serde(rename_all = "camelCase")]
    VoiceActivity {
        /// Monotonically increasing event sequence number.
        seq: u64,
        speaking: bool,
    },
    /// A fixed-length chunk of buffered audio became available.
    #[serde(rename_all = "camelCase")]
    ChunkReady { seq: u64, chunk: AudioChunk },
    /// The session stopped; carries the final recording (tail-trimmed when
    /// the stop was silence-triggered with drop enabled).
    #[serde(rename_all = "camelCase")]
    Stopped { seq: u64, recording: AudioChunk },
}

impl SessionEvent {
    pub fn seq(&self) -> u64 {
        match self {
            SessionEvent::VoiceActivity { seq, .. }
            | SessionEvent::ChunkReady { seq, .. }
            | SessionEvent::Stopped { seq, .. } => *seq,
        }
    }
}
