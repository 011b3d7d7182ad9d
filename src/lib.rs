//! # loopcap
//!
//! Ring-buffer audio capture with chunked delivery and real-time voice
//! activity detection.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SharedRing (write cursor)
//!                                  │
//!            RecordingSession::update(write_pos)   ← external tick driver
//!                  │                     │
//!           ChunkSegmenter         VadController
//!                  │              (Simple | Neural)
//!         SessionEvent::ChunkReady      │
//!                            SessionEvent::VoiceActivity
//!                            SessionEvent::Stopped (auto-stop on silence)
//! ```
//!
//! The session never owns the sample storage: it only tracks cursors into an
//! externally-written circular buffer and reads slices through the
//! [`buffering::SampleSource`] trait. All state transitions happen
//! synchronously inside `update` ticks — there is no internal threading.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod config;
pub mod error;
pub mod events;
pub mod inference;
pub mod session;
pub mod vad;

// Convenience re-exports for downstream crates
pub use buffering::{chunk::AudioChunk, SampleSource, SharedRing};
pub use config::{RecordingConfig, VadConfig, VadStrategyKind};
pub use error::LoopcapError;
pub use events::SessionEvent;
pub use inference::{ModelHandle, RecurrentState, SpeechModel};
pub use session::RecordingSession;

#[cfg(feature = "onnx")]
pub use inference::onnx::SileroModel;
