//! Voice Activity Detection.
//!
//! Two mutually exclusive strategies, selected at session start:
//! [`simple::SimpleVad`] (energy + dominant-frequency thresholding, pure)
//! and [`neural::NeuralVadEngine`] (recurrent model over fixed windows).
//! [`controller::VadController`] owns whichever is active plus the
//! speech/silence state machine and the silence timer.

pub mod controller;
pub mod neural;
pub mod simple;

pub use controller::{StopRequest, VadController, VadStrategy};
pub use neural::NeuralVadEngine;
pub use simple::SimpleVad;

/// Whether a given audio window contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    Speech,
    Silence,
}

impl VadDecision {
    pub fn is_speech(self) -> bool {
        self == VadDecision::Speech
    }

    pub fn from_bool(speech: bool) -> Self {
        if speech {
            VadDecision::Speech
        } else {
            VadDecision::Silence
        }
    }
}

/// Average interleaved frames down to mono. Pass-through for mono input.
pub(crate) fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    if ch == 1 {
        return samples.to_vec();
    }
    let frames = samples.len() / ch;
    let mut mono = Vec::with_capacity(frames);
    for f in 0..frames {
        let base = f * ch;
        let sum: f32 = samples[base..base + ch].iter().sum();
        mono.push(sum / ch as f32);
    }
    mono
}
