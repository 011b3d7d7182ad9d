//! Speech model abstraction.
//!
//! The `SpeechModel` trait decouples the neural VAD engine from any specific
//! backend (deterministic stub, ONNX Silero, etc.). A model maps a
//! fixed-size sample window plus a recurrent state blob to a speech
//! probability and an updated state blob; it never aliases the caller's
//! state.
//!
//! `&mut self` on `evaluate` intentionally expresses that backends are
//! stateful (session caches, pre-allocated tensors). All mutation is
//! serialised through `ModelHandle`'s `parking_lot::Mutex`.

pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{LoopcapError, Result};

/// Recurrent state length: 2 layers × 1 batch × 128 units.
pub const RECURRENT_STATE_LEN: usize = 256;

/// The neural model's carried-forward memory between evaluations.
///
/// A fixed-shape value type, passed by value or explicit `&mut` — never a
/// shared pointer. Mutated only by a successful model evaluation, or
/// explicitly decayed/zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentState {
    values: Vec<f32>,
}

impl RecurrentState {
    /// A fresh all-zero state.
    pub fn zeroed() -> Self {
        Self {
            values: vec![0.0; RECURRENT_STATE_LEN],
        }
    }

    /// Build a state from model output.
    ///
    /// # Errors
    /// Rejects blobs that do not match the fixed state shape.
    pub fn from_values(values: Vec<f32>) -> Result<Self> {
        if values.len() != RECURRENT_STATE_LEN {
            return Err(LoopcapError::Inference(format!(
                "recurrent state has {} values, expected {RECURRENT_STATE_LEN}",
                values.len()
            )));
        }
        Ok(Self { values })
    }

    /// Soft reset: scale every element by `factor`, clamped to [0, 1].
    /// `decay(1.0)` is a no-op, `decay(0.0)` zeroes the state.
    pub fn decay(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        for v in &mut self.values {
            *v *= factor;
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl Default for RecurrentState {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Contract for neural VAD backends.
pub trait SpeechModel: Send + 'static {
    /// One-time warm-up: load weights, pre-allocate buffers, run a dummy
    /// evaluation. Called once when the session builds the neural strategy.
    ///
    /// # Errors
    /// Returns an error if model files are missing or corrupt.
    fn warm_up(&mut self) -> Result<()>;

    /// Fixed window size (mono samples) this model evaluates.
    fn window_size(&self) -> usize;

    /// Score one window against `state`.
    ///
    /// Deterministic given identical inputs. The returned state always has
    /// the same shape as the input state.
    ///
    /// # Errors
    /// Rejects windows whose length differs from [`Self::window_size`].
    fn evaluate(&mut self, window: &[f32], state: &RecurrentState) -> Result<(f32, RecurrentState)>;
}

/// Thread-safe reference-counted handle to any `SpeechModel` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic and a fast
/// uncontended lock.
#[derive(Clone)]
pub struct ModelHandle(pub Arc<Mutex<dyn SpeechModel>>);

impl ModelHandle {
    /// Wrap any `SpeechModel` in a `ModelHandle`.
    pub fn new<M: SpeechModel>(model: M) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}
