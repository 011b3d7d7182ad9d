//! Silero VAD ONNX backend.
//!
//! Wraps the Silero VAD v5 model published at
//! <https://github.com/snakers4/silero-vad>.
//!
//! ## Model I/O (v5 GRU)
//!
//! | Name     | Shape       | DType | Direction |
//! |----------|-------------|-------|-----------|
//! | `input`  | `[1, 512]`  | f32   | in        |
//! | `sr`     | `[1]`       | i64   | in        |
//! | `state`  | `[2,1,128]` | f32   | in/out    |
//! | `output` | `[1, 1]`    | f32   | out       |
//! | `stateN` | `[2,1,128]` | f32   | out       |

use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use ort::session::builder::SessionBuilder;
use ort::session::SessionInputValue;
use ort::value::Value;
use tracing::info;

use crate::error::{LoopcapError, Result};
use crate::inference::{RecurrentState, SpeechModel};

/// Window size expected by Silero VAD (samples at 16 kHz = 32 ms).
const WINDOW: usize = 512;

/// Silero VAD v5 as a [`SpeechModel`].
pub struct SileroModel {
    session: ort::session::Session,
    input_name: String,
    sr_name: Option<String>,
    state_name: String,
    output_name: String,
    state_out_name: String,
    sample_rate: i64,
}

impl SileroModel {
    /// Load the Silero VAD ONNX model from `path`.
    pub fn new(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoopcapError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let metadata = std::fs::metadata(path);
        let size_mb = metadata
            .map(|m| m.len() as f64 / 1_048_576.0)
            .unwrap_or(0.0);

        info!("=== SileroModel Startup Report ===");
        info!("  path: {:?}", path);
        info!("  size: {:.2} MB", size_mb);
        info!("  sample_rate: {}", sample_rate);

        let session = SessionBuilder::new()
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();

        info!("  inputs: {:?}", input_names);
        info!("  outputs: {:?}", output_names);

        let input_name = resolve_name(&input_names, &["input", "audio", "x"])
            .or_else(|| input_names.first().cloned())
            .ok_or_else(|| LoopcapError::OnnxSession("Silero model has no inputs".into()))?;
        let sr_name = resolve_name(&input_names, &["sr", "sample_rate"]);
        let state_name = resolve_name(&input_names, &["state", "h_0", "hidden"])
            .ok_or_else(|| LoopcapError::OnnxSession("Silero model has no state input".into()))?;

        let output_name = resolve_name(&output_names, &["output", "speech_prob", "prob"])
            .or_else(|| output_names.first().cloned())
            .ok_or_else(|| LoopcapError::OnnxSession("Silero model has no outputs".into()))?;
        let state_out_name =
            resolve_name(&output_names, &["stateN", "state_out", "hn_out"]).ok_or_else(|| {
                LoopcapError::OnnxSession("Silero model has no state output".into())
            })?;

        info!("=== SileroModel ready ===");

        Ok(Self {
            session,
            input_name,
            sr_name,
            state_name,
            output_name,
            state_out_name,
            sample_rate: sample_rate as i64,
        })
    }
}

fn resolve_name(candidates: &[String], preferred: &[&str]) -> Option<String> {
    preferred.iter().find_map(|needle| {
        candidates
            .iter()
            .find(|name| name.eq_ignore_ascii_case(needle))
            .cloned()
    })
}

impl SpeechModel for SileroModel {
    fn warm_up(&mut self) -> Result<()> {
        let state = RecurrentState::zeroed();
        let (prob, _) = self.evaluate(&[0.0; WINDOW], &state)?;
        info!(prob, "SileroModel warm-up evaluation done");
        Ok(())
    }

    fn window_size(&self) -> usize {
        WINDOW
    }

    fn evaluate(&mut self, window: &[f32], state: &RecurrentState) -> Result<(f32, RecurrentState)> {
        if window.len() != WINDOW {
            return Err(LoopcapError::Inference(format!(
                "window has {} samples, expected {WINDOW}",
                window.len()
            )));
        }

        let input_arr = Array2::<f32>::from_shape_vec((1, WINDOW), window.to_vec())
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;
        let input_val = Value::from_array(input_arr)
            .map_err(|e: ort::Error| LoopcapError::OnnxSession(e.to_string()))?;

        let state_arr = Array3::<f32>::from_shape_vec((2, 1, 128), state.as_slice().to_vec())
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;
        let state_val = Value::from_array(state_arr)
            .map_err(|e: ort::Error| LoopcapError::OnnxSession(e.to_string()))?;

        let mut input_values: Vec<(String, SessionInputValue<'_>)> = vec![
            (self.input_name.clone(), input_val.into()),
            (self.state_name.clone(), state_val.into()),
        ];

        if let Some(sr_name) = &self.sr_name {
            let sr_arr = Array1::<i64>::from_elem(1, self.sample_rate);
            let sr_val = Value::from_array(sr_arr)
                .map_err(|e: ort::Error| LoopcapError::OnnxSession(e.to_string()))?;
            input_values.push((sr_name.clone(), sr_val.into()));
        }

        let outputs = self
            .session
            .run(input_values)
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;

        let prob_output = outputs
            .get(self.output_name.as_str())
            .unwrap_or(&outputs[0]);
        let (_, prob_data) = prob_output
            .try_extract_tensor::<f32>()
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;
        let prob = prob_data.first().copied().unwrap_or(0.0);

        let state_out = outputs.get(self.state_out_name.as_str()).ok_or_else(|| {
            LoopcapError::OnnxSession(format!("output '{}' missing", self.state_out_name))
        })?;
        let (_, state_data) = state_out
            .try_extract_tensor::<f32>()
            .map_err(|e| LoopcapError::OnnxSession(e.to_string()))?;
        let next = RecurrentState::from_values(state_data.to_vec())?;

        Ok((prob, next))
    }
}
