//! Audio capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It must not allocate, block for long, or perform I/O. The [`SharedRing`]
//! write path takes a short uncontended lock and touches no allocator.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `AudioCapture` therefore must be created and dropped on the same
//! thread.

pub mod device;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

use crate::buffering::SharedRing;
use crate::config::RecordingConfig;
use crate::error::Result;
#[cfg(feature = "audio-cpal")]
use crate::error::LoopcapError;

/// Handle to an active audio capture stream writing into a [`SharedRing`].
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to make the callback a no-op.
    running: Arc<AtomicBool>,
}

impl AudioCapture {
    /// Open an input device by the configured preferred name, otherwise fall
    /// back to the default input device and then the first available one.
    ///
    /// The stream is opened at `config.sample_rate` / `config.channels` so
    /// the ring carries samples in the session's native format. Samples are
    /// converted to f32 in `[-1, 1]` before they reach the ring.
    ///
    /// # Errors
    /// `LoopcapError::NoDefaultInputDevice` when no microphone exists,
    /// `LoopcapError::AudioStream` when the device rejects the requested
    /// format or cpal fails to build the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open(
        ring: SharedRing,
        running: Arc<AtomicBool>,
        config: &RecordingConfig,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred) = config.preferred_input_device.as_deref() {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices
                        .find(|d| d.name().map(|n| n == preferred).unwrap_or(false));
                    if selected_device.is_none() {
                        warn!("preferred input device '{preferred}' not found, falling back");
                    }
                }
                Err(e) => {
                    warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| LoopcapError::AudioDevice(e.to_string()))?;
            let fallback = devices.next().ok_or(LoopcapError::NoDefaultInputDevice)?;
            warn!("no default input device, falling back to first available input");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| LoopcapError::AudioDevice(e.to_string()))?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running_f32 = Arc::clone(&running);
        let running_i16 = Arc::clone(&running);

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let ring = ring.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _info| {
                        if !running_f32.load(Ordering::Relaxed) {
                            return;
                        }
                        ring.push(data);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            SampleFormat::I16 => {
                let ring = ring.clone();
                let mut convert_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _info| {
                        if !running_i16.load(Ordering::Relaxed) {
                            return;
                        }
                        convert_buf.clear();
                        convert_buf.extend(data.iter().map(|&s| s as f32 / 32768.0));
                        ring.push(&convert_buf);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }

            fmt => {
                return Err(LoopcapError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| LoopcapError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| LoopcapError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
        })
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open(
        _ring: SharedRing,
        running: Arc<AtomicBool>,
        _config: &RecordingConfig,
    ) -> Result<Self> {
        let _ = running;
        Err(crate::error::LoopcapError::AudioStream(
            "compiled without the audio-cpal feature".into(),
        ))
    }
}
