//! Demo recorder: capture from a microphone into a ring buffer, run VAD,
//! and write the final recording to a WAV file.
//!
//! ```text
//! cargo run --bin loopcap-record -- \
//!   [--device <name>] [--max-secs <n>] [--stop-on-silence] [--output <file.wav>]
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use loopcap::{
    audio::{device::list_input_devices, AudioCapture},
    RecordingConfig, RecordingSession, SessionEvent, SharedRing,
};

const TICK: Duration = Duration::from_millis(30);

#[derive(Debug)]
struct Args {
    device: Option<String>,
    max_secs: f32,
    stop_on_silence: bool,
    output: PathBuf,
    list_devices: bool,
}

fn parse_args() -> Result<Args> {
    let mut device = None;
    let mut max_secs = 30.0f32;
    let mut stop_on_silence = false;
    let mut output = PathBuf::from("recording.wav");
    let mut list_devices = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--device" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --device");
                };
                device = Some(v);
            }
            "--max-secs" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --max-secs");
                };
                max_secs = v
                    .parse::<f32>()
                    .context("invalid value for --max-secs")?
                    .clamp(1.0, 600.0);
            }
            "--stop-on-silence" => stop_on_silence = true,
            "--output" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --output");
                };
                output = PathBuf::from(v);
            }
            "--list-devices" => list_devices = true,
            "--help" | "-h" => {
                println!(
                    "Usage: loopcap-record [--device <name>] [--max-secs <n>] \\
  [--stop-on-silence] [--output <file.wav>] [--list-devices]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(Args {
        device,
        max_secs,
        stop_on_silence,
        output,
        list_devices,
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopcap=info,loopcap_record=info".into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("recording failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;

    if args.list_devices {
        for d in list_input_devices() {
            println!("{}{}", d.name, if d.is_default { " (default)" } else { "" });
        }
        return Ok(());
    }

    let mut config = RecordingConfig {
        max_length_secs: args.max_secs,
        preferred_input_device: args.device.clone(),
        ..Default::default()
    };
    config.vad.stop_on_silence = args.stop_on_silence;
    config.vad.drop_trailing_silence = args.stop_on_silence;

    if let Some(name) = args.device.as_deref() {
        loopcap::audio::device::ensure_input_device(name)?;
    }

    let ring = SharedRing::new(config.capacity_samples());
    let running = Arc::new(AtomicBool::new(true));
    let capture = AudioCapture::open(ring.clone(), Arc::clone(&running), &config)?;

    let mut session = RecordingSession::new(config.clone(), Arc::new(ring.clone()))?;
    let events = session.events();
    session.start();

    println!("recording (max {}s, ctrl-c to abort)...", args.max_secs);
    let deadline = std::time::Instant::now() + Duration::from_secs_f32(args.max_secs);

    let mut final_recording = None;
    while std::time::Instant::now() < deadline {
        if let Some(recording) = session.update(ring.write_pos()) {
            final_recording = Some(recording);
            break;
        }
        for event in events.try_iter() {
            match event {
                SessionEvent::VoiceActivity { speaking, .. } => {
                    println!("{}", if speaking { "speech" } else { "silence" });
                }
                SessionEvent::ChunkReady { chunk, .. } => {
                    tracing::debug!(
                        samples = chunk.samples.len(),
                        voice = chunk.voice_detected,
                        "chunk ready"
                    );
                }
                SessionEvent::Stopped { .. } => {}
            }
        }
        std::thread::sleep(TICK);
    }
    capture.stop();
    running.store(false, Ordering::Release);

    let recording = match final_recording.or_else(|| session.stop(0.0)) {
        Some(r) => r,
        None => bail!("no audio recorded"),
    };

    println!(
        "captured {:.2}s ({} samples)",
        recording.duration_secs(),
        recording.samples.len()
    );

    let spec = hound::WavSpec {
        channels: recording.channels,
        sample_rate: recording.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for &s in &recording.samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    println!("wrote {}", args.output.display());

    Ok(())
}
