//! End-to-end session behavior over an in-memory ring: chunk emission,
//! loop-lap handling, silence auto-stop, and event sequencing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use loopcap::{
    RecordingConfig, RecordingSession, SessionEvent, SharedRing, VadConfig,
};

fn silent_vad() -> VadConfig {
    VadConfig {
        enabled: false,
        ..Default::default()
    }
}

fn sine(freq: f32, amplitude: f32, n: usize, sample_rate: u32) -> Vec<f32> {
    (0..n)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32).collect()
}

#[test]
fn full_chunks_are_emitted_as_the_cursor_advances() {
    // 0.5 s chunks at 16 kHz mono = 8000 samples each.
    let config = RecordingConfig {
        max_length_secs: 30.0,
        chunk_length_secs: 0.5,
        vad: silent_vad(),
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    let events = session.events();
    session.start();

    // 1.5 s of audio in one tick: exactly three chunks, nothing withheld.
    ring.push(&ramp(24_000));
    session.update(ring.write_pos());

    let chunks: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::ChunkReady { chunk, .. } => Some(chunk),
            _ => None,
        })
        .collect();
    assert_eq!(chunks.len(), 3);
    for (k, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.samples.len(), 8_000);
        // Chunks are contiguous and non-overlapping over the ramp.
        assert_eq!(chunk.samples[0], (k * 8_000) as f32);
        assert_eq!(chunk.samples[7_999], (k * 8_000 + 7_999) as f32);
    }
}

#[test]
fn partial_chunk_stays_buffered_until_it_fills() {
    let config = RecordingConfig {
        chunk_length_secs: 0.5,
        vad: silent_vad(),
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    let events = session.events();
    session.start();

    ring.push(&ramp(7_000));
    session.update(ring.write_pos());
    assert!(events.try_recv().is_err(), "7000 < 8000, no chunk yet");

    ring.push(&ramp(1_000));
    session.update(ring.write_pos());
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::ChunkReady { .. })
    ));
}

#[test]
fn cursor_wrap_stops_the_session_when_looping_is_disallowed() {
    let config = RecordingConfig {
        loop_on_overflow: false,
        chunk_length_secs: 0.0,
        vad: silent_vad(),
        ..Default::default()
    };
    // Ring smaller than the configured maximum: capacity comes from the
    // source, not the config.
    let ring = SharedRing::new(2_000);
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    let events = session.events();
    session.start();

    ring.push(&ramp(1_000));
    assert!(session.update(ring.write_pos()).is_none());

    // 1500 more samples: cursor wraps to 500, below the previous 1000.
    ring.push(&ramp(1_500));
    let recording = session
        .update(ring.write_pos())
        .expect("wrap with looping disallowed stops the session");

    // Everything recorded before the wrap was detected survives.
    assert_eq!(recording.samples.len(), 1_000);
    assert!(!session.is_recording());
    assert!(events
        .try_iter()
        .any(|e| matches!(e, SessionEvent::Stopped { .. })));
}

#[test]
fn cursor_wrap_marks_a_loop_lap_when_looping_is_allowed() {
    let config = RecordingConfig {
        loop_on_overflow: true,
        chunk_length_secs: 0.0,
        vad: silent_vad(),
        ..Default::default()
    };
    let ring = SharedRing::new(2_000);
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    session.start();

    // A continuous ramp 0..2500 pushed in two batches; the second wraps.
    ring.push(&ramp(1_000));
    session.update(ring.write_pos());
    let second: Vec<f32> = (1_000..2_500).map(|i| i as f32).collect();
    ring.push(&second);
    assert!(session.update(ring.write_pos()).is_none());
    assert!(session.made_loop_lap());
    assert!(session.is_recording());

    // After a lap the final slice is the full capacity, oldest-first across
    // the wrap boundary.
    let recording = session.stop(0.0).expect("was recording");
    assert_eq!(recording.samples.len(), 2_000);
    assert_eq!(recording.samples[0], 500.0);
    assert_eq!(recording.samples[1_999], 2_499.0);
}

#[test]
fn sustained_silence_stops_and_trims_the_trailing_silence() {
    let mut config = RecordingConfig {
        max_length_secs: 10.0,
        chunk_length_secs: 0.0,
        ..Default::default()
    };
    config.vad.stop_on_silence = true;
    config.vad.drop_trailing_silence = true;
    config.vad.silence_timeout_secs = 3.0;

    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    let events = session.events();
    session.start();

    let t0 = Instant::now();

    // 1 s of voiced tone → speech.
    ring.push(&sine(440.0, 0.5, 16_000, 16_000));
    assert!(session.update_at(ring.write_pos(), t0).is_none());

    // 4 s of silence; the first silent decision arms the timer.
    ring.push(&vec![0.0; 64_000]);
    let t1 = t0 + Duration::from_secs(1);
    assert!(session.update_at(ring.write_pos(), t1).is_none());

    // No new audio, but the timer elapses: auto-stop with a 3 s trim.
    let t2 = t1 + Duration::from_millis(3_050);
    let recording = session
        .update_at(ring.write_pos(), t2)
        .expect("silence timeout stops the session");

    // 80000 recorded − 48000 trimmed = 32000 samples: the 1 s of speech
    // plus the 1 s of silence that preceded the timeout window.
    assert_eq!(recording.samples.len(), 32_000);
    assert!(recording.samples[..16_000].iter().any(|&s| s.abs() > 0.1));
    assert!(recording.samples[16_000..].iter().all(|&s| s == 0.0));

    let kinds: Vec<SessionEvent> = events.try_iter().collect();
    assert!(matches!(
        kinds[0],
        SessionEvent::VoiceActivity { speaking: true, .. }
    ));
    assert!(matches!(
        kinds[1],
        SessionEvent::VoiceActivity {
            speaking: false,
            ..
        }
    ));
    assert!(matches!(kinds.last(), Some(SessionEvent::Stopped { .. })));
}

#[test]
fn silence_timeout_without_trim_keeps_the_whole_recording() {
    let mut config = RecordingConfig {
        max_length_secs: 10.0,
        chunk_length_secs: 0.0,
        ..Default::default()
    };
    config.vad.stop_on_silence = true;
    config.vad.drop_trailing_silence = false;
    config.vad.silence_timeout_secs = 2.0;

    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    session.start();

    let t0 = Instant::now();
    ring.push(&vec![0.0; 32_000]);
    session.update_at(ring.write_pos(), t0);

    let recording = session
        .update_at(ring.write_pos(), t0 + Duration::from_millis(2_100))
        .expect("timeout fired");
    assert_eq!(recording.samples.len(), 32_000, "nothing trimmed");
}

#[test]
fn event_sequence_numbers_are_monotonic() {
    let config = RecordingConfig {
        chunk_length_secs: 0.25,
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    let events = session.events();
    session.start();

    ring.push(&sine(440.0, 0.5, 16_000, 16_000));
    session.update(ring.write_pos());
    ring.push(&vec![0.0; 16_000]);
    session.update(ring.write_pos());
    session.stop(0.0);

    let seqs: Vec<u64> = events.try_iter().map(|e| e.seq()).collect();
    assert!(seqs.len() >= 4, "chunks + transitions + stopped");
    assert_eq!(seqs[0], 0);
    assert!(seqs.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn stop_returns_the_recording_once() {
    let config = RecordingConfig {
        vad: silent_vad(),
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    session.start();

    ring.push(&ramp(5_000));
    session.update(ring.write_pos());

    let first = session.stop(0.0);
    assert_eq!(first.map(|r| r.samples.len()), Some(5_000));
    assert!(session.stop(0.0).is_none(), "already stopped");
}

#[test]
fn activity_indicator_follows_transitions() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let config = RecordingConfig {
        chunk_length_secs: 0.0,
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();

    let toggles = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&toggles);
    session.set_activity_indicator(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    session.start();

    ring.push(&sine(440.0, 0.5, 16_000, 16_000));
    session.update(ring.write_pos()); // silence → speech
    ring.push(&vec![0.0; 16_000]);
    session.update(ring.write_pos()); // speech → silence

    assert_eq!(toggles.load(Ordering::SeqCst), 2);
}

#[test]
fn drop_larger_than_the_recording_yields_an_empty_buffer() {
    let config = RecordingConfig {
        vad: silent_vad(),
        ..Default::default()
    };
    let ring = SharedRing::new(config.capacity_samples());
    let mut session = RecordingSession::new(config, Arc::new(ring.clone())).unwrap();
    session.start();

    ring.push(&ramp(1_000));
    session.update(ring.write_pos());

    let recording = session.stop(60.0).expect("stop still completes");
    assert!(recording.is_empty());
}
