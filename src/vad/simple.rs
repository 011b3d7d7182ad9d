//! Energy + frequency-domain VAD heuristic.
//!
//! ## Algorithm
//!
//! 1. Take the trailing `window_secs` of the supplied window.
//! 2. Compute its RMS; below `energy_threshold` → silence.
//! 3. FFT the tail and find the dominant non-DC bin; speech only when that
//!    dominant frequency exceeds `freq_threshold` (rejects hum and constant
//!    offsets that pass the energy gate).
//!
//! No persisted state: identical window + parameters always yield the same
//! decision. The caller supplies enough trailing context.

use rustfft::{num_complex::Complex, FftPlanner};

/// A stateless energy/frequency voice activity detector.
#[derive(Debug, Clone)]
pub struct SimpleVad {
    sample_rate: u32,
    /// Trailing portion of the supplied window actually analysed (seconds).
    window_secs: f32,
    /// RMS amplitude threshold. Typical range: 0.005–0.05.
    energy_threshold: f32,
    /// Dominant-frequency threshold in Hz.
    freq_threshold: f32,
}

impl SimpleVad {
    pub fn new(
        sample_rate: u32,
        window_secs: f32,
        energy_threshold: f32,
        freq_threshold: f32,
    ) -> Self {
        Self {
            sample_rate,
            window_secs,
            energy_threshold,
            freq_threshold,
        }
    }

    /// Classify the trailing window. Pure: no state survives the call.
    pub fn detect(&self, window: &[f32]) -> bool {
        let take = ((self.window_secs * self.sample_rate as f32) as usize).max(1);
        let tail = &window[window.len().saturating_sub(take)..];
        if tail.is_empty() {
            return false;
        }

        if Self::rms(tail) < self.energy_threshold {
            return false;
        }

        dominant_frequency(tail, self.sample_rate) > self.freq_threshold
    }

    /// Compute the root-mean-square of a sample slice.
    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }
}

/// Frequency (Hz) of the strongest non-DC bin in the first half of the
/// spectrum.
fn dominant_frequency(samples: &[f32], sample_rate: u32) -> f32 {
    let n = samples.len();
    if n < 4 {
        return 0.0;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buf);

    let mut best_bin = 0usize;
    let mut best_mag = 0.0f32;
    for (bin, value) in buf.iter().enumerate().take(n / 2).skip(1) {
        let mag = value.norm_sqr();
        if mag > best_mag {
            best_mag = mag;
            best_bin = bin;
        }
    }

    best_bin as f32 * sample_rate as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
        let n = (secs * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_below_energy_threshold() {
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        assert!(!vad.detect(&vec![0.0; 8_000]));
    }

    #[test]
    fn voiced_tone_is_speech() {
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        assert!(vad.detect(&sine(440.0, 0.5, 0.5, 16_000)));
    }

    #[test]
    fn low_frequency_rumble_is_rejected() {
        // Loud 30 Hz rumble: passes the energy gate, fails the frequency gate.
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        assert!(!vad.detect(&sine(30.0, 0.5, 0.5, 16_000)));
    }

    #[test]
    fn decision_is_a_pure_function_of_the_window() {
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        let window = sine(300.0, 0.2, 0.6, 16_000);
        let first = vad.detect(&window);
        for _ in 0..5 {
            assert_eq!(vad.detect(&window), first);
        }
    }

    #[test]
    fn only_the_trailing_window_is_analysed() {
        // 1 s of speech followed by 0.5 s of silence: with a 0.5 s analysis
        // window only the silent tail is scored.
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        let mut window = sine(440.0, 0.5, 1.0, 16_000);
        window.extend(std::iter::repeat(0.0).take(8_000));
        assert!(!vad.detect(&window));
    }

    #[test]
    fn empty_window_is_silence() {
        let vad = SimpleVad::new(16_000, 0.5, 0.01, 100.0);
        assert!(!vad.detect(&[]));
    }

    #[test]
    fn dominant_frequency_finds_the_tone() {
        let tone = sine(1_000.0, 0.4, 0.5, 16_000);
        let freq = dominant_frequency(&tone, 16_000);
        assert_relative_eq!(freq, 1_000.0, max_relative = 0.02);
    }
}
