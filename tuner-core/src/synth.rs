//! # Reference Tone Module
//!
//! Generates one seamless loop of a pure sine tone as 16-bit PCM. The loop
//! spans a whole number of cycles, so a player can repeat
//! `[0, loop_length)` forever without an audible click at the seam.

use std::f64::consts::PI;

/// Sample rate used for reference tones.
pub const TONE_SAMPLE_RATE: u32 = 44100;

/// Longest loop a tone may span, about six minutes at 44.1 kHz.
pub const MAX_LOOP_SAMPLES: usize = 1 << 24;

/// One loop period of a quantized sine tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneBuffer {
    pub samples: Vec<i16>,
    /// Number of samples in one loop; always equal to `samples.len()`.
    pub loop_length: usize,
    pub sample_rate: u32,
}

impl ToneBuffer {
    /// Duration of one loop in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.loop_length as f64 / self.sample_rate as f64
    }

    /// Samples as little-endian 16-bit PCM bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

fn check_tone_args(frequency: f32, sample_rate: u32) {
    assert!(
        frequency.is_finite() && frequency > 0.0,
        "tone frequency must be positive, got {frequency}"
    );
    assert!(sample_rate > 0, "tone sample rate must be positive");
}

/// Number of samples spanning the whole number of cycles closest to one
/// second, rounded to the nearest sample.
///
/// At least one cycle is always kept, so sub-hertz frequencies still
/// produce a usable loop.
///
/// # Panics
/// * If `frequency` is not a positive finite number or `sample_rate` is zero
/// * If one cycle is so long that the loop exceeds [`MAX_LOOP_SAMPLES`]
pub fn loop_sample_count(frequency: f32, sample_rate: u32) -> usize {
    check_tone_args(frequency, sample_rate);

    let sample_rate = sample_rate as f64;
    let samples_per_cycle = sample_rate / frequency as f64;
    let cycles = (sample_rate / samples_per_cycle).round().max(1.0);
    let count = (cycles * samples_per_cycle).round();
    assert!(
        count <= MAX_LOOP_SAMPLES as f64,
        "tone loop of {count} samples at {frequency} Hz is too long"
    );
    count as usize
}

/// Samples `sin(2π·f·t)` at `t = i / sample_rate` for `i` in `0..sample_count`
/// and quantizes each value to `round(value * 32767)`.
///
/// # Panics
/// * If `frequency` is not a positive finite number or `sample_rate` is zero
pub fn generate_samples(frequency: f32, sample_rate: u32, sample_count: usize) -> Vec<i16> {
    check_tone_args(frequency, sample_rate);

    let two_pi_f = 2.0 * PI * frequency as f64;
    let sample_rate = sample_rate as f64;
    (0..sample_count)
        .map(|i| {
            let t = i as f64 / sample_rate;
            ((two_pi_f * t).sin() * i16::MAX as f64).round() as i16
        })
        .collect()
}

/// Synthesizes exactly one loop period of a sine tone at `frequency_hz`.
///
/// # Panics
/// * If `frequency_hz` is not a positive finite number or `sample_rate` is zero
pub fn synthesize_tone(frequency_hz: f32, sample_rate: u32) -> ToneBuffer {
    let loop_length = loop_sample_count(frequency_hz, sample_rate);
    let samples = generate_samples(frequency_hz, sample_rate, loop_length);
    tracing::debug!(frequency_hz, sample_rate, loop_length, "synthesized reference tone");

    ToneBuffer {
        samples,
        loop_length,
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_of_integer_frequency_is_one_second() {
        assert_eq!(loop_sample_count(440.0, 44100), 44100);
        assert_eq!(loop_sample_count(196.0, 44100), 44100);
    }

    #[test]
    fn loop_of_fractional_frequency_spans_whole_cycles() {
        // 147 cycles of 146.83 Hz = 44151.06 samples
        assert_eq!(loop_sample_count(146.83, 44100), 44151);
        // 294 cycles of 293.66 Hz = 44151.13 samples
        assert_eq!(loop_sample_count(293.66, 44100), 44151);
    }

    #[test]
    fn sub_hertz_tone_keeps_one_cycle() {
        assert_eq!(loop_sample_count(0.25, 100), 400);
    }

    #[test]
    #[should_panic(expected = "is too long")]
    fn near_zero_frequency_is_rejected() {
        loop_sample_count(1e-6, TONE_SAMPLE_RATE);
    }

    #[test]
    fn lowest_frequency_within_bound_is_accepted() {
        // One cycle of 0.01 Hz is 4_410_000 samples.
        assert_eq!(loop_sample_count(0.01, TONE_SAMPLE_RATE), 4_410_000);
    }

    #[test]
    fn samples_are_quantized_to_full_scale() {
        // A quarter period of 11025 Hz at 44100 Hz is exactly one sample.
        let samples = generate_samples(11025.0, 44100, 4);
        assert_eq!(samples, vec![0, 32767, 0, -32767]);
    }

    #[test]
    fn buffer_holds_exactly_one_loop() {
        let tone = synthesize_tone(246.94, TONE_SAMPLE_RATE);
        assert_eq!(tone.samples.len(), tone.loop_length);
        assert_eq!(tone.sample_rate, TONE_SAMPLE_RATE);
        assert!((tone.duration_secs() - 1.0).abs() < 0.01);
        assert_eq!(tone.to_le_bytes().len(), tone.loop_length * 2);
    }

    #[test]
    #[should_panic(expected = "frequency must be positive")]
    fn zero_frequency_is_rejected() {
        synthesize_tone(0.0, TONE_SAMPLE_RATE);
    }

    #[test]
    #[should_panic(expected = "frequency must be positive")]
    fn nan_frequency_is_rejected() {
        loop_sample_count(f32::NAN, TONE_SAMPLE_RATE);
    }

    #[test]
    #[should_panic(expected = "sample rate must be positive")]
    fn zero_sample_rate_is_rejected() {
        synthesize_tone(440.0, 0);
    }
}
