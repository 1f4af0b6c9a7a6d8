//! # Pitch Detection Module
//!
//! This module estimates the fundamental frequency of a block of mono audio
//! using the YIN algorithm. It is the analysis half of the tuner: the host
//! hands it one block at a time and gets back a frequency or nothing.
//!
//! ## Features
//! - Plain time-domain YIN (difference function, CMND, absolute threshold)
//! - Walk to the bottom of the first dip below the threshold
//! - Parabolic interpolation for sub-sample lag accuracy
//! - No windowing and no octave-error correction
//!
//! The estimator holds configuration only. Every call allocates its own
//! working buffer and keeps nothing once it returns.

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of samples per analysed block.
///
/// At 44.1 kHz this is ~93 ms, which covers more than four periods of the
/// lowest banjo string (C3, ~130.8 Hz).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Absolute threshold applied to the cumulative mean normalized difference.
pub const YIN_THRESHOLD: f32 = 0.15;

/// A detected pitch together with how clearly the signal repeated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pitch {
    /// Fundamental frequency in Hz.
    pub frequency: f32,
    /// `1 - d'(tau)` at the chosen lag, clamped to `[0, 1]`.
    pub clarity: f32,
}

/// YIN pitch estimator configured with a sample rate and detection threshold.
///
/// The struct is `Copy` and holds no buffers, so one instance can be shared
/// freely between threads or rebuilt for every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimator {
    pub sample_rate: u32,
    pub threshold: f32,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl PitchEstimator {
    /// Creates an estimator with the default YIN threshold.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            threshold: YIN_THRESHOLD,
        }
    }

    /// Returns a copy of this estimator using `threshold` instead.
    pub fn with_threshold(self, threshold: f32) -> Self {
        Self { threshold, ..self }
    }

    /// Estimates the fundamental frequency of `samples`.
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected frequency in Hz
    /// * `None` - No periodic signal found (silence, noise, or out of range)
    ///
    /// # Panics
    /// * If `samples` is empty or has an odd length
    /// * If the estimator's sample rate is zero
    pub fn estimate(&self, samples: &[f32]) -> Option<f32> {
        self.estimate_with_clarity(samples).map(|pitch| pitch.frequency)
    }

    /// Same as [`estimate`](Self::estimate) but also reports the clarity of
    /// the chosen dip.
    pub fn estimate_with_clarity(&self, samples: &[f32]) -> Option<Pitch> {
        assert!(
            !samples.is_empty() && samples.len() % 2 == 0,
            "sample block must have a non-zero even length, got {}",
            samples.len()
        );
        assert!(self.sample_rate > 0, "sample rate must be positive");

        let mut yin_buffer = difference_function(samples);
        cumulative_mean_normalize(&mut yin_buffer);

        let tau = absolute_threshold(&yin_buffer, self.threshold)?;
        let refined_tau = parabolic_interpolation(&yin_buffer, tau);
        let frequency = (self.sample_rate as f64 / refined_tau) as f32;

        Some(Pitch {
            frequency,
            clarity: (1.0 - yin_buffer[tau]).clamp(0.0, 1.0),
        })
    }
}

/// Estimates the pitch of `samples` with the default threshold.
///
/// Convenience wrapper around [`PitchEstimator::estimate`].
pub fn estimate_pitch(samples: &[f32], sample_rate: u32) -> Option<f32> {
    PitchEstimator::new(sample_rate).estimate(samples)
}

/// Computes the raw difference function over the first half of the block.
///
/// For `tau` in `0..N/2`: `d(tau) = sum_{i=0}^{N/2-1} (x_i - x_{i+tau})^2`.
pub fn difference_function(samples: &[f32]) -> Vec<f32> {
    let half_len = samples.len() / 2;
    let window = &samples[..half_len];

    (0..half_len)
        .map(|tau| {
            window
                .iter()
                .zip(&samples[tau..tau + half_len])
                .map(|(&a, &b)| {
                    let delta = a - b;
                    delta * delta
                })
                .sum::<f32>()
        })
        .collect()
}

/// Turns a difference function into the cumulative mean normalized difference,
/// in place.
///
/// `d'(0) = 1` and `d'(tau) = d(tau) * tau / sum_{j=1}^{tau} d(j)`. A block of
/// silence produces `0 / 0` here; the resulting NaNs never compare below the
/// threshold, so silence falls out of the threshold search on its own.
pub fn cumulative_mean_normalize(yin_buffer: &mut [f32]) {
    let Some(first) = yin_buffer.first_mut() else {
        return;
    };
    *first = 1.0;

    let mut running_sum = 0.0;
    for (tau, value) in yin_buffer.iter_mut().enumerate().skip(1) {
        running_sum += *value;
        *value = *value * tau as f32 / running_sum;
    }
}

/// Finds the first dip of `yin_buffer` below `threshold`, starting at lag 2,
/// and walks forward to the bottom of that dip.
fn absolute_threshold(yin_buffer: &[f32], threshold: f32) -> Option<usize> {
    let first_dip = (2..yin_buffer.len()).find(|&tau| yin_buffer[tau] < threshold)?;

    let mut tau = first_dip;
    while tau + 1 < yin_buffer.len() && yin_buffer[tau + 1] < yin_buffer[tau] {
        tau += 1;
    }
    Some(tau)
}

/// Refines an integer lag using the parabola through its two neighbours.
///
/// Lags at either edge of the buffer, and flat neighbourhoods, are returned
/// unrefined.
fn parabolic_interpolation(yin_buffer: &[f32], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= yin_buffer.len() {
        return tau as f64;
    }

    let s0 = yin_buffer[tau - 1] as f64;
    let s1 = yin_buffer[tau] as f64;
    let s2 = yin_buffer[tau + 1] as f64;

    let denominator = 2.0 * (2.0 * s1 - s2 - s0);
    if denominator == 0.0 {
        return tau as f64;
    }
    tau as f64 + (s2 - s0) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_function_matches_direct_sum() {
        let signal = [0.0, 1.0, 2.0, 0.0, -1.0, -2.0];
        // window = [0, 1, 2]
        // tau 1: (0-1)^2 + (1-2)^2 + (2-0)^2 = 6
        // tau 2: (0-2)^2 + (1-0)^2 + (2+1)^2 = 14
        assert_eq!(difference_function(&signal), vec![0.0, 6.0, 14.0]);
    }

    #[test]
    fn cmnd_normalizes_by_running_mean() {
        let mut buffer = vec![0.0, 6.0, 14.0];
        cumulative_mean_normalize(&mut buffer);
        assert_eq!(buffer, vec![1.0, 1.0, 2.0 * 14.0 / 20.0]);
    }

    #[test]
    fn threshold_walks_to_bottom_of_dip() {
        let buffer = [1.0, 1.0, 0.9, 0.14, 0.08, 0.05, 0.07, 0.02];
        assert_eq!(absolute_threshold(&buffer, 0.15), Some(5));
    }

    #[test]
    fn threshold_ignores_lags_below_two() {
        let buffer = [1.0, 0.01, 0.5, 0.5];
        assert_eq!(absolute_threshold(&buffer, 0.15), None);
    }

    #[test]
    fn interpolation_finds_vertex_of_parabola() {
        // y = (x - 2.25)^2 sampled at x = 1, 2, 3
        let buffer = [0.0, 1.5625, 0.0625, 0.5625];
        let refined = parabolic_interpolation(&buffer, 2);
        assert!((refined - 2.25).abs() < 1e-9);
    }

    #[test]
    fn interpolation_skips_buffer_edges() {
        let buffer = [1.0, 0.5, 0.1];
        assert_eq!(parabolic_interpolation(&buffer, 2), 2.0);
        assert_eq!(parabolic_interpolation(&buffer, 0), 0.0);
    }

    #[test]
    fn silence_is_not_a_pitch() {
        let silence = vec![0.0; DEFAULT_BLOCK_SIZE];
        assert_eq!(estimate_pitch(&silence, DEFAULT_SAMPLE_RATE), None);
    }

    #[test]
    fn clarity_is_high_for_a_pure_tone() {
        let signal: Vec<f32> = (0..DEFAULT_BLOCK_SIZE)
            .map(|i| (2.0 * std::f64::consts::PI * 440.0 * i as f64 / 44100.0).sin() as f32)
            .collect();
        let pitch = PitchEstimator::default()
            .estimate_with_clarity(&signal)
            .unwrap();
        assert!(pitch.clarity > 0.95, "clarity was {}", pitch.clarity);
    }

    #[test]
    #[should_panic(expected = "even length")]
    fn odd_block_is_rejected() {
        estimate_pitch(&[0.0; 5], DEFAULT_SAMPLE_RATE);
    }

    #[test]
    #[should_panic(expected = "sample rate must be positive")]
    fn zero_sample_rate_is_rejected() {
        PitchEstimator::new(0).estimate(&[0.0; 4]);
    }

    #[test]
    #[should_panic(expected = "even length")]
    fn empty_block_is_rejected() {
        estimate_pitch(&[], DEFAULT_SAMPLE_RATE);
    }
}
