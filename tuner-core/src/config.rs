//! # Tuner Configuration
//!
//! Every tunable constant of the engine in one serde struct. Missing fields
//! fall back to their defaults, so a config file only needs the values it
//! changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{TunerError, TunerResult};
use crate::pitch::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, PitchEstimator, YIN_THRESHOLD};
use crate::session::{DEFAULT_SESSION_VOLUME, SECONDS_PER_STRING, clamp_volume};
use crate::tuning::{CLOSE_CENTS, Classifier, DEFAULT_REFERENCE_PITCH, IN_TUNE_CENTS, ReferencePitch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per analysed block. Must be even.
    pub block_size: usize,
    /// YIN absolute threshold, in `(0, 1)`.
    pub yin_threshold: f32,
    pub in_tune_cents: f32,
    pub close_cents: f32,
    /// A4 in Hz; clamped to the supported range when used.
    pub reference_pitch: u32,
    /// Session playback volume; clamped to `[0, 1]` when used.
    pub session_volume: f32,
    pub seconds_per_string: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            yin_threshold: YIN_THRESHOLD,
            in_tune_cents: IN_TUNE_CENTS,
            close_cents: CLOSE_CENTS,
            reference_pitch: DEFAULT_REFERENCE_PITCH,
            session_volume: DEFAULT_SESSION_VOLUME,
            seconds_per_string: SECONDS_PER_STRING,
        }
    }
}

impl TunerConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> TunerResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        info!("Loaded tuner config from {}", path.display());
        Ok(config)
    }

    /// Writes this configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> TunerResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> TunerResult<()> {
        if self.sample_rate == 0 {
            return Err(TunerError::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.block_size == 0 || self.block_size % 2 != 0 {
            return Err(TunerError::InvalidConfig(format!(
                "block_size must be a positive even number, got {}",
                self.block_size
            )));
        }
        if !(self.yin_threshold > 0.0 && self.yin_threshold < 1.0) {
            return Err(TunerError::InvalidConfig(format!(
                "yin_threshold must be in (0, 1), got {}",
                self.yin_threshold
            )));
        }
        if !(self.in_tune_cents >= 0.0 && self.close_cents >= self.in_tune_cents) {
            return Err(TunerError::InvalidConfig(format!(
                "expected 0 <= in_tune_cents <= close_cents, got {} and {}",
                self.in_tune_cents, self.close_cents
            )));
        }
        if !(self.seconds_per_string.is_finite() && self.seconds_per_string > 0.0) {
            return Err(TunerError::InvalidConfig(format!(
                "seconds_per_string must be positive, got {}",
                self.seconds_per_string
            )));
        }
        Ok(())
    }

    pub fn estimator(&self) -> PitchEstimator {
        PitchEstimator::new(self.sample_rate).with_threshold(self.yin_threshold)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.in_tune_cents, self.close_cents)
    }

    pub fn reference_pitch(&self) -> ReferencePitch {
        ReferencePitch::new(self.reference_pitch)
    }

    pub fn session_volume(&self) -> f32 {
        clamp_volume(self.session_volume)
    }
}
