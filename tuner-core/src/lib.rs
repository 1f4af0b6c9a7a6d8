// tuner-core/src/lib.rs

//! The core logic for the banjo tuner.
//! This crate is responsible for pitch detection, tuning classification,
//! reference tone synthesis and the string-by-string session sequence. It is completely headless: it owns no
//! audio device, no thread and no UI state. A host feeds it sample blocks
//! and plays the tone buffers it returns.

pub mod catalogue;
pub mod config;
pub mod error;
pub mod pitch;
pub mod session;
pub mod synth;
pub mod tuning;

use serde::{Deserialize, Serialize};

pub use config::TunerConfig;
pub use error::{TunerError, TunerResult};
pub use pitch::{Pitch, PitchEstimator, estimate_pitch};
pub use session::Session;
pub use synth::{ToneBuffer, synthesize_tone};
pub use tuning::{BanjoString, Classifier, ReferencePitch, TuningStatus, classify_deviation};

/// Represents the result of analysing a single block against a target string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    /// The detected frequency in Hz, if any pitch was found.
    pub detected_hz: Option<f32>,
    /// The frequency the string should be at.
    pub target_hz: f32,
    /// Signed deviation from the target in cents; zero when nothing was detected.
    pub cent_deviation: f32,
    pub status: TuningStatus,
}

impl TuningResult {
    /// Result for a block in which no pitch was found.
    pub fn no_signal(target_hz: f32) -> Self {
        Self {
            detected_hz: None,
            target_hz,
            cent_deviation: 0.0,
            status: TuningStatus::NoSignal,
        }
    }

    /// Classifies a detected frequency against `target_hz`.
    pub fn from_detection(detected_hz: f32, target_hz: f32, classifier: &Classifier) -> Self {
        let (cent_deviation, status) = classifier.classify_deviation(detected_hz, target_hz);
        Self {
            detected_hz: Some(detected_hz),
            target_hz,
            cent_deviation,
            status,
        }
    }
}

/// Runs one tuner step: estimates the pitch of `samples` and, if one was
/// found, classifies it against `target_hz`.
///
/// # Panics
/// * If `samples` is empty or has an odd length
pub fn analyze_block(
    samples: &[f32],
    target_hz: f32,
    estimator: &PitchEstimator,
    classifier: &Classifier,
) -> TuningResult {
    let result = match estimator.estimate(samples) {
        Some(detected_hz) => TuningResult::from_detection(detected_hz, target_hz, classifier),
        None => TuningResult::no_signal(target_hz),
    };
    tracing::debug!(
        detected_hz = ?result.detected_hz,
        target_hz,
        cents = result.cent_deviation,
        status = result.status.label(),
        "analysed block"
    );
    result
}
