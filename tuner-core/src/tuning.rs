//! # Musical Tuning Module
//!
//! Converts a detected frequency and a target frequency into tuning feedback.
//! It handles cent deviation, classification into tuning states, equal
//! temperament note frequencies, the open strings of a standard banjo, and
//! the adjustable A4 reference pitch.
//!
//! Cents are a logarithmic unit, so the classification thresholds mean the
//! same thing for every string regardless of its frequency.

use serde::{Deserialize, Serialize};

/// Deviation, in cents, at or below which a string is considered in tune.
pub const IN_TUNE_CENTS: f32 = 10.0;

/// Deviation, in cents, at or below which a string is considered close.
pub const CLOSE_CENTS: f32 = 25.0;

/// Classification of a detected pitch relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningStatus {
    InTune,
    Close,
    Sharp,
    Flat,
    /// No pitch was detected in the block. Assigned by the caller, never by
    /// [`Classifier::classify`].
    NoSignal,
}

impl TuningStatus {
    pub fn label(self) -> &'static str {
        match self {
            TuningStatus::InTune => "in tune",
            TuningStatus::Close => "close",
            TuningStatus::Sharp => "sharp",
            TuningStatus::Flat => "flat",
            TuningStatus::NoSignal => "no signal",
        }
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// Returns `0.0` if either frequency is not positive.
pub fn cents_from_target(detected: f32, target: f32) -> f32 {
    if detected <= 0.0 || target <= 0.0 {
        return 0.0;
    }
    1200.0 * (detected / target).log2()
}

/// Cent thresholds used to classify a deviation.
///
/// Each boundary belongs to the tighter class: exactly `in_tune_cents` is
/// [`TuningStatus::InTune`], exactly `close_cents` is [`TuningStatus::Close`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    pub in_tune_cents: f32,
    pub close_cents: f32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            in_tune_cents: IN_TUNE_CENTS,
            close_cents: CLOSE_CENTS,
        }
    }
}

impl Classifier {
    pub fn new(in_tune_cents: f32, close_cents: f32) -> Self {
        Self {
            in_tune_cents,
            close_cents,
        }
    }

    /// Classifies a cent deviation. Never returns [`TuningStatus::NoSignal`].
    pub fn classify(&self, cents: f32) -> TuningStatus {
        let abs_cents = cents.abs();
        if abs_cents <= self.in_tune_cents {
            TuningStatus::InTune
        } else if abs_cents <= self.close_cents {
            TuningStatus::Close
        } else if cents > 0.0 {
            TuningStatus::Sharp
        } else {
            TuningStatus::Flat
        }
    }

    /// Computes the cent deviation of `detected_hz` from `target_hz` and
    /// classifies it.
    pub fn classify_deviation(&self, detected_hz: f32, target_hz: f32) -> (f32, TuningStatus) {
        let cents = cents_from_target(detected_hz, target_hz);
        (cents, self.classify(cents))
    }
}

/// Classifies `cents` with the default 10 / 25 cent thresholds.
pub fn classify(cents: f32) -> TuningStatus {
    Classifier::default().classify(cents)
}

/// [`Classifier::classify_deviation`] with the default thresholds.
pub fn classify_deviation(detected_hz: f32, target_hz: f32) -> (f32, TuningStatus) {
    Classifier::default().classify_deviation(detected_hz, target_hz)
}

/// Equal temperament frequency of a MIDI note, with A4 (note 69) at 440 Hz.
pub fn note_frequency(midi_note: i32) -> f32 {
    440.0 * 2.0_f32.powf((midi_note - 69) as f32 / 12.0)
}

/// The open strings of a standard-tuned four-string banjo, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BanjoString {
    D4,
    B3,
    G3,
    D3,
}

impl BanjoString {
    pub const ALL: [BanjoString; 4] = [
        BanjoString::D4,
        BanjoString::B3,
        BanjoString::G3,
        BanjoString::D3,
    ];

    pub fn note_name(self) -> &'static str {
        match self {
            BanjoString::D4 | BanjoString::D3 => "D",
            BanjoString::B3 => "B",
            BanjoString::G3 => "G",
        }
    }

    pub fn frequency_hz(self) -> f32 {
        match self {
            BanjoString::D4 => 293.66,
            BanjoString::B3 => 246.94,
            BanjoString::G3 => 196.00,
            BanjoString::D3 => 146.83,
        }
    }

    /// Looks a string up by its scientific pitch name ("D4", "g3", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|string| format!("{string:?}").eq_ignore_ascii_case(name))
    }
}

/// Lowest selectable A4 reference pitch in Hz.
pub const MIN_REFERENCE_PITCH: u32 = 432;
/// Highest selectable A4 reference pitch in Hz.
pub const MAX_REFERENCE_PITCH: u32 = 446;
/// Concert pitch.
pub const DEFAULT_REFERENCE_PITCH: u32 = 440;

/// The A4 frequency every target and reference tone is scaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferencePitch(u32);

impl Default for ReferencePitch {
    fn default() -> Self {
        Self(DEFAULT_REFERENCE_PITCH)
    }
}

impl ReferencePitch {
    /// Creates a reference pitch, clamped to
    /// `MIN_REFERENCE_PITCH..=MAX_REFERENCE_PITCH`.
    pub fn new(hz: u32) -> Self {
        Self(hz.clamp(MIN_REFERENCE_PITCH, MAX_REFERENCE_PITCH))
    }

    pub fn hz(self) -> u32 {
        self.0
    }

    /// Ratio of this reference to concert pitch.
    pub fn ratio(self) -> f32 {
        self.0 as f32 / DEFAULT_REFERENCE_PITCH as f32
    }

    pub fn can_decrease(self) -> bool {
        self.0 > MIN_REFERENCE_PITCH
    }

    pub fn can_increase(self) -> bool {
        self.0 < MAX_REFERENCE_PITCH
    }

    /// One hertz lower, saturating at the minimum.
    pub fn decreased(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }

    /// One hertz higher, saturating at the maximum.
    pub fn increased(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Rescales a concert-pitch frequency to this reference.
    pub fn scale(self, frequency: f32) -> f32 {
        frequency * self.ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_are_zero_at_target() {
        assert_eq!(cents_from_target(440.0, 440.0), 0.0);
    }

    #[test]
    fn cents_sign_follows_direction() {
        assert!(cents_from_target(440.5, 440.0) > 0.0);
        assert!(cents_from_target(439.5, 440.0) < 0.0);
    }

    #[test]
    fn one_octave_is_1200_cents() {
        assert!((cents_from_target(880.0, 440.0) - 1200.0).abs() < 1e-3);
        assert!((cents_from_target(220.0, 440.0) + 1200.0).abs() < 1e-3);
    }

    #[test]
    fn non_positive_input_gives_zero_cents() {
        assert_eq!(cents_from_target(0.0, 440.0), 0.0);
        assert_eq!(cents_from_target(440.0, 0.0), 0.0);
        assert_eq!(cents_from_target(-1.0, -1.0), 0.0);
    }

    #[test]
    fn boundaries_belong_to_the_tighter_class() {
        assert_eq!(classify(10.0), TuningStatus::InTune);
        assert_eq!(classify(-10.0), TuningStatus::InTune);
        assert_eq!(classify(10.1), TuningStatus::Close);
        assert_eq!(classify(25.0), TuningStatus::Close);
        assert_eq!(classify(-25.0), TuningStatus::Close);
        assert_eq!(classify(25.1), TuningStatus::Sharp);
        assert_eq!(classify(-25.1), TuningStatus::Flat);
    }

    #[test]
    fn custom_thresholds_override_defaults() {
        let strict = Classifier::new(2.0, 5.0);
        assert_eq!(strict.classify(3.0), TuningStatus::Close);
        assert_eq!(strict.classify(-6.0), TuningStatus::Flat);
        assert_eq!(strict.classify(1.5), TuningStatus::InTune);
    }

    #[test]
    fn classify_deviation_reports_cents_and_status() {
        let (cents, status) = classify_deviation(300.0, BanjoString::D4.frequency_hz());
        assert!((cents - 37.0).abs() < 0.5, "cents was {cents}");
        assert_eq!(status, TuningStatus::Sharp);
    }

    #[test]
    fn note_frequency_matches_banjo_strings() {
        assert!((note_frequency(69) - 440.0).abs() < 0.01);
        assert!((note_frequency(60) - 261.63).abs() < 0.1);
        for (midi, string) in [
            (62, BanjoString::D4),
            (59, BanjoString::B3),
            (55, BanjoString::G3),
            (50, BanjoString::D3),
        ] {
            assert!((note_frequency(midi) - string.frequency_hz()).abs() < 0.1);
        }
    }

    #[test]
    fn banjo_string_lookup_is_case_insensitive() {
        assert_eq!(BanjoString::from_name("d4"), Some(BanjoString::D4));
        assert_eq!(BanjoString::from_name("G3"), Some(BanjoString::G3));
        assert_eq!(BanjoString::from_name("E2"), None);
        assert_eq!(BanjoString::B3.note_name(), "B");
    }

    #[test]
    fn reference_pitch_clamps_and_scales() {
        assert_eq!(ReferencePitch::new(430).hz(), MIN_REFERENCE_PITCH);
        assert_eq!(ReferencePitch::new(450).hz(), MAX_REFERENCE_PITCH);
        assert_eq!(ReferencePitch::default().ratio(), 1.0);
        assert!((ReferencePitch::new(432).ratio() - 0.98182).abs() < 0.001);
        assert!((ReferencePitch::new(446).ratio() - 1.01364).abs() < 0.001);
        assert!((ReferencePitch::new(432).scale(440.0) - 432.0).abs() < 1e-3);
    }

    #[test]
    fn reference_pitch_steps_stop_at_the_limits() {
        let low = ReferencePitch::new(MIN_REFERENCE_PITCH);
        assert!(!low.can_decrease());
        assert!(low.can_increase());
        assert_eq!(low.decreased(), low);

        let high = ReferencePitch::new(MAX_REFERENCE_PITCH);
        assert!(!high.can_increase());
        assert_eq!(high.increased(), high);
        assert_eq!(high.decreased().hz(), MAX_REFERENCE_PITCH - 1);
    }
}
