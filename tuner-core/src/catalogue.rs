//! # Tuning Catalogue
//!
//! Named tunings for four- and five-string banjos, plus a compact text
//! encoding used to store custom tunings as a single string.
//!
//! Every frequency is derived from its MIDI note with
//! [`note_frequency`](crate::tuning::note_frequency), so the catalogue is
//! always in equal temperament at concert pitch.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{TunerError, TunerResult};
use crate::tuning::{ReferencePitch, cents_from_target, note_frequency};

/// A single string target: a note name and its frequency in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note name (e.g., "D3", "f#4"). Lower case marks a short drone string.
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

impl Note {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }

    fn from_midi(name: &str, midi_note: i32) -> Self {
        Self::new(name, note_frequency(midi_note))
    }
}

/// A named set of open-string targets, ordered as the strings are labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub name: String,
    pub notes: Vec<Note>,
}

impl Tuning {
    pub fn new(name: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            name: name.into(),
            notes,
        }
    }

    /// Finds the string whose target is closest, in cents, to `frequency`.
    ///
    /// Returns `None` for an empty tuning or a non-positive frequency.
    pub fn nearest_note(&self, frequency: f32) -> Option<&Note> {
        if frequency <= 0.0 {
            return None;
        }
        self.notes.iter().min_by(|a, b| {
            let diff_a = cents_from_target(frequency, a.frequency).abs();
            let diff_b = cents_from_target(frequency, b.frequency).abs();
            diff_a.total_cmp(&diff_b)
        })
    }

    /// Returns a copy with every target moved from concert pitch to `reference`.
    pub fn rescaled(&self, reference: ReferencePitch) -> Tuning {
        let notes = self
            .notes
            .iter()
            .map(|note| Note::new(note.name.clone(), reference.scale(note.frequency)))
            .collect();
        Tuning::new(self.name.clone(), notes)
    }
}

/// An instrument and the tunings offered for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub tunings: Vec<Tuning>,
}

impl Instrument {
    /// Looks up a tuning by name, ignoring ASCII case.
    pub fn tuning(&self, name: &str) -> Option<&Tuning> {
        self.tunings
            .iter()
            .find(|tuning| tuning.name.eq_ignore_ascii_case(name))
    }
}

/// Four-string (tenor/plectrum style) banjo tunings.
pub static FOUR_STRING_BANJO: Lazy<Instrument> = Lazy::new(|| Instrument {
    name: "4-String Banjo".to_string(),
    tunings: vec![
        Tuning::new(
            "Standard DGBD",
            vec![
                Note::from_midi("D3", 50),
                Note::from_midi("G3", 55),
                Note::from_midi("B3", 59),
                Note::from_midi("D4", 62),
            ],
        ),
        Tuning::new(
            "Irish GDAE",
            vec![
                Note::from_midi("G3", 55),
                Note::from_midi("D4", 62),
                Note::from_midi("A4", 69),
                Note::from_midi("E5", 76),
            ],
        ),
        Tuning::new(
            "Chicago DGBE",
            vec![
                Note::from_midi("D3", 50),
                Note::from_midi("G3", 55),
                Note::from_midi("B3", 59),
                Note::from_midi("E4", 64),
            ],
        ),
        Tuning::new(
            "Plectrum CGBD",
            vec![
                Note::from_midi("C3", 48),
                Note::from_midi("G3", 55),
                Note::from_midi("B3", 59),
                Note::from_midi("D4", 62),
            ],
        ),
    ],
});

/// Five-string banjo tunings. The first note is the short fifth string.
pub static FIVE_STRING_BANJO: Lazy<Instrument> = Lazy::new(|| Instrument {
    name: "5-String Banjo".to_string(),
    tunings: vec![
        Tuning::new(
            "Open G (gDGBD)",
            vec![
                Note::from_midi("g4", 67),
                Note::from_midi("D3", 50),
                Note::from_midi("G3", 55),
                Note::from_midi("B3", 59),
                Note::from_midi("D4", 62),
            ],
        ),
        Tuning::new(
            "Double C (gCGCD)",
            vec![
                Note::from_midi("g4", 67),
                Note::from_midi("C3", 48),
                Note::from_midi("G3", 55),
                Note::from_midi("C4", 60),
                Note::from_midi("D4", 62),
            ],
        ),
        Tuning::new(
            "Modal (gDGCD)",
            vec![
                Note::from_midi("g4", 67),
                Note::from_midi("D3", 50),
                Note::from_midi("G3", 55),
                Note::from_midi("C4", 60),
                Note::from_midi("D4", 62),
            ],
        ),
        Tuning::new(
            "Drop C (gCGBD)",
            vec![
                Note::from_midi("g4", 67),
                Note::from_midi("C3", 48),
                Note::from_midi("G3", 55),
                Note::from_midi("B3", 59),
                Note::from_midi("D4", 62),
            ],
        ),
        Tuning::new(
            "Open D (f#DF#AD)",
            vec![
                Note::from_midi("f#4", 66),
                Note::from_midi("D3", 50),
                Note::from_midi("F#3", 54),
                Note::from_midi("A3", 57),
                Note::from_midi("D4", 62),
            ],
        ),
    ],
});

/// All built-in instruments, four-string first.
pub fn all_instruments() -> [&'static Instrument; 2] {
    [&*FOUR_STRING_BANJO, &*FIVE_STRING_BANJO]
}

/// Finds a built-in tuning by name across every instrument.
pub fn find_tuning(name: &str) -> Option<&'static Tuning> {
    all_instruments()
        .into_iter()
        .find_map(|instrument| instrument.tuning(name))
}

/// Label for the string button at `index`, numbered from the highest string
/// number down (index 0 of a four-string tuning is string 4).
pub fn string_label(index: usize, note_name: &str, string_count: usize) -> String {
    format!("{} - {}", string_count.saturating_sub(index), note_name)
}

/// Encodes a tuning as `name|note:freq,note:freq,...`.
pub fn encode_tuning(tuning: &Tuning) -> String {
    let notes = tuning
        .notes
        .iter()
        .map(|note| format!("{}:{:?}", note.name, note.frequency))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}|{}", tuning.name, notes)
}

/// Parses a tuning produced by [`encode_tuning`].
///
/// Note entries that are malformed, or whose frequency is not a positive
/// finite number, are skipped. The whole string is
/// rejected if it does not have exactly one `|` or if no note survives.
pub fn decode_tuning(encoded: &str) -> TunerResult<Tuning> {
    let parts: Vec<&str> = encoded.split('|').collect();
    let [name, notes] = parts.as_slice() else {
        return Err(TunerError::InvalidTuning(format!(
            "expected `name|notes`, got {encoded:?}"
        )));
    };

    let notes: Vec<Note> = notes
        .split(',')
        .filter_map(|entry| {
            let (note_name, frequency) = entry.split_once(':')?;
            if frequency.contains(':') {
                return None;
            }
            let frequency = frequency.trim().parse::<f32>().ok()?;
            if !(frequency.is_finite() && frequency > 0.0) {
                return None;
            }
            Some(Note::new(note_name, frequency))
        })
        .collect();

    if notes.is_empty() {
        return Err(TunerError::InvalidTuning(format!(
            "tuning {name:?} has no valid notes"
        )));
    }
    Ok(Tuning::new(*name, notes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_names(tuning: &Tuning) -> Vec<&str> {
        tuning.notes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn instruments_are_listed_in_order() {
        let names: Vec<&str> = all_instruments()
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, ["4-String Banjo", "5-String Banjo"]);
    }

    #[test]
    fn every_tuning_has_one_note_per_string() {
        assert!(FOUR_STRING_BANJO.tunings.len() >= 4);
        assert!(FIVE_STRING_BANJO.tunings.len() >= 4);
        for tuning in &FOUR_STRING_BANJO.tunings {
            assert_eq!(tuning.notes.len(), 4, "{}", tuning.name);
        }
        for tuning in &FIVE_STRING_BANJO.tunings {
            assert_eq!(tuning.notes.len(), 5, "{}", tuning.name);
        }
    }

    #[test]
    fn standard_tunings_come_first() {
        assert_eq!(
            note_names(&FOUR_STRING_BANJO.tunings[0]),
            ["D3", "G3", "B3", "D4"]
        );
        assert_eq!(
            note_names(&FIVE_STRING_BANJO.tunings[0]),
            ["g4", "D3", "G3", "B3", "D4"]
        );
    }

    #[test]
    fn find_tuning_searches_all_instruments() {
        assert_eq!(find_tuning("irish gdae").unwrap().notes[2].name, "A4");
        assert!(find_tuning("Double C (gCGCD)").is_some());
        assert!(find_tuning("Sitar").is_none());
    }

    #[test]
    fn nearest_note_picks_closest_string() {
        let standard = &FOUR_STRING_BANJO.tunings[0];
        assert_eq!(standard.nearest_note(300.0).unwrap().name, "D4");
        assert_eq!(standard.nearest_note(150.0).unwrap().name, "D3");
        assert_eq!(standard.nearest_note(200.0).unwrap().name, "G3");
        assert!(standard.nearest_note(0.0).is_none());
    }

    #[test]
    fn rescaled_tuning_follows_reference_pitch() {
        let standard = &FOUR_STRING_BANJO.tunings[0];
        assert_eq!(standard.rescaled(ReferencePitch::default()), *standard);

        let low = standard.rescaled(ReferencePitch::new(432));
        assert_eq!(low.name, standard.name);
        let d4 = &low.notes[3];
        assert!((d4.frequency - 293.66 * 432.0 / 440.0).abs() < 0.05);
    }

    #[test]
    fn string_labels_count_down() {
        let labels: Vec<String> = ["D", "G", "B", "D"]
            .iter()
            .enumerate()
            .map(|(i, n)| string_label(i, n, 4))
            .collect();
        assert_eq!(labels, ["4 - D", "3 - G", "2 - B", "1 - D"]);
    }

    #[test]
    fn encoded_tuning_decodes_back() {
        let original = Tuning::new(
            "My Tuning",
            vec![Note::new("A4", 440.0), Note::new("C4", 261.63)],
        );
        let encoded = encode_tuning(&original);
        assert_eq!(encoded, "My Tuning|A4:440.0,C4:261.63");
        assert_eq!(decode_tuning(&encoded).unwrap(), original);
    }

    #[test]
    fn malformed_notes_are_skipped() {
        let tuning = decode_tuning("Odd|A4:440.0,broken,B4:abc,C5:1:2,D4:293.66").unwrap();
        assert_eq!(note_names(&tuning), ["A4", "D4"]);
    }

    #[test]
    fn unusable_frequencies_are_skipped() {
        let tuning =
            decode_tuning("X|A4:-440.0,B4:0,C5:NaN,E5:inf,D3:146.83").unwrap();
        assert_eq!(note_names(&tuning), ["D3"]);
        assert!(decode_tuning("Y|A4:NaN").is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_tuning("garbage"),
            Err(TunerError::InvalidTuning(_))
        ));
        assert!(decode_tuning("a|b|c").is_err());
        assert!(decode_tuning("Empty|nothing,here").is_err());
    }
}
