//! # Session Mode
//!
//! Plays the reference tone of every string of a tuning in turn, each for a
//! fixed time at a reduced volume, and stops after the last string. The
//! player only has to play the returned steps back to back.

use crate::catalogue::{Note, Tuning};
use crate::synth::{ToneBuffer, synthesize_tone};

/// How long each string rings during a session.
pub const SECONDS_PER_STRING: f32 = 5.0;

/// Session playback volume, as a fraction of full scale.
pub const DEFAULT_SESSION_VOLUME: f32 = 0.3;

/// Clamps a playback volume into `[0, 1]`. NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Index of the string that follows `current`, or `None` once the last of
/// `string_count` strings has played.
pub fn next_string_index(current: usize, string_count: usize) -> Option<usize> {
    let next = current + 1;
    (next < string_count).then_some(next)
}

/// Number of whole loops of `tone` closest to `seconds`, at least one.
///
/// Whole loops keep every string change on a cycle boundary.
pub fn loops_per_string(tone: &ToneBuffer, seconds: f32) -> usize {
    let wanted = seconds as f64 * tone.sample_rate as f64 / tone.loop_length as f64;
    wanted.round().max(1.0) as usize
}

/// Scales 16-bit samples by `volume`, which is clamped first.
pub fn apply_volume(samples: &[i16], volume: f32) -> Vec<i16> {
    let volume = clamp_volume(volume);
    samples
        .iter()
        .map(|&s| (s as f32 * volume).round() as i16)
        .collect()
}

/// One string of a session: its position in the tuning, its target and the
/// samples to play for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStep {
    pub index: usize,
    pub note: Note,
    pub samples: Vec<i16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tuning: Tuning,
    pub volume: f32,
    pub seconds_per_string: f32,
    pub sample_rate: u32,
}

impl Session {
    pub fn new(tuning: Tuning, sample_rate: u32) -> Self {
        Self {
            tuning,
            volume: DEFAULT_SESSION_VOLUME,
            seconds_per_string: SECONDS_PER_STRING,
            sample_rate,
        }
    }

    pub fn with_volume(self, volume: f32) -> Self {
        Self {
            volume: clamp_volume(volume),
            ..self
        }
    }

    pub fn with_seconds_per_string(self, seconds_per_string: f32) -> Self {
        Self {
            seconds_per_string,
            ..self
        }
    }

    /// Iterates over the strings in tuning order, synthesizing each one as
    /// it is reached.
    ///
    /// # Panics
    /// * If a note frequency or the sample rate cannot be synthesized
    pub fn steps(&self) -> SessionSteps<'_> {
        SessionSteps {
            session: self,
            next: (!self.tuning.notes.is_empty()).then_some(0),
        }
    }

    /// Renders the whole session as one continuous PCM buffer.
    pub fn render(&self) -> Vec<i16> {
        self.steps().flat_map(|step| step.samples).collect()
    }

    fn step(&self, index: usize) -> SessionStep {
        let note = self.tuning.notes[index].clone();
        let tone = synthesize_tone(note.frequency, self.sample_rate);
        let loops = loops_per_string(&tone, self.seconds_per_string);
        let quiet = apply_volume(&tone.samples, self.volume);
        tracing::debug!(index, note = %note.name, loops, "session step");

        SessionStep {
            index,
            note,
            samples: quiet.repeat(loops),
        }
    }
}

/// Iterator returned by [`Session::steps`].
#[derive(Debug)]
pub struct SessionSteps<'a> {
    session: &'a Session,
    next: Option<usize>,
}

impl Iterator for SessionSteps<'_> {
    type Item = SessionStep;

    fn next(&mut self) -> Option<SessionStep> {
        let index = self.next?;
        self.next = next_string_index(index, self.session.tuning.notes.len());
        Some(self.session.step(index))
    }
}
