//! Conversions between frequency, MIDI note numbers and cents.
//!
//! All conversions use equal temperament with A4 = 440 Hz = MIDI 69.

use std::fmt;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

pub const A4_FREQUENCY: f32 = 440.0;
pub const A4_MIDI: f32 = 69.0;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Fractional MIDI pitch of `freq` (69.0 for 440 Hz). `freq` must be positive.
pub fn semitones_from_a4(freq: f32) -> f32 {
    A4_MIDI + 12.0 * (freq / A4_FREQUENCY).log2()
}

/// Frequency of a fractional MIDI pitch.
pub fn midi_to_freq(midi: f32) -> f32 {
    A4_FREQUENCY * 2f32.powf((midi - A4_MIDI) / 12.0)
}

/// Nearest MIDI note of `freq` and its deviation from that note in cents.
/// Returns `None` for non-positive frequencies.
pub fn freq_to_midi(freq: f32) -> Option<(u8, f32)> {
    if !(freq > 0.0) {
        return None;
    }
    let pitch = semitones_from_a4(freq);
    let note = pitch.round().clamp(0.0, 127.0);
    Some((note as u8, (pitch - note) * 100.0))
}

/// Signed distance from `reference` to `freq` in cents.
pub fn cents_between(freq: f32, reference: f32) -> f32 {
    1200.0 * (freq / reference).log2()
}

pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    SHARP_NAMES[(pitch_class % 12) as usize]
}

/// A MIDI note together with the deviation of the measured pitch from it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Note {
    /// MIDI note number (60 = C4)
    pub midi: u8,
    /// Deviation from the note, -50..=50 cents
    pub cents: f32,
}

impl Note {
    pub fn from_frequency(freq: f32) -> Option<Self> {
        freq_to_midi(freq).map(|(midi, cents)| Note { midi, cents })
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi % 12
    }

    /// Scientific pitch notation octave (C4 is middle C).
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Note name with sharp notation, without octave ("C#").
    pub fn name(&self) -> &'static str {
        SHARP_NAMES[self.pitch_class() as usize]
    }

    /// Note name with flat notation, without octave ("Db").
    pub fn name_flat(&self) -> &'static str {
        FLAT_NAMES[self.pitch_class() as usize]
    }

    /// Exact frequency of the note, ignoring `cents`.
    pub fn frequency(&self) -> f32 {
        midi_to_freq(self.midi as f32)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}
