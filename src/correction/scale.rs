//! Scales as sets of allowed pitch classes.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::music::pitch_class_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum ScaleKind {
    Chromatic,
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
    PentatonicMajor,
    PentatonicMinor,
    Blues,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    WholeTone,
    DiminishedHalfWhole,
    DiminishedWholeHalf,
    /// Arbitrary pitch classes. Only [`Scale::custom`] builds one;
    /// `Scale::new(ScaleKind::Custom, key)` gives the chromatic scale.
    Custom,
}

impl ScaleKind {
    /// Semitone offsets from the key. Empty for `Custom`.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            ScaleKind::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleKind::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScaleKind::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleKind::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleKind::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleKind::DiminishedHalfWhole => &[0, 1, 3, 4, 6, 7, 9, 10],
            ScaleKind::DiminishedWholeHalf => &[0, 2, 3, 5, 6, 8, 9, 11],
            ScaleKind::Custom => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScaleKind::Chromatic => "chromatic",
            ScaleKind::Major => "major",
            ScaleKind::NaturalMinor => "natural minor",
            ScaleKind::HarmonicMinor => "harmonic minor",
            ScaleKind::MelodicMinor => "melodic minor",
            ScaleKind::PentatonicMajor => "major pentatonic",
            ScaleKind::PentatonicMinor => "minor pentatonic",
            ScaleKind::Blues => "blues",
            ScaleKind::Dorian => "dorian",
            ScaleKind::Phrygian => "phrygian",
            ScaleKind::Lydian => "lydian",
            ScaleKind::Mixolydian => "mixolydian",
            ScaleKind::Locrian => "locrian",
            ScaleKind::WholeTone => "whole tone",
            ScaleKind::DiminishedHalfWhole => "diminished (half-whole)",
            ScaleKind::DiminishedWholeHalf => "diminished (whole-half)",
            ScaleKind::Custom => "custom",
        }
    }
}

/// A key plus the pitch classes allowed in it. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Scale {
    kind: ScaleKind,
    key: u8,
    allowed: [bool; 12],
}

impl Default for Scale {
    fn default() -> Self {
        Scale::chromatic()
    }
}

impl Scale {
    /// Scale of `kind` rooted at pitch class `key` (0 = C), taken modulo 12.
    /// A `Custom` kind allows nothing until built with [`Scale::custom`], so it
    /// falls back to chromatic here.
    pub fn new(kind: ScaleKind, key: u8) -> Self {
        let kind = if kind == ScaleKind::Custom {
            ScaleKind::Chromatic
        } else {
            kind
        };
        Self::from_intervals(kind, key % 12, kind.intervals())
    }

    pub fn chromatic() -> Self {
        Self::new(ScaleKind::Chromatic, 0)
    }

    pub fn major(key: u8) -> Self {
        Self::new(ScaleKind::Major, key)
    }

    pub fn minor(key: u8) -> Self {
        Self::new(ScaleKind::NaturalMinor, key)
    }

    pub fn pentatonic_major(key: u8) -> Self {
        Self::new(ScaleKind::PentatonicMajor, key)
    }

    pub fn pentatonic_minor(key: u8) -> Self {
        Self::new(ScaleKind::PentatonicMinor, key)
    }

    pub fn blues(key: u8) -> Self {
        Self::new(ScaleKind::Blues, key)
    }

    /// Scale allowing `intervals` (semitones above `key`, each `0..12`).
    pub fn custom(key: u8, intervals: &[u8]) -> Result<Self, ConfigError> {
        if key >= 12 {
            return Err(ConfigError::InvalidScale(format!(
                "key {} is not a pitch class (0..12)",
                key
            )));
        }
        if intervals.is_empty() {
            return Err(ConfigError::InvalidScale(
                "a scale needs at least one pitch class".to_string(),
            ));
        }
        if let Some(&bad) = intervals.iter().find(|&&i| i >= 12) {
            return Err(ConfigError::InvalidScale(format!(
                "interval {} is outside 0..12",
                bad
            )));
        }
        Ok(Self::from_intervals(ScaleKind::Custom, key, intervals))
    }

    /// Check a scale that did not come from a constructor, such as one loaded
    /// from a config file: the key must be a pitch class, at least one class
    /// must be allowed, and a preset must allow exactly its own intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key >= 12 {
            return Err(ConfigError::InvalidScale(format!(
                "key {} is not a pitch class (0..12)",
                self.key
            )));
        }
        if !self.allowed.contains(&true) {
            return Err(ConfigError::InvalidScale(
                "a scale needs at least one pitch class".to_string(),
            ));
        }
        let preset = Self::from_intervals(self.kind, self.key, self.kind.intervals());
        if self.kind != ScaleKind::Custom && self.allowed != preset.allowed {
            return Err(ConfigError::InvalidScale(format!(
                "pitch classes do not match {}",
                self.name()
            )));
        }
        Ok(())
    }

    fn from_intervals(kind: ScaleKind, key: u8, intervals: &[u8]) -> Self {
        let mut allowed = [false; 12];
        for &interval in intervals {
            allowed[((key + interval) % 12) as usize] = true;
        }
        Scale { kind, key, allowed }
    }

    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    /// Whether pitch class `pitch_class` (taken modulo 12) is in the scale.
    pub fn contains(&self, pitch_class: u8) -> bool {
        self.allowed[(pitch_class % 12) as usize]
    }

    /// Allowed pitch classes in ascending order.
    pub fn pitch_classes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..12u8).filter(move |&pc| self.allowed[pc as usize])
    }

    /// "D major", "chromatic"
    pub fn name(&self) -> String {
        match self.kind {
            ScaleKind::Chromatic => self.kind.name().to_string(),
            kind => format!("{} {}", pitch_class_name(self.key), kind.name()),
        }
    }

    /// The allowed MIDI note closest to the fractional MIDI pitch `semitone`.
    /// Ties go to the lower note.
    pub fn nearest(&self, semitone: f32) -> u8 {
        let center = semitone.round().clamp(0.0, 127.0) as i32;
        (center - 6..=center + 6)
            .filter(|&n| (0..=127).contains(&n) && self.allowed[n.rem_euclid(12) as usize])
            .min_by(|&a, &b| {
                let da = (semitone - a as f32).abs();
                let db = (semitone - b as f32).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(center) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_expected_sizes() {
        assert_eq!(Scale::chromatic().pitch_classes().count(), 12);
        assert_eq!(Scale::major(0).pitch_classes().count(), 7);
        assert_eq!(Scale::pentatonic_minor(9).pitch_classes().count(), 5);
        assert_eq!(Scale::blues(0).pitch_classes().count(), 6);
        assert_eq!(Scale::new(ScaleKind::WholeTone, 0).pitch_classes().count(), 6);
    }

    #[test]
    fn key_transposes() {
        let d_major = Scale::major(2);
        let expected = [1, 2, 4, 6, 7, 9, 11];
        assert_eq!(d_major.pitch_classes().collect::<Vec<_>>(), expected);
        assert!(d_major.contains(6));
        assert!(!d_major.contains(5));
        assert_eq!(Scale::major(14), d_major);
    }

    #[test]
    fn validate_rejects_inconsistent_scales() {
        for scale in [
            Scale::chromatic(),
            Scale::major(11),
            Scale::new(ScaleKind::DiminishedHalfWhole, 3),
            Scale::custom(4, &[0, 7]).unwrap(),
        ] {
            assert!(scale.validate().is_ok(), "{:?}", scale);
        }

        let empty = Scale {
            kind: ScaleKind::Custom,
            key: 0,
            allowed: [false; 12],
        };
        let bad_key = Scale {
            key: 40,
            ..Scale::chromatic()
        };
        let mut not_major = Scale::major(0);
        not_major.allowed[1] = true;
        for scale in [empty, bad_key, not_major] {
            assert!(matches!(scale.validate(), Err(ConfigError::InvalidScale(_))), "{:?}", scale);
        }
    }

    #[test]
    fn custom_kind_without_intervals_is_chromatic() {
        let scale = Scale::new(ScaleKind::Custom, 5);
        assert_eq!(scale.kind(), ScaleKind::Chromatic);
        assert_eq!(scale.pitch_classes().count(), 12);
    }

    #[test]
    fn names() {
        assert_eq!(Scale::chromatic().name(), "chromatic");
        assert_eq!(Scale::major(2).name(), "D major");
        assert_eq!(Scale::minor(9).name(), "A natural minor");
    }

    #[test]
    fn custom_scales() {
        let power_chord = Scale::custom(4, &[0, 7]).unwrap();
        assert_eq!(power_chord.kind(), ScaleKind::Custom);
        assert_eq!(power_chord.pitch_classes().collect::<Vec<_>>(), [4, 11]);

        assert!(matches!(Scale::custom(0, &[]), Err(ConfigError::InvalidScale(_))));
        assert!(matches!(Scale::custom(0, &[0, 12]), Err(ConfigError::InvalidScale(_))));
        assert!(matches!(Scale::custom(12, &[0]), Err(ConfigError::InvalidScale(_))));
    }

    #[test]
    fn nearest_note() {
        let chromatic = Scale::chromatic();
        assert_eq!(chromatic.nearest(69.2), 69);
        assert_eq!(chromatic.nearest(69.7), 70);

        let c_major = Scale::major(0);
        // C# (61) is not in C major; 61.2 is closer to D (62) than to C (60)
        assert_eq!(c_major.nearest(61.2), 62);
        assert_eq!(c_major.nearest(60.8), 60);
        // F# sits exactly between F and G
        assert_eq!(c_major.nearest(66.0), 65);
        assert_eq!(c_major.nearest(-3.0), 0);
    }
}
