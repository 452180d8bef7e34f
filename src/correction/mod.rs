//! Scale-aware pitch correction.
//!
//! Each voiced cycle the input frequency is assigned to an allowed note of the
//! configured [`Scale`]. Once a note is locked, the input has to move past the
//! midpoint to the next allowed note by `hysteresis - 0.5` semitones before the
//! lock switches, so a note sung right between two scale degrees does not
//! flutter. The output is pulled towards the locked note by `strength` and
//! approaches it with a time constant set by `retune_speed`.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use log::{debug, trace};

use crate::detector::check_range;
use crate::error::ConfigError;
use crate::utils::music::{cents_between, midi_to_freq, semitones_from_a4};

pub mod scale;

pub use scale::{Scale, ScaleKind};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct CorrectionConfig {
    pub enabled: bool,
    pub scale: Scale,
    /// 0 leaves the pitch alone, 1 lands exactly on the note
    pub strength: f32,
    /// 0 retunes instantly, 1 retunes with a time constant of `max_retune_time`
    pub retune_speed: f32,
    /// Semitones from the locked note the input may stray before the lock
    /// switches to a neighbour one semitone away (0.5 disables hysteresis)
    pub hysteresis: f32,
    /// Cycles with a lower clarity pass through uncorrected
    pub min_clarity: f32,
    /// Seconds
    pub max_retune_time: f32,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: Scale::chromatic(),
            strength: 1.0,
            retune_speed: 0.25,
            hysteresis: 0.6,
            min_clarity: 0.5,
            max_retune_time: 0.2,
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("strength", self.strength, 0.0, 1.0)?;
        check_range("retune_speed", self.retune_speed, 0.0, 1.0)?;
        check_range("hysteresis", self.hysteresis, 0.5, 0.99)?;
        check_range("min_clarity", self.min_clarity, 0.0, 1.0)?;
        check_range("max_retune_time", self.max_retune_time, 0.001, 5.0)?;
        self.scale.validate()
    }
}

/// What the corrector did with one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Correction {
    /// Corrected frequency in Hz
    pub frequency: f32,
    /// MIDI note the input is locked to
    pub target_note: u8,
    pub target_frequency: f32,
    /// Deviation of the input from the target note
    pub input_cents: f32,
    /// Deviation of the output from the target note
    pub output_cents: f32,
}

#[derive(Debug, Clone)]
pub struct PitchCorrector {
    config: CorrectionConfig,
    locked: Option<u8>,
    output: Option<f32>,
    last_timestamp: f64,
}

impl PitchCorrector {
    pub fn new(config: CorrectionConfig) -> Self {
        PitchCorrector {
            config,
            locked: None,
            output: None,
            last_timestamp: 0.0,
        }
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The note currently locked, if any.
    pub fn locked_note(&self) -> Option<u8> {
        self.locked
    }

    /// Replace the parameters. A different scale also resets the state.
    pub fn set_config(&mut self, config: CorrectionConfig) {
        let scale = config.scale;
        self.config = CorrectionConfig {
            scale: self.config.scale,
            ..config
        };
        self.set_scale(scale);
    }

    pub fn set_scale(&mut self, scale: Scale) {
        if scale != self.config.scale {
            debug!("correction scale set to {}", scale.name());
            self.config.scale = scale;
            self.reset();
        }
    }

    /// Correct a voiced frequency measured in the cycle ending at `timestamp`
    /// seconds.
    pub fn process(&mut self, frequency: f32, clarity: f32, timestamp: f64) -> Correction {
        let semitone = semitones_from_a4(frequency);

        if clarity < self.config.min_clarity {
            let note = self
                .locked
                .unwrap_or_else(|| self.config.scale.nearest(semitone));
            let target_frequency = midi_to_freq(note as f32);
            let cents = cents_between(frequency, target_frequency);
            // Resume from the input once the clarity comes back.
            self.output = Some(frequency);
            self.last_timestamp = timestamp;
            return Correction {
                frequency,
                target_note: note,
                target_frequency,
                input_cents: cents,
                output_cents: cents,
            };
        }

        let note = self.select_note(semitone);
        if self.locked != Some(note) {
            trace!("correction locked to MIDI {}", note);
            self.locked = Some(note);
        }

        let target_frequency = midi_to_freq(note as f32);
        let desired = frequency + self.config.strength * (target_frequency - frequency);
        let corrected = if self.config.retune_speed <= 0.0 {
            desired
        } else {
            match self.output {
                None => frequency,
                Some(previous) => {
                    let dt = (timestamp - self.last_timestamp).max(0.0) as f32;
                    let tau = self.config.retune_speed * self.config.max_retune_time;
                    previous + (desired - previous) * (1.0 - (-dt / tau).exp())
                }
            }
        };
        self.output = Some(corrected);
        self.last_timestamp = timestamp;

        Correction {
            frequency: corrected,
            target_note: note,
            target_frequency,
            input_cents: cents_between(frequency, target_frequency),
            output_cents: cents_between(corrected, target_frequency),
        }
    }

    fn select_note(&self, semitone: f32) -> u8 {
        let candidate = self.config.scale.nearest(semitone);
        match self.locked {
            Some(locked) if locked != candidate => {
                let gap = (candidate as f32 - locked as f32).abs();
                let reach = gap / 2.0 + (self.config.hysteresis - 0.5);
                if (semitone - locked as f32).abs() <= reach {
                    locked
                } else {
                    candidate
                }
            }
            _ => candidate,
        }
    }

    /// Forget the locked note and the retune state.
    pub fn reset(&mut self) {
        self.locked = None;
        self.output = None;
        self.last_timestamp = 0.0;
    }
}
