//! Note articulation from the smoothed loudness envelope.
//!
//! ```text
//!            level up, rising fast or loud
//!   Silence ------------------------------> Attack
//!      |  ^                                   | dwell elapsed
//!      |  | below silence                     v
//!      |  +---------- Release <---------- Sustain
//!      |                 |   below release    ^
//!      |                 +--------------------+ back above re-sustain
//!      +------- level up, gradually ----------^
//! ```
//!
//! Only `Attack` has a minimum dwell. `Release` never goes back to `Attack`, so
//! a held note can only be re-attacked after it has fallen into `Silence`.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use log::debug;

use crate::detector::check_range;
use crate::error::ConfigError;
use crate::utils::buffer::MIN_DB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Articulation {
    #[default]
    Silence,
    Attack,
    Sustain,
    Release,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct OnsetConfig {
    /// Level (dBFS) separating silence from sound
    pub silence_threshold_db: f32,
    /// Rise per cycle (dB) that turns a start into an attack
    pub onset_delta_db: f32,
    /// A start above this level (dBFS) is an attack regardless of the rise
    pub loud_onset_db: f32,
    /// Sustain falls into release below `silence_threshold_db + release_margin_db`
    pub release_margin_db: f32,
    /// Release recovers to sustain above `silence_threshold_db + resustain_margin_db`
    pub resustain_margin_db: f32,
    /// Minimum time spent in attack, milliseconds
    pub attack_dwell_ms: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -40.0,
            onset_delta_db: 6.0,
            loud_onset_db: -20.0,
            release_margin_db: 10.0,
            resustain_margin_db: 15.0,
            attack_dwell_ms: 50.0,
        }
    }
}

impl OnsetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("silence_threshold_db", self.silence_threshold_db, MIN_DB, 0.0)?;
        check_range("onset_delta_db", self.onset_delta_db, 0.1, 60.0)?;
        check_range("loud_onset_db", self.loud_onset_db, MIN_DB, 0.0)?;
        check_range("release_margin_db", self.release_margin_db, 0.0, 60.0)?;
        check_range("resustain_margin_db", self.resustain_margin_db, 0.0, 60.0)?;
        check_range("attack_dwell_ms", self.attack_dwell_ms, 0.0, 1000.0)?;

        if self.loud_onset_db <= self.silence_threshold_db {
            return Err(ConfigError::InconsistentOnset(
                "loud onset level must be above the silence threshold",
            ));
        }
        if self.resustain_margin_db <= self.release_margin_db {
            return Err(ConfigError::InconsistentOnset(
                "re-sustain margin must be above the release margin",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OnsetClassifier {
    config: OnsetConfig,
    state: Articulation,
    entered_at: f64,
    previous_db: f32,
}

impl OnsetClassifier {
    pub fn new(config: OnsetConfig) -> Self {
        OnsetClassifier {
            config,
            state: Articulation::Silence,
            entered_at: 0.0,
            previous_db: MIN_DB,
        }
    }

    pub fn state(&self) -> Articulation {
        self.state
    }

    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Thresholds take effect from the next update; the current state is kept.
    pub fn set_config(&mut self, config: OnsetConfig) {
        self.config = config;
    }

    /// Feed the smoothed level of one cycle ending at `timestamp` seconds.
    /// Returns the new state and whether it differs from the previous one.
    pub fn update(&mut self, level_db: f32, timestamp: f64) -> (Articulation, bool) {
        let c = &self.config;
        let rise = level_db - self.previous_db;
        self.previous_db = level_db;

        let next = match self.state {
            Articulation::Silence => {
                if level_db <= c.silence_threshold_db {
                    Articulation::Silence
                } else if rise > c.onset_delta_db || level_db > c.loud_onset_db {
                    Articulation::Attack
                } else {
                    Articulation::Sustain
                }
            }
            Articulation::Attack => {
                let elapsed_ms = (timestamp - self.entered_at) * 1000.0;
                if elapsed_ms >= c.attack_dwell_ms as f64 {
                    Articulation::Sustain
                } else {
                    Articulation::Attack
                }
            }
            Articulation::Sustain => {
                if level_db < c.silence_threshold_db + c.release_margin_db {
                    Articulation::Release
                } else {
                    Articulation::Sustain
                }
            }
            Articulation::Release => {
                if level_db < c.silence_threshold_db {
                    Articulation::Silence
                } else if level_db > c.silence_threshold_db + c.resustain_margin_db {
                    Articulation::Sustain
                } else {
                    Articulation::Release
                }
            }
        };

        let changed = next != self.state;
        if changed {
            debug!(
                "{:?} -> {:?} at {:.3} s ({:.1} dB)",
                self.state, next, timestamp, level_db
            );
            self.state = next;
            self.entered_at = timestamp;
        }
        (next, changed)
    }

    pub fn reset(&mut self) {
        self.state = Articulation::Silence;
        self.entered_at = 0.0;
        self.previous_db = MIN_DB;
    }
}
