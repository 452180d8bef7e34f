//! Monophonic fundamental frequency estimation.
//!
//! A *detector* turns one full analysis window into a [`Pitch`]: an optional
//! frequency plus the clarity of the periodicity it found. When no frequency is
//! reported, [`Voicing`] says why, so "nothing there" and "something there but
//! not trustworthy" stay distinguishable downstream.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub mod internals;
pub mod yin;

pub use yin::YinDetector;

/// Why a window did or did not produce a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Voicing {
    /// A periodic signal was found inside the configured range
    Voiced,
    /// The window level is below the volume floor
    #[default]
    Silent,
    /// No lag dipped below the YIN threshold
    Aperiodic,
    /// A period was found but its clarity is below the minimum
    LowClarity,
    /// A period was found but its frequency is outside the configured range
    OutOfRange,
}

/// Raw estimate for one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Pitch {
    /// Fundamental frequency in Hz, `None` unless `voicing` is `Voiced`
    pub frequency: Option<f32>,
    /// Periodicity confidence, `1 - d'(tau)` at the chosen lag (0.0 - 1.0)
    pub clarity: f32,
    pub voicing: Voicing,
}

impl Pitch {
    pub fn voiced(frequency: f32, clarity: f32) -> Self {
        Pitch {
            frequency: Some(frequency),
            clarity,
            voicing: Voicing::Voiced,
        }
    }

    pub fn unvoiced(voicing: Voicing, clarity: f32) -> Self {
        Pitch {
            frequency: None,
            clarity,
            voicing,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.frequency.is_some()
    }
}

/// How the YIN difference function is computed. Both produce the same values;
/// `Fft` is `O(n log n)` and the default, `Direct` is the `O(n^2)` definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum DifferenceMethod {
    Direct,
    #[default]
    Fft,
}

/// Pitch detection parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct DetectorConfig {
    /// YIN absolute threshold on `d'(tau)`. The paper uses 0.1; lower is stricter.
    pub threshold: f32,
    /// Minimum clarity for a window to count as voiced
    pub min_clarity: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Windows whose RMS level is below this (dBFS) are reported as silent
    pub volume_floor_db: f32,
    pub method: DifferenceMethod,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.12,
            min_clarity: 0.5,
            min_frequency: 50.0,
            max_frequency: 1500.0,
            volume_floor_db: -55.0,
            method: DifferenceMethod::Fft,
        }
    }
}

impl DetectorConfig {
    /// Check the parameters against a sample rate and window size.
    pub fn validate(&self, sample_rate: u32, window_size: usize) -> Result<(), ConfigError> {
        check_range("threshold", self.threshold, 0.01, 0.9)?;
        check_range("min_clarity", self.min_clarity, 0.0, 1.0)?;
        check_range("volume_floor_db", self.volume_floor_db, -100.0, 0.0)?;

        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency) {
            return Err(ConfigError::InvalidFrequencyRange {
                min: self.min_frequency,
                max: self.max_frequency,
            });
        }

        let nyquist = sample_rate as f32 / 2.0;
        if self.max_frequency >= nyquist {
            return Err(ConfigError::AboveNyquist {
                max: self.max_frequency,
                nyquist,
            });
        }

        // The longest period must fit in the lag range with a neighbour to spare
        // for interpolation.
        let lag = (sample_rate as f32 / self.min_frequency).ceil() as usize;
        let max_lag = (window_size / 2).saturating_sub(2);
        if lag > max_lag {
            return Err(ConfigError::WindowTooShort {
                min: self.min_frequency,
                lag,
                window: window_size,
                max_lag,
            });
        }
        Ok(())
    }
}

pub(crate) fn check_range(
    name: &'static str,
    value: f32,
    low: f32,
    high: f32,
) -> Result<(), ConfigError> {
    if value >= low && value <= high {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            low,
            high,
        })
    }
}

pub trait PitchDetector {
    /// Estimate the pitch of one full analysis window.
    ///
    /// # Panics
    /// If `signal` does not have the window size the detector was built for.
    fn get_pitch(&mut self, signal: &[f32]) -> Pitch;
}
