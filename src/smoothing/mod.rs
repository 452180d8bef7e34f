//! Per-stream stabilization of the raw measurements.
//!
//! Pitch goes through a [`MedianFilter`] (octave error rejection) and then a
//! [`KalmanFilter`] on fractional MIDI pitch (cents level jitter). Loudness,
//! brightness and breathiness each get an [`Ema`] with its own rate: loudness
//! must follow attacks, breathiness should not flicker.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use log::trace;

use crate::detector::check_range;
use crate::error::ConfigError;
use crate::features::SpectralFeatures;
use crate::utils::buffer::amplitude_to_db;
use crate::utils::music::{midi_to_freq, semitones_from_a4};

pub mod filters;

pub use filters::{Ema, KalmanFilter, MedianFilter};

pub const MAX_MEDIAN_LENGTH: usize = 31;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct SmoothingConfig {
    /// Odd number of cycles in the median window. An unvoiced run this long
    /// also clears the pitch state.
    pub median_length: usize,
    /// Kalman process noise, semitones squared per cycle
    pub kalman_process_noise: f32,
    /// Kalman measurement noise, semitones squared
    pub kalman_measurement_noise: f32,
    /// Pitch changes larger than this (semitones) re-seed the Kalman filter
    pub kalman_jump_semitones: f32,
    pub loudness_alpha: f32,
    pub brightness_alpha: f32,
    pub breathiness_alpha: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            median_length: 5,
            kalman_process_noise: 0.005,
            kalman_measurement_noise: 0.02,
            kalman_jump_semitones: 1.0,
            loudness_alpha: 0.5,
            brightness_alpha: 0.3,
            breathiness_alpha: 0.15,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.median_length == 0
            || self.median_length % 2 == 0
            || self.median_length > MAX_MEDIAN_LENGTH
        {
            return Err(ConfigError::InvalidMedianLength(self.median_length));
        }
        check_range("kalman_process_noise", self.kalman_process_noise, 0.0, 10.0)?;
        check_range("kalman_measurement_noise", self.kalman_measurement_noise, 1e-6, 10.0)?;
        check_range("kalman_jump_semitones", self.kalman_jump_semitones, 0.1, 12.0)?;
        check_range("loudness_alpha", self.loudness_alpha, 0.01, 1.0)?;
        check_range("brightness_alpha", self.brightness_alpha, 0.01, 1.0)?;
        check_range("breathiness_alpha", self.breathiness_alpha, 0.01, 1.0)?;
        Ok(())
    }
}

/// Output of one smoothing step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Smoothed {
    pub frequency: Option<f32>,
    /// Linear RMS
    pub loudness: f32,
    /// `loudness` in dBFS
    pub loudness_db: f32,
    pub brightness: f32,
    pub breathiness: f32,
}

#[derive(Debug, Clone)]
pub struct Smoother {
    median: MedianFilter,
    kalman: KalmanFilter,
    loudness: Ema,
    brightness: Ema,
    breathiness: Ema,
}

impl Smoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        Smoother {
            median: MedianFilter::new(config.median_length),
            kalman: KalmanFilter::new(
                config.kalman_process_noise,
                config.kalman_measurement_noise,
                config.kalman_jump_semitones,
            ),
            loudness: Ema::new(config.loudness_alpha),
            brightness: Ema::new(config.brightness_alpha),
            breathiness: Ema::new(config.breathiness_alpha),
        }
    }

    /// Advance every filter by one cycle. `frequency` is the raw estimate,
    /// `None` when the window was unvoiced; `level` is the linear RMS.
    pub fn update(
        &mut self,
        frequency: Option<f32>,
        level: f32,
        features: &SpectralFeatures,
    ) -> Smoothed {
        let median = self.median.push(frequency);
        if self.median.gap_run() == self.median.length() {
            trace!("unvoiced for {} cycles, pitch state cleared", self.median.gap_run());
            self.kalman.reset();
        }
        let frequency = median.map(|f| midi_to_freq(self.kalman.update(semitones_from_a4(f))));

        let loudness = self.loudness.update(level);
        Smoothed {
            frequency,
            loudness,
            loudness_db: amplitude_to_db(loudness),
            brightness: self.brightness.update(features.brightness),
            breathiness: self.breathiness.update(features.breathiness),
        }
    }

    pub fn reset(&mut self) {
        self.median.reset();
        self.kalman.reset();
        self.loudness.reset();
        self.brightness.reset();
        self.breathiness.reset();
    }
}
