use crate::correction::{CorrectionConfig, Scale};
use crate::detector::DetectorConfig;
use crate::error::ConfigError;
use crate::fft::is_power_of_two;
use crate::onset::OnsetConfig;
use crate::smoothing::SmoothingConfig;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

pub const MIN_WINDOW_SIZE: usize = 256;
pub const MAX_WINDOW_SIZE: usize = 16384;

pub const MIN_SAMPLE_RATE: u32 = 8000;
pub const MAX_SAMPLE_RATE: u32 = 384_000;

pub fn window_size_error(size: usize) -> ConfigError {
    ConfigError::InvalidWindowSize {
        size,
        min: MIN_WINDOW_SIZE,
        max: MAX_WINDOW_SIZE,
    }
}

/// Analysis windows are powers of two between [`MIN_WINDOW_SIZE`] and
/// [`MAX_WINDOW_SIZE`].
pub fn validate_window_size(size: usize) -> Result<(), ConfigError> {
    if is_power_of_two(size) && (MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(window_size_error(size))
    }
}

/// Everything an [`Analyzer`](super::Analyzer) can be configured with.
///
/// ```
/// use pitch_engine::correction::Scale;
/// use pitch_engine::engine::AnalyzerConfig;
///
/// let config = AnalyzerConfig::default()
///     .with_window_size(4096)
///     .with_scale(Scale::minor(9));
/// assert!(config.validate(48000).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct AnalyzerConfig {
    /// Samples per analysis window; consecutive windows overlap by half
    pub window_size: usize,
    pub detector: DetectorConfig,
    pub smoothing: SmoothingConfig,
    pub onset: OnsetConfig,
    pub correction: CorrectionConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            detector: DetectorConfig::default(),
            smoothing: SmoothingConfig::default(),
            onset: OnsetConfig::default(),
            correction: CorrectionConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self, sample_rate: u32) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        validate_window_size(self.window_size)?;
        self.detector.validate(sample_rate, self.window_size)?;
        self.smoothing.validate()?;
        self.onset.validate()?;
        self.correction.validate()
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_onset(mut self, onset: OnsetConfig) -> Self {
        self.onset = onset;
        self
    }

    pub fn with_correction(mut self, correction: CorrectionConfig) -> Self {
        self.correction = correction;
        self
    }

    /// Enable pitch correction towards `scale`.
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.correction.scale = scale;
        self.correction.enabled = true;
        self
    }

    /// Set the detector's frequency range.
    pub fn with_frequency_range(mut self, min: f32, max: f32) -> Self {
        self.detector.min_frequency = min;
        self.detector.max_frequency = max;
        self
    }
}
