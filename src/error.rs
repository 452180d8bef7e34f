//! Error types.
//!
//! Only configuration problems and misuse of the public FFT API are reported as
//! errors. A window without a detectable pitch is not an error: it produces a
//! regular frame whose frequency is `None`.

use thiserror::Error;

/// Invalid analyzer configuration. Returned by `Analyzer::new`,
/// `Analyzer::reconfigure` and the `validate` methods of the config types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("window size must be a power of two between {min} and {max}, got {size}")]
    InvalidWindowSize { size: usize, min: usize, max: usize },

    #[error("invalid frequency range: {min} - {max} Hz")]
    InvalidFrequencyRange { min: f32, max: f32 },

    #[error("maximum frequency {max} Hz is above the Nyquist frequency {nyquist} Hz")]
    AboveNyquist { max: f32, nyquist: f32 },

    #[error("minimum frequency {min} Hz needs a lag of {lag} samples, but a window of {window} samples only covers {max_lag}")]
    WindowTooShort {
        min: f32,
        lag: usize,
        window: usize,
        max_lag: usize,
    },

    #[error("`{name}` must be within {low}..={high}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        low: f32,
        high: f32,
    },

    #[error(
        "median length must be odd and within 1..={max}, got {0}",
        max = crate::smoothing::MAX_MEDIAN_LENGTH
    )]
    InvalidMedianLength(usize),

    #[error("onset thresholds are inconsistent: {0}")]
    InconsistentOnset(&'static str),

    #[error("invalid scale: {0}")]
    InvalidScale(String),
}

/// Misuse of the public FFT API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FftError {
    #[error("FFT length must be a power of two (>= 2), got {0}")]
    InvalidSize(usize),

    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
