//! Timbre descriptors computed from the power spectrum of an analysis window.
//!
//! * **Brightness** maps the spectral centroid logarithmically from 200 Hz
//!   (dark, 0.0) to 8 kHz (bright, 1.0).
//! * **Breathiness** is the spectral flatness, the ratio of the geometric to
//!   the arithmetic mean of the power spectrum: close to 0 for a clean harmonic
//!   tone, rising towards 1 as noise takes over.
//!
//! All functions are pure and allocation free. Bin 0 (DC) is ignored.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

pub const BRIGHTNESS_LOW_HZ: f32 = 200.0;
pub const BRIGHTNESS_HIGH_HZ: f32 = 8000.0;

/// Bins weaker than this fraction of the strongest bin do not count towards the
/// centroid.
const NEGLIGIBLE_BIN: f32 = 1e-8;

/// Total power below which a spectrum is treated as empty.
const SILENT_POWER: f32 = 1e-12;

/// Guards the logarithm in the geometric mean against empty bins.
const FLATNESS_EPSILON: f32 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct SpectralFeatures {
    /// 0.0 - 1.0
    pub brightness: f32,
    /// 0.0 - 1.0
    pub breathiness: f32,
    /// Spectral centroid in Hz, 0 for an empty spectrum
    pub centroid: f32,
}

/// Frequency resolution of a spectrum computed from `window_len` samples.
pub fn bin_width(sample_rate: f32, window_len: usize) -> f32 {
    sample_rate / window_len as f32
}

/// Power weighted mean frequency of `power`, whose bin `k` is centred on
/// `k * bin_width` Hz. Returns `None` for an empty spectrum.
pub fn spectral_centroid(power: &[f32], bin_width: f32) -> Option<f32> {
    let bins = power.get(1..)?;
    let peak = bins.iter().fold(0.0f32, |m, &p| m.max(p));
    if peak <= SILENT_POWER {
        return None;
    }
    let floor = peak * NEGLIGIBLE_BIN;

    let (weighted, total) = bins
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > floor)
        .fold((0.0f64, 0.0f64), |(w, t), (i, &p)| {
            let freq = (i + 1) as f64 * bin_width as f64;
            (w + freq * p as f64, t + p as f64)
        });

    if total <= SILENT_POWER as f64 {
        None
    } else {
        Some((weighted / total) as f32)
    }
}

/// Logarithmic position of `centroid` between 200 Hz and 8 kHz, clamped to 0..=1.
pub fn brightness(centroid: f32) -> f32 {
    if !(centroid > 0.0) {
        return 0.0;
    }
    let span = (BRIGHTNESS_HIGH_HZ / BRIGHTNESS_LOW_HZ).ln();
    ((centroid / BRIGHTNESS_LOW_HZ).ln() / span).clamp(0.0, 1.0)
}

/// Spectral flatness of `power`, clamped to 0..=1. An empty spectrum is 0.
pub fn spectral_flatness(power: &[f32]) -> f32 {
    let bins = match power.get(1..) {
        Some(bins) if !bins.is_empty() => bins,
        _ => return 0.0,
    };

    let n = bins.len() as f64;
    let (log_sum, sum) = bins.iter().fold((0.0f64, 0.0f64), |(l, s), &p| {
        let p = p.max(0.0) as f64;
        (l + (p + FLATNESS_EPSILON as f64).ln(), s + p)
    });

    let arithmetic = sum / n;
    if arithmetic <= SILENT_POWER as f64 {
        return 0.0;
    }
    let geometric = (log_sum / n).exp();
    ((geometric / arithmetic) as f32).clamp(0.0, 1.0)
}

/// Compute all features from the power spectrum of a `window_len` sample window.
pub fn extract(power: &[f32], sample_rate: f32, window_len: usize) -> SpectralFeatures {
    let centroid = spectral_centroid(power, bin_width(sample_rate, window_len)).unwrap_or(0.0);
    SpectralFeatures {
        brightness: brightness(centroid),
        breathiness: spectral_flatness(power),
        centroid,
    }
}
