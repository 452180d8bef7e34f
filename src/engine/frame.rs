#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::correction::Correction;
use crate::detector::Voicing;
use crate::onset::Articulation;
use crate::utils::music::Note;

/// Everything measured in one analysis cycle. Plain data, cheap to copy
/// across threads or into a synth's parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct PitchFrame {
    /// Smoothed fundamental frequency in Hz, `None` when unvoiced
    pub frequency: Option<f32>,
    /// Unsmoothed estimate of this window
    pub raw_frequency: Option<f32>,
    /// Nearest note to `frequency`
    pub note: Option<Note>,
    /// 0.0 - 1.0
    pub clarity: f32,
    pub voicing: Voicing,
    /// Smoothed RMS level, linear
    pub loudness: f32,
    /// `loudness` in dBFS
    pub loudness_db: f32,
    /// 0.0 - 1.0
    pub brightness: f32,
    /// 0.0 - 1.0
    pub breathiness: f32,
    pub articulation: Articulation,
    /// Present when correction is enabled and the cycle is voiced
    pub correction: Option<Correction>,
    /// Stream time in seconds of the window's last sample
    pub timestamp: f64,
}

impl PitchFrame {
    pub fn is_voiced(&self) -> bool {
        self.frequency.is_some()
    }

    /// The frequency a synth should play: corrected if correction ran,
    /// smoothed otherwise.
    pub fn output_frequency(&self) -> Option<f32> {
        self.correction
            .map(|c| c.frequency)
            .or(self.frequency)
    }
}
