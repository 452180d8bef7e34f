//! # Pitch Engine
//! *pitch_engine* turns a continuous stream of microphone samples into one
//! structured [`PitchFrame`] per analysis cycle: fundamental frequency and its
//! clarity, loudness, brightness, breathiness, note articulation and an
//! optional scale-corrected frequency. It is meant to drive a voice-controlled
//! instrument, so everything runs on the audio thread without allocating.
//!
//! # Pipeline
//!   * [Frame accumulation][engine::accumulator] into half-overlapping windows
//!   * [YIN pitch detection][detector::yin] on top of an [FFT core][fft]
//!   * [Spectral features][features] from the same spectrum
//!   * [Smoothing][smoothing]: median and Kalman filtering of the pitch, EMAs
//!     for the rest
//!   * [Onset classification][onset]
//!   * [Pitch correction][correction] to a scale
//!
//! # Examples
//! ```
//! use pitch_engine::correction::Scale;
//! use pitch_engine::engine::{Analyzer, AnalyzerConfig};
//!
//! fn main() {
//!     const SAMPLE_RATE: u32 = 44100;
//!
//!     // Signal coming from some source (microphone, generated, etc...)
//!     let dt = 1.0 / SAMPLE_RATE as f32;
//!     let freq = 293.66;
//!     let signal: Vec<f32> = (0..8192)
//!         .map(|x| 0.5 * (2.0 * std::f32::consts::PI * x as f32 * dt * freq).sin())
//!         .collect();
//!
//!     let config = AnalyzerConfig::default().with_scale(Scale::major(0));
//!     let mut analyzer = Analyzer::new(SAMPLE_RATE, config).unwrap();
//!
//!     // Blocks of any size can be pushed; a frame is produced every hop.
//!     for block in signal.chunks(256) {
//!         if let Some(frame) = analyzer.push(block) {
//!             println!(
//!                 "{:.3}s: {:?} Hz ({:?}), clarity {:.2}, {:?}",
//!                 frame.timestamp,
//!                 frame.frequency,
//!                 frame.note.map(|n| n.to_string()),
//!                 frame.clarity,
//!                 frame.articulation,
//!             );
//!         }
//!     }
//! }
//! ```

pub use correction::{Correction, Scale, ScaleKind};
pub use detector::{Pitch, Voicing};
pub use engine::{Analyzer, AnalyzerConfig, PitchFrame};
pub use error::{ConfigError, FftError};
pub use onset::Articulation;
pub use utils::music::Note;

pub mod correction;
pub mod detector;
pub mod engine;
pub mod error;
pub mod features;
pub mod fft;
#[cfg(feature = "live")]
pub mod live;
pub mod onset;
pub mod smoothing;
pub mod utils;
