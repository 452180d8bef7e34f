//! The analysis pipeline for one audio stream.
//!
//! An [`Analyzer`] owns every stage and all of their buffers. Samples are
//! pushed in blocks of any size; each completed window runs pitch detection,
//! spectral feature extraction, smoothing, onset classification and optionally
//! pitch correction, and yields one [`PitchFrame`].
//!
//! Everything runs synchronously on the calling thread and nothing is
//! allocated after construction, except in [`Analyzer::reconfigure`] when the
//! window size or the smoothing parameters change.

use log::{debug, info};

use crate::correction::PitchCorrector;
use crate::detector::{PitchDetector, YinDetector};
use crate::error::ConfigError;
use crate::features;
use crate::onset::{Articulation, OnsetClassifier};
use crate::smoothing::Smoother;
use crate::utils::music::Note;

pub mod accumulator;
pub mod config;
pub mod frame;

pub use accumulator::FrameAccumulator;
pub use config::AnalyzerConfig;
pub use frame::PitchFrame;

const PCM16_SCALE: f32 = 1.0 / 32768.0;

/// The per-window stages, kept apart from the accumulator so both can be
/// borrowed at once.
struct Pipeline {
    sample_rate: u32,
    detector: YinDetector,
    smoother: Smoother,
    onset: OnsetClassifier,
    corrector: PitchCorrector,
}

impl Pipeline {
    fn new(sample_rate: u32, config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        Ok(Pipeline {
            sample_rate,
            detector: YinDetector::new(config.window_size, sample_rate, config.detector.clone())?,
            smoother: Smoother::new(&config.smoothing),
            onset: OnsetClassifier::new(config.onset.clone()),
            corrector: PitchCorrector::new(config.correction.clone()),
        })
    }

    fn analyze(&mut self, window: &[f32], end: u64) -> PitchFrame {
        let timestamp = end as f64 / self.sample_rate as f64;

        let raw = self.detector.get_pitch(window);
        let features = features::extract(
            self.detector.power_spectrum(),
            self.sample_rate as f32,
            window.len(),
        );
        let smoothed = self
            .smoother
            .update(raw.frequency, self.detector.level(), &features);

        let (articulation, changed) = self.onset.update(smoothed.loudness_db, timestamp);
        if changed && matches!(articulation, Articulation::Attack | Articulation::Silence) {
            self.corrector.reset();
        }

        let correction = match smoothed.frequency {
            Some(frequency) if self.corrector.is_enabled() => {
                Some(self.corrector.process(frequency, raw.clarity, timestamp))
            }
            _ => None,
        };

        PitchFrame {
            frequency: smoothed.frequency,
            raw_frequency: raw.frequency,
            note: smoothed.frequency.and_then(Note::from_frequency),
            clarity: raw.clarity,
            voicing: raw.voicing,
            loudness: smoothed.loudness,
            loudness_db: smoothed.loudness_db,
            brightness: smoothed.brightness,
            breathiness: smoothed.breathiness,
            articulation,
            correction,
            timestamp,
        }
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.onset.reset();
        self.corrector.reset();
    }
}

/// Real-time pitch and timbre analyzer for one mono stream.
///
/// ```
/// use pitch_engine::engine::{Analyzer, AnalyzerConfig};
///
/// let sample_rate = 44100;
/// let mut analyzer = Analyzer::new(sample_rate, AnalyzerConfig::default()).unwrap();
///
/// let block: Vec<f32> = (0..4096)
///     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin())
///     .collect();
/// let frame = analyzer.push(&block).unwrap();
/// let frequency = frame.frequency.unwrap();
/// assert!((frequency - 220.0).abs() < 2.2);
/// ```
pub struct Analyzer {
    sample_rate: u32,
    config: AnalyzerConfig,
    accumulator: FrameAccumulator,
    pipeline: Pipeline,
}

impl Analyzer {
    pub fn new(sample_rate: u32, config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate(sample_rate)?;
        let pipeline = Pipeline::new(sample_rate, &config)?;
        let accumulator = FrameAccumulator::new(config.window_size);

        let analyzer = Analyzer {
            sample_rate,
            config,
            accumulator,
            pipeline,
        };
        info!(
            "analyzer ready: {} Hz, window {} samples, {:.1} ms per frame",
            sample_rate,
            analyzer.window_size(),
            analyzer.latency() * 1000.0
        );
        Ok(analyzer)
    }

    /// Feed a block of samples and return the frame of the last window it
    /// completed, if any. Earlier frames completed by the same block still
    /// advance the filters; use [`process`](Self::process) to receive them.
    pub fn push(&mut self, block: &[f32]) -> Option<PitchFrame> {
        let mut latest = None;
        self.process(block, |frame| latest = Some(frame));
        latest
    }

    /// Feed a block of samples and call `on_frame` for every frame it
    /// completes, in order.
    pub fn process<F>(&mut self, block: &[f32], on_frame: F)
    where
        F: FnMut(PitchFrame),
    {
        self.feed(block.iter().copied(), on_frame);
    }

    /// [`push`](Self::push) for signed 16-bit PCM.
    pub fn push_pcm16(&mut self, block: &[i16]) -> Option<PitchFrame> {
        let mut latest = None;
        self.feed(
            block.iter().map(|&s| s as f32 * PCM16_SCALE),
            |frame| latest = Some(frame),
        );
        latest
    }

    fn feed<I, F>(&mut self, samples: I, mut on_frame: F)
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(PitchFrame),
    {
        let Analyzer {
            accumulator,
            pipeline,
            ..
        } = self;
        accumulator.push(samples, |window, end| on_frame(pipeline.analyze(window, end)));
    }

    /// Swap in a new configuration. Buffers are reallocated only when the
    /// window size changes, which also drops buffered samples and resets
    /// every filter. On error the analyzer is left untouched.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> Result<(), ConfigError> {
        config.validate(self.sample_rate)?;

        if config.window_size != self.config.window_size {
            debug!(
                "window size {} -> {}, reallocating",
                self.config.window_size, config.window_size
            );
            let pipeline = Pipeline::new(self.sample_rate, &config)?;
            self.pipeline = pipeline;
            self.accumulator.resize(config.window_size);
        } else {
            if config.detector != self.config.detector {
                debug!("detector parameters changed");
                self.pipeline.detector.set_config(config.detector.clone())?;
            }
            if config.smoothing != self.config.smoothing {
                debug!("smoothing parameters changed, filters reset");
                self.pipeline.smoother = Smoother::new(&config.smoothing);
            }
            if config.onset != self.config.onset {
                self.pipeline.onset.set_config(config.onset.clone());
            }
            self.pipeline.corrector.set_config(config.correction.clone());
        }

        self.config = config;
        Ok(())
    }

    /// Drop buffered samples and reset every filter, as for a new stream.
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.pipeline.reset();
    }

    /// Time between consecutive frames in seconds.
    pub fn latency(&self) -> f64 {
        self.hop_size() as f64 / self.sample_rate as f64
    }

    pub fn window_size(&self) -> usize {
        self.accumulator.window_size()
    }

    pub fn hop_size(&self) -> usize {
        self.accumulator.hop_size()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn articulation(&self) -> Articulation {
        self.pipeline.onset.state()
    }
}
