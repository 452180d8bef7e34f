//! The YIN pitch detection algorithm is based on the algorithm from the paper
//! *[YIN, a fundamental frequency estimator for speech and music](http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf)*.
//!
//! Let $S=(s_0,s_1,\ldots,s_N)$ be a discrete signal and $W = N/2$. The *difference function* at lag $t$
//! is defined by
//! $$ d(t) = \sum_{i=0}^{W-1} (s_i-s_{i+t})^2. $$
//! This function is close to zero when the signal "lines up" with itself. However, *close* is a relative term,
//! and the value of $d(t)$ depends on volume, which should not affect the pitch of the signal. For this
//! reason, the signal is normalized. The YIN algorithm computes the *cumulative mean normalized difference function*,
//! $$ d\'(t) = \begin{cases}1&\text{if }t=0\\\\ d(t) / \left[ \tfrac{1}{t}\sum_{i=1}^t d(i) \right] & \text{otherwise}\end{cases}. $$
//! Then, it searches for the first local minimum of $d\'(t)$ below a given threshold. Taking the *first*
//! dip rather than the deepest one is what keeps YIN from locking onto subharmonics.
//!
//! ## Implementation
//! The difference function is computed either directly or, by default, through an
//! [FFT](crate::fft) based windowed autocorrelation, which gives a dramatic speed increase for large
//! windows. The FFT path produces the power spectrum of the window as a by-product; it is kept
//! in the detector so the spectral features can reuse it.
//!
//! After a candidate lag is found, quadratic interpolation is applied to refine the estimate.

use log::trace;

use crate::detector::internals::{
    direct_square_error, split_first_two_mut, windowed_square_error, yin_normalize_square_error,
    DetectorInternals,
};
use crate::detector::{DetectorConfig, DifferenceMethod, Pitch, PitchDetector, Voicing};
use crate::engine::config::{validate_window_size, window_size_error};
use crate::error::ConfigError;
use crate::utils::buffer::{amplitude_to_db, rms};
use crate::utils::peak::{first_dip_below, global_minimum, refine_dip};

/// Lags below this are never considered; `d'(1)` is dominated by the
/// normalization rather than by any period.
const MIN_LAG: usize = 2;

const DIFFERENCE: usize = 0;
const SPECTRUM: usize = 1;

pub struct YinDetector {
    sample_rate: f32,
    config: DetectorConfig,
    internals: DetectorInternals,
    level: f32,
}

impl YinDetector {
    /// Create a detector for windows of `size` samples.
    pub fn new(size: usize, sample_rate: u32, config: DetectorConfig) -> Result<Self, ConfigError> {
        validate_window_size(size)?;
        config.validate(sample_rate, size)?;
        let internals = DetectorInternals::new(2, 2, size).map_err(|_| window_size_error(size))?;

        Ok(YinDetector {
            sample_rate: sample_rate as f32,
            config,
            internals,
            level: 0.0,
        })
    }

    /// Replace the parameters without touching the buffers.
    pub fn set_config(&mut self, config: DetectorConfig) -> Result<(), ConfigError> {
        config.validate(self.sample_rate as u32, self.internals.size)?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn size(&self) -> usize {
        self.internals.size
    }

    /// Power spectrum (`size / 2` bins) of the last analyzed window.
    pub fn power_spectrum(&self) -> &[f32] {
        &self.internals.real_buffers[SPECTRUM][..self.internals.size / 2]
    }

    /// RMS level of the last analyzed window.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// The cumulative mean normalized difference function of the last analyzed
    /// window, for lags `0..size / 2`.
    pub fn normalized_difference(&self) -> &[f32] {
        &self.internals.real_buffers[DIFFERENCE][..self.internals.size / 2]
    }

    fn compute_difference(&mut self, signal: &[f32]) {
        let window_size = signal.len() / 2;
        let DetectorInternals {
            fft,
            real_buffers,
            complex_buffers,
            ..
        } = &mut self.internals;
        let (difference, spectrum) = split_first_two_mut(real_buffers);
        let difference = &mut difference[..window_size];

        match self.config.method {
            DifferenceMethod::Fft => {
                let (signal_complex, truncated) = split_first_two_mut(complex_buffers);
                windowed_square_error(
                    signal,
                    window_size,
                    fft,
                    signal_complex,
                    truncated,
                    Some(&mut spectrum[..]),
                    difference,
                );
            }
            DifferenceMethod::Direct => {
                direct_square_error(signal, window_size, difference);
                fft.power_spectrum(signal, spectrum);
            }
        }
    }
}

/// Pitch detection based on the YIN algorithm. See <http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf>
impl PitchDetector for YinDetector {
    fn get_pitch(&mut self, signal: &[f32]) -> Pitch {
        assert_eq!(
            signal.len(),
            self.internals.size,
            "analysis window does not match the detector size"
        );
        assert!(self.internals.has_sufficient_buffers(2, 2));

        self.level = rms(signal);

        // STEP 1: The difference function, d_t. The spectrum is always produced so
        // silent windows still have features.
        self.compute_difference(signal);

        if amplitude_to_db(self.level) < self.config.volume_floor_db {
            return Pitch::unvoiced(Voicing::Silent, 0.0);
        }

        // STEP 2: The cumulative mean normalized difference function, d_t'.
        let window_size = signal.len() / 2;
        let result = &mut self.internals.real_buffers[DIFFERENCE][..window_size];
        yin_normalize_square_error(result);

        // STEP 3: The absolute threshold. We want the first dip below `threshold`.
        let tau = match first_dip_below(result, MIN_LAG, self.config.threshold) {
            Some(tau) => tau,
            None => {
                let best = global_minimum(result, MIN_LAG).map_or(1.0, |(_, v)| v);
                trace!("no dip below {}, best d' {}", self.config.threshold, best);
                return Pitch::unvoiced(Voicing::Aperiodic, (1.0 - best).clamp(0.0, 1.0));
            }
        };

        // STEP 4: Quadratic interpolation to fine-tune the lag.
        let (refined_tau, _) = refine_dip(result, tau);
        let clarity = (1.0 - result[tau]).clamp(0.0, 1.0);
        let frequency = self.sample_rate / refined_tau;

        if clarity < self.config.min_clarity {
            trace!("{} Hz rejected, clarity {}", frequency, clarity);
            return Pitch::unvoiced(Voicing::LowClarity, clarity);
        }
        if frequency < self.config.min_frequency || frequency > self.config.max_frequency {
            trace!("{} Hz outside the configured range", frequency);
            return Pitch::unvoiced(Voicing::OutOfRange, clarity);
        }

        Pitch::voiced(frequency, clarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const SAMPLE_RATE: u32 = 44100;
    const SIZE: usize = 2048;

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    fn detector(method: DifferenceMethod) -> YinDetector {
        let config = DetectorConfig {
            method,
            ..DetectorConfig::default()
        };
        YinDetector::new(SIZE, SAMPLE_RATE, config).unwrap()
    }

    #[test]
    fn detect_a440() {
        let mut detector = detector(DifferenceMethod::Fft);
        let pitch = detector.get_pitch(&sine(440.0, 0.5));

        assert_eq!(pitch.voicing, Voicing::Voiced);
        let frequency = pitch.frequency.unwrap();
        assert!((frequency - 440.0).abs() < 4.4, "got {} Hz", frequency);
        assert!(pitch.clarity > 0.8, "clarity {}", pitch.clarity);
    }

    #[test]
    fn detect_across_the_range() {
        for method in [DifferenceMethod::Fft, DifferenceMethod::Direct] {
            let mut detector = detector(method);
            for freq in [55.0, 82.41, 110.0, 220.0, 440.0, 880.0, 1200.0, 1480.0] {
                let pitch = detector.get_pitch(&sine(freq, 0.5));
                let frequency = pitch.frequency.expect("should be voiced");
                let error = ((frequency - freq) / freq).abs();
                assert!(error < 0.01, "{:?}: expected {} Hz, got {} Hz", method, freq, frequency);
                assert!(pitch.clarity > 0.8);
            }
        }
    }

    #[test]
    fn direct_and_fft_paths_agree() {
        let signal: Vec<f32> = sine(196.0, 0.4)
            .iter()
            .zip(sine(392.0, 0.2).iter())
            .map(|(a, b)| a + b)
            .collect();

        let mut fast = detector(DifferenceMethod::Fft);
        let mut slow = detector(DifferenceMethod::Direct);
        let fast_pitch = fast.get_pitch(&signal);
        let slow_pitch = slow.get_pitch(&signal);

        for (a, b) in fast
            .normalized_difference()
            .iter()
            .zip(slow.normalized_difference().iter())
        {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
        assert_eq!(fast_pitch.voicing, slow_pitch.voicing);
        let (a, b) = (fast_pitch.frequency.unwrap(), slow_pitch.frequency.unwrap());
        assert!((a - b).abs() / b < 1e-3);

        for (a, b) in fast.power_spectrum().iter().zip(slow.power_spectrum().iter()) {
            assert!((a - b).abs() <= 1e-3 * b.abs().max(1.0));
        }
    }

    #[test]
    fn silence_is_unvoiced() {
        let mut detector = detector(DifferenceMethod::Fft);
        let pitch = detector.get_pitch(&vec![0.0; SIZE]);
        assert_eq!(pitch, Pitch::unvoiced(Voicing::Silent, 0.0));
        assert_eq!(detector.level(), 0.0);

        // -70 dBFS, below the default floor
        let pitch = detector.get_pitch(&sine(440.0, 0.0003));
        assert_eq!(pitch.voicing, Voicing::Silent);
    }

    #[test]
    fn noise_is_not_voiced() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise: Vec<f32> = (0..SIZE).map(|_| rng.gen_range(-0.5f32..0.5)).collect();
        let mut detector = detector(DifferenceMethod::Fft);
        let pitch = detector.get_pitch(&noise);
        assert!(!pitch.is_voiced());
        assert!(pitch.clarity < 0.8);
    }

    #[test]
    fn out_of_range_frequency_is_rejected() {
        let config = DetectorConfig {
            min_frequency: 200.0,
            max_frequency: 400.0,
            ..DetectorConfig::default()
        };
        let mut detector = YinDetector::new(SIZE, SAMPLE_RATE, config).unwrap();
        let pitch = detector.get_pitch(&sine(1000.0, 0.5));
        assert_eq!(pitch.voicing, Voicing::OutOfRange);
        assert!(pitch.clarity > 0.8, "a clean tone is still clear");
    }

    #[test]
    fn deterministic() {
        let signal = sine(311.13, 0.3);
        let mut detector = detector(DifferenceMethod::Fft);
        let first = detector.get_pitch(&signal);
        let second = detector.get_pitch(&signal);
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "does not match the detector size")]
    fn wrong_window_size_panics() {
        let mut detector = detector(DifferenceMethod::Fft);
        detector.get_pitch(&[0.0; 1024]);
    }
}
