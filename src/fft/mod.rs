//! Power-of-two FFT shared by the pitch detector and the spectral features.
//!
//! An [`FftCore`] is planned once for a single length: the forward and inverse
//! plans (twiddle factors, radix permutation tables) and the scratch space are
//! built at construction, so transforming never allocates. The inverse transform
//! is normalized, i.e. `inverse(forward(x)) == x` up to rounding.
//!
//! Besides the raw transforms the core offers the two derived quantities the
//! analysis needs:
//!
//!   * [`FftCore::power_spectrum`], the first half of `|FFT(x)|^2`;
//!   * [`FftCore::autocorrelation`], computed with the Wiener-Khinchin theorem:
//!     the signal is zero padded to at least twice its length so the circular
//!     correlation does not wrap, transformed, multiplied by its conjugate and
//!     transformed back. This is `O(n log n)` instead of the `O(n^2)` of
//!     [`direct_autocorrelation`], which is kept as the reference.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::FftError;
use crate::utils::buffer::{
    copy_complex_to_real, copy_real_to_complex, mean, modulus_squared, new_complex_buffer,
};

pub struct FftCore {
    len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    work: Vec<Complex<f32>>,
}

impl fmt::Debug for FftCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftCore").field("len", &self.len).finish()
    }
}

pub fn is_power_of_two(len: usize) -> bool {
    len >= 2 && len.is_power_of_two()
}

impl FftCore {
    pub fn new(len: usize) -> Result<Self, FftError> {
        if !is_power_of_two(len) {
            return Err(FftError::InvalidSize(len));
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Ok(FftCore {
            len,
            forward,
            inverse,
            scratch: new_complex_buffer(scratch_len),
            work: new_complex_buffer(len),
        })
    }

    /// Plan a core large enough to autocorrelate `signal_len` samples without
    /// circular wrap-around.
    pub fn for_autocorrelation(signal_len: usize) -> Result<Self, FftError> {
        Self::new((2 * signal_len.max(1)).next_power_of_two())
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// In-place forward transform of `buffer`.
    pub fn forward(&mut self, buffer: &mut [Complex<f32>]) -> Result<(), FftError> {
        self.check_len(buffer.len())?;
        self.forward_unchecked(buffer);
        Ok(())
    }

    /// In-place normalized inverse transform of `buffer`.
    pub fn inverse(&mut self, buffer: &mut [Complex<f32>]) -> Result<(), FftError> {
        self.check_len(buffer.len())?;
        self.inverse_unchecked(buffer);
        Ok(())
    }

    /// Forward transform of a signal stored as separate real and imaginary parts.
    pub fn forward_split(&mut self, re: &mut [f32], im: &mut [f32]) -> Result<(), FftError> {
        self.split_transform(re, im, true)
    }

    /// Normalized inverse of [`FftCore::forward_split`].
    pub fn inverse_split(&mut self, re: &mut [f32], im: &mut [f32]) -> Result<(), FftError> {
        self.split_transform(re, im, false)
    }

    /// Write the first `len / 2` bins of `|FFT(window)|^2` to `out`. A window
    /// shorter than the planned length is zero padded.
    ///
    /// # Panics
    /// If `window` is longer than the planned length or `out` is shorter than
    /// `len / 2`.
    pub fn power_spectrum(&mut self, window: &[f32], out: &mut [f32]) {
        assert!(
            window.len() <= self.len,
            "window of {} samples does not fit an FFT of length {}",
            window.len(),
            self.len
        );
        let half = self.len / 2;
        assert!(out.len() >= half, "power spectrum output is too short");

        let mut work = std::mem::take(&mut self.work);
        copy_real_to_complex(window, &mut work);
        self.forward_unchecked(&mut work);
        for (o, c) in out[..half].iter_mut().zip(work.iter()) {
            *o = c.norm_sqr();
        }
        self.work = work;
    }

    /// Autocorrelation `r[t] = sum_i (x_i - m)(x_{i+t} - m)` of the mean-removed
    /// `signal` for `t` in `0..out.len()`.
    ///
    /// # Panics
    /// If the planned length is smaller than `2 * signal.len()` or `out` is longer
    /// than `signal`.
    pub fn autocorrelation(&mut self, signal: &[f32], out: &mut [f32]) {
        assert!(
            2 * signal.len() <= self.len,
            "autocorrelation of {} samples needs an FFT of at least {}, planned {}",
            signal.len(),
            2 * signal.len(),
            self.len
        );
        assert!(out.len() <= signal.len());

        let m = mean(signal);
        let mut work = std::mem::take(&mut self.work);
        for (w, &s) in work.iter_mut().zip(signal) {
            *w = Complex::new(s - m, 0.0);
        }
        work[signal.len()..]
            .iter_mut()
            .for_each(|w| *w = Complex::new(0.0, 0.0));

        self.forward_unchecked(&mut work);
        modulus_squared(&mut work);
        self.inverse_unchecked(&mut work);

        copy_complex_to_real(&work[..out.len()], out);
        self.work = work;
    }

    pub(crate) fn forward_unchecked(&mut self, buffer: &mut [Complex<f32>]) {
        assert_eq!(buffer.len(), self.len, "FFT length mismatch");
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    pub(crate) fn inverse_unchecked(&mut self, buffer: &mut [Complex<f32>]) {
        assert_eq!(buffer.len(), self.len, "FFT length mismatch");
        self.inverse.process_with_scratch(buffer, &mut self.scratch);
        let norm = 1.0 / self.len as f32;
        buffer.iter_mut().for_each(|c| *c = *c * norm);
    }

    fn check_len(&self, len: usize) -> Result<(), FftError> {
        if !is_power_of_two(len) {
            return Err(FftError::InvalidSize(len));
        }
        if len != self.len {
            return Err(FftError::LengthMismatch {
                expected: self.len,
                actual: len,
            });
        }
        Ok(())
    }

    fn split_transform(
        &mut self,
        re: &mut [f32],
        im: &mut [f32],
        forward: bool,
    ) -> Result<(), FftError> {
        if re.len() != im.len() {
            return Err(FftError::LengthMismatch {
                expected: re.len(),
                actual: im.len(),
            });
        }
        self.check_len(re.len())?;

        let mut work = std::mem::take(&mut self.work);
        for ((w, &r), &i) in work.iter_mut().zip(re.iter()).zip(im.iter()) {
            *w = Complex::new(r, i);
        }
        if forward {
            self.forward_unchecked(&mut work);
        } else {
            self.inverse_unchecked(&mut work);
        }
        for ((w, r), i) in work.iter().zip(re.iter_mut()).zip(im.iter_mut()) {
            *r = w.re;
            *i = w.im;
        }
        self.work = work;
        Ok(())
    }
}

/// Reference `O(n^2)` autocorrelation with the same semantics as
/// [`FftCore::autocorrelation`].
pub fn direct_autocorrelation(signal: &[f32], out: &mut [f32]) {
    assert!(out.len() <= signal.len());
    let m = mean(signal);
    for (lag, o) in out.iter_mut().enumerate() {
        *o = signal
            .iter()
            .zip(signal[lag..].iter())
            .map(|(&a, &b)| (a - m) * (b - m))
            .sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_signal(rng: &mut StdRng, len: usize) -> Vec<f32> {
        (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    fn direct_dft(re: &[f32], im: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let n = re.len();
        let mut out_re = vec![0.0f64; n];
        let mut out_im = vec![0.0f64; n];
        for k in 0..n {
            for t in 0..n {
                let angle = -2.0 * std::f64::consts::PI * (k * t) as f64 / n as f64;
                let (s, c) = angle.sin_cos();
                out_re[k] += re[t] as f64 * c - im[t] as f64 * s;
                out_im[k] += re[t] as f64 * s + im[t] as f64 * c;
            }
        }
        (
            out_re.into_iter().map(|v| v as f32).collect(),
            out_im.into_iter().map(|v| v as f32).collect(),
        )
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(FftCore::new(0).unwrap_err(), FftError::InvalidSize(0));
        assert_eq!(FftCore::new(1).unwrap_err(), FftError::InvalidSize(1));
        assert_eq!(FftCore::new(1000).unwrap_err(), FftError::InvalidSize(1000));
        assert!(FftCore::new(1024).is_ok());
    }

    #[test]
    fn split_buffers_must_match() {
        let mut core = FftCore::new(8).unwrap();
        let mut re = vec![0.0; 8];
        let mut im = vec![0.0; 4];
        assert_eq!(
            core.forward_split(&mut re, &mut im),
            Err(FftError::LengthMismatch {
                expected: 8,
                actual: 4
            })
        );

        let mut re = vec![0.0; 6];
        let mut im = vec![0.0; 6];
        assert_eq!(
            core.forward_split(&mut re, &mut im),
            Err(FftError::InvalidSize(6))
        );

        let mut buffer = new_complex_buffer(16);
        assert_eq!(
            core.forward(&mut buffer),
            Err(FftError::LengthMismatch {
                expected: 8,
                actual: 16
            })
        );
    }

    #[test]
    fn forward_matches_direct_dft() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [2, 4, 8, 16, 32, 64] {
            let mut re = random_signal(&mut rng, len);
            let mut im = random_signal(&mut rng, len);
            let (expected_re, expected_im) = direct_dft(&re, &im);

            let mut core = FftCore::new(len).unwrap();
            core.forward_split(&mut re, &mut im).unwrap();

            for k in 0..len {
                assert!((re[k] - expected_re[k]).abs() < 1e-3, "re[{}] at len {}", k, len);
                assert!((im[k] - expected_im[k]).abs() < 1e-3, "im[{}] at len {}", k, len);
            }
        }
    }

    #[test]
    fn inverse_of_forward_is_identity() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut len = 2;
        while len <= 4096 {
            let original_re = random_signal(&mut rng, len);
            let original_im = random_signal(&mut rng, len);
            let mut re = original_re.clone();
            let mut im = original_im.clone();

            let mut core = FftCore::new(len).unwrap();
            core.forward_split(&mut re, &mut im).unwrap();
            core.inverse_split(&mut re, &mut im).unwrap();

            for i in 0..len {
                assert!((re[i] - original_re[i]).abs() < 1e-4, "len {}", len);
                assert!((im[i] - original_im[i]).abs() < 1e-4, "len {}", len);
            }
            len *= 2;
        }
    }

    #[test]
    fn power_spectrum_of_bin_centered_sine() {
        let len = 64;
        let bin = 5;
        let signal: Vec<f32> = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / len as f32).sin())
            .collect();
        let mut core = FftCore::new(len).unwrap();
        let mut spectrum = vec![0.0; len / 2];
        core.power_spectrum(&signal, &mut spectrum);

        let (peak, _) = spectrum
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert_eq!(peak, bin);
        // |X[k]| = N/2 for a unit sine centred on bin k
        assert!((spectrum[bin] - (len as f32 / 2.0).powi(2)).abs() < 1e-1);
    }

    #[test]
    fn autocorrelation_matches_direct() {
        let mut rng = StdRng::seed_from_u64(3);
        for len in [8, 16, 32, 64] {
            let signal: Vec<f32> = random_signal(&mut rng, len)
                .into_iter()
                .map(|s| s + 0.3)
                .collect();
            let mut core = FftCore::for_autocorrelation(len).unwrap();
            let mut fast = vec![0.0; len];
            let mut slow = vec![0.0; len];
            core.autocorrelation(&signal, &mut fast);
            direct_autocorrelation(&signal, &mut slow);

            let scale = slow[0].abs();
            for lag in 0..len {
                assert!(
                    (fast[lag] - slow[lag]).abs() <= 1e-3 * scale,
                    "lag {} of {}: {} vs {}",
                    lag,
                    len,
                    fast[lag],
                    slow[lag]
                );
            }
        }
    }

    #[test]
    #[should_panic(expected = "needs an FFT of at least")]
    fn autocorrelation_requires_padding() {
        let mut core = FftCore::new(16).unwrap();
        let mut out = vec![0.0; 16];
        core.autocorrelation(&[0.0; 16], &mut out);
    }

    // Wall-clock timing. Run with `cargo test --release -- --ignored fft_beats_direct`.
    #[test]
    #[ignore]
    fn fft_beats_direct_autocorrelation() {
        use std::hint::black_box;
        use std::time::Instant;

        const ROUNDS: u32 = 20;
        let mut rng = StdRng::seed_from_u64(3);
        for len in [1024usize, 2048, 4096] {
            let signal = random_signal(&mut rng, len);
            let mut core = FftCore::for_autocorrelation(len).unwrap();
            let mut out = vec![0.0; len];

            let start = Instant::now();
            for _ in 0..ROUNDS {
                direct_autocorrelation(black_box(&signal), &mut out);
            }
            let direct = start.elapsed();

            let start = Instant::now();
            for _ in 0..ROUNDS {
                core.autocorrelation(black_box(&signal), &mut out);
            }
            let fft = start.elapsed();

            assert!(
                direct >= fft * 5,
                "{} samples: direct {:?}, fft {:?}",
                len,
                direct,
                fft
            );
        }
    }
}
