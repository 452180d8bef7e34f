use rustfft::num_complex::Complex;

use crate::error::FftError;
use crate::fft::FftCore;
use crate::utils::buffer::{
    copy_complex_to_real, copy_real_to_complex, new_complex_buffer, new_real_buffer, square_sum,
};

/// Data structure to hold any buffers needed for pitch computation.
/// Every buffer is allocated once here and reused for every window, so the
/// detector never allocates while analyzing.
pub struct DetectorInternals {
    pub size: usize,
    pub fft: FftCore,
    pub real_buffers: Vec<Vec<f32>>,
    pub complex_buffers: Vec<Vec<Complex<f32>>>,
}

impl DetectorInternals {
    pub fn new(
        n_real_buffers: usize,
        n_complex_buffers: usize,
        size: usize,
    ) -> Result<Self, FftError> {
        let fft = FftCore::new(size)?;
        let real_buffers = (0..n_real_buffers).map(|_| new_real_buffer(size)).collect();
        let complex_buffers = (0..n_complex_buffers)
            .map(|_| new_complex_buffer(size))
            .collect();

        Ok(DetectorInternals {
            size,
            fft,
            real_buffers,
            complex_buffers,
        })
    }

    pub fn has_sufficient_buffers(&self, n_real_buffers: usize, n_complex_buffers: usize) -> bool {
        self.real_buffers.len() >= n_real_buffers && self.complex_buffers.len() >= n_complex_buffers
    }
}

/// Split the first two elements from `array` off as mutable elements in a tuple.
pub fn split_first_two_mut<T>(array: &mut [T]) -> (&mut T, &mut T) {
    let (first, rest) = array.split_at_mut(1);
    (&mut first[0], &mut rest[0])
}

/// Compute the windowed autocorrelation of `signal` and put the result in `result`.
/// For a signal _x=(x_0,x_1,...)_, the windowed autocorrelation with window size _w_ is
/// the function
///
/// > r(t) = sum_{i=0}^{w-1} x_i*x_{i+t}
///
/// This function assumes `window_size` is at most half of the length of `signal`,
/// and that `fft` is planned for exactly `signal.len()`. If `spectrum` is given,
/// the first half of the power spectrum of `signal` is written to it on the way.
pub fn windowed_autocorrelation(
    signal: &[f32],
    window_size: usize,
    fft: &mut FftCore,
    signal_complex: &mut [Complex<f32>],
    truncated_signal_complex: &mut [Complex<f32>],
    spectrum: Option<&mut [f32]>,
    result: &mut [f32],
) {
    assert_eq!(signal.len(), fft.len(), "signal does not match the planned FFT");

    // To achieve the windowed autocorrelation, we compute the cross correlation between
    // the original signal and the signal truncated to lie in `0..window_size`
    copy_real_to_complex(signal, signal_complex);
    copy_real_to_complex(&signal[..window_size], truncated_signal_complex);
    fft.forward_unchecked(signal_complex);
    fft.forward_unchecked(truncated_signal_complex);

    if let Some(spectrum) = spectrum {
        spectrum
            .iter_mut()
            .zip(signal_complex.iter())
            .take(signal.len() / 2)
            .for_each(|(p, c)| *p = c.norm_sqr());
    }

    signal_complex
        .iter_mut()
        .zip(truncated_signal_complex.iter())
        .for_each(|(a, b)| *a = *a * b.conj());
    // The inverse transform is already normalized by the core.
    fft.inverse_unchecked(signal_complex);

    // The result is valid only for `0..window_size`
    copy_complex_to_real(&signal_complex[..window_size], result);
}

/// Compute the windowed square error, _d(t)_, of `signal`. For a window size of _w_ and a signal
/// _x=(x_0,x_1,...)_, this is defined by
///
///  > d(t) = sum_{i=0}^{w-1} (x_i - x_{i+t})^2
///
/// This function is computed efficiently using an FFT. It is assumed that `window_size` is at most half
/// the length of `signal`.
pub fn windowed_square_error(
    signal: &[f32],
    window_size: usize,
    fft: &mut FftCore,
    signal_complex: &mut [Complex<f32>],
    truncated_signal_complex: &mut [Complex<f32>],
    spectrum: Option<&mut [f32]>,
    result: &mut [f32],
) {
    assert!(
        2 * window_size <= signal.len(),
        "The window size cannot be more than half the signal length"
    );

    // The windowed square error function, d(t), can be computed
    // as d(t) = pow_0^w + pow_t^{t+w} - 2*windowed_autocorrelation(t)
    // where pow_a^b is the sum of the square of `signal` on the window `a..b`
    // We proceed accordingly.
    windowed_autocorrelation(
        signal,
        window_size,
        fft,
        signal_complex,
        truncated_signal_complex,
        spectrum,
        result,
    );
    let mut windowed_power = square_sum(&signal[..window_size]);
    let power = windowed_power;

    result[..window_size]
        .iter_mut()
        .enumerate()
        .for_each(|(i, a)| {
            // FFT rounding can push a perfect match slightly below zero.
            *a = (power + windowed_power - 2.0 * *a).max(0.0);
            // Since we're processing everything in order, we can compute pow_{t+1}^{t+1+w}
            // directly from pow_t^{t+w} by adding and subtracting the boundary terms.
            windowed_power = windowed_power - signal[i] * signal[i]
                + signal[i + window_size] * signal[i + window_size];
        })
}

/// The same _d(t)_ as [`windowed_square_error`], computed term by term in
/// `O(w^2)`. Used when the FFT path is disabled and as its reference.
pub fn direct_square_error(signal: &[f32], window_size: usize, result: &mut [f32]) {
    assert!(
        2 * window_size <= signal.len(),
        "The window size cannot be more than half the signal length"
    );

    result[..window_size]
        .iter_mut()
        .enumerate()
        .for_each(|(tau, a)| {
            *a = signal[..window_size]
                .iter()
                .zip(signal[tau..tau + window_size].iter())
                .map(|(x_j, x_j_tau)| (x_j - x_j_tau) * (x_j - x_j_tau))
                .sum();
        });
}

/// Calculate the "cumulative mean normalized difference function" as
/// specified in the YIN paper. If _d(t)_ is the square error function,
/// compute _d'(0) = 1_ and for _t > 0_
///
///  > d'(t) = d(t) / [ (1/t) * sum_{i=1}^t d(i) ]
///
/// A lag whose running sum is still zero (silence) is set to 1.
pub fn yin_normalize_square_error(square_error: &mut [f32]) {
    if square_error.is_empty() {
        return;
    }
    let mut sum = 0.0;
    square_error[0] = 1.0;
    // square_error[0] should always be zero, so we don't need to worry about
    // adding this to our sum.
    square_error
        .iter_mut()
        .enumerate()
        .skip(1)
        .for_each(|(i, a)| {
            sum += *a;
            *a = if sum > f32::EPSILON {
                *a * i as f32 / sum
            } else {
                1.0
            };
        });
}
