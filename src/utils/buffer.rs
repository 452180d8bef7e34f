use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// Lowest level reported by [`amplitude_to_db`].
pub const MIN_DB: f32 = -100.0;

pub fn new_real_buffer(size: usize) -> Vec<f32> {
    vec![0.0; size]
}

pub fn new_complex_buffer(size: usize) -> Vec<Complex<f32>> {
    vec![Complex::zero(); size]
}

/// Copy `input` into the real part of `output`, zeroing the imaginary part and
/// the tail of `output` past `input.len()`.
pub fn copy_real_to_complex(input: &[f32], output: &mut [Complex<f32>]) {
    assert!(input.len() <= output.len());
    input.iter().zip(output.iter_mut()).for_each(|(i, o)| {
        o.re = *i;
        o.im = 0.0;
    });
    output[input.len()..]
        .iter_mut()
        .for_each(|o| *o = Complex::zero())
}

/// Copy the real part of `input` into `output`.
pub fn copy_complex_to_real(input: &[Complex<f32>], output: &mut [f32]) {
    input
        .iter()
        .zip(output.iter_mut())
        .for_each(|(i, o)| *o = i.re)
}

/// Computes |x|^2 for each complex value x in `arr`. This function
/// modifies `arr` in place and leaves the imaginary component zero.
pub fn modulus_squared(arr: &mut [Complex<f32>]) {
    for s in arr {
        s.re = s.re * s.re + s.im * s.im;
        s.im = 0.0;
    }
}

/// Compute the sum of the square of each element of `arr`.
pub fn square_sum(arr: &[f32]) -> f32 {
    arr.iter().map(|&s| s * s).sum()
}

pub fn mean(arr: &[f32]) -> f32 {
    if arr.is_empty() {
        return 0.0;
    }
    arr.iter().sum::<f32>() / arr.len() as f32
}

/// Root mean square level of `arr`, 0 for an empty slice.
pub fn rms(arr: &[f32]) -> f32 {
    if arr.is_empty() {
        return 0.0;
    }
    (square_sum(arr) / arr.len() as f32).sqrt()
}

/// Linear amplitude to decibels full scale, floored at [`MIN_DB`].
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return MIN_DB;
    }
    (20.0 * amplitude.log10()).max(MIN_DB)
}

pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
