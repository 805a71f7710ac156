//! # Spectrum Module
//!
//! Turns one windowed block into its complex spectrum and keeps the
//! magnitudes of bins `0..N/2`.
//!
//! The rustfft plan is built once per detector and reused for every block.
//! Block lengths need not be powers of two; the planner picks the algorithm.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Forward DFT of a fixed length, unnormalized, `e^{-i2πkn/N}` convention.
///
/// The plan and scratch space are reused across blocks; each call still
/// produces a fresh spectrum.
pub struct SpectralTransform {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralTransform {
    /// Plans a forward FFT for `len` samples.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self { fft, scratch }
    }

    pub fn len(&self) -> usize {
        self.fft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fft.len() == 0
    }

    /// Transforms a windowed real block into its complex spectrum.
    ///
    /// The input is promoted to complex with a zero imaginary part.
    ///
    /// # Panics
    /// * If `signal.len()` differs from the planned length
    pub fn process(&mut self, signal: &[f64]) -> Vec<Complex<f64>> {
        assert_eq!(
            signal.len(),
            self.fft.len(),
            "input block length must match the planned FFT length"
        );

        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .map(|&sample| Complex { re: sample, im: 0.0 })
            .collect();

        self.fft.process_with_scratch(&mut buffer, &mut self.scratch);
        buffer
    }
}

/// Calculates the magnitude of the non-negative-frequency half of a spectrum.
///
/// Real input makes the spectrum Hermitian-symmetric, so only the first
/// `⌊N/2⌋` bins carry information.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f64>]) -> Vec<f64> {
    spectrum
        .iter()
        .take(spectrum.len() / 2)
        .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
        .collect()
}
