//! # Windowing Module
//!
//! Hamming taper applied to every sample block before the transform to reduce
//! spectral leakage at the block edges. The coefficients depend only on the
//! block length, so they are computed once per detector and shared read-only.

use std::f64::consts::PI;

use crate::error::DetectorError;

/// Precomputed Hamming coefficients for a fixed block length.
#[derive(Debug, Clone, PartialEq)]
pub struct HammingWindow {
    coefficients: Vec<f64>,
}

impl HammingWindow {
    /// Builds the window for blocks of `len` samples.
    ///
    /// `coefficient[i] = 0.54 - 0.46 * cos(2πi / (len - 1))`
    ///
    /// The formula is undefined below two samples, so shorter lengths are rejected here
    /// rather than per block.
    pub fn new(len: usize) -> Result<Self, DetectorError> {
        if len < 2 {
            return Err(DetectorError::InvalidBlockLength(len));
        }

        let n_minus_1 = (len - 1) as f64;
        let mut coefficients = vec![0.0; len];
        // Only the first half is evaluated; the mirror keeps c[i] == c[len-1-i] bit-exact.
        for i in 0..len.div_ceil(2) {
            let c = 0.54 - 0.46 * (2.0 * PI * i as f64 / n_minus_1).cos();
            coefficients[i] = c;
            coefficients[len - 1 - i] = c;
        }

        Ok(Self { coefficients })
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Returns `block[i] * coefficient[i]` for every sample.
    pub fn apply(&self, block: &[f64]) -> Vec<f64> {
        debug_assert_eq!(block.len(), self.coefficients.len());
        block
            .iter()
            .zip(self.coefficients.iter())
            .map(|(&s, &w)| s * w)
            .collect()
    }

    /// In-place variant of [`apply`](Self::apply).
    pub fn apply_inplace(&self, block: &mut [f64]) {
        debug_assert_eq!(block.len(), self.coefficients.len());
        for (s, w) in block.iter_mut().zip(self.coefficients.iter()) {
            *s *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_lengths() {
        assert!(matches!(HammingWindow::new(0), Err(DetectorError::InvalidBlockLength(0))));
        assert!(matches!(HammingWindow::new(1), Err(DetectorError::InvalidBlockLength(1))));
    }

    #[test]
    fn test_length_endpoints_and_symmetry() {
        for n in [2usize, 3, 4, 5, 16, 101, 1024, 4096] {
            let window = HammingWindow::new(n).unwrap();
            let c = window.coefficients();
            assert_eq!(c.len(), n);
            assert!((c[0] - 0.08).abs() < 1e-12, "n={} c[0]={}", n, c[0]);
            assert!((c[n - 1] - 0.08).abs() < 1e-12, "n={} c[n-1]={}", n, c[n - 1]);
            for i in 0..n {
                assert_eq!(c[i], c[n - 1 - i], "asymmetric at n={} i={}", n, i);
            }
        }
    }

    #[test]
    fn test_coefficients_within_hamming_range() {
        let window = HammingWindow::new(513).unwrap();
        for &c in window.coefficients() {
            assert!((0.08 - 1e-12..=1.0 + 1e-12).contains(&c));
        }
        // Odd lengths peak at exactly 1.0 in the centre
        assert!((window.coefficients()[256] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_scales_each_sample() {
        let window = HammingWindow::new(100).unwrap();
        let signal = vec![2.0; 100];
        let windowed = window.apply(&signal);

        assert_eq!(windowed.len(), 100);
        for (w, c) in windowed.iter().zip(window.coefficients()) {
            assert!((w - 2.0 * c).abs() < 1e-12);
        }
        // Edges are tapered to ~0.08 of the input
        assert!(windowed[0] < 0.2);
        assert!(windowed[99] < 0.2);

        let mut inplace = signal.clone();
        window.apply_inplace(&mut inplace);
        assert_eq!(inplace, windowed);
    }

    #[test]
    fn test_window_independent_of_amplitude() {
        let window = HammingWindow::new(64).unwrap();
        let quiet = window.apply(&vec![0.001; 64]);
        let loud = window.apply(&vec![1000.0; 64]);
        for (q, l) in quiet.iter().zip(loud.iter()) {
            assert!((l / q - 1_000_000.0).abs() < 1e-3);
        }
    }
}
