//! # Pitch Detection Module
//!
//! Turns a magnitude spectrum into a single frequency estimate.
//!
//! ## Features
//! - Strongest-bin peak location with deterministic tie-breaking
//! - Bin index to Hz mapping
//! - Optional parabolic interpolation for sub-bin accuracy

/// Returns the index of the largest magnitude.
///
/// The scan runs left to right and only a strictly greater value replaces the
/// running peak, so ties resolve to the lowest index.
///
/// # Returns
/// * `Some(index)` - Bin with the most energy
/// * `None` - The spectrum is empty
pub fn peak_index(magnitudes: &[f64]) -> Option<usize> {
    let first = *magnitudes.first()?;
    let (index, _) = magnitudes
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, first), |(best_i, best), (i, &m)| {
            if best < m { (i, m) } else { (best_i, best) }
        });
    Some(index)
}

/// Maps a (possibly fractional) bin index to a frequency in Hz.
///
/// `frequency = sample_rate * index / block_len`
pub fn bin_to_frequency(index: f64, block_len: usize, sample_rate: u32) -> f64 {
    sample_rate as f64 * index / block_len as f64
}

/// Refines a peak bin to a fractional bin position.
///
/// Fits a parabola through the log-magnitudes of the peak and its two
/// neighbours (Gaussian interpolation). Falls back to the integer bin when the
/// peak sits on the edge of the spectrum or a neighbour is silent.
///
/// # Arguments
/// * `magnitudes` - Magnitude spectrum
/// * `peak` - Index returned by [`peak_index`]
///
/// # Returns
/// * Interpolated bin position, within half a bin of `peak`
pub fn interpolate_peak(magnitudes: &[f64], peak: usize) -> f64 {
    if peak == 0 || peak + 1 >= magnitudes.len() {
        return peak as f64;
    }

    let y1 = magnitudes[peak - 1].ln();
    let y2 = magnitudes[peak].ln();
    let y3 = magnitudes[peak + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return peak as f64;
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-12 {
        return peak as f64;
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    if peak_shift.is_finite() && peak_shift.abs() <= 0.5 {
        peak as f64 + peak_shift
    } else {
        peak as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_tie_resolves_to_first() {
        assert_eq!(peak_index(&[3.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(peak_index(&[1.0, 1.0, 1.0]), Some(0));
    }

    #[test]
    fn test_peak_simple_cases() {
        assert_eq!(peak_index(&[7.0]), Some(0));
        assert_eq!(peak_index(&[0.0, 0.5, 0.1, 9.0]), Some(3));
        assert_eq!(peak_index(&[4.0, 0.0, 0.0]), Some(0));
    }

    #[test]
    fn test_peak_empty_spectrum() {
        assert_eq!(peak_index(&[]), None);
    }

    #[test]
    fn test_bin_to_frequency_exact() {
        let rate = 44100;
        let n = 4096;
        for k in [0usize, 1, 41, 1000, 2047] {
            assert_eq!(bin_to_frequency(k as f64, n, rate), rate as f64 * k as f64 / n as f64);
        }
        assert_eq!(bin_to_frequency(10.0, 100, 1000), 100.0);
        assert_eq!(bin_to_frequency(0.0, 4096, 44100), 0.0);
    }

    #[test]
    fn test_interpolate_symmetric_peak_stays_put() {
        let magnitudes = [0.0, 1.0, 4.0, 1.0, 0.0];
        assert_eq!(interpolate_peak(&magnitudes, 2), 2.0);
    }

    #[test]
    fn test_interpolate_leans_toward_larger_neighbour() {
        let magnitudes = [0.5, 2.0, 4.0, 3.0, 0.5];
        let refined = interpolate_peak(&magnitudes, 2);
        assert!(refined > 2.0 && refined < 2.5, "refined = {}", refined);
    }

    #[test]
    fn test_interpolate_edges_and_silence_fall_back() {
        let magnitudes = [5.0, 1.0, 0.0, 3.0];
        assert_eq!(interpolate_peak(&magnitudes, 0), 0.0);
        assert_eq!(interpolate_peak(&magnitudes, 3), 3.0);
        // ln(0) is not finite
        assert_eq!(interpolate_peak(&[0.0, 2.0, 1.0], 1), 1.0);
    }
}
