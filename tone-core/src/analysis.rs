//! # Analysis Pipeline
//!
//! Runs one block through Window → FFT → Magnitude → Peak → Frequency.
//! The detection loop owns one [`ToneAnalyzer`]; it can also be used directly
//! for offline analysis.

use std::sync::Arc;

use crate::config::{DetectorConfig, PeakInterpolation};
use crate::error::DetectorError;
use crate::fft::{self, SpectralTransform};
use crate::pitch;
use crate::window::HammingWindow;

/// Per-detector analysis state: the shared window and a planned transform.
pub struct ToneAnalyzer {
    config: DetectorConfig,
    window: Arc<HammingWindow>,
    transform: SpectralTransform,
}

impl ToneAnalyzer {
    /// Validates the config and precomputes everything that depends only on N.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        let window = Arc::new(HammingWindow::new(config.block_len)?);
        Ok(Self::with_window(config, window))
    }

    /// Builds an analyzer around an existing window of matching length.
    pub(crate) fn with_window(config: DetectorConfig, window: Arc<HammingWindow>) -> Self {
        debug_assert_eq!(window.len(), config.block_len);
        let transform = SpectralTransform::new(config.block_len);
        Self {
            config,
            window,
            transform,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Windowed magnitude spectrum of one block (`⌊N/2⌋` bins).
    ///
    /// # Panics
    /// * If `block.len()` is not the configured block length
    pub fn magnitudes(&mut self, block: &[f64]) -> Vec<f64> {
        let windowed = self.window.apply(block);
        let spectrum = self.transform.process(&windowed);
        fft::spectrum_to_magnitudes(&spectrum)
    }

    /// Estimates the dominant frequency of one block in Hz.
    ///
    /// # Returns
    /// * `Some(frequency)` - Frequency of the strongest bin (optionally refined/rounded)
    /// * `None` - The spectrum was empty, which a validated config rules out
    pub fn analyze(&mut self, block: &[f64]) -> Option<f64> {
        let magnitudes = self.magnitudes(block);
        let peak = pitch::peak_index(&magnitudes)?;

        let bin = match self.config.interpolation {
            PeakInterpolation::None => peak as f64,
            PeakInterpolation::Parabolic => pitch::interpolate_peak(&magnitudes, peak),
        };

        let frequency = pitch::bin_to_frequency(bin, self.config.block_len, self.config.sample_rate);
        if self.config.round_to_hz {
            Some(frequency.round())
        } else {
            Some(frequency)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            ToneAnalyzer::new(DetectorConfig::new(44100, 1)),
            Err(DetectorError::InvalidBlockLength(1))
        ));
        assert!(matches!(
            ToneAnalyzer::new(DetectorConfig::new(0, 1024)),
            Err(DetectorError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_bin_aligned_tone_peaks_at_its_bin() {
        // R = 8000, N = 1000: 8 Hz per bin, bin 55 = 440 Hz
        let rate = 8000;
        let n = 1000;
        let k = 55;
        let tone = sine(rate as f64 * k as f64 / n as f64, rate, n);

        // Unwindowed spectrum
        let mut transform = SpectralTransform::new(n);
        let raw = fft::spectrum_to_magnitudes(&transform.process(&tone));
        assert_eq!(pitch::peak_index(&raw), Some(k));

        // Windowing broadens but does not shift the peak
        let mut analyzer = ToneAnalyzer::new(DetectorConfig::new(rate, n)).unwrap();
        assert_eq!(pitch::peak_index(&analyzer.magnitudes(&tone)), Some(k));
        assert_eq!(analyzer.analyze(&tone), Some(440.0));
    }

    #[test]
    fn test_a440_at_cd_rate() {
        let config = DetectorConfig::new(44100, 4096);
        let bin_width = config.bin_width();
        let mut analyzer = ToneAnalyzer::new(config).unwrap();
        let tone = sine(440.0, 44100, 4096);

        let magnitudes = analyzer.magnitudes(&tone);
        assert_eq!(magnitudes.len(), 2048);
        assert_eq!(pitch::peak_index(&magnitudes), Some(41));

        let frequency = analyzer.analyze(&tone).unwrap();
        assert_eq!(frequency, 44100.0 * 41.0 / 4096.0);
        assert!((frequency - 441.1).abs() < 0.1);
        assert!((frequency - 440.0).abs() < bin_width);
    }

    #[test]
    fn test_rounding_to_whole_hz() {
        let mut config = DetectorConfig::new(44100, 4096);
        config.round_to_hz = true;
        let mut analyzer = ToneAnalyzer::new(config).unwrap();
        assert_eq!(analyzer.analyze(&sine(440.0, 44100, 4096)), Some(441.0));
    }

    #[test]
    fn test_parabolic_interpolation_improves_estimate() {
        let mut config = DetectorConfig::new(44100, 4096);
        config.interpolation = PeakInterpolation::Parabolic;
        let mut analyzer = ToneAnalyzer::new(config).unwrap();

        let frequency = analyzer.analyze(&sine(440.0, 44100, 4096)).unwrap();
        let exact_bin: f64 = 44100.0 * 41.0 / 4096.0;
        assert!((frequency - 440.0).abs() < (exact_bin - 440.0).abs());
        assert!((frequency - 440.0).abs() < 1.0, "frequency = {}", frequency);
    }

    #[test]
    fn test_silence_reports_dc() {
        let mut analyzer = ToneAnalyzer::new(DetectorConfig::new(44100, 256)).unwrap();
        assert_eq!(analyzer.analyze(&vec![0.0; 256]), Some(0.0));
    }

    #[test]
    fn test_minimum_block_length() {
        let mut analyzer = ToneAnalyzer::new(DetectorConfig::new(100, 2)).unwrap();
        assert_eq!(analyzer.magnitudes(&[1.0, -1.0]).len(), 1);
        assert_eq!(analyzer.analyze(&[1.0, -1.0]), Some(0.0));
    }
}
