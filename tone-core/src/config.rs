//! # Detector Configuration
//!
//! Construction parameters for a tone detector. The same struct is used by the
//! library, the command-line front end and JSON config files.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::DetectorError;

/// Default capture rate in Hz (CD quality).
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default block length in samples (~93ms at 44.1kHz, ~10.8Hz per bin).
pub const DEFAULT_BLOCK_LEN: usize = 4096;

/// How the peak bin is turned into a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakInterpolation {
    /// Report the centre frequency of the peak bin.
    #[default]
    None,
    /// Fit a parabola through the log-magnitudes around the peak for sub-bin accuracy.
    Parabolic,
}

/// Parameters fixed for the lifetime of one detector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sample rate R in Hz. Must be greater than 0.
    pub sample_rate: u32,
    /// Block length N in samples. Must be at least 2.
    pub block_len: usize,
    /// Sub-bin refinement of the spectral peak.
    pub interpolation: PeakInterpolation,
    /// Round every estimate to the nearest whole Hz before delivery.
    pub round_to_hz: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_len: DEFAULT_BLOCK_LEN,
            interpolation: PeakInterpolation::None,
            round_to_hz: false,
        }
    }
}

impl DetectorConfig {
    pub fn new(sample_rate: u32, block_len: usize) -> Self {
        Self {
            sample_rate,
            block_len,
            ..Self::default()
        }
    }

    /// Rejects parameters the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.block_len < 2 {
            return Err(DetectorError::InvalidBlockLength(self.block_len));
        }
        if self.sample_rate == 0 {
            return Err(DetectorError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_width(&self) -> f64 {
        self.sample_rate as f64 / self.block_len as f64
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DetectorError> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: DetectorConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DetectorError> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}
