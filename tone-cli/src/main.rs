//! # Tonefinder - single-tone frequency detector
//!
//! Command-line front end for `tone-core`. Runs a detector against the
//! default microphone or against raw PCM on stdin and prints every estimate.
//!
//! ## Architecture
//! - **Main Thread**: argument parsing, printing, Ctrl-C handling
//! - **Detector Thread**: capture/read, analysis, result hand-off
//! - **Communication**: Crossbeam channels for estimates and shutdown

mod capture;
mod stdin;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::select;
use log::{info, warn};
use std::path::PathBuf;
use tone_core::{DetectorConfig, PeakInterpolation, ToneDetector};

/// Smallest block the front end will run with (~5.8ms at 44.1kHz).
const MIN_BLOCK_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Input {
    /// Default microphone
    Mic,
    /// Signed 16-bit little-endian mono PCM on stdin
    Stdin,
}

#[derive(Debug, Parser)]
#[command(name = "tonefinder", version, about = "Real-time single-tone frequency detector")]
struct Args {
    /// Where samples come from
    #[arg(short, long, value_enum, default_value_t = Input::Mic)]
    input: Input,

    /// Sample rate in Hz
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Samples per analysis block
    #[arg(short, long)]
    block_size: Option<usize>,

    /// Refine the peak between FFT bins
    #[arg(long)]
    parabolic: bool,

    /// Report whole Hz
    #[arg(long)]
    round: bool,

    /// Load detector settings from a JSON file (flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a JSON file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Args {
    fn detector_config(&self) -> Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => DetectorConfig::default(),
        };

        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(block_len) = self.block_size {
            config.block_len = block_len;
        }
        if self.parabolic {
            config.interpolation = PeakInterpolation::Parabolic;
        }
        if self.round {
            config.round_to_hz = true;
        }

        if config.block_len < MIN_BLOCK_LEN {
            warn!(
                "[MAIN] Block size {} is below the minimum, using {}",
                config.block_len, MIN_BLOCK_LEN
            );
            config.block_len = MIN_BLOCK_LEN;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.detector_config()?;

    if let Some(path) = &args.save_config {
        config
            .save(path)
            .with_context(|| format!("failed to save config to {}", path.display()))?;
        info!("[MAIN] Settings saved to {}", path.display());
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let (results_tx, results_rx) = crossbeam_channel::unbounded::<f64>();
    let mut detector = ToneDetector::new(config.clone(), results_tx)?;

    match args.input {
        Input::Mic => {
            let (rate, block_len) = (config.sample_rate, config.block_len);
            detector.start(move || capture::open_microphone(rate, block_len))?;
        }
        Input::Stdin => {
            let source = stdin::spawn_pcm_reader(std::io::stdin(), config.block_len)?;
            detector.start_with(source)?;
        }
    }

    info!("[MAIN] Listening... press Ctrl-C to stop");
    let decimals = if config.round_to_hz { 0 } else { 1 };

    loop {
        select! {
            recv(results_rx) -> msg => match msg {
                Ok(hz) => println!("{:.*} Hz", decimals, hz),
                Err(_) => {
                    info!("[MAIN] Detector finished");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                info!("[MAIN] Interrupted");
                break;
            },
        }
    }

    detector.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tonefinder"]);
        assert_eq!(args.input, Input::Mic);
        assert_eq!(args.detector_config().unwrap(), DetectorConfig::default());
    }

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "tonefinder", "--input", "stdin", "-r", "8000", "-b", "1000", "--parabolic", "--round",
        ]);
        let config = args.detector_config().unwrap();
        assert_eq!(args.input, Input::Stdin);
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.block_len, 1000);
        assert_eq!(config.interpolation, PeakInterpolation::Parabolic);
        assert!(config.round_to_hz);
    }

    #[test]
    fn test_small_blocks_are_raised_to_minimum() {
        let args = Args::parse_from(["tonefinder", "-b", "2"]);
        assert_eq!(args.detector_config().unwrap().block_len, MIN_BLOCK_LEN);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let args = Args::parse_from(["tonefinder", "-r", "0"]);
        assert!(args.detector_config().is_err());
    }
}
