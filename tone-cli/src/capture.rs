//! # Microphone Capture
//!
//! Sample source backed by the default input device via CPAL.
//! The stream callback re-chunks device buffers into detector-sized blocks
//! and hands them over a channel to a [`ChannelSource`].
//!
//! The CPAL stream cannot move between threads on every platform, so
//! [`open_microphone`] must run on the detection worker (it is passed to
//! `ToneDetector::start` as the source opener).

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};
use tone_core::{CancelToken, ChannelSource, SampleSource, SourceError};

/// Blocks buffered between the callback and the detector before frames are dropped.
const CAPTURE_QUEUE_BLOCKS: usize = 8;

/// Live microphone input delivering `block_len`-sample mono blocks.
pub struct MicrophoneSource {
    stream: Option<cpal::Stream>,
    frames: ChannelSource<f32>,
}

/// Opens the default input device at exactly `sample_rate` Hz.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration that supports the requested rate
/// 3. Starts a stream whose callback downmixes to mono and sends full blocks
///
/// # Returns
/// * `Ok(source)` - Capture is running
/// * `Err(e)` - No device, no matching format, or the stream failed to start
pub fn open_microphone(sample_rate: u32, block_len: usize) -> Result<MicrophoneSource> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("[CAPTURE] Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("failed to query input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, sample_rate).ok_or_else(|| {
        anyhow!(
            "No f32 input format supporting {} Hz found. Pick another rate with --sample-rate.",
            sample_rate
        )
    })?;

    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    info!(
        "[CAPTURE] Selected {} Hz, {} channel(s), {} samples per block",
        sample_rate, channels, block_len
    );

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(CAPTURE_QUEUE_BLOCKS);
    let err_fn = |err| error!("[CAPTURE] An error occurred on the audio stream: {}", err);

    // This buffer accumulates mono samples from the callback.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(block_len * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );

            // While we have enough data for a full block, send it.
            while audio_buffer.len() >= block_len {
                let block: Vec<f32> = audio_buffer.drain(..block_len).collect();
                if frame_tx.try_send(block).is_err() {
                    debug!("[CAPTURE] Detector queue full, dropping block");
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(MicrophoneSource {
        stream: Some(stream),
        frames: ChannelSource::new(frame_rx),
    })
}

impl SampleSource for MicrophoneSource {
    fn read(&mut self, block: &mut [f64], cancel: &CancelToken) -> Result<usize, SourceError> {
        self.frames.read(block, cancel)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!("[CAPTURE] Stopping stream...");
            if let Err(e) = stream.pause() {
                warn!("[CAPTURE] Error pausing stream: {}", e);
            }
            drop(stream);
        }
    }
}

/// Finds an f32 input configuration whose rate range contains `target_rate`.
///
/// Mono configurations are preferred; otherwise the one with the fewest channels wins.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
}
