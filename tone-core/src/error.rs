//! Error types for the tone detector.

use thiserror::Error;

/// Errors raised while constructing or driving a [`ToneDetector`](crate::detector::ToneDetector).
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The Hamming formula divides by `N - 1`, so blocks need at least two samples.
    #[error("block length must be at least 2 samples (got {0})")]
    InvalidBlockLength(usize),

    #[error("sample rate must be greater than 0 Hz (got {0})")]
    InvalidSampleRate(u32),

    /// The sample source could not be acquired when the detector started.
    #[error("sample source failed to initialize: {0:#}")]
    SourceInit(anyhow::Error),

    #[error("detector has already been started")]
    AlreadyStarted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Config(#[from] serde_json::Error),
}

/// Outcome of a failed [`SampleSource::read`](crate::source::SampleSource::read).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The producer side is gone for good; no more blocks will arrive.
    #[error("sample source closed")]
    Closed,

    /// The read was abandoned because the detector is stopping.
    #[error("read cancelled")]
    Cancelled,

    /// A single read failed. The loop skips this block and tries the next one.
    #[error("read failed: {0}")]
    Read(String),
}

/// The consumer of frequency estimates has gone away.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("frequency sink disconnected")]
pub struct SinkError;
