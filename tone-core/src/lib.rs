// tone-core/src/lib.rs

//! The core logic for the single-tone frequency detector.
//! This crate is responsible for windowing, spectral analysis, peak picking
//! and the detection worker. It performs no audio device management; callers
//! hand it a sample source and a result sink.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod sink;
pub mod source;
pub mod window;

pub use analysis::ToneAnalyzer;
pub use config::{DetectorConfig, PeakInterpolation};
pub use detector::{DetectorState, ToneDetector};
pub use error::{DetectorError, SinkError, SourceError};
pub use sink::{CallbackSink, FrequencySink};
pub use source::{CancelToken, Canceller, ChannelSource, SampleSource, cancellation};
pub use window::HammingWindow;
