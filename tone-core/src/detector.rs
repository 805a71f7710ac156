//! # Detection Loop
//!
//! Owns the dedicated worker thread that reads sample blocks, runs the
//! analysis pipeline and hands each estimate to a [`FrequencySink`].
//!
//! ## Lifecycle
//! `Idle` → `Running` → `Stopped`. `Stopped` is terminal.
//!
//! ## Threading
//! - **Caller thread**: `start()` / `stop()`; holds the [`Canceller`]
//! - **Worker thread**: opens the source, loops over blocks, closes the source
//! - **Hand-off**: the sink, in block order
//!
//! Nothing is locked. The worker owns the source, sink and transform; the
//! window coefficients are shared read-only and the cancel flag is atomic.

use crossbeam_channel::bounded;
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::analysis::ToneAnalyzer;
use crate::config::DetectorConfig;
use crate::error::{DetectorError, SourceError};
use crate::sink::FrequencySink;
use crate::source::{CancelToken, Canceller, SampleSource, cancellation};
use crate::window::HammingWindow;

/// Observable state of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Constructed, not started (or start failed).
    Idle,
    /// The worker is consuming blocks.
    Running,
    /// Terminal; the source has been released.
    Stopped,
}

enum Lifecycle<K> {
    Idle(K),
    Running(Worker),
    Stopped,
}

/// Worker thread management: cancel handle plus join handle.
struct Worker {
    canceller: Canceller,
    thread_handle: Option<JoinHandle<()>>,
}

/// What the worker reports back once it has tried to open the source.
type ReadySignal<K> = Result<(), (anyhow::Error, K)>;

/// A real-time single-tone frequency detector.
///
/// ```no_run
/// use tone_core::{ChannelSource, DetectorConfig, ToneDetector};
///
/// let (frames_tx, source) = ChannelSource::<f32>::unbounded();
/// let (results_tx, results_rx) = crossbeam_channel::unbounded::<f64>();
///
/// let mut detector = ToneDetector::new(DetectorConfig::default(), results_tx)?;
/// detector.start(move || Ok(source))?;
/// // ... a capture callback pushes 4096-sample frames into `frames_tx` ...
/// # drop(frames_tx);
/// for hz in results_rx.try_iter() {
///     println!("{hz:.1} Hz");
/// }
/// detector.stop();
/// # Ok::<(), tone_core::DetectorError>(())
/// ```
pub struct ToneDetector<K: FrequencySink> {
    config: DetectorConfig,
    window: Arc<HammingWindow>,
    lifecycle: Lifecycle<K>,
}

impl<K: FrequencySink> ToneDetector<K> {
    /// Validates the parameters and precomputes the window.
    ///
    /// No resources are acquired here; invalid parameters never yield a detector.
    pub fn new(config: DetectorConfig, sink: K) -> Result<Self, DetectorError> {
        config.validate()?;
        let window = Arc::new(HammingWindow::new(config.block_len)?);
        Ok(Self {
            config,
            window,
            lifecycle: Lifecycle::Idle(sink),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> DetectorState {
        match &self.lifecycle {
            Lifecycle::Idle(_) => DetectorState::Idle,
            Lifecycle::Running(worker) => {
                let finished = worker
                    .thread_handle
                    .as_ref()
                    .is_none_or(|handle| handle.is_finished());
                if finished {
                    DetectorState::Stopped
                } else {
                    DetectorState::Running
                }
            }
            Lifecycle::Stopped => DetectorState::Stopped,
        }
    }

    /// Spawns the worker and opens the sample source on it.
    ///
    /// `open_source` runs on the worker thread, so the source itself may hold
    /// handles that cannot cross threads. This call waits until the source is
    /// open.
    ///
    /// # Returns
    /// * `Ok(())` - The detector is `Running`
    /// * `Err(DetectorError::SourceInit(_))` - The source failed to open (or its opener panicked); the detector stays `Idle`
    /// * `Err(DetectorError::Io(_))` - The worker thread could not be spawned; the detector stays `Idle`
    /// * `Err(DetectorError::AlreadyStarted)` - `start` was already called successfully
    pub fn start<F, S>(&mut self, open_source: F) -> Result<(), DetectorError>
    where
        F: FnOnce() -> anyhow::Result<S> + Send + 'static,
        S: SampleSource + 'static,
    {
        let sink = match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(sink) => sink,
            other => {
                self.lifecycle = other;
                return Err(DetectorError::AlreadyStarted);
            }
        };

        let (canceller, token) = cancellation();
        let (sink_tx, sink_rx) = bounded::<K>(1);
        let (ready_tx, ready_rx) = bounded::<ReadySignal<K>>(1);
        let analyzer = ToneAnalyzer::with_window(self.config.clone(), Arc::clone(&self.window));

        // The sink is handed over only once the thread exists, so a failed spawn keeps it.
        let spawned = thread::Builder::new()
            .name("tone-detector".into())
            .spawn(move || {
                let Ok(sink) = sink_rx.recv() else {
                    return;
                };
                info!("[DETECTOR] Worker starting, opening sample source...");
                let opened = panic::catch_unwind(AssertUnwindSafe(open_source))
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("sample source opener panicked")));
                let source = match opened {
                    Ok(source) => source,
                    Err(e) => {
                        error!("[DETECTOR] Failed to open sample source: {:#}", e);
                        let _ = ready_tx.send(Err((e, sink)));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }
                run_detection_loop(source, sink, analyzer, &token);
            });

        let thread_handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("[DETECTOR] Failed to spawn worker: {}", e);
                self.lifecycle = Lifecycle::Idle(sink);
                return Err(DetectorError::Io(e));
            }
        };
        // Capacity 1 and the worker is alive, so this cannot fail.
        let _ = sink_tx.send(sink);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    "[DETECTOR] Running: {} Hz, {} samples per block ({:.2} Hz per bin)",
                    self.config.sample_rate,
                    self.config.block_len,
                    self.config.bin_width()
                );
                self.lifecycle = Lifecycle::Running(Worker {
                    canceller,
                    thread_handle: Some(thread_handle),
                });
                Ok(())
            }
            Ok(Err((e, sink))) => {
                let _ = thread_handle.join();
                self.lifecycle = Lifecycle::Idle(sink);
                Err(DetectorError::SourceInit(e))
            }
            Err(_) => {
                // The worker died outside the opener and took the sink with it.
                let _ = thread_handle.join();
                Err(DetectorError::SourceInit(anyhow::anyhow!(
                    "worker exited while opening the sample source"
                )))
            }
        }
    }

    /// Convenience for sources that are already constructed and `Send`.
    pub fn start_with<S>(&mut self, source: S) -> Result<(), DetectorError>
    where
        S: SampleSource + Send + 'static,
    {
        self.start(move || Ok(source))
    }

    /// Cancels the worker, unblocks any pending read and waits for it to exit.
    ///
    /// Idempotent. Stopping an `Idle` detector makes it `Stopped` as well.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(mut worker) => {
                info!("[DETECTOR] Stop requested, cancelling worker...");
                worker.canceller.cancel();
                if let Some(handle) = worker.thread_handle.take() {
                    if handle.join().is_err() {
                        error!("[DETECTOR] Worker thread panicked");
                    }
                }
                info!("[DETECTOR] Stopped");
            }
            Lifecycle::Idle(_) => debug!("[DETECTOR] Stopped before start"),
            Lifecycle::Stopped => {}
        }
    }
}

impl<K: FrequencySink> Drop for ToneDetector<K> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the worker: one iteration per block until cancelled.
fn run_detection_loop<S, K>(mut source: S, mut sink: K, mut analyzer: ToneAnalyzer, token: &CancelToken)
where
    S: SampleSource,
    K: FrequencySink,
{
    let block_len = analyzer.config().block_len;
    let mut block = vec![0.0; block_len];
    let mut delivered: u64 = 0;

    while !token.is_cancelled() {
        match source.read(&mut block, token) {
            Ok(0) => {
                debug!("[DETECTOR] Empty read, waiting for next block");
            }
            Ok(count) => {
                if token.is_cancelled() {
                    break;
                }
                if count < block_len {
                    block[count..].fill(0.0);
                }
                let Some(frequency) = analyzer.analyze(&block) else {
                    continue;
                };
                if sink.deliver(frequency, token).is_err() {
                    if !token.is_cancelled() {
                        warn!("[DETECTOR] Frequency sink disconnected, stopping");
                    }
                    break;
                }
                delivered += 1;
            }
            Err(SourceError::Cancelled) => break,
            Err(SourceError::Closed) => {
                info!("[DETECTOR] Sample source closed, stopping");
                break;
            }
            Err(SourceError::Read(msg)) => {
                warn!("[DETECTOR] Read failed, skipping block: {}", msg);
            }
        }
    }

    source.close();
    info!("[DETECTOR] Worker finished after {} estimates", delivered);
}
