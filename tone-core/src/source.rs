//! # Sample Source Module
//!
//! The detection loop pulls fixed-length blocks from a [`SampleSource`]. Reads
//! may block waiting for audio, so every read also receives a [`CancelToken`]
//! which wakes it up when the detector is stopped.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SourceError;

/// Creates a linked cancel handle and token.
///
/// The [`Canceller`] stays with the controlling thread; the [`CancelToken`]
/// goes to the worker and any source it reads from.
pub fn cancellation() -> (Canceller, CancelToken) {
    let flag = Arc::new(AtomicBool::new(false));
    let (tx, rx) = crossbeam_channel::bounded(0);
    (
        Canceller {
            flag: Arc::clone(&flag),
            wake_tx: Some(tx),
        },
        CancelToken { flag, wake_rx: rx },
    )
}

/// Controlling side of a cancellation pair.
#[derive(Debug)]
pub struct Canceller {
    flag: Arc<AtomicBool>,
    wake_tx: Option<Sender<()>>,
}

impl Canceller {
    /// Raises the flag and disconnects the wake channel.
    ///
    /// Disconnection makes every pending and future `recv` on the token's
    /// channel return at once, so blocked reads are released. Calling this
    /// more than once is a no-op.
    pub fn cancel(&mut self) {
        self.flag.store(true, Ordering::Release);
        self.wake_tx.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Worker side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Channel that becomes ready (disconnected) on cancellation.
    ///
    /// Blocking sources put this in a `crossbeam_channel::select!` next to
    /// their data channel.
    pub fn wake_signal(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}

/// A supplier of audio sample blocks.
///
/// Sources are created on the detection worker, so they do not need to be
/// `Send`. This lets platform stream handles live inside a source.
pub trait SampleSource {
    /// Fills `block` with up to `block.len()` samples, blocking until data
    /// arrives, the source closes, or `cancel` fires.
    ///
    /// # Returns
    /// * `Ok(count)` - Number of samples written; `0` means no data this call
    /// * `Err(SourceError::Cancelled)` - The detector is stopping
    /// * `Err(SourceError::Closed)` - No more data will ever arrive
    /// * `Err(SourceError::Read(_))` - This read failed; the next one may succeed
    fn read(&mut self, block: &mut [f64], cancel: &CancelToken) -> Result<usize, SourceError>;

    /// Releases the underlying resource. Called once when the loop stops.
    fn close(&mut self) {}
}

/// A source fed by frames sent over a crossbeam channel.
///
/// Typical producers are a capture callback sending `Vec<f32>` frames or a
/// reader thread decoding 16-bit PCM into `Vec<i16>`. Each received frame is
/// one block; frames longer than the block are truncated.
pub struct ChannelSource<T> {
    frames: Receiver<Vec<T>>,
}

impl<T> ChannelSource<T>
where
    T: Copy + Into<f64>,
{
    pub fn new(frames: Receiver<Vec<T>>) -> Self {
        Self { frames }
    }

    /// Creates the sending half together with the source.
    pub fn unbounded() -> (Sender<Vec<T>>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self::new(rx))
    }
}

impl<T> SampleSource for ChannelSource<T>
where
    T: Copy + Into<f64>,
{
    fn read(&mut self, block: &mut [f64], cancel: &CancelToken) -> Result<usize, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        crossbeam_channel::select! {
            recv(self.frames) -> msg => match msg {
                Ok(frame) => {
                    if frame.len() > block.len() {
                        debug!(
                            "[SOURCE] Frame of {} samples truncated to {}",
                            frame.len(),
                            block.len()
                        );
                    }
                    let count = frame.len().min(block.len());
                    for (dst, &src) in block.iter_mut().zip(frame.iter()) {
                        *dst = src.into();
                    }
                    Ok(count)
                }
                Err(_) => Err(SourceError::Closed),
            },
            recv(cancel.wake_signal()) -> _ => Err(SourceError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_reads_and_converts_frames() {
        let (tx, mut source) = ChannelSource::<i16>::unbounded();
        let (_canceller, token) = cancellation();
        tx.send(vec![1, -2, 3]).unwrap();

        let mut block = [0.0; 4];
        assert_eq!(source.read(&mut block, &token), Ok(3));
        assert_eq!(&block[..3], &[1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_truncates_long_frames() {
        let (tx, mut source) = ChannelSource::<f32>::unbounded();
        let (_canceller, token) = cancellation();
        tx.send(vec![0.5; 10]).unwrap();

        let mut block = [0.0; 4];
        assert_eq!(source.read(&mut block, &token), Ok(4));
        assert!(block.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_empty_frame_reads_zero() {
        let (tx, mut source) = ChannelSource::<f64>::unbounded();
        let (_canceller, token) = cancellation();
        tx.send(Vec::new()).unwrap();

        let mut block = [0.0; 4];
        assert_eq!(source.read(&mut block, &token), Ok(0));
    }

    #[test]
    fn test_dropped_producer_closes() {
        let (tx, mut source) = ChannelSource::<f64>::unbounded();
        let (_canceller, token) = cancellation();
        drop(tx);

        let mut block = [0.0; 4];
        assert_eq!(source.read(&mut block, &token), Err(SourceError::Closed));
    }

    #[test]
    fn test_cancel_unblocks_pending_read() {
        let (_tx, mut source) = ChannelSource::<f64>::unbounded();
        let (mut canceller, token) = cancellation();

        let reader = thread::spawn(move || {
            let mut block = [0.0; 4];
            source.read(&mut block, &token)
        });

        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        canceller.cancel();
        let result = reader.join().unwrap();

        assert_eq!(result, Err(SourceError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (mut canceller, token) = cancellation();
        assert!(!token.is_cancelled());
        canceller.cancel();
        canceller.cancel();
        assert!(canceller.is_cancelled());
        assert!(token.is_cancelled());
    }
}
