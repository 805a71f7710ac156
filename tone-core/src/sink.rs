//! Result sinks: where the detection loop hands off each frequency estimate.

use crossbeam_channel::Sender;

use crate::error::SinkError;
use crate::source::CancelToken;

/// Receives one frequency estimate (Hz) per analysed block, in block order.
///
/// `deliver` runs on the detection worker. A sink that can block must give up
/// once `cancel` fires so that stopping the detector stays bounded.
/// Returning an error tells the loop to stop.
pub trait FrequencySink: Send + 'static {
    fn deliver(&mut self, frequency_hz: f64, cancel: &CancelToken) -> Result<(), SinkError>;
}

/// Sends each estimate over a crossbeam channel, e.g. to a UI thread.
///
/// With a bounded channel the loop waits for room rather than dropping
/// estimates, until the consumer goes away or the detector is stopped.
impl FrequencySink for Sender<f64> {
    fn deliver(&mut self, frequency_hz: f64, cancel: &CancelToken) -> Result<(), SinkError> {
        if cancel.is_cancelled() {
            return Err(SinkError);
        }
        let tx: &Sender<f64> = self;
        crossbeam_channel::select! {
            send(tx, frequency_hz) -> res => res.map_err(|_| SinkError),
            recv(cancel.wake_signal()) -> _ => Err(SinkError),
        }
    }
}

/// Adapts a closure into a sink.
pub struct CallbackSink<F>(pub F);

impl<F> FrequencySink for CallbackSink<F>
where
    F: FnMut(f64) + Send + 'static,
{
    fn deliver(&mut self, frequency_hz: f64, _cancel: &CancelToken) -> Result<(), SinkError> {
        (self.0)(frequency_hz);
        Ok(())
    }
}
