//! Raw PCM input: signed 16-bit little-endian mono samples from any reader.
//!
//! A helper thread performs the blocking reads and forwards whole blocks to a
//! [`ChannelSource`], so the detector can still be stopped while the reader
//! waits on a pipe.

use anyhow::Result;
use log::{debug, info, warn};
use std::io::{ErrorKind, Read};
use std::thread;
use tone_core::ChannelSource;

/// Blocks read ahead of the detector.
const READ_AHEAD_BLOCKS: usize = 4;

/// Spawns a reader thread decoding `reader` into `block_len`-sample blocks.
///
/// The final block may be short. At end of input the channel closes and the
/// detector stops on its own.
pub fn spawn_pcm_reader<R>(reader: R, block_len: usize) -> Result<ChannelSource<i16>>
where
    R: Read + Send + 'static,
{
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<i16>>(READ_AHEAD_BLOCKS);

    thread::Builder::new()
        .name("pcm-reader".into())
        .spawn(move || {
            let mut reader = reader;
            let mut bytes = vec![0u8; block_len * 2];
            loop {
                let filled = match fill_buffer(&mut reader, &mut bytes) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("[PCM] Read error, closing input: {}", e);
                        break;
                    }
                };
                let block: Vec<i16> = bytes[..filled - filled % 2]
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                let at_eof = filled < bytes.len();
                if !block.is_empty() && frame_tx.send(block).is_err() {
                    debug!("[PCM] Detector gone, stopping reader");
                    break;
                }
                if at_eof {
                    info!("[PCM] End of input");
                    break;
                }
            }
        })?;

    Ok(ChannelSource::new(frame_rx))
}

/// Reads until `buf` is full or the reader hits end of input.
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
