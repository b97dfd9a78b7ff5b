//! Silence-delimited frame collection.
//!
//! RTU has no start or stop bytes, so a frame ends when the line stays quiet
//! for longer than the silence threshold. The source's read timeout *is* that
//! threshold: bytes are gathered across reads until one comes back empty.
//!
//! A frame is capped at [`CHUNK_SIZE`] bytes. Longer bursts are cut into
//! independent frames with no reassembly; RTU carries no length prefix to
//! reassemble against, and the cut points are part of what a monitor shows.

use anyhow::{Context, Result};
use chrono::Local;
use std::{io, time::Duration};

use super::{frame::RawFrame, source::ByteSource};

/// Upper bound on bytes gathered into one frame.
pub const CHUNK_SIZE: usize = 256;

/// Wait before the startup drain so bytes already in flight land in the driver buffer.
pub const STARTUP_SETTLE: Duration = Duration::from_millis(100);

pub struct FrameCollector<S: ByteSource> {
    source: S,
    drained: bool,
}

impl<S: ByteSource> FrameCollector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            drained: false,
        }
    }

    /// Discard traffic buffered before start-up. Only the first call has any effect.
    pub fn drain_stale(&mut self, settle: Duration) -> Result<()> {
        if self.drained {
            return Ok(());
        }
        std::thread::sleep(settle);
        self.source
            .discard_input()
            .context("Failed to discard buffered input")?;
        self.drained = true;
        log::debug!("Discarded residual input after {settle:?} settle");
        Ok(())
    }

    /// Gather one frame. `Ok(None)` means the line was silent for a whole window.
    ///
    /// A read interrupted by a signal ends the window like silence does, so the
    /// caller gets to look at its stop flag.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut filled = 0;
        while filled < CHUNK_SIZE {
            let n = match self.source.read_window(&mut chunk[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    log::debug!("Read interrupted after {filled} bytes");
                    0
                }
                Err(e) => return Err(e).context("Serial read failed"),
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled == CHUNK_SIZE {
            log::debug!("Frame reached {CHUNK_SIZE} bytes, cutting without waiting for silence");
        }
        Ok(Some(RawFrame::new(chunk[..filled].to_vec(), Local::now())))
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
