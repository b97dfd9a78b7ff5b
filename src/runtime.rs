use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    output::RecordSink,
    protocol::{
        decode_frame, format_hex_bytes, ByteSource, FrameCollector, FrameStatus, STARTUP_SETTLE,
    },
};

/// Per-status record counters for one monitoring session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub total: u64,
    pub ok: u64,
    pub bad_crc: u64,
    pub short_frame: u64,
    pub exception: u64,
}

impl FrameStats {
    pub fn record(&mut self, status: FrameStatus) {
        self.total += 1;
        match status {
            FrameStatus::Ok => self.ok += 1,
            FrameStatus::BadCrc => self.bad_crc += 1,
            FrameStatus::ShortFrame => self.short_frame += 1,
            FrameStatus::Exception => self.exception += 1,
        }
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames ({} ok, {} bad crc, {} short, {} exception)",
            self.total, self.ok, self.bad_crc, self.short_frame, self.exception
        )
    }
}

/// Read, classify and emit until `stop` is raised or the source fails.
///
/// The flag is only looked at between reads, so shutdown waits for at most
/// one silence window. Source and sink errors end the loop and are returned.
pub fn run<S, K>(
    collector: &mut FrameCollector<S>,
    sink: &mut K,
    stop: &AtomicBool,
) -> Result<FrameStats>
where
    S: ByteSource,
    K: RecordSink + ?Sized,
{
    let mut stats = FrameStats::default();
    collector.drain_stale(STARTUP_SETTLE)?;

    while !stop.load(Ordering::Relaxed) {
        let Some(frame) = collector.next_frame()? else {
            continue;
        };
        log::debug!(
            "Frame of {} bytes: {}",
            frame.len(),
            format_hex_bytes(&frame.bytes, " ")
        );
        let record = decode_frame(&frame);
        stats.record(record.status);
        sink.emit(&record)?;
    }

    log::info!("Monitoring stopped: {stats}");
    Ok(stats)
}
