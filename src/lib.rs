//! rtutap — passive Modbus RTU bus monitor
//!
//! The monitor never transmits. It splits the raw byte stream of a serial line
//! into frames using inter-frame silence, checks each frame's CRC16 and emits
//! one classified record per frame:
//!
//! ```text
//! byte source -> FrameCollector -> RawFrame -> decode_frame -> DecodedRecord -> sink
//! ```
//!
//! The binary wires a serial port and a line-oriented writer to this pipeline.
//! Embedders can supply their own [`protocol::ByteSource`] and
//! [`output::RecordSink`] and call [`runtime::run`] directly.

#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod output;
pub mod protocol;
pub mod runtime;
pub mod utils;

pub use output::{OutputFormat, OutputSink, RecordSink, RecordWriter};
pub use protocol::{
    decode_frame, ByteSource, DecodedRecord, FrameCollector, FrameStatus, RawFrame, SnifferConfig,
};
pub use runtime::{run, FrameStats};
