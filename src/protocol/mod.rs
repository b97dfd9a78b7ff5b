pub mod collector;
pub mod config;
pub mod crc;
pub mod exception;
pub mod frame;
pub mod source;

pub use collector::{FrameCollector, CHUNK_SIZE, STARTUP_SETTLE};
pub use config::{derive_silence_threshold, Parity, SnifferConfig, StopBits};
pub use crc::{append_crc, crc16_modbus};
pub use exception::ExceptionCode;
pub use frame::{decode_frame, format_hex_bytes, DecodedRecord, FrameStatus, RawFrame};
pub use source::{open_serial, ByteSource};
