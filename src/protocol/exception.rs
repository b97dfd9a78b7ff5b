use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use strum::{Display, IntoStaticStr};

/// Bit set on the echoed function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Standard Modbus exception codes carried in byte 2 of an exception response.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    Display,
    IntoStaticStr,
    Serialize,
)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetNoResponse = 0x0B,
}

impl ExceptionCode {
    /// Look up a raw code; vendor-specific codes yield `None`.
    pub fn from_raw(code: u8) -> Option<Self> {
        Self::try_from(code).ok()
    }
}
