//! Frame validation and the decoded record handed to sinks.
//!
//! A [`RawFrame`] is whatever the collector judged to be one silence-delimited
//! run of bytes. [`decode_frame`] turns it into exactly one [`DecodedRecord`];
//! it never fails, because bus garbage is something to report, not an error.

use bytes::Bytes;
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use strum::{Display, EnumString, IntoStaticStr};

use super::{
    crc::crc16_modbus,
    exception::{ExceptionCode, EXCEPTION_FLAG},
};

/// Frames shorter than this cannot hold slave id, function code and CRC.
pub const MIN_FRAME_LEN: usize = 5;

/// Timestamp layout used by the line format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// One silence-delimited byte run, stamped when the read that completed it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub bytes: Bytes,
    pub captured_at: DateTime<Local>,
}

impl RawFrame {
    pub fn new(bytes: impl Into<Bytes>, captured_at: DateTime<Local>) -> Self {
        Self {
            bytes: bytes.into(),
            captured_at,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Classification assigned to every frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
pub enum FrameStatus {
    #[strum(serialize = "NO")]
    #[serde(rename = "NO")]
    Ok,
    #[strum(serialize = "BAD_CRC")]
    #[serde(rename = "BAD_CRC")]
    BadCrc,
    #[strum(serialize = "SHORT_FRAME")]
    #[serde(rename = "SHORT_FRAME")]
    ShortFrame,
    #[strum(serialize = "EXCEPTION")]
    #[serde(rename = "EXCEPTION")]
    Exception,
}

/// The output unit: one per frame, never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
    pub status: FrameStatus,
    #[serde(rename = "frame", serialize_with = "serialize_frame")]
    pub raw_bytes: Bytes,
    pub slave_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionCode>,
}

impl DecodedRecord {
    fn unchecked(frame: &RawFrame, status: FrameStatus) -> Self {
        Self {
            timestamp: frame.captured_at,
            status,
            raw_bytes: frame.bytes.clone(),
            slave_id: 0,
            exception_code: None,
            exception: None,
        }
    }

    /// Render the `DATE=..;ERR=..;FRAME=..;SLAVE=..` line, without the newline.
    pub fn to_line(&self) -> String {
        format!(
            "DATE={};ERR={};FRAME={};SLAVE={}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.status,
            format_hex_bytes(&self.raw_bytes, "-"),
            self.slave_id
        )
    }
}

impl std::fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Classify one frame and extract its header fields.
pub fn decode_frame(frame: &RawFrame) -> DecodedRecord {
    let bytes = frame.bytes.as_ref();
    if bytes.len() < MIN_FRAME_LEN {
        return DecodedRecord::unchecked(frame, FrameStatus::ShortFrame);
    }

    let (payload, crc_bytes) = bytes.split_at(bytes.len() - 2);
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    let computed = crc16_modbus(payload);
    if received != computed {
        log::debug!("CRC mismatch: received {received:04X}, computed {computed:04X}");
        return DecodedRecord::unchecked(frame, FrameStatus::BadCrc);
    }

    let slave_id = payload[0];
    let function_code = payload[1];
    if function_code > EXCEPTION_FLAG {
        let code = payload[2];
        let exception = ExceptionCode::from_raw(code);
        log::debug!(
            "Exception response from slave {slave_id}: function {:02X}, code {code:02X} ({})",
            function_code & !EXCEPTION_FLAG,
            exception.map(<&'static str>::from).unwrap_or("unknown")
        );
        return DecodedRecord {
            slave_id,
            exception_code: Some(code),
            exception,
            ..DecodedRecord::unchecked(frame, FrameStatus::Exception)
        };
    }

    DecodedRecord {
        slave_id,
        ..DecodedRecord::unchecked(frame, FrameStatus::Ok)
    }
}

/// Convert a byte slice into uppercase two-digit hex tokens joined by `sep`.
pub fn format_hex_bytes(bytes: &[u8], sep: &str) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

fn serialize_frame<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_hex_bytes(bytes, "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::append_crc;
    use chrono::TimeZone;

    fn frame(bytes: &[u8]) -> RawFrame {
        let ts = Local
            .with_ymd_and_hms(2015, 11, 5, 17, 31, 27)
            .single()
            .unwrap()
            + chrono::Duration::milliseconds(977);
        RawFrame::new(bytes.to_vec(), ts)
    }

    #[test]
    fn test_ok_frame() {
        let rec = decode_frame(&frame(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x55, 0x09]));
        assert_eq!(rec.status, FrameStatus::Ok);
        assert_eq!(rec.slave_id, 1);
        assert_eq!(rec.exception_code, None);
        assert_eq!(
            rec.to_line(),
            "DATE=2015-11-05T17:31:27.977;ERR=NO;FRAME=01-03-50-00-00-04-55-09;SLAVE=1"
        );
    }

    #[test]
    fn test_bad_crc_hides_header() {
        let rec = decode_frame(&frame(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x00, 0x00]));
        assert_eq!(rec.status, FrameStatus::BadCrc);
        assert_eq!(rec.slave_id, 0);
        assert_eq!(rec.exception_code, None);
        assert!(rec.to_line().ends_with(";ERR=BAD_CRC;FRAME=01-03-50-00-00-04-00-00;SLAVE=0"));
    }

    #[test]
    fn test_short_frames() {
        for len in 0..MIN_FRAME_LEN {
            let bytes: Vec<u8> = (0..len as u8).map(|b| b + 0x11).collect();
            let rec = decode_frame(&frame(&bytes));
            assert_eq!(rec.status, FrameStatus::ShortFrame, "len {len}");
            assert_eq!(rec.slave_id, 0);
            assert_eq!(rec.exception_code, None);
        }
    }

    #[test]
    fn test_short_exception_is_short() {
        let rec = decode_frame(&frame(&[0x01, 0x83, 0x02]));
        assert_eq!(rec.status, FrameStatus::ShortFrame);
        assert_eq!(rec.slave_id, 0);
    }

    #[test]
    fn test_exception_frame() {
        let bytes = append_crc(&[0x11, 0x83, 0x02]);
        assert_eq!(bytes, vec![0x11, 0x83, 0x02, 0xC1, 0x34]);
        let rec = decode_frame(&frame(&bytes));
        assert_eq!(rec.status, FrameStatus::Exception);
        assert_eq!(rec.slave_id, 0x11);
        assert_eq!(rec.exception_code, Some(0x02));
        assert_eq!(rec.exception, Some(ExceptionCode::IllegalDataAddress));
        assert!(rec.to_line().ends_with(";ERR=EXCEPTION;FRAME=11-83-02-C1-34;SLAVE=17"));
    }

    #[test]
    fn test_unknown_exception_code_kept_raw() {
        let bytes = append_crc(&[0x05, 0x90, 0x42]);
        let rec = decode_frame(&frame(&bytes));
        assert_eq!(rec.status, FrameStatus::Exception);
        assert_eq!(rec.exception_code, Some(0x42));
        assert_eq!(rec.exception, None);
    }

    #[test]
    fn test_function_code_0x80_is_not_exception() {
        let bytes = append_crc(&[0x07, 0x80, 0x01]);
        let rec = decode_frame(&frame(&bytes));
        assert_eq!(rec.status, FrameStatus::Ok);
        assert_eq!(rec.slave_id, 7);
        assert_eq!(rec.exception_code, None);
    }

    #[test]
    fn test_crc_failure_regardless_of_content() {
        let mut bytes = append_crc(&[0x02, 0x81, 0x01, 0x00]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert_eq!(decode_frame(&frame(&bytes)).status, FrameStatus::BadCrc);
    }

    #[test]
    fn test_status_names_round_trip() {
        for status in [
            FrameStatus::Ok,
            FrameStatus::BadCrc,
            FrameStatus::ShortFrame,
            FrameStatus::Exception,
        ] {
            assert_eq!(status.to_string().parse::<FrameStatus>().unwrap(), status);
        }
        assert_eq!(FrameStatus::Ok.to_string(), "NO");
    }

    #[test]
    fn test_json_record() {
        let rec = decode_frame(&frame(&append_crc(&[0x11, 0x83, 0x02])));
        let json: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["timestamp"], "2015-11-05T17:31:27.977");
        assert_eq!(json["status"], "EXCEPTION");
        assert_eq!(json["frame"], "11-83-02-C1-34");
        assert_eq!(json["slave_id"], 17);
        assert_eq!(json["exception_code"], 2);
        assert_eq!(json["exception"], "IllegalDataAddress");

        let ok = decode_frame(&frame(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x55, 0x09]));
        let json: serde_json::Value = serde_json::to_value(&ok).unwrap();
        assert!(json.get("exception_code").is_none());
        assert!(json.get("exception").is_none());
    }

    #[test]
    fn test_empty_frame_hex() {
        let rec = decode_frame(&frame(&[]));
        assert_eq!(rec.status, FrameStatus::ShortFrame);
        assert!(rec.to_line().ends_with(";ERR=SHORT_FRAME;FRAME=;SLAVE=0"));
    }
}
