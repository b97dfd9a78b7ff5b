use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Duration};

use strum::{Display, EnumIter, EnumString};

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Start + 8 data + parity/stop, the RTU character frame.
pub const BITS_PER_CHAR: f64 = 11.0;
/// Minimum inter-frame silence in character times.
pub const SILENT_CHARS: f64 = 3.5;
/// Margin on top of the silent interval for serial driver jitter.
pub const SAFETY_MARGIN: f64 = 1.3;

/// Line parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(try_from = "String")]
pub enum Parity {
    #[default]
    #[strum(to_string = "none", serialize = "n")]
    None,
    #[strum(to_string = "even", serialize = "e")]
    Even,
    #[strum(to_string = "odd", serialize = "o")]
    Odd,
    #[strum(to_string = "mark", serialize = "m")]
    Mark,
    #[strum(to_string = "space", serialize = "s")]
    Space,
}

impl TryFrom<String> for Parity {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value
            .parse()
            .map_err(|_| anyhow!("Invalid parity '{value}'. Use none, even, odd, mark or space"))
    }
}

/// Stop bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, Deserialize)]
#[serde(try_from = "f64")]
pub enum StopBits {
    #[default]
    One,
    OneAndHalf,
    Two,
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopBits::One => write!(f, "1"),
            StopBits::OneAndHalf => write!(f, "1.5"),
            StopBits::Two => write!(f, "2"),
        }
    }
}

impl FromStr for StopBits {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OneAndHalf),
            "2" => Ok(StopBits::Two),
            other => Err(anyhow!("Invalid stop bits '{other}'. Use 1, 1.5 or 2")),
        }
    }
}

impl TryFrom<f64> for StopBits {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self> {
        if value == 1.0 {
            Ok(StopBits::One)
        } else if value == 1.5 {
            Ok(StopBits::OneAndHalf)
        } else if value == 2.0 {
            Ok(StopBits::Two)
        } else {
            Err(anyhow!("Invalid stop bits {value}. Use 1, 1.5 or 2"))
        }
    }
}

/// Everything needed to open the bus and delimit frames on it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnifferConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default)]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
    /// Explicit inter-frame silence in seconds; replaces the baud-derived value
    #[serde(default)]
    pub timeout: Option<f64>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: None,
        }
    }
}

impl SnifferConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).context("Invalid sniffer configuration")
    }

    /// Read configuration from a file
    pub fn from_file(file_path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {file_path}"))?;
        Self::from_json(&content).with_context(|| format!("In config file {file_path}"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(anyhow!("No serial device given"));
        }
        if self.baud_rate == 0 {
            return Err(anyhow!("Baud rate must be greater than zero"));
        }
        if let Some(secs) = self.timeout {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(anyhow!("Timeout must be a positive number of seconds, got {secs}"));
            }
        }
        Ok(())
    }

    /// Inter-frame silence used as the read timeout.
    pub fn silence_threshold(&self) -> Duration {
        let derived = derive_silence_threshold(self.baud_rate);
        match self.timeout {
            Some(secs) => Duration::try_from_secs_f64(secs).unwrap_or(derived),
            None => derived,
        }
    }
}

/// 3.5 character times at `baud_rate`, plus the safety margin.
pub fn derive_silence_threshold(baud_rate: u32) -> Duration {
    let secs = BITS_PER_CHAR * SILENT_CHARS * SAFETY_MARGIN / baud_rate.max(1) as f64;
    Duration::from_secs_f64(secs)
}
