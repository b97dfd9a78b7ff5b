use anyhow::{anyhow, Context, Result};
use std::io::{self, Read};

use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, SerialPortBuilder};

use super::config::{Parity, SnifferConfig, StopBits};

/// Where the collector gets its bytes from.
///
/// `read_window` blocks until at least one byte is available or the silence
/// threshold elapses, returning `Ok(0)` for silence. `Interrupted` ends the
/// window early; any other `Err` is fatal.
pub trait ByteSource {
    fn read_window(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drop whatever the driver has buffered but not yet delivered.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_window(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_window(buf)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

impl ByteSource for dyn SerialPort {
    fn read_window(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

fn driver_parity(parity: Parity) -> Result<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Mark | Parity::Space => Err(anyhow!(
            "Parity '{parity}' is not supported by the serial driver"
        )),
    }
}

fn driver_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OneAndHalf => Err(anyhow!(
            "{stop_bits} stop bits are not supported by the serial driver"
        )),
    }
}

/// Apply line settings to a port builder. The silence threshold becomes the read timeout.
pub fn apply_builder(cfg: &SnifferConfig, b: SerialPortBuilder) -> Result<SerialPortBuilder> {
    Ok(b.data_bits(DataBits::Eight)
        .parity(driver_parity(cfg.parity)?)
        .stop_bits(driver_stop_bits(cfg.stop_bits)?)
        .flow_control(FlowControl::None)
        .timeout(cfg.silence_threshold()))
}

/// Open the configured device for passive reading.
pub fn open_serial(cfg: &SnifferConfig) -> Result<Box<dyn SerialPort>> {
    cfg.validate()?;
    let builder = apply_builder(cfg, serialport::new(cfg.device.as_str(), cfg.baud_rate))?;
    let port = builder
        .open()
        .with_context(|| format!("Failed to open port {}", cfg.device))?;

    log::info!(
        "Opened {} (baud={}, parity={}, stop_bits={}, silence={:?})",
        cfg.device,
        cfg.baud_rate,
        cfg.parity,
        cfg.stop_bits,
        cfg.silence_threshold()
    );
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_mapping() {
        assert_eq!(driver_parity(Parity::Even).unwrap(), serialport::Parity::Even);
        assert_eq!(driver_parity(Parity::None).unwrap(), serialport::Parity::None);
        assert!(driver_parity(Parity::Mark).is_err());
        assert!(driver_parity(Parity::Space).is_err());

        assert_eq!(driver_stop_bits(StopBits::Two).unwrap(), serialport::StopBits::Two);
        assert!(driver_stop_bits(StopBits::OneAndHalf).is_err());
    }

    #[test]
    fn test_open_rejects_unsupported_settings_before_touching_device() {
        let cfg = SnifferConfig {
            parity: Parity::Mark,
            ..SnifferConfig::new("/dev/rtutap-does-not-exist")
        };
        let err = open_serial(&cfg).err().expect("mark parity must be rejected");
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_open_missing_device_fails() {
        let err = open_serial(&SnifferConfig::new("/dev/rtutap-does-not-exist"))
            .err()
            .expect("missing device must fail");
        assert!(format!("{err:#}").contains("/dev/rtutap-does-not-exist"));
    }
}
