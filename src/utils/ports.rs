use anyhow::{Context, Result};
use serde::Serialize;
use serialport::SerialPortType;

/// A serial device the user could point the monitor at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub name: String,
    pub kind: String,
}

/// Return the available ports sorted by name, duplicates removed.
pub fn enumerate_ports() -> Result<Vec<PortEntry>> {
    let mut ports: Vec<PortEntry> = serialport::available_ports()
        .context("Failed to enumerate serial ports")?
        .into_iter()
        .map(|p| PortEntry {
            kind: describe_port_type(&p.port_type),
            name: p.port_name,
        })
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    ports.dedup_by(|a, b| a.name == b.name);
    Ok(ports)
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let mut s = format!("USB {:04x}:{:04x}", info.vid, info.pid);
            if let Some(product) = &info.product {
                s.push(' ');
                s.push_str(product);
            }
            s
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}
