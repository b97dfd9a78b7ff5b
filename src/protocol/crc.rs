/// Reflected form of the CRC-16/MODBUS polynomial 0x8005.
pub const CRC16_POLY: u16 = 0xA001;

/// Compute the CRC-16/MODBUS checksum of `data` (init 0xFFFF, reflected).
///
/// On the wire the checksum trails the payload low byte first, so compare
/// against `u16::from_le_bytes([frame[n - 2], frame[n - 1]])`.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in data {
        crc ^= b as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc >>= 1;
                crc ^= CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the little-endian CRC of `payload` and return the complete RTU frame.
pub fn append_crc(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc16_modbus(payload).to_le_bytes());
    frame
}
