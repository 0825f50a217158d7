//! Fixed-point and encoded numeric conversions
//!
//! Battery monitor readings, run-hour counters and serial numbers reported
//! by CS1108 controllers, plus GPS fixed-point fields.

// ============================================================================
// CS1108 Conversions
// ============================================================================

/// Full scale of the CS1108 voltage ADC (2^24)
const VOLTAGE_FULL_SCALE: f64 = 16_777_216.0;

/// Marker expected in the top nibble of a programmed serial number
const SERIAL_MARKER: u8 = 0x20;

/// Convert a raw CS1108 battery reading to volts
pub fn cs1108_voltage(raw: u16) -> f64 {
    f64::from(raw) * 1469.0 / 3.0 / VOLTAGE_FULL_SCALE * 24.0
}

/// Combine the fractional (1/65536) and integer hour words, one decimal place
pub fn cs1108_hours(fraction: u16, hours: u16) -> f64 {
    let total = f64::from(hours) + f64::from(fraction) / 65536.0;
    (total * 10.0).round() / 10.0
}

/// Decode a 4-byte CS1108 serial number
///
/// Valid serials carry `0x2` in the top nibble of the first byte and render
/// as `S` followed by the 7-digit decimal of the remaining 24 bits. Anything
/// else is an unprogrammed serial and renders as an empty string.
pub fn cs1108_serial(bytes: &[u8; 4]) -> String {
    if bytes[0] & 0xF0 != SERIAL_MARKER {
        return String::new();
    }
    let n = u32::from(bytes[1]) * 65536 + u32::from(bytes[2]) * 256 + u32::from(bytes[3]);
    format!("S{:07}", n)
}

// ============================================================================
// GPS Conversions
// ============================================================================

/// Degrees from a 1e-7 fixed-point coordinate
pub fn coordinate_degrees(raw: i32) -> f64 {
    f64::from(raw) / 10_000_000.0
}

/// Horizontal position error from centimetres
pub fn ehpe_metres(raw: u32) -> f64 {
    f64::from(raw) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage() {
        assert_eq!(cs1108_voltage(0), 0.0);
        // 0x8000 is half of the 16-bit range, well below full ADC scale
        let v = cs1108_voltage(0x8000);
        let expected = 32768.0 * 1469.0 / 3.0 / 16_777_216.0 * 24.0;
        assert!((v - expected).abs() < 1e-9);
    }

    #[test]
    fn test_hours_rounding() {
        assert_eq!(cs1108_hours(0, 12), 12.0);
        assert_eq!(cs1108_hours(32768, 12), 12.5);
        // 0.96 rounds up to the next hour
        assert_eq!(cs1108_hours(62915, 1), 2.0);
    }

    #[test]
    fn test_serial() {
        assert_eq!(cs1108_serial(&[0x2A, 0x00, 0x30, 0x39]), "S0012345");
        assert_eq!(cs1108_serial(&[0x20, 0x98, 0x96, 0x7F]), "S9999999");
        assert_eq!(cs1108_serial(&[0x10, 0x00, 0x30, 0x39]), "");
        assert_eq!(cs1108_serial(&[0xFF, 0xFF, 0xFF, 0xFF]), "");
    }

    #[test]
    fn test_gps_fixed_point() {
        assert!((coordinate_degrees(-1_234_567_890) - -123.456_789).abs() < 1e-9);
        assert_eq!(ehpe_metres(250), 2.5);
    }
}
