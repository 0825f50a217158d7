//! String forms of device addresses and register values

use crate::error::{AcnError, Result};

/// Length of an IEEE long (MAC) address
pub const MAC_LEN: usize = 8;

/// Render `bytes` as colon-separated, zero-padded lowercase hex
///
/// Example: `[0x00, 0x0A, 0xFF]` → `"00:0a:ff"`
pub fn mac_to_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse a colon-separated 8-byte MAC string
pub fn string_to_mac(s: &str) -> Result<[u8; MAC_LEN]> {
    let tokens: Vec<&str> = s.split(':').collect();
    if tokens.len() != MAC_LEN {
        return Err(AcnError::encoding(format!(
            "MAC address must have {} bytes, got {}: '{}'",
            MAC_LEN,
            tokens.len(),
            s
        )));
    }

    let mut mac = [0u8; MAC_LEN];
    for (slot, token) in mac.iter_mut().zip(tokens) {
        if token.is_empty() || token.len() > 2 {
            return Err(AcnError::encoding(format!("Invalid MAC byte '{}'", token)));
        }
        *slot = u8::from_str_radix(token, 16)
            .map_err(|_| AcnError::encoding(format!("Invalid MAC byte '{}'", token)))?;
    }
    Ok(mac)
}

/// Render a 16-bit network address as 4 lowercase hex digits
pub fn short_address_to_string(value: u16) -> String {
    format!("{:04x}", value)
}

/// Display form of a hex register, e.g. `0x00FF`
pub fn hex16_to_string(value: u16) -> String {
    format!("0x{:04X}", value)
}

/// Parse a hex register value, with or without the `0x` prefix
pub fn string_to_hex16(s: &str) -> Result<u16> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16)
        .map_err(|_| AcnError::encoding(format!("Invalid 16-bit hex value '{}'", s)))
}

/// Parse a number that may be written in decimal or with a `0x` prefix
pub fn parse_number(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_mac_round_trip() {
        let s = "00:13:a2:00:40:0a:0b:ff";
        let mac = string_to_mac(s).unwrap();
        assert_eq!(mac, [0x00, 0x13, 0xA2, 0x00, 0x40, 0x0A, 0x0B, 0xFF]);
        assert_eq!(mac_to_string(&mac), s);

        // uppercase input is accepted, output is canonical lowercase
        let mac = string_to_mac("00:13:A2:00:40:0A:0B:FF").unwrap();
        assert_eq!(mac_to_string(&mac), s);
    }

    #[test]
    fn test_mac_round_trip_all_byte_values() {
        for seed in 0..=255u8 {
            // the first byte walks every value
            let mac: [u8; MAC_LEN] = std::array::from_fn(|i| {
                seed.wrapping_mul(31)
                    .wrapping_add((i as u8).wrapping_mul(seed | 1))
            });
            let text = mac_to_string(&mac);
            assert_eq!(text.len(), MAC_LEN * 3 - 1);
            assert_eq!(string_to_mac(&text).unwrap(), mac, "{}", text);
            assert_eq!(string_to_mac(&text.to_uppercase()).unwrap(), mac);
        }
    }

    #[test]
    fn test_mac_rejects_wrong_token_count() {
        assert!(matches!(
            string_to_mac("00:11:22:33:44:55:66"),
            Err(AcnError::Encoding(_))
        ));
        assert!(string_to_mac("00:11:22:33:44:55:66:77:88").is_err());
        assert!(string_to_mac("").is_err());
        assert!(string_to_mac("00:11:22:33:44:55:66:zz").is_err());
        assert!(string_to_mac("00:11:22:33:44:55:66:123").is_err());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address_to_string(0x1234), "1234");
        assert_eq!(short_address_to_string(0xABCD), "abcd");
        assert_eq!(short_address_to_string(0x000F), "000f");
    }

    #[test]
    fn test_hex16() {
        assert_eq!(hex16_to_string(0x00FF), "0x00FF");
        assert_eq!(string_to_hex16("0x00FF").unwrap(), 0xFF);
        assert_eq!(string_to_hex16("ff").unwrap(), 0xFF);
        assert_eq!(string_to_hex16("0XbEeF").unwrap(), 0xBEEF);
        assert!(string_to_hex16("0x10000").is_err());
        assert!(string_to_hex16("xyz").is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0x2A"), Some(42));
        assert_eq!(parse_number("abc"), None);
    }
}
