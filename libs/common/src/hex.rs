//! Hex encoding utility
//! Used for TX/RX frame dumps

use std::fmt::Write;

/// Encode bytes as space separated uppercase pairs
/// Example: [0x12, 0x34, 0xAB] -> "12 34 AB"
pub fn encode_spaced(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            result.push(' ');
        }
        // Writing to String buffer is infallible - no need for expect
        let _ = write!(&mut result, "{:02X}", byte);
    }
    result
}
