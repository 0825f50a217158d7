//! Bit-level operations on status and capability fields
//!
//! Decoding is total: every input value yields a defined result and
//! reserved bits are ignored.

/// Extract single bit from u16 value
#[inline]
pub fn extract_bit_u16(value: u16, bit_index: u8) -> bool {
    debug_assert!(bit_index < 16, "Bit index out of range: {}", bit_index);
    (value & (1 << bit_index)) != 0
}

/// Extract single bit from u8 value
#[inline]
pub fn extract_bit_u8(value: u8, bit_index: u8) -> bool {
    debug_assert!(bit_index < 8, "Bit index out of range: {}", bit_index);
    (value & (1 << bit_index)) != 0
}

/// Test a mask against a status byte
#[inline]
pub fn has_flag(value: u8, mask: u8) -> bool {
    (value & mask) != 0
}

/// Extract a multi-bit field: `(value & mask) >> shift`
#[inline]
pub fn extract_field(value: u16, mask: u16, shift: u8) -> u16 {
    (value & mask) >> shift
}

/// Expand a u16 into 16 bools, bit 0 first
pub fn u16_to_bool_array(value: u16) -> [bool; 16] {
    let mut bits = [false; 16];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = extract_bit_u16(value, i as u8);
    }
    bits
}

/// Expand a u8 into 8 bools, bit 0 first
pub fn u8_to_bool_array(value: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = extract_bit_u8(value, i as u8);
    }
    bits
}

/// Pack up to 16 bools (bit 0 first) into a u16
///
/// Returns `None` when more than 16 bits are supplied.
pub fn bool_array_to_u16(bits: &[bool]) -> Option<u16> {
    if bits.len() > 16 {
        return None;
    }
    Some(
        bits.iter()
            .enumerate()
            .fold(0u16, |acc, (i, &b)| if b { acc | (1 << i) } else { acc }),
    )
}
