//! Byte order of multi-byte fields
//!
//! Holding registers travel as big-endian words, while the fields packed
//! inside device objects (addresses, PAN ids, GPS coordinates) are
//! little-endian.

/// Byte order of a 16/32-bit field inside a buffer
///
/// For 16-bit value `0x1234`:
/// - `BigEndian`: [0x12, 0x34]
/// - `LittleEndian`: [0x34, 0x12]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first (register words)
    BigEndian,
    /// Least significant byte first (object fields)
    LittleEndian,
}

impl ByteOrder {
    /// Decode a 16-bit value
    #[inline]
    pub fn u16_from(&self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::BigEndian => u16::from_be_bytes(bytes),
            Self::LittleEndian => u16::from_le_bytes(bytes),
        }
    }

    /// Encode a 16-bit value
    #[inline]
    pub fn u16_to(&self, value: u16) -> [u8; 2] {
        match self {
            Self::BigEndian => value.to_be_bytes(),
            Self::LittleEndian => value.to_le_bytes(),
        }
    }
}
