//! Binary data processing utilities
//!
//! Stateless conversions between raw ACN byte sequences and host values:
//! byte order handling, bit-field extraction, fixed-point conversions and
//! the address string formats used on the wire.

pub mod bit_ops;
pub mod byte_order;
pub mod conversions;
pub mod format;

pub use bit_ops::*;
pub use byte_order::ByteOrder;
pub use conversions::*;
pub use format::*;
