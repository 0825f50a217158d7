//! Bounds-checked cursor over a response buffer
//!
//! Thin wrapper around [`bytes::Buf`] that reports underruns as
//! [`AcnError::DataIntegrity`] instead of panicking.

use bytes::Buf;

use crate::bytes::ByteOrder;
use crate::error::{AcnError, Result};

/// Sequential reader over a device response
pub struct BufferReader<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes already consumed
    pub fn position(&self) -> usize {
        self.consumed
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(AcnError::data_integrity(format!(
                "Buffer underrun at offset {}: need {} bytes, {} left",
                self.consumed,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        self.consumed += 1;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self, order: ByteOrder) -> Result<u16> {
        self.ensure(2)?;
        self.consumed += 2;
        Ok(match order {
            ByteOrder::BigEndian => self.buf.get_u16(),
            ByteOrder::LittleEndian => self.buf.get_u16_le(),
        })
    }

    pub fn u32(&mut self, order: ByteOrder) -> Result<u32> {
        self.ensure(4)?;
        self.consumed += 4;
        Ok(match order {
            ByteOrder::BigEndian => self.buf.get_u32(),
            ByteOrder::LittleEndian => self.buf.get_u32_le(),
        })
    }

    pub fn i32(&mut self, order: ByteOrder) -> Result<i32> {
        self.ensure(4)?;
        self.consumed += 4;
        Ok(match order {
            ByteOrder::BigEndian => self.buf.get_i32(),
            ByteOrder::LittleEndian => self.buf.get_i32_le(),
        })
    }

    /// Borrow the next `n` bytes
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        self.consumed += n;
        Ok(head)
    }

    /// Copy the next `N` bytes into an array
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.buf.advance(n);
        self.consumed += n;
        Ok(())
    }
}
