//! Bounds-checked argument slicing
//!
//! Instruction arguments are fixed-width big-endian fields concatenated
//! without padding. Running past the buffer is reported per field as
//! [`VmError::MissingArgument`] rather than a bounds panic.

use crate::error::{Result, VmError};
use crate::types::{Address, TokenPair};
use primitive_types::U256;

/// Bytes `[start, end)` of `buf`, or `MissingArgument { field }` when short
pub fn slice<'a>(buf: &'a [u8], start: usize, end: usize, field: &'static str) -> Result<&'a [u8]> {
    if start > end || end > buf.len() {
        return Err(VmError::MissingArgument {
            field,
            needed: end,
            available: buf.len(),
        });
    }
    Ok(&buf[start..end])
}

/// Sequential reader over consecutive fields of an argument buffer
#[derive(Debug, Clone)]
pub struct ArgReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ArgReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn bytes(&mut self, width: usize, field: &'static str) -> Result<&'a [u8]> {
        let end = self.offset.saturating_add(width);
        let out = slice(self.buf, self.offset, end, field)?;
        self.offset = end;
        Ok(out)
    }

    pub fn u16(&mut self, field: &'static str) -> Result<u16> {
        let b = self.bytes(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32> {
        let b = self.bytes(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.bytes(8, field)?);
        Ok(u64::from_be_bytes(out))
    }

    pub fn u256(&mut self, field: &'static str) -> Result<U256> {
        Ok(U256::from_big_endian(self.bytes(32, field)?))
    }

    pub fn address(&mut self, field: &'static str) -> Result<Address> {
        let mut out = [0u8; 20];
        out.copy_from_slice(self.bytes(20, field)?);
        Ok(out)
    }

    /// `tokenA(20) amountA(32) tokenB(20) amountB(32)`
    pub fn token_pair(&mut self, field: &'static str) -> Result<TokenPair> {
        Ok(TokenPair {
            token_a: self.address(field)?,
            amount_a: self.u256(field)?,
            token_b: self.address(field)?,
            amount_b: self.u256(field)?,
        })
    }

    /// Everything not consumed yet
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.offset.min(self.buf.len())..];
        self.offset = self.buf.len();
        out
    }
}

/// Big-endian U256 as a 32-byte field
pub fn u256_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_reports_field() {
        let buf = [1u8, 2, 3];
        assert_eq!(slice(&buf, 1, 3, "f").unwrap(), &[2, 3]);
        assert_eq!(
            slice(&buf, 2, 6, "fee").unwrap_err(),
            VmError::MissingArgument { field: "fee", needed: 6, available: 3 }
        );
    }

    #[test]
    fn test_reader_consecutive_fields() {
        let mut buf = vec![0x01, 0x02];
        buf.extend_from_slice(&7u32.to_be_bytes());
        buf.extend_from_slice(&[0xaa; 20]);
        buf.extend_from_slice(&u256_bytes(U256::from(1_000_000u64)));
        buf.extend_from_slice(b"tail");

        let mut r = ArgReader::new(&buf);
        assert_eq!(r.u16("a").unwrap(), 0x0102);
        assert_eq!(r.u32("b").unwrap(), 7);
        assert_eq!(r.address("c").unwrap(), [0xaa; 20]);
        assert_eq!(r.u256("d").unwrap(), U256::from(1_000_000u64));
        assert_eq!(r.rest(), b"tail");
        assert!(r.rest().is_empty());
    }

    #[test]
    fn test_short_field_names_the_field() {
        let mut r = ArgReader::new(&[0u8; 3]);
        assert!(matches!(
            r.u32("flat_fee_in.fee"),
            Err(VmError::MissingArgument { field: "flat_fee_in.fee", needed: 4, available: 3 })
        ));
    }
}
