// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Positioned byte cursor for reading bag data.
//!
//! Everything in a bag is little-endian and packed, so the cursor is a thin
//! bounds-checked wrapper over a byte slice: fixed-width reads plus
//! zero-copy slice production for record headers, record data, and blobs.

use crate::core::error::{BagError, Result};

/// Bounds-checked little-endian cursor over a byte range.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current position from the start of the range.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Whether the cursor has reached the end of the range.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn check(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(BagError::truncated(
                count,
                self.remaining(),
                self.offset as u64,
            ));
        }
        Ok(())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.check(1)?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.check(2)?;
        let bytes = [self.data[self.offset], self.data[self.offset + 1]];
        self.offset += 2;
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.check(4)?;
        let bytes = [
            self.data[self.offset],
            self.data[self.offset + 1],
            self.data[self.offset + 2],
            self.data[self.offset + 3],
        ];
        self.offset += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.check(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[self.offset..self.offset + 8]);
        self.offset += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read `count` bytes as a zero-copy slice.
    pub fn read_slice(&mut self, count: usize) -> Result<&'a [u8]> {
        self.check(count)?;
        let start = self.offset;
        self.offset += count;
        Ok(&self.data[start..self.offset])
    }

    /// Advance past `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.check(count)?;
        self.offset += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let data = [0x42, 0xff];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x42);
        assert_eq!(cursor.read_u8().unwrap(), 0xff);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_read_u32_little_endian() {
        let data = 0xdead_beefu32.to_le_bytes();
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0xdead_beef);
    }

    #[test]
    fn test_read_u64_little_endian() {
        let data = 0x0123_4567_89ab_cdefu64.to_le_bytes();
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u64().unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn test_read_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.25f64).to_le_bytes());
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_f32().unwrap(), 1.5);
        assert_eq!(cursor.read_f64().unwrap(), -2.25);
    }

    #[test]
    fn test_read_signed() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-5i16).to_le_bytes());
        data.extend_from_slice(&(-6i32).to_le_bytes());
        data.extend_from_slice(&(-7i64).to_le_bytes());
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_i16().unwrap(), -5);
        assert_eq!(cursor.read_i32().unwrap(), -6);
        assert_eq!(cursor.read_i64().unwrap(), -7);
    }

    #[test]
    fn test_read_slice_zero_copy() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = ByteCursor::new(&data);
        let slice = cursor.read_slice(3).unwrap();
        assert_eq!(slice, &[1, 2, 3]);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn test_read_past_end() {
        let data = [1u8, 2];
        let mut cursor = ByteCursor::new(&data);
        let err = cursor.read_u32().unwrap_err();
        match err {
            BagError::TruncatedRecord {
                requested,
                available,
                position,
            } => {
                assert_eq!(requested, 4);
                assert_eq!(available, 2);
                assert_eq!(position, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_skip() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();
        assert_eq!(cursor.read_u8().unwrap(), 3);
        assert!(cursor.skip(5).is_err());
    }

    #[test]
    fn test_empty_input() {
        let mut cursor = ByteCursor::new(&[]);
        assert!(cursor.is_at_end());
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.read_u8().is_err());
        // Zero-length reads succeed at the end
        assert_eq!(cursor.read_slice(0).unwrap(), &[] as &[u8]);
    }
}
