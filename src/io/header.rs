// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record header field decoding.
//!
//! A record header is a packed list of `<field_len: u32><name>=<value>`
//! entries. The value is raw bytes and may itself contain `=`; only the
//! first `=` separates. Values are reinterpreted on demand through the
//! typed accessors, which check the exact width for numeric fields.

use std::collections::HashMap;

use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;
use crate::io::cursor::ByteCursor;

/// Decoded header fields of one record: name to raw value bytes.
///
/// Duplicate names are last-writer-wins.
#[derive(Debug, Default)]
pub struct HeaderFields<'a> {
    fields: HashMap<&'a [u8], &'a [u8]>,
}

impl<'a> HeaderFields<'a> {
    /// Parse the packed field entries of a record header.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let mut fields = HashMap::new();

        while !cursor.is_at_end() {
            let field_len = cursor.read_u32()? as usize;
            let entry = cursor.read_slice(field_len)?;

            let sep = entry.iter().position(|&b| b == b'=').ok_or_else(|| {
                BagError::malformed_field(format!(
                    "no '=' in entry {:?}",
                    String::from_utf8_lossy(entry)
                ))
            })?;

            fields.insert(&entry[..sep], &entry[sep + 1..]);
        }

        Ok(Self { fields })
    }

    /// Raw value bytes for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.fields.get(name.as_bytes()).copied()
    }

    /// Number of fields in the header.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the header holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn require(&self, name: &str) -> Result<&'a [u8]> {
        self.get(name).ok_or_else(|| BagError::missing_field(name))
    }

    fn numeric<const N: usize>(&self, name: &str) -> Result<[u8; N]> {
        let value = self.require(name)?;
        let bytes: [u8; N] = value.try_into().map_err(|_| {
            BagError::malformed_field(format!(
                "field '{name}' is {} bytes, expected {N}",
                value.len()
            ))
        })?;
        Ok(bytes)
    }

    /// The record opcode (the reserved single-byte `op` field).
    pub fn op(&self) -> Result<u8> {
        self.u8_field("op")
    }

    /// A single-byte field.
    pub fn u8_field(&self, name: &str) -> Result<u8> {
        let [value] = self.numeric::<1>(name)?;
        Ok(value)
    }

    /// A little-endian u32 field.
    pub fn u32_field(&self, name: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.numeric::<4>(name)?))
    }

    /// A little-endian u64 field.
    pub fn u64_field(&self, name: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.numeric::<8>(name)?))
    }

    /// A timestamp field: secs u32 followed by nsecs u32.
    pub fn time_field(&self, name: &str) -> Result<BagTime> {
        let bytes = self.numeric::<8>(name)?;
        let secs = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let nsecs = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(BagTime::new(secs, nsecs))
    }

    /// A required string field (lossily decoded).
    pub fn string_field(&self, name: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(self.require(name)?).into_owned())
    }

    /// An optional string field (lossily decoded).
    pub fn optional_string_field(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }
}
