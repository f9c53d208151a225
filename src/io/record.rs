// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record framing for bag files.
//!
//! Every record, at the top level and inside chunk bodies, uses the same
//! frame: `<header_len: u32><header><data_len: u32><data>`. Records are
//! returned as ranges into the scanned buffer so they stay valid after the
//! cursor moves on.

use std::ops::Range;

use crate::core::error::Result;
use crate::io::cursor::ByteCursor;

/// Message data record, found inside chunk bodies.
pub const OP_MESSAGE_DATA: u8 = 0x02;
/// Bag header record, first record in the file.
pub const OP_BAG_HEADER: u8 = 0x03;
/// Per-connection index for the preceding chunk.
pub const OP_INDEX_DATA: u8 = 0x04;
/// Chunk record carrying a (possibly compressed) body of inner records.
pub const OP_CHUNK: u8 = 0x05;
/// Summary record for a chunk, found in the index section.
pub const OP_CHUNK_INFO: u8 = 0x06;
/// Topic connection record.
pub const OP_CONNECTION: u8 = 0x07;

/// One framed record, as ranges into the buffer it was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Header bytes range
    pub header: Range<usize>,
    /// Data bytes range
    pub data: Range<usize>,
}

impl Record {
    /// Length of the header section.
    pub fn header_len(&self) -> usize {
        self.header.len()
    }

    /// Length of the data section.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Read one record frame at the cursor.
///
/// Fails with `TruncatedRecord` if either length prefix or section crosses
/// the end of the buffer.
pub fn read_record(cursor: &mut ByteCursor<'_>) -> Result<Record> {
    let header_len = cursor.read_u32()? as usize;
    let header_start = cursor.position();
    cursor.skip(header_len)?;

    let data_len = cursor.read_u32()? as usize;
    let data_start = cursor.position();
    cursor.skip(data_len)?;

    Ok(Record {
        header: header_start..header_start + header_len,
        data: data_start..data_start + data_len,
    })
}
