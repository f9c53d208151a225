// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! On-disk container access: byte cursor, record framing, header fields,
//! and chunk bodies.

pub mod chunk;
pub mod cursor;
pub mod header;
pub mod record;

pub use chunk::{Chunk, ChunkBytes, ChunkInfo};
pub use cursor::ByteCursor;
pub use header::HeaderFields;
pub use record::{read_record, Record};
