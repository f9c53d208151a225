// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk records and chunk body access.
//!
//! A chunk is one record whose data section holds many inner records,
//! optionally compressed as a whole. `Chunk::read` produces the
//! uncompressed body as a [`ChunkBytes`] handle: a zero-copy window into
//! the mapped file for uncompressed chunks, or a reference-counted owned
//! buffer for decompressed ones. Blobs and raw message spans clone the
//! handle, which is what keeps chunk buffers alive exactly as long as
//! something still points into them.

use std::fmt;
use std::io::Read;
use std::ops::Range;
use std::sync::Arc;

use memmap2::Mmap;

use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;

/// Chunk body stored without compression.
pub const COMPRESSION_NONE: &str = "none";
/// Chunk body compressed with bzip2.
pub const COMPRESSION_BZ2: &str = "bz2";
/// Chunk body compressed as an LZ4 frame.
pub const COMPRESSION_LZ4: &str = "lz4";

/// Shared handle on a chunk's uncompressed bytes.
#[derive(Clone)]
pub enum ChunkBytes {
    /// Window into the mapped file (uncompressed chunks)
    Mapped(Arc<Mmap>, Range<usize>),
    /// Owned decompressed buffer
    Owned(Arc<[u8]>),
}

impl ChunkBytes {
    /// The uncompressed chunk body.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ChunkBytes::Mapped(map, range) => &map[range.clone()],
            ChunkBytes::Owned(buf) => buf,
        }
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        match self {
            ChunkBytes::Mapped(_, range) => range.len(),
            ChunkBytes::Owned(buf) => buf.len(),
        }
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChunkBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkBytes::Mapped(_, range) => {
                write!(f, "ChunkBytes::Mapped({}..{})", range.start, range.end)
            }
            ChunkBytes::Owned(buf) => write!(f, "ChunkBytes::Owned({} bytes)", buf.len()),
        }
    }
}

/// Summary data for a chunk, filled in from its CHUNK_INFO record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Earliest message timestamp in the chunk
    pub start_time: BagTime,
    /// Latest message timestamp in the chunk
    pub end_time: BagTime,
    /// Number of messages in the chunk
    pub message_count: u32,
}

/// One chunk record from the bag.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// File offset of the record start (the header length prefix)
    pub offset: u64,
    /// Compression name from the chunk header
    pub compression: String,
    /// Uncompressed body size from the chunk header
    pub uncompressed_size: u32,
    /// Record header range in the mapped file
    pub header: Range<usize>,
    /// Record data range in the mapped file (the compressed body)
    pub data: Range<usize>,
    /// Summary from the matching CHUNK_INFO record
    pub info: ChunkInfo,
}

impl Chunk {
    /// Produce the uncompressed chunk body.
    ///
    /// Uncompressed chunks pass through as a window into the mapped file;
    /// compressed chunks decompress into an owned buffer of exactly
    /// `uncompressed_size` bytes.
    pub fn read(&self, map: &Arc<Mmap>) -> Result<ChunkBytes> {
        match self.compression.as_str() {
            COMPRESSION_NONE => Ok(ChunkBytes::Mapped(Arc::clone(map), self.data.clone())),
            COMPRESSION_LZ4 => {
                let src = &map[self.data.clone()];
                decompress_lz4(src, self.uncompressed_size as usize).map(ChunkBytes::Owned)
            }
            COMPRESSION_BZ2 => {
                let src = &map[self.data.clone()];
                decompress_bz2(src, self.uncompressed_size as usize).map(ChunkBytes::Owned)
            }
            other => Err(BagError::unsupported_compression(other)),
        }
    }
}

/// Decompress an LZ4-frame chunk body into exactly `dst_len` bytes.
///
/// The streaming loop accumulates until either side is exhausted. Success
/// requires both to run out together; a leftover on one side is a
/// `DecompressShortRead` carrying the remaining counts.
pub fn decompress_lz4(src: &[u8], dst_len: usize) -> Result<Arc<[u8]>> {
    let mut decoder = lz4_flex::frame::FrameDecoder::new(src);
    let mut dst = vec![0u8; dst_len];

    let mut filled = 0;
    while filled < dst_len {
        let produced = decoder
            .read(&mut dst[filled..])
            .map_err(|e| BagError::decompress(e.to_string()))?;
        if produced == 0 {
            break;
        }
        filled += produced;
    }

    finish_decompress(filled, dst_len, &mut decoder, |d| d.get_ref().len())?;
    Ok(Arc::from(dst))
}

/// Decompress a bzip2 chunk body into exactly `dst_len` bytes.
pub fn decompress_bz2(src: &[u8], dst_len: usize) -> Result<Arc<[u8]>> {
    let mut decoder = bzip2::read::BzDecoder::new(src);
    let mut dst = vec![0u8; dst_len];

    let mut filled = 0;
    while filled < dst_len {
        let produced = decoder
            .read(&mut dst[filled..])
            .map_err(|e| BagError::decompress(e.to_string()))?;
        if produced == 0 {
            break;
        }
        filled += produced;
    }

    finish_decompress(filled, dst_len, &mut decoder, |d| d.get_ref().len())?;
    Ok(Arc::from(dst))
}

/// Shared exhaustion accounting for the streaming decoders.
fn finish_decompress<D: Read>(
    filled: usize,
    dst_len: usize,
    decoder: &mut D,
    src_remaining: impl Fn(&D) -> usize,
) -> Result<()> {
    if filled < dst_len {
        return Err(BagError::DecompressShortRead {
            src_remaining: src_remaining(decoder),
            dst_remaining: dst_len - filled,
        });
    }

    // Destination is full; the stream must not produce anything further.
    let mut probe = [0u8; 1];
    let extra = decoder
        .read(&mut probe)
        .map_err(|e| BagError::decompress(e.to_string()))?;
    if extra != 0 {
        return Err(BagError::DecompressShortRead {
            src_remaining: src_remaining(decoder).max(1),
            dst_remaining: 0,
        });
    }

    Ok(())
}
