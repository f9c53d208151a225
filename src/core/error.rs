// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for bagview.
//!
//! Provides error types for bag reading operations:
//! - File magic and version checks
//! - Record framing and header field decoding
//! - Index construction
//! - Schema parsing
//! - Chunk decompression and message decoding

use std::fmt;

/// Errors that can occur while reading a bag file.
#[derive(Debug, Clone)]
pub enum BagError {
    /// The file does not start with the bag magic string
    NotABag {
        /// What was found instead of the magic string
        found: String,
    },

    /// The bag declares a format version other than 2.0
    UnsupportedVersion {
        /// Version string found in the file
        version: String,
    },

    /// The magic line is present but malformed (e.g. missing newline)
    MalformedMagic {
        /// Description of the mismatch
        reason: String,
    },

    /// A read crossed the end of the file or buffer
    TruncatedRecord {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when the read was attempted
        position: u64,
    },

    /// A header field entry did not contain a `=` separator
    MalformedHeaderField {
        /// Description of the bad entry
        context: String,
    },

    /// A required header field was absent
    MissingHeaderField {
        /// Field name
        name: String,
    },

    /// A record header carried an opcode this reader does not know
    UnknownOpcode {
        /// The opcode byte
        op: u8,
        /// File offset of the record
        position: u64,
    },

    /// A chunk-info record referenced a file offset with no chunk
    DanglingChunkInfo {
        /// The chunk offset the record pointed at
        chunk_pos: u64,
    },

    /// An index record appeared before any chunk record
    DanglingIndexData {
        /// File offset of the index record
        position: u64,
    },

    /// An index or connection record referenced a connection id outside the table
    ConnectionIdOutOfRange {
        /// Connection id from the record
        id: u32,
        /// Size of the connection table
        count: usize,
    },

    /// A message definition failed to parse
    SchemaParseError {
        /// Topic whose definition was being parsed (empty if unknown)
        topic: String,
        /// Up to 30 bytes of input at the failure position
        context: String,
    },

    /// A chunk uses a compression this reader cannot handle
    UnsupportedCompression {
        /// Compression name from the chunk header
        compression: String,
    },

    /// Decompression ended with bytes left over on one side
    DecompressShortRead {
        /// Unconsumed source bytes
        src_remaining: usize,
        /// Unfilled destination bytes
        dst_remaining: usize,
    },

    /// The decompression library reported an error
    DecompressError {
        /// Library error message
        message: String,
    },

    /// A field type could not be resolved against the schema
    UnknownType {
        /// The unresolved type name
        type_name: String,
    },

    /// A field name lookup on an object value failed
    UnknownField {
        /// The missing field name
        name: String,
    },

    /// A value conversion was asked for an incompatible type
    TypeMismatch {
        /// Requested type
        expected: &'static str,
        /// Actual value type
        actual: &'static str,
    },

    /// An integer index on an array value was out of bounds
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the value
        len: usize,
    },

    /// A message payload was not fully consumed by its schema
    TrailingBytes {
        /// Bytes left after decoding
        remaining: usize,
    },

    /// Message timestamps inside a chunk went backwards
    ChunkTimeOrderViolation {
        /// File offset of the offending chunk
        chunk_offset: u64,
    },

    /// Underlying I/O failure
    Io {
        /// Error message
        message: String,
    },
}

impl BagError {
    /// Create a truncated-read error.
    pub fn truncated(requested: usize, available: usize, position: u64) -> Self {
        BagError::TruncatedRecord {
            requested,
            available,
            position,
        }
    }

    /// Create a malformed header field error.
    pub fn malformed_field(context: impl Into<String>) -> Self {
        BagError::MalformedHeaderField {
            context: context.into(),
        }
    }

    /// Create a missing header field error.
    pub fn missing_field(name: impl Into<String>) -> Self {
        BagError::MissingHeaderField { name: name.into() }
    }

    /// Create a schema parse error with its failure context.
    pub fn schema_parse(topic: impl Into<String>, context: impl Into<String>) -> Self {
        BagError::SchemaParseError {
            topic: topic.into(),
            context: context.into(),
        }
    }

    /// Create an unsupported compression error.
    pub fn unsupported_compression(compression: impl Into<String>) -> Self {
        BagError::UnsupportedCompression {
            compression: compression.into(),
        }
    }

    /// Create a decompression error from a library message.
    pub fn decompress(message: impl Into<String>) -> Self {
        BagError::DecompressError {
            message: message.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        BagError::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        BagError::TypeMismatch { expected, actual }
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagError::NotABag { found } => {
                write!(f, "Not a bag file: expected '#ROSBAG V', found {found:?}")
            }
            BagError::UnsupportedVersion { version } => {
                write!(f, "Unsupported bag version: {version}")
            }
            BagError::MalformedMagic { reason } => {
                write!(f, "Malformed bag magic: {reason}")
            }
            BagError::TruncatedRecord {
                requested,
                available,
                position,
            } => write!(
                f,
                "Truncated record: requested {requested} bytes at position {position}, but only {available} bytes available"
            ),
            BagError::MalformedHeaderField { context } => {
                write!(f, "Malformed header field: {context}")
            }
            BagError::MissingHeaderField { name } => {
                write!(f, "Missing header field '{name}'")
            }
            BagError::UnknownOpcode { op, position } => {
                write!(f, "Unknown record opcode {op:#04x} at position {position}")
            }
            BagError::DanglingChunkInfo { chunk_pos } => {
                write!(f, "Chunk info references missing chunk at offset {chunk_pos}")
            }
            BagError::DanglingIndexData { position } => {
                write!(f, "Index record at position {position} has no preceding chunk")
            }
            BagError::ConnectionIdOutOfRange { id, count } => {
                write!(f, "Connection id {id} out of range (table holds {count})")
            }
            BagError::SchemaParseError { topic, context } => {
                write!(f, "Message definition for '{topic}' failed to parse at: {context}")
            }
            BagError::UnsupportedCompression { compression } => {
                write!(f, "Unsupported chunk compression: '{compression}'")
            }
            BagError::DecompressShortRead {
                src_remaining,
                dst_remaining,
            } => write!(
                f,
                "Decompression left {src_remaining}/{dst_remaining} source/destination bytes in buffer"
            ),
            BagError::DecompressError { message } => {
                write!(f, "Decompression failed: {message}")
            }
            BagError::UnknownType { type_name } => {
                write!(f, "Unknown type: '{type_name}'")
            }
            BagError::UnknownField { name } => {
                write!(f, "No such field: '{name}'")
            }
            BagError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: requested {expected}, value is {actual}")
            }
            BagError::IndexOutOfRange { index, len } => {
                write!(f, "Index {index} out of range for value of length {len}")
            }
            BagError::TrailingBytes { remaining } => {
                write!(f, "Message payload has {remaining} trailing bytes after decoding")
            }
            BagError::ChunkTimeOrderViolation { chunk_offset } => {
                write!(f, "Timestamps went backwards inside chunk at offset {chunk_offset}")
            }
            BagError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for BagError {}

impl From<std::io::Error> for BagError {
    fn from(err: std::io::Error) -> Self {
        BagError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for bagview operations.
pub type Result<T> = std::result::Result<T, BagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_record() {
        let err = BagError::truncated(100, 50, 10);
        assert!(matches!(err, BagError::TruncatedRecord { .. }));
        assert_eq!(
            err.to_string(),
            "Truncated record: requested 100 bytes at position 10, but only 50 bytes available"
        );
    }

    #[test]
    fn test_not_a_bag() {
        let err = BagError::NotABag {
            found: "#GARBAGE".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Not a bag file: expected '#ROSBAG V', found \"#GARBAGE\""
        );
    }

    #[test]
    fn test_unsupported_version() {
        let err = BagError::UnsupportedVersion {
            version: "1.2".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported bag version: 1.2");
    }

    #[test]
    fn test_malformed_field() {
        let err = BagError::malformed_field("no separator");
        assert!(matches!(err, BagError::MalformedHeaderField { .. }));
        assert_eq!(err.to_string(), "Malformed header field: no separator");
    }

    #[test]
    fn test_missing_field() {
        let err = BagError::missing_field("conn");
        assert_eq!(err.to_string(), "Missing header field 'conn'");
    }

    #[test]
    fn test_unknown_opcode() {
        let err = BagError::UnknownOpcode {
            op: 0x09,
            position: 128,
        };
        assert_eq!(err.to_string(), "Unknown record opcode 0x09 at position 128");
    }

    #[test]
    fn test_schema_parse_error() {
        let err = BagError::schema_parse("/scan", "float32[ bad");
        assert_eq!(
            err.to_string(),
            "Message definition for '/scan' failed to parse at: float32[ bad"
        );
    }

    #[test]
    fn test_decompress_short_read() {
        let err = BagError::DecompressShortRead {
            src_remaining: 3,
            dst_remaining: 0,
        };
        assert_eq!(
            err.to_string(),
            "Decompression left 3/0 source/destination bytes in buffer"
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = BagError::type_mismatch("uint32", "string");
        assert_eq!(
            err.to_string(),
            "Type mismatch: requested uint32, value is string"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BagError = io_err.into();
        assert!(matches!(err, BagError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error: file not found");
    }

    #[test]
    fn test_error_clone() {
        let err1 = BagError::unknown_type("geometry_msgs/Twist");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }

    #[test]
    fn test_error_debug_format() {
        let err = BagError::truncated(4, 0, 0);
        let debug = format!("{:?}", err);
        assert!(debug.contains("TruncatedRecord"));
    }
}
