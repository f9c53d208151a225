// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagview
//!
//! Reading library for ROS1 bag files (format version 2.0).
//!
//! A bag is a framed file of records: topic connections, compressed or
//! uncompressed chunks of serialized messages, per-connection index
//! blocks, and chunk summaries. This library opens such a file,
//! enumerates topics and their schemas, and yields a timestamp-ordered
//! stream of dynamically typed messages.
//!
//! ## Architecture
//!
//! - `io/` - container access: byte cursor, record framing, header
//!   fields, chunk decompression (`none`, `lz4`, `bz2`)
//! - `schema/` - the embedded message definition language: AST and parser
//! - `decode/` - schema-driven payload decoding into [`RosValue`] trees
//! - `bag` - open/scan: connection, chunk, and index tables
//! - `view` - the timestamp-ordered merge iterator
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagview::Bag;
//!
//! let bag = Bag::open("input.bag")?;
//! for topic in bag.topics() {
//!     println!("{topic}");
//! }
//!
//! let view = bag.view()?;
//! for message in view.messages() {
//!     let message = message?;
//!     let seq = message.data()["header"]["seq"].to::<u32>()?;
//!     println!("{} @ {}: seq {seq}", message.topic, message.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Container I/O
pub mod io;

// Schema parsing
pub mod schema;

// Message decoding
pub mod decode;

// Bag scanning and the topic API
pub mod bag;

// Time-ordered views
pub mod view;

pub use crate::core::{BagError, BagTime, Blob, FromRosValue, Result, RosValue, ValueType};

pub use bag::{Bag, Connection, IndexBlock, IndexEntry};
pub use io::chunk::{Chunk, ChunkBytes, ChunkInfo};
pub use schema::{ConstantDef, EmbeddedMessageDef, FieldDef, Member, MessageDef};
pub use view::{Messages, RosMessage, View};
