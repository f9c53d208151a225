// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag opening and the single-pass record scan.
//!
//! `Bag::open` memory-maps the file, checks the version line, then walks
//! every top-level record once, building the connection table, the chunk
//! table, the per-connection index blocks, and the per-topic schema
//! registry. Everything else (decompression, decoding, iteration) happens
//! lazily through [`View`](crate::view::View).

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;
use crate::io::chunk::Chunk;
use crate::io::cursor::ByteCursor;
use crate::io::header::HeaderFields;
use crate::io::record::{
    read_record, OP_BAG_HEADER, OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA,
    OP_MESSAGE_DATA,
};
use crate::schema::ast::MessageDef;
use crate::schema::parse_definition;
use crate::view::View;

/// Magic prefix of a bag file, up to but not including the version.
pub const MAGIC: &[u8] = b"#ROSBAG V";
/// The one supported wire version.
pub const VERSION: &[u8] = b"2.0";

/// One `(time, offset)` entry from an index record's payload.
///
/// `offset` locates the message inside the uncompressed chunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Receive time of the message
    pub time: BagTime,
    /// Offset of the message record within the uncompressed chunk
    pub offset: u32,
}

/// Per-chunk, per-connection index block.
#[derive(Debug, Clone)]
pub struct IndexBlock {
    /// Connection this block belongs to
    pub connection_id: u32,
    /// Index record version (entries are parsed for version 1)
    pub version: u32,
    /// Message count from the index header
    pub message_count: u32,
    /// Index of the chunk the block points into
    pub chunk_index: usize,
    /// Parsed `(time, offset)` entries
    pub entries: Vec<IndexEntry>,
}

/// One topic connection: its metadata and index blocks.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Dense connection id (equals the table index)
    pub id: u32,
    /// Topic name; empty if the connection never appeared
    pub topic: String,
    /// Message type, e.g. `sensor_msgs/LaserScan`
    pub message_type: String,
    /// Package prefix of the type, e.g. `sensor_msgs` (empty if none)
    pub scope: String,
    /// MD5 of the message definition
    pub md5sum: String,
    /// The embedded schema text
    pub message_definition: String,
    /// Publishing node, if recorded
    pub callerid: String,
    /// Whether the publisher latched
    pub latching: bool,
    /// Index blocks pointing at chunks with messages on this connection
    pub blocks: Vec<IndexBlock>,
}

impl Connection {
    fn empty(id: u32) -> Self {
        Self {
            id,
            topic: String::new(),
            message_type: String::new(),
            scope: String::new(),
            md5sum: String::new(),
            message_definition: String::new(),
            callerid: String::new(),
            latching: false,
            blocks: Vec::new(),
        }
    }
}

/// An open bag file.
#[derive(Debug)]
pub struct Bag {
    map: Option<Arc<Mmap>>,
    connections: Vec<Connection>,
    chunks: Vec<Chunk>,
    index_pos: u64,
    topic_connections: HashMap<String, Vec<u32>>,
    schemas: HashMap<String, MessageDef>,
}

impl Bag {
    /// Open and scan a bag file.
    ///
    /// The whole top-level record stream is walked once; chunk bodies stay
    /// compressed until a view touches them.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let map = Arc::new(unsafe { Mmap::map(&file) }?);

        let mut bag = Self {
            map: None,
            connections: Vec::new(),
            chunks: Vec::new(),
            index_pos: 0,
            topic_connections: HashMap::new(),
            schemas: HashMap::new(),
        };
        bag.scan(&map)?;
        bag.map = Some(map);

        debug!(
            connections = bag.connections.len(),
            chunks = bag.chunks.len(),
            topics = bag.topic_connections.len(),
            "opened bag"
        );
        Ok(bag)
    }

    /// Close the bag, unmapping the file.
    ///
    /// Returns `true` the first time, `false` if already closed. Buffers
    /// already handed out (decompressed chunks, blobs) stay valid; closing
    /// only drops the bag's own handle on the mapping.
    pub fn close(&mut self) -> bool {
        self.map.take().is_some()
    }

    /// Whether the bag is still open.
    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Distinct topics, in connection-id order.
    pub fn topics(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.connections
            .iter()
            .filter(|c| !c.topic.is_empty() && seen.insert(c.topic.as_str()))
            .map(|c| c.topic.as_str())
            .collect()
    }

    /// Whether any connection carries `topic`.
    pub fn topic_in_bag(&self, topic: &str) -> bool {
        self.topic_connections.contains_key(topic)
    }

    /// The parsed message definition for `topic`.
    pub fn msg_def_for_topic(&self, topic: &str) -> Option<&MessageDef> {
        self.schemas.get(topic)
    }

    /// All connections carrying `topic`.
    pub fn connections_for_topic(&self, topic: &str) -> Vec<&Connection> {
        self.topic_connections
            .get(topic)
            .map(|ids| {
                ids.iter()
                    .map(|&id| &self.connections[id as usize])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A view over every topic in the bag.
    pub fn view(&self) -> Result<View<'_>> {
        View::of_all(self)
    }

    /// A view over a subset of topics.
    pub fn view_for_topics(&self, topics: &[&str]) -> Result<View<'_>> {
        View::of_topics(self, topics)
    }

    /// All connections, indexed by id.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// All chunks, in file order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// File offset of the index section, from the bag header record.
    pub fn index_pos(&self) -> u64 {
        self.index_pos
    }

    pub(crate) fn shared_map(&self) -> Result<&Arc<Mmap>> {
        self.map.as_ref().ok_or_else(|| BagError::Io {
            message: "bag is closed".to_string(),
        })
    }

    fn scan(&mut self, map: &Arc<Mmap>) -> Result<()> {
        let data: &[u8] = &map[..];
        let mut cursor = ByteCursor::new(data);

        self.check_magic(&mut cursor, data)?;

        while !cursor.is_at_end() {
            let pos = cursor.position() as u64;
            let record = read_record(&mut cursor)?;
            let header = HeaderFields::parse(&data[record.header.clone()])?;

            match header.op()? {
                OP_BAG_HEADER => {
                    let conn_count = header.u32_field("conn_count")?;
                    let chunk_count = header.u32_field("chunk_count")?;
                    self.index_pos = header.u64_field("index_pos")?;

                    self.connections = (0..conn_count).map(Connection::empty).collect();
                    self.chunks.reserve(chunk_count as usize);
                }
                OP_CHUNK => {
                    self.chunks.push(Chunk {
                        offset: pos,
                        compression: header.string_field("compression")?,
                        uncompressed_size: header.u32_field("size")?,
                        header: record.header.clone(),
                        data: record.data.clone(),
                        info: Default::default(),
                    });
                }
                OP_INDEX_DATA => {
                    let version = header.u32_field("ver")?;
                    let conn = header.u32_field("conn")?;
                    let count = header.u32_field("count")?;

                    if conn as usize >= self.connections.len() {
                        return Err(BagError::ConnectionIdOutOfRange {
                            id: conn,
                            count: self.connections.len(),
                        });
                    }
                    let chunk_index = self
                        .chunks
                        .len()
                        .checked_sub(1)
                        .ok_or(BagError::DanglingIndexData { position: pos })?;

                    let entries =
                        parse_index_entries(version, count, &data[record.data.clone()])?;

                    self.connections[conn as usize].blocks.push(IndexBlock {
                        connection_id: conn,
                        version,
                        message_count: count,
                        chunk_index,
                        entries,
                    });
                }
                OP_CONNECTION => {
                    let conn = header.u32_field("conn")?;
                    let topic = header.string_field("topic")?;
                    if topic.is_empty() {
                        continue;
                    }
                    if conn as usize >= self.connections.len() {
                        return Err(BagError::ConnectionIdOutOfRange {
                            id: conn,
                            count: self.connections.len(),
                        });
                    }

                    // The record's data section is another field dictionary.
                    let fields = HeaderFields::parse(&data[record.data.clone()])?;
                    let message_type = fields.string_field("type")?;
                    let scope = match message_type.find('/') {
                        Some(at) => message_type[..at].to_string(),
                        None => String::new(),
                    };
                    let message_definition = fields.string_field("message_definition")?;
                    let def = parse_definition(&topic, &message_definition)?;

                    let connection = &mut self.connections[conn as usize];
                    connection.topic = topic.clone();
                    connection.message_type = message_type;
                    connection.scope = scope;
                    connection.md5sum = fields.string_field("md5sum")?;
                    connection.message_definition = message_definition;
                    connection.callerid =
                        fields.optional_string_field("callerid").unwrap_or_default();
                    connection.latching =
                        fields.optional_string_field("latching").as_deref() == Some("1");

                    let ids = self.topic_connections.entry(topic.clone()).or_default();
                    if !ids.contains(&conn) {
                        ids.push(conn);
                    }
                    self.schemas.insert(topic, def);
                }
                OP_MESSAGE_DATA => {
                    // Message data lives inside chunks; a top-level record
                    // changes nothing.
                }
                OP_CHUNK_INFO => {
                    let _ver = header.u32_field("ver")?;
                    let chunk_pos = header.u64_field("chunk_pos")?;
                    let start_time = header.time_field("start_time")?;
                    let end_time = header.time_field("end_time")?;
                    let count = header.u32_field("count")?;

                    let chunk = self
                        .chunks
                        .iter_mut()
                        .find(|c| c.offset == chunk_pos)
                        .ok_or(BagError::DanglingChunkInfo { chunk_pos })?;
                    chunk.info.start_time = start_time;
                    chunk.info.end_time = end_time;
                    chunk.info.message_count = count;
                }
                op => {
                    return Err(BagError::UnknownOpcode { op, position: pos });
                }
            }
        }

        Ok(())
    }

    fn check_magic(&self, cursor: &mut ByteCursor<'_>, data: &[u8]) -> Result<()> {
        let magic = cursor.read_slice(MAGIC.len()).map_err(|_| BagError::NotABag {
            found: String::from_utf8_lossy(data).into_owned(),
        })?;
        if magic != MAGIC {
            return Err(BagError::NotABag {
                found: String::from_utf8_lossy(magic).into_owned(),
            });
        }

        let version = cursor.read_slice(VERSION.len()).map_err(|_| {
            BagError::MalformedMagic {
                reason: "file ends inside the version string".to_string(),
            }
        })?;
        if version != VERSION {
            return Err(BagError::UnsupportedVersion {
                version: String::from_utf8_lossy(version).into_owned(),
            });
        }

        let newline = cursor.read_u8().map_err(|_| BagError::MalformedMagic {
            reason: "file ends before the version newline".to_string(),
        })?;
        if newline != b'\n' {
            return Err(BagError::MalformedMagic {
                reason: format!("expected newline after version, found {newline:#04x}"),
            });
        }
        Ok(())
    }
}

/// Parse an index record's `(time, chunk_offset)` payload.
///
/// Only version 1 payloads are understood; other versions keep their
/// header counts but no entries.
fn parse_index_entries(version: u32, count: u32, data: &[u8]) -> Result<Vec<IndexEntry>> {
    if version != 1 {
        warn!(version, "skipping index entries with unknown version");
        return Ok(Vec::new());
    }

    let expected = count as usize * 12;
    if data.len() != expected {
        return Err(BagError::truncated(expected, data.len(), 0));
    }

    let mut cursor = ByteCursor::new(data);
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let time = BagTime::new(cursor.read_u32()?, cursor.read_u32()?);
        let offset = cursor.read_u32()?;
        entries.push(IndexEntry { time, offset });
    }
    Ok(entries)
}
