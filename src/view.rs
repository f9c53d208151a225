// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time-ordered message views.
//!
//! A [`View`] binds a set of connections (every topic, or a subset) and an
//! optional time window, and iterates their messages in non-decreasing
//! timestamp order across chunks. The iterator keeps one cursor per chunk
//! the selection touches, ordered in a priority queue keyed by
//! `(next timestamp, chunk file offset, in-chunk position)`. A cursor
//! decompresses its chunk on first advance, so chunks ahead of the merge
//! frontier stay compressed, and dropping the iterator releases every
//! decompressed buffer.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::ops::Range;

use crate::bag::Bag;
use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;
use crate::core::value::RosValue;
use crate::decode::MessageDecoder;
use crate::io::chunk::ChunkBytes;
use crate::io::cursor::ByteCursor;
use crate::io::header::HeaderFields;
use crate::io::record::{read_record, OP_CONNECTION, OP_MESSAGE_DATA};

/// One decoded message out of a view.
pub struct RosMessage {
    /// Topic the message was published on
    pub topic: String,
    /// Receive timestamp from the message record
    pub timestamp: BagTime,
    /// MD5 of the connection's message definition
    pub md5sum: String,
    bytes: ChunkBytes,
    range: Range<usize>,
    value: RosValue,
}

impl RosMessage {
    /// The serialized payload bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.bytes.as_slice()[self.range.clone()]
    }

    /// Length of the serialized payload.
    pub fn raw_data_len(&self) -> usize {
        self.range.len()
    }

    /// The decoded value tree.
    pub fn data(&self) -> &RosValue {
        &self.value
    }
}

impl std::fmt::Debug for RosMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosMessage")
            .field("topic", &self.topic)
            .field("timestamp", &self.timestamp)
            .field("raw_data_len", &self.range.len())
            .finish()
    }
}

/// A selection of connections plus an optional time window.
pub struct View<'a> {
    bag: &'a Bag,
    connection_ids: HashSet<u32>,
    chunk_indices: Vec<usize>,
    start_time: BagTime,
    end_time: BagTime,
    window: Option<(BagTime, BagTime)>,
}

impl<'a> View<'a> {
    pub(crate) fn of_all(bag: &'a Bag) -> Result<Self> {
        let ids = bag
            .connections()
            .iter()
            .filter(|c| !c.topic.is_empty())
            .map(|c| c.id)
            .collect();
        Self::build(bag, ids)
    }

    pub(crate) fn of_topics(bag: &'a Bag, topics: &[&str]) -> Result<Self> {
        let mut ids = HashSet::new();
        for topic in topics {
            for connection in bag.connections_for_topic(topic) {
                ids.insert(connection.id);
            }
        }
        Self::build(bag, ids)
    }

    fn build(bag: &'a Bag, connection_ids: HashSet<u32>) -> Result<Self> {
        bag.shared_map()?;

        let mut chunk_indices: Vec<usize> = connection_ids
            .iter()
            .flat_map(|&id| {
                bag.connections()[id as usize]
                    .blocks
                    .iter()
                    .map(|block| block.chunk_index)
            })
            .collect();
        chunk_indices.sort_unstable();
        chunk_indices.dedup();

        let mut start_time = BagTime::ZERO;
        let mut end_time = BagTime::ZERO;
        for (i, &index) in chunk_indices.iter().enumerate() {
            let info = bag.chunks()[index].info;
            if i == 0 || info.start_time < start_time {
                start_time = info.start_time;
            }
            if info.end_time > end_time {
                end_time = info.end_time;
            }
        }

        Ok(Self {
            bag,
            connection_ids,
            chunk_indices,
            start_time,
            end_time,
            window: None,
        })
    }

    /// Restrict iteration to `[start, end]` (inclusive).
    pub fn with_time_range(mut self, start: BagTime, end: BagTime) -> Self {
        self.window = Some((start, end));
        self
    }

    /// Earliest chunk start time across the selection.
    pub fn start_time(&self) -> BagTime {
        self.start_time
    }

    /// Latest chunk end time across the selection.
    pub fn end_time(&self) -> BagTime {
        self.end_time
    }

    /// Iterate the selection's messages in timestamp order.
    pub fn messages(&self) -> Messages<'_, 'a> {
        let mut heap = BinaryHeap::new();
        let mut cursors = Vec::new();

        for &chunk_index in &self.chunk_indices {
            let chunk = &self.bag.chunks()[chunk_index];

            // Chunk infos bound each chunk's time span, so chunks wholly
            // outside the window never need decompressing.
            if let Some((lo, hi)) = self.window {
                if chunk.info.message_count > 0
                    && (chunk.info.end_time < lo || chunk.info.start_time > hi)
                {
                    continue;
                }
            }

            let slot = cursors.len();
            heap.push(Reverse((chunk.info.start_time, chunk.offset, 0usize, slot)));
            cursors.push(ChunkCursor {
                chunk_index,
                state: CursorState::Unstarted,
            });
        }

        Messages {
            view: self,
            cursors,
            heap,
        }
    }
}

struct Pending {
    conn_id: u32,
    time: BagTime,
    data: Range<usize>,
    record_pos: usize,
}

enum CursorState {
    Unstarted,
    Active {
        bytes: ChunkBytes,
        pos: usize,
        last_time: Option<BagTime>,
        pending: Option<Pending>,
    },
    Done,
}

struct ChunkCursor {
    chunk_index: usize,
    state: CursorState,
}

/// Merge iterator over the chunks a view touches.
///
/// Heap keys are `(timestamp, chunk file offset, in-chunk position, slot)`,
/// which yields timestamp order with ties broken by chunk offset and then
/// position. Unstarted cursors are keyed by their chunk's summary start
/// time; the first pop decompresses the chunk and re-keys on the first
/// actual message.
pub struct Messages<'v, 'a> {
    view: &'v View<'a>,
    cursors: Vec<ChunkCursor>,
    heap: BinaryHeap<Reverse<(BagTime, u64, usize, usize)>>,
}

impl<'v, 'a> Messages<'v, 'a> {
    /// Scan the cursor forward to its next selected, in-window message and
    /// queue its heap key. Returns false when the chunk is exhausted.
    fn scan_ahead(&mut self, slot: usize, chunk_offset: u64) -> Result<bool> {
        let view = self.view;
        let found = {
            let (bytes, pos, last_time, pending) = match &mut self.cursors[slot].state {
                CursorState::Active {
                    bytes,
                    pos,
                    last_time,
                    pending,
                } => (bytes, pos, last_time, pending),
                _ => return Ok(false),
            };

            let slice = bytes.as_slice();
            let mut cursor = ByteCursor::new(slice);
            cursor.skip(*pos)?;

            let mut found = None;
            while !cursor.is_at_end() {
                let record_pos = cursor.position();
                let record = read_record(&mut cursor)?;
                let header = HeaderFields::parse(&slice[record.header.clone()])?;

                match header.op()? {
                    OP_CONNECTION => continue,
                    OP_MESSAGE_DATA => {
                        let conn = header.u32_field("conn")?;
                        let time = header.time_field("time")?;

                        if let Some(last) = *last_time {
                            if time < last {
                                return Err(BagError::ChunkTimeOrderViolation { chunk_offset });
                            }
                        }
                        *last_time = Some(time);

                        if !view.connection_ids.contains(&conn) {
                            continue;
                        }
                        if let Some((lo, hi)) = view.window {
                            if time < lo {
                                continue;
                            }
                            if time > hi {
                                // Times only grow within a chunk; nothing
                                // further can be inside the window.
                                break;
                            }
                        }

                        *pending = Some(Pending {
                            conn_id: conn,
                            time,
                            data: record.data.clone(),
                            record_pos,
                        });
                        *pos = cursor.position();
                        found = Some((time, record_pos));
                        break;
                    }
                    op => {
                        return Err(BagError::UnknownOpcode {
                            op,
                            position: record_pos as u64,
                        })
                    }
                }
            }
            found
        };

        match found {
            Some((time, record_pos)) => {
                self.heap
                    .push(Reverse((time, chunk_offset, record_pos, slot)));
                Ok(true)
            }
            None => {
                self.cursors[slot].state = CursorState::Done;
                Ok(false)
            }
        }
    }

    fn materialize(&self, bytes: ChunkBytes, pending: Pending) -> Result<RosMessage> {
        let connection = &self.view.bag.connections()[pending.conn_id as usize];
        let def = self
            .view
            .bag
            .msg_def_for_topic(&connection.topic)
            .ok_or_else(|| BagError::unknown_type(&connection.message_type))?;

        let decoder = MessageDecoder::new(def, &connection.scope, &bytes);
        let value = decoder.decode(pending.data.clone())?;

        Ok(RosMessage {
            topic: connection.topic.clone(),
            timestamp: pending.time,
            md5sum: connection.md5sum.clone(),
            bytes,
            range: pending.data,
            value,
        })
    }
}

impl<'v, 'a> Iterator for Messages<'v, 'a> {
    type Item = Result<RosMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Reverse((_, chunk_offset, _, slot)) = self.heap.pop()?;

            if matches!(self.cursors[slot].state, CursorState::Unstarted) {
                let map = match self.view.bag.shared_map() {
                    Ok(map) => map,
                    Err(err) => return Some(Err(err)),
                };
                let chunk = &self.view.bag.chunks()[self.cursors[slot].chunk_index];
                let bytes = match chunk.read(map) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        self.cursors[slot].state = CursorState::Done;
                        return Some(Err(err));
                    }
                };
                self.cursors[slot].state = CursorState::Active {
                    bytes,
                    pos: 0,
                    last_time: None,
                    pending: None,
                };
                // Re-key on the first real message (or drop the cursor).
                match self.scan_ahead(slot, chunk_offset) {
                    Ok(_) => continue,
                    Err(err) => {
                        self.cursors[slot].state = CursorState::Done;
                        return Some(Err(err));
                    }
                }
            }

            let (pending, bytes) = match &mut self.cursors[slot].state {
                CursorState::Active { pending, bytes, .. } => match pending.take() {
                    Some(pending) => (pending, bytes.clone()),
                    None => continue,
                },
                _ => continue,
            };

            if let Err(err) = self.scan_ahead(slot, chunk_offset) {
                self.cursors[slot].state = CursorState::Done;
                return Some(Err(err));
            }

            return Some(self.materialize(bytes, pending));
        }
    }
}
