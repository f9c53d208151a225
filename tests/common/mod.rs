// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests: a builder that writes
//! synthetic version 2.0 bag files.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use bagview::io::record::{
    OP_BAG_HEADER, OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA, OP_MESSAGE_DATA,
};

/// MD5 recorded for the laser scan connection.
pub const SCAN_MD5: &str = "90c7ef2dc6895d81024acba2ac42f369";
/// MD5 recorded for the ground truth pose connection.
pub const POSE_MD5: &str = "cd5e73d190d741a2f92e81eda573aca7";

/// Number of range/intensity elements in the scan payloads.
pub const SCAN_RANGES: usize = 90;

/// One message to place into a chunk.
#[derive(Debug, Clone)]
pub struct MessageSpec {
    pub conn: u32,
    pub time: (u32, u32),
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ChunkSpec {
    compression: String,
    messages: Vec<MessageSpec>,
}

#[derive(Debug, Clone)]
struct ConnectionSpec {
    topic: String,
    message_type: String,
    md5sum: String,
    definition: String,
}

/// Builder for synthetic bag files.
///
/// Layout: magic line, bag header record, connection records, then each
/// chunk followed by its index records, then chunk info records.
#[derive(Debug, Default)]
pub struct BagBuilder {
    connections: Vec<ConnectionSpec>,
    chunks: Vec<ChunkSpec>,
}

impl BagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; ids are assigned densely in call order.
    pub fn connection(
        mut self,
        topic: &str,
        message_type: &str,
        md5sum: &str,
        definition: &str,
    ) -> Self {
        self.connections.push(ConnectionSpec {
            topic: topic.to_string(),
            message_type: message_type.to_string(),
            md5sum: md5sum.to_string(),
            definition: definition.to_string(),
        });
        self
    }

    /// Append a chunk holding `messages` in order.
    pub fn chunk(mut self, compression: &str, messages: Vec<MessageSpec>) -> Self {
        self.chunks.push(ChunkSpec {
            compression: compression.to_string(),
            messages,
        });
        self
    }

    /// Serialize the bag to bytes.
    pub fn build(&self) -> Vec<u8> {
        struct BuiltChunk {
            compressed: Vec<u8>,
            compression: String,
            uncompressed_len: u32,
            // conn id -> (time, offset within uncompressed body)
            index: BTreeMap<u32, Vec<((u32, u32), u32)>>,
            start: (u32, u32),
            end: (u32, u32),
            count: u32,
        }

        let built: Vec<BuiltChunk> = self
            .chunks
            .iter()
            .map(|chunk| {
                let mut body = Vec::new();
                let mut index: BTreeMap<u32, Vec<((u32, u32), u32)>> = BTreeMap::new();
                let mut start = (u32::MAX, u32::MAX);
                let mut end = (0, 0);

                for message in &chunk.messages {
                    let offset = body.len() as u32;
                    let mut header = Vec::new();
                    push_field(&mut header, "op", &[OP_MESSAGE_DATA]);
                    push_field(&mut header, "conn", &message.conn.to_le_bytes());
                    push_field(&mut header, "time", &time_bytes(message.time));
                    push_record(&mut body, &header, &message.payload);

                    index.entry(message.conn).or_default().push((message.time, offset));
                    start = start.min(message.time);
                    end = end.max(message.time);
                }
                if chunk.messages.is_empty() {
                    start = (0, 0);
                }

                let compressed = match chunk.compression.as_str() {
                    "lz4" => {
                        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
                        encoder.write_all(&body).unwrap();
                        encoder.finish().unwrap()
                    }
                    "bz2" => {
                        let mut encoder = bzip2::write::BzEncoder::new(
                            Vec::new(),
                            bzip2::Compression::default(),
                        );
                        encoder.write_all(&body).unwrap();
                        encoder.finish().unwrap()
                    }
                    // "none" and anything unrecognized pass the body through
                    _ => body.clone(),
                };

                BuiltChunk {
                    compressed,
                    compression: chunk.compression.clone(),
                    uncompressed_len: body.len() as u32,
                    index,
                    start,
                    end,
                    count: chunk.messages.len() as u32,
                }
            })
            .collect();

        let bag_header_len = self.bag_header_record(0).len();

        let mut connection_records = Vec::new();
        for (id, connection) in self.connections.iter().enumerate() {
            let mut header = Vec::new();
            push_field(&mut header, "op", &[OP_CONNECTION]);
            push_field(&mut header, "conn", &(id as u32).to_le_bytes());
            push_field(&mut header, "topic", connection.topic.as_bytes());

            let mut data = Vec::new();
            push_field(&mut data, "topic", connection.topic.as_bytes());
            push_field(&mut data, "type", connection.message_type.as_bytes());
            push_field(&mut data, "md5sum", connection.md5sum.as_bytes());
            push_field(&mut data, "message_definition", connection.definition.as_bytes());

            push_record(&mut connection_records, &header, &data);
        }

        let magic = b"#ROSBAG V2.0\n";
        let chunk_base = magic.len() + bag_header_len + connection_records.len();

        let mut chunk_section = Vec::new();
        let mut infos = Vec::new();
        for chunk in &built {
            let chunk_offset = (chunk_base + chunk_section.len()) as u64;

            let mut header = Vec::new();
            push_field(&mut header, "op", &[OP_CHUNK]);
            push_field(&mut header, "compression", chunk.compression.as_bytes());
            push_field(&mut header, "size", &chunk.uncompressed_len.to_le_bytes());
            push_record(&mut chunk_section, &header, &chunk.compressed);

            for (conn, entries) in &chunk.index {
                let mut index_header = Vec::new();
                push_field(&mut index_header, "op", &[OP_INDEX_DATA]);
                push_field(&mut index_header, "ver", &1u32.to_le_bytes());
                push_field(&mut index_header, "conn", &conn.to_le_bytes());
                push_field(
                    &mut index_header,
                    "count",
                    &(entries.len() as u32).to_le_bytes(),
                );

                let mut data = Vec::new();
                for (time, offset) in entries {
                    data.extend_from_slice(&time_bytes(*time));
                    data.write_u32::<LittleEndian>(*offset).unwrap();
                }
                push_record(&mut chunk_section, &index_header, &data);
            }

            infos.push((chunk_offset, chunk.start, chunk.end, chunk.count));
        }

        let index_pos = (chunk_base + chunk_section.len()) as u64;

        let mut out = magic.to_vec();
        out.extend_from_slice(&self.bag_header_record(index_pos));
        out.extend_from_slice(&connection_records);
        out.extend_from_slice(&chunk_section);
        for (chunk_pos, start, end, count) in infos {
            let mut header = Vec::new();
            push_field(&mut header, "op", &[OP_CHUNK_INFO]);
            push_field(&mut header, "ver", &1u32.to_le_bytes());
            push_field(&mut header, "chunk_pos", &chunk_pos.to_le_bytes());
            push_field(&mut header, "start_time", &time_bytes(start));
            push_field(&mut header, "end_time", &time_bytes(end));
            push_field(&mut header, "count", &count.to_le_bytes());
            push_record(&mut out, &header, &[]);
        }
        out
    }

    /// Build and write to a temporary file.
    pub fn write_temp(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&self.build()).unwrap();
        file.flush().unwrap();
        file
    }

    fn bag_header_record(&self, index_pos: u64) -> Vec<u8> {
        let mut header = Vec::new();
        push_field(&mut header, "op", &[OP_BAG_HEADER]);
        push_field(
            &mut header,
            "conn_count",
            &(self.connections.len() as u32).to_le_bytes(),
        );
        push_field(
            &mut header,
            "chunk_count",
            &(self.chunks.len() as u32).to_le_bytes(),
        );
        push_field(&mut header, "index_pos", &index_pos.to_le_bytes());

        let mut out = Vec::new();
        push_record(&mut out, &header, &[]);
        out
    }
}

fn push_field(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    out.write_u32::<LittleEndian>((name.len() + 1 + value.len()) as u32)
        .unwrap();
    out.extend_from_slice(name.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value);
}

fn push_record(out: &mut Vec<u8>, header: &[u8], data: &[u8]) {
    out.write_u32::<LittleEndian>(header.len() as u32).unwrap();
    out.extend_from_slice(header);
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.extend_from_slice(data);
}

fn time_bytes(time: (u32, u32)) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(time.0).unwrap();
    out.write_u32::<LittleEndian>(time.1).unwrap();
    out
}

// ============================================================================
// Fixture definitions and payloads
// ============================================================================

/// The laser scan message definition, with its `Header` dependency block.
pub fn laser_scan_definition() -> String {
    let sep = "=".repeat(80);
    format!(
        "# Single scan from a planar laser range-finder\n\n\
         Header header\n\
         float32 angle_min\n\
         float32 angle_max\n\
         float32 angle_increment\n\
         float32 time_increment\n\
         float32 scan_time\n\
         float32 range_min\n\
         float32 range_max\n\
         float32[] ranges\n\
         float32[] intensities\n\
         {sep}\n\
         MSG: std_msgs/Header\n\
         uint32 seq\n\
         time stamp\n\
         string frame_id\n"
    )
}

/// A ground-truth pose definition with nested geometry types.
pub fn pose_definition() -> String {
    let sep = "=".repeat(80);
    format!(
        "Header header\n\
         geometry_msgs/PoseWithCovariance pose\n\
         {sep}\n\
         MSG: std_msgs/Header\n\
         uint32 seq\n\
         time stamp\n\
         string frame_id\n\
         {sep}\n\
         MSG: geometry_msgs/PoseWithCovariance\n\
         geometry_msgs/Pose pose\n\
         float64[36] covariance\n\
         {sep}\n\
         MSG: geometry_msgs/Pose\n\
         geometry_msgs/Point position\n\
         geometry_msgs/Quaternion orientation\n\
         {sep}\n\
         MSG: geometry_msgs/Point\n\
         float64 x\n\
         float64 y\n\
         float64 z\n\
         {sep}\n\
         MSG: geometry_msgs/Quaternion\n\
         float64 x\n\
         float64 y\n\
         float64 z\n\
         float64 w\n"
    )
}

fn push_header(out: &mut Vec<u8>, seq: u32, stamp: (u32, u32), frame_id: &str) {
    out.write_u32::<LittleEndian>(seq).unwrap();
    out.extend_from_slice(&time_bytes(stamp));
    out.write_u32::<LittleEndian>(frame_id.len() as u32).unwrap();
    out.extend_from_slice(frame_id.as_bytes());
}

/// Serialized laser scan with `SCAN_RANGES` nonzero ranges.
pub fn laser_scan_payload(seq: u32, stamp: (u32, u32)) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(&mut out, seq, stamp, "base_laser_link");

    for scalar in [-1.57f32, 1.57, 0.035, 0.0, 0.1, 0.05, 30.0] {
        out.write_f32::<LittleEndian>(scalar).unwrap();
    }

    out.write_u32::<LittleEndian>(SCAN_RANGES as u32).unwrap();
    for i in 0..SCAN_RANGES {
        out.write_f32::<LittleEndian>(1.0 + i as f32 * 0.25).unwrap();
    }
    out.write_u32::<LittleEndian>(SCAN_RANGES as u32).unwrap();
    for i in 0..SCAN_RANGES {
        out.write_f32::<LittleEndian>(100.0 + i as f32).unwrap();
    }
    out
}

/// Serialized ground-truth pose.
pub fn pose_payload(seq: u32, stamp: (u32, u32)) -> Vec<u8> {
    let mut out = Vec::new();
    push_header(&mut out, seq, stamp, "odom");

    // position, orientation
    for value in [1.5f64, -2.5, 0.0, 0.0, 0.0, 0.0, 1.0] {
        out.write_f64::<LittleEndian>(value).unwrap();
    }
    // covariance
    for i in 0..36 {
        out.write_f64::<LittleEndian>(i as f64 * 0.01).unwrap();
    }
    out
}

/// Message times of the standard fixture, per chunk, in order:
/// scan, pose, scan, pose.
pub const FIXTURE_TIMES: [[(u32, u32); 4]; 4] = [
    [(60, 200_000_000), (65, 0), (70, 0), (75, 0)],
    [(100, 0), (105, 0), (110, 0), (115, 0)],
    [(150, 0), (155, 0), (160, 0), (165, 0)],
    [(200, 0), (210, 0), (220, 0), (232, 800_000_000)],
];

/// First `header.seq` of both fixture topics.
pub const FIXTURE_FIRST_SEQ: u32 = 601;

/// The standard two-topic fixture: `/base_pose_ground_truth` (conn 0) and
/// `/base_scan` (conn 1), four LZ4 chunks, two messages per topic per
/// chunk, seqs counting up from 601.
pub fn standard_bag() -> BagBuilder {
    let mut builder = BagBuilder::new()
        .connection(
            "/base_pose_ground_truth",
            "nav_msgs/Odometry",
            POSE_MD5,
            &pose_definition(),
        )
        .connection(
            "/base_scan",
            "sensor_msgs/LaserScan",
            SCAN_MD5,
            &laser_scan_definition(),
        );

    for (chunk_index, times) in FIXTURE_TIMES.iter().enumerate() {
        let seq = FIXTURE_FIRST_SEQ + chunk_index as u32 * 2;
        builder = builder.chunk(
            "lz4",
            vec![
                MessageSpec {
                    conn: 1,
                    time: times[0],
                    payload: laser_scan_payload(seq, times[0]),
                },
                MessageSpec {
                    conn: 0,
                    time: times[1],
                    payload: pose_payload(seq, times[1]),
                },
                MessageSpec {
                    conn: 1,
                    time: times[2],
                    payload: laser_scan_payload(seq + 1, times[2]),
                },
                MessageSpec {
                    conn: 0,
                    time: times[3],
                    payload: pose_payload(seq + 1, times[3]),
                },
            ],
        );
    }

    builder
}
