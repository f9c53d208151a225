// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-driven message decoding.
//!
//! ROS1 serialization is packed little-endian with no alignment: scalars
//! are their fixed width, strings and dynamic arrays carry a u32 length
//! prefix, and embedded messages are decoded member by member in schema
//! order. Arrays of fixed-width primitives are not materialized; they
//! surface as blobs pointing into the chunk buffer.

use std::ops::Range;

use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;
use crate::core::value::{Blob, RosValue, ValueMap, ValueType};
use crate::io::chunk::ChunkBytes;
use crate::io::cursor::ByteCursor;
use crate::schema::ast::{FieldDef, Member, MessageDef, ARRAY_DYNAMIC, ARRAY_NONE};

/// Upper bound on decoded array lengths, to reject hostile length prefixes.
const MAX_ARRAY_LENGTH: usize = 10_000_000;

/// Decoder for one connection: its schema, its scope, and the chunk the
/// payload lives in.
pub struct MessageDecoder<'a> {
    def: &'a MessageDef,
    scope: &'a str,
    chunk: &'a ChunkBytes,
}

impl<'a> MessageDecoder<'a> {
    /// Create a decoder over `chunk` for a connection's schema and scope.
    pub fn new(def: &'a MessageDef, scope: &'a str, chunk: &'a ChunkBytes) -> Self {
        Self { def, scope, chunk }
    }

    /// Decode the payload at `range` within the chunk body.
    ///
    /// The schema must consume the payload exactly; leftover bytes are a
    /// `TrailingBytes` error.
    pub fn decode(&self, range: Range<usize>) -> Result<RosValue> {
        let slice = &self.chunk.as_slice()[range.clone()];
        let mut cursor = ByteCursor::new(slice);

        let value = self.decode_object(&self.def.members, &mut cursor, range.start)?;

        if !cursor.is_at_end() {
            return Err(BagError::TrailingBytes {
                remaining: cursor.remaining(),
            });
        }
        Ok(value)
    }

    fn decode_object(
        &self,
        members: &[Member],
        cursor: &mut ByteCursor<'_>,
        base: usize,
    ) -> Result<RosValue> {
        let mut map = ValueMap::new();
        for member in members {
            // Constants advertise values through the schema only.
            if let Member::Field(field) = member {
                let value = self.decode_field(field, cursor, base)?;
                map.insert(field.name.clone(), value);
            }
        }
        Ok(RosValue::Object(map))
    }

    fn decode_field(
        &self,
        field: &FieldDef,
        cursor: &mut ByteCursor<'_>,
        base: usize,
    ) -> Result<RosValue> {
        match field.array_size {
            ARRAY_NONE => self.decode_scalar(field, cursor, base),
            ARRAY_DYNAMIC => {
                let len = cursor.read_u32()? as usize;
                self.decode_array(field, len, cursor, base)
            }
            fixed => self.decode_array(field, fixed as usize, cursor, base),
        }
    }

    fn decode_scalar(
        &self,
        field: &FieldDef,
        cursor: &mut ByteCursor<'_>,
        base: usize,
    ) -> Result<RosValue> {
        match field.primitive() {
            Some(primitive) => decode_primitive(primitive, cursor),
            None => {
                let embedded = self.resolve(&field.type_name)?;
                self.decode_object(&embedded.members, cursor, base)
            }
        }
    }

    fn decode_array(
        &self,
        field: &FieldDef,
        len: usize,
        cursor: &mut ByteCursor<'_>,
        base: usize,
    ) -> Result<RosValue> {
        if len > MAX_ARRAY_LENGTH {
            return Err(BagError::truncated(
                len,
                cursor.remaining(),
                cursor.position() as u64,
            ));
        }

        match field.primitive() {
            Some(primitive) => {
                if let Some(width) = primitive.fixed_size() {
                    // Fixed-width primitive arrays become blobs: one
                    // bounds check, no per-element values.
                    let byte_len = len * width;
                    let start = base + cursor.position();
                    cursor.read_slice(byte_len)?;
                    Ok(RosValue::Blob(Blob::new(
                        self.chunk.clone(),
                        start..start + byte_len,
                        primitive,
                        len,
                    )))
                } else {
                    // Strings are the only variable-width primitive.
                    let mut items = Vec::with_capacity(len.min(cursor.remaining()));
                    for _ in 0..len {
                        items.push(decode_primitive(ValueType::String, cursor)?);
                    }
                    Ok(RosValue::Array(items))
                }
            }
            None => {
                let embedded = self.resolve(&field.type_name)?;
                let mut items = Vec::with_capacity(len.min(cursor.remaining()));
                for _ in 0..len {
                    items.push(self.decode_object(&embedded.members, cursor, base)?);
                }
                Ok(RosValue::Array(items))
            }
        }
    }

    fn resolve(&self, type_name: &str) -> Result<&'a crate::schema::ast::EmbeddedMessageDef> {
        self.def
            .resolve_embedded(self.scope, type_name)
            .ok_or_else(|| BagError::unknown_type(type_name))
    }
}

fn decode_primitive(primitive: ValueType, cursor: &mut ByteCursor<'_>) -> Result<RosValue> {
    match primitive {
        ValueType::Bool => Ok(RosValue::Bool(cursor.read_u8()? != 0)),
        ValueType::Int8 => Ok(RosValue::Int8(cursor.read_u8()? as i8)),
        ValueType::UInt8 => Ok(RosValue::UInt8(cursor.read_u8()?)),
        ValueType::Int16 => Ok(RosValue::Int16(cursor.read_i16()?)),
        ValueType::UInt16 => Ok(RosValue::UInt16(cursor.read_u16()?)),
        ValueType::Int32 => Ok(RosValue::Int32(cursor.read_i32()?)),
        ValueType::UInt32 => Ok(RosValue::UInt32(cursor.read_u32()?)),
        ValueType::Int64 => Ok(RosValue::Int64(cursor.read_i64()?)),
        ValueType::UInt64 => Ok(RosValue::UInt64(cursor.read_u64()?)),
        ValueType::Float32 => Ok(RosValue::Float32(cursor.read_f32()?)),
        ValueType::Float64 => Ok(RosValue::Float64(cursor.read_f64()?)),
        ValueType::String => {
            let len = cursor.read_u32()? as usize;
            let bytes = cursor.read_slice(len)?;
            Ok(RosValue::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        ValueType::Time => Ok(RosValue::Time(read_time(cursor)?)),
        ValueType::Duration => Ok(RosValue::Duration(read_time(cursor)?)),
        ValueType::Object | ValueType::Array | ValueType::Blob => {
            Err(BagError::unknown_type(primitive.name()))
        }
    }
}

fn read_time(cursor: &mut ByteCursor<'_>) -> Result<BagTime> {
    let secs = cursor.read_u32()?;
    let nsecs = cursor.read_u32()?;
    Ok(BagTime::new(secs, nsecs))
}
