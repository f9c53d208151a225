// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dynamic value tree for decoded bag messages.
//!
//! `RosValue` is a tagged variant covering every primitive the ROS1
//! serialization format knows, plus objects (embedded messages), arrays of
//! composite elements, and blobs. A blob is the zero-copy rendering of an
//! array of fixed-width primitives: it keeps a reference-counted handle on
//! the chunk buffer the bytes live in instead of materializing elements.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, Range};

use crate::core::error::{BagError, Result};
use crate::core::time::BagTime;
use crate::io::chunk::ChunkBytes;

/// Type tag for a [`RosValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Boolean
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Length-prefixed string
    String,
    /// ROS time (secs + nsecs)
    Time,
    /// ROS duration (secs + nsecs)
    Duration,
    /// Embedded message (field name to value map)
    Object,
    /// Array of composite values
    Array,
    /// Byte view over an array of fixed-width primitives
    Blob,
}

impl ValueType {
    /// Map a primitive type name from a message definition to its tag.
    ///
    /// `byte` and `char` are the ROS1 legacy aliases for `int8` and `uint8`.
    pub fn from_primitive_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ValueType::Bool),
            "int8" | "byte" => Some(ValueType::Int8),
            "uint8" | "char" => Some(ValueType::UInt8),
            "int16" => Some(ValueType::Int16),
            "uint16" => Some(ValueType::UInt16),
            "int32" => Some(ValueType::Int32),
            "uint32" => Some(ValueType::UInt32),
            "int64" => Some(ValueType::Int64),
            "uint64" => Some(ValueType::UInt64),
            "float32" => Some(ValueType::Float32),
            "float64" => Some(ValueType::Float64),
            "string" => Some(ValueType::String),
            "time" => Some(ValueType::Time),
            "duration" => Some(ValueType::Duration),
            _ => None,
        }
    }

    /// Serialized width in bytes, for fixed-width primitives.
    ///
    /// Strings and containers have no fixed width and return `None`.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            ValueType::Bool | ValueType::Int8 | ValueType::UInt8 => Some(1),
            ValueType::Int16 | ValueType::UInt16 => Some(2),
            ValueType::Int32 | ValueType::UInt32 | ValueType::Float32 => Some(4),
            ValueType::Int64 | ValueType::UInt64 | ValueType::Float64 => Some(8),
            ValueType::Time | ValueType::Duration => Some(8),
            ValueType::String | ValueType::Object | ValueType::Array | ValueType::Blob => None,
        }
    }

    /// Human-readable type name.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int8 => "int8",
            ValueType::UInt8 => "uint8",
            ValueType::Int16 => "int16",
            ValueType::UInt16 => "uint16",
            ValueType::Int32 => "int32",
            ValueType::UInt32 => "uint32",
            ValueType::Int64 => "int64",
            ValueType::UInt64 => "uint64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::String => "string",
            ValueType::Time => "time",
            ValueType::Duration => "duration",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Blob => "blob",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Zero-copy view over an array of fixed-width primitive elements.
///
/// The blob holds a clone of the chunk's [`ChunkBytes`] handle, so the
/// backing buffer stays alive as long as any blob referencing it does.
#[derive(Clone)]
pub struct Blob {
    bytes: ChunkBytes,
    range: Range<usize>,
    element_type: ValueType,
    count: usize,
}

impl Blob {
    /// Create a blob over `range` of `bytes`, holding `count` elements.
    pub(crate) fn new(
        bytes: ChunkBytes,
        range: Range<usize>,
        element_type: ValueType,
        count: usize,
    ) -> Self {
        Self {
            bytes,
            range,
            element_type,
            count,
        }
    }

    /// Element type of the underlying array.
    pub fn element_type(&self) -> ValueType {
        self.element_type
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the blob holds no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total byte length (`len() * element width`).
    pub fn byte_len(&self) -> usize {
        self.range.len()
    }

    /// The raw little-endian element bytes.
    pub fn data(&self) -> &[u8] {
        &self.bytes.as_slice()[self.range.clone()]
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("element_type", &self.element_type)
            .field("count", &self.count)
            .field("byte_len", &self.range.len())
            .finish()
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.count == other.count
            && self.data() == other.data()
    }
}

/// Field name to value mapping for decoded embedded messages.
pub type ValueMap = HashMap<String, RosValue>;

/// A decoded message value.
#[derive(Debug, Clone, PartialEq)]
pub enum RosValue {
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// 16-bit signed integer
    Int16(i16),
    /// 16-bit unsigned integer
    UInt16(u16),
    /// 32-bit signed integer
    Int32(i32),
    /// 32-bit unsigned integer
    UInt32(u32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// UTF-8 string (lossily decoded)
    String(String),
    /// ROS time
    Time(BagTime),
    /// ROS duration
    Duration(BagTime),
    /// Embedded message
    Object(ValueMap),
    /// Array of composite values (embedded messages or strings)
    Array(Vec<RosValue>),
    /// Array of fixed-width primitives, as a byte view
    Blob(Blob),
}

impl RosValue {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            RosValue::Bool(_) => ValueType::Bool,
            RosValue::Int8(_) => ValueType::Int8,
            RosValue::UInt8(_) => ValueType::UInt8,
            RosValue::Int16(_) => ValueType::Int16,
            RosValue::UInt16(_) => ValueType::UInt16,
            RosValue::Int32(_) => ValueType::Int32,
            RosValue::UInt32(_) => ValueType::UInt32,
            RosValue::Int64(_) => ValueType::Int64,
            RosValue::UInt64(_) => ValueType::UInt64,
            RosValue::Float32(_) => ValueType::Float32,
            RosValue::Float64(_) => ValueType::Float64,
            RosValue::String(_) => ValueType::String,
            RosValue::Time(_) => ValueType::Time,
            RosValue::Duration(_) => ValueType::Duration,
            RosValue::Object(_) => ValueType::Object,
            RosValue::Array(_) => ValueType::Array,
            RosValue::Blob(_) => ValueType::Blob,
        }
    }

    /// Look up a field on an object value.
    pub fn field(&self, name: &str) -> Result<&RosValue> {
        match self {
            RosValue::Object(map) => map.get(name).ok_or_else(|| BagError::UnknownField {
                name: name.to_string(),
            }),
            other => Err(BagError::type_mismatch(
                "object",
                other.value_type().name(),
            )),
        }
    }

    /// Index into an array value.
    pub fn at(&self, index: usize) -> Result<&RosValue> {
        match self {
            RosValue::Array(items) => items.get(index).ok_or(BagError::IndexOutOfRange {
                index,
                len: items.len(),
            }),
            other => Err(BagError::type_mismatch("array", other.value_type().name())),
        }
    }

    /// Number of elements for arrays and blobs, fields for objects.
    pub fn len(&self) -> usize {
        match self {
            RosValue::Array(items) => items.len(),
            RosValue::Blob(blob) => blob.len(),
            RosValue::Object(map) => map.len(),
            _ => 0,
        }
    }

    /// Whether a container value is empty (scalars report true).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the blob view of a primitive-array value.
    pub fn blob(&self) -> Result<&Blob> {
        match self {
            RosValue::Blob(blob) => Ok(blob),
            other => Err(BagError::type_mismatch("blob", other.value_type().name())),
        }
    }

    /// Checked conversion to a concrete Rust type.
    ///
    /// Integer requests accept any integer variant whose value fits;
    /// everything else requires the matching variant.
    pub fn to<T: FromRosValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    fn as_i64_checked(&self) -> Option<i64> {
        match self {
            RosValue::Int8(v) => Some(*v as i64),
            RosValue::Int16(v) => Some(*v as i64),
            RosValue::Int32(v) => Some(*v as i64),
            RosValue::Int64(v) => Some(*v),
            RosValue::UInt8(v) => Some(*v as i64),
            RosValue::UInt16(v) => Some(*v as i64),
            RosValue::UInt32(v) => Some(*v as i64),
            RosValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    fn as_u64_checked(&self) -> Option<u64> {
        match self {
            RosValue::UInt8(v) => Some(*v as u64),
            RosValue::UInt16(v) => Some(*v as u64),
            RosValue::UInt32(v) => Some(*v as u64),
            RosValue::UInt64(v) => Some(*v),
            RosValue::Int8(v) => u64::try_from(*v).ok(),
            RosValue::Int16(v) => u64::try_from(*v).ok(),
            RosValue::Int32(v) => u64::try_from(*v).ok(),
            RosValue::Int64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl Index<&str> for RosValue {
    type Output = RosValue;

    fn index(&self, name: &str) -> &RosValue {
        match self.field(name) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Index<usize> for RosValue {
    type Output = RosValue;

    fn index(&self, index: usize) -> &RosValue {
        match self.at(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl fmt::Display for RosValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosValue::Bool(v) => write!(f, "{v}"),
            RosValue::Int8(v) => write!(f, "{v}"),
            RosValue::UInt8(v) => write!(f, "{v}"),
            RosValue::Int16(v) => write!(f, "{v}"),
            RosValue::UInt16(v) => write!(f, "{v}"),
            RosValue::Int32(v) => write!(f, "{v}"),
            RosValue::UInt32(v) => write!(f, "{v}"),
            RosValue::Int64(v) => write!(f, "{v}"),
            RosValue::UInt64(v) => write!(f, "{v}"),
            RosValue::Float32(v) => write!(f, "{v}"),
            RosValue::Float64(v) => write!(f, "{v}"),
            RosValue::String(v) => write!(f, "\"{v}\""),
            RosValue::Time(v) => write!(f, "time({v})"),
            RosValue::Duration(v) => write!(f, "duration({v})"),
            RosValue::Object(map) => write!(f, "{{{} fields}}", map.len()),
            RosValue::Array(items) => write!(f, "[{} elements]", items.len()),
            RosValue::Blob(blob) => {
                write!(f, "<{} x {}>", blob.len(), blob.element_type())
            }
        }
    }
}

/// Conversion target for [`RosValue::to`].
pub trait FromRosValue: Sized {
    /// Extract `Self` from a value, or fail with `TypeMismatch`.
    fn from_value(value: &RosValue) -> Result<Self>;
}

macro_rules! signed_from_value {
    ($($t:ty),*) => {$(
        impl FromRosValue for $t {
            fn from_value(value: &RosValue) -> Result<Self> {
                value
                    .as_i64_checked()
                    .and_then(|v| <$t>::try_from(v).ok())
                    .ok_or_else(|| {
                        BagError::type_mismatch(stringify!($t), value.value_type().name())
                    })
            }
        }
    )*};
}

macro_rules! unsigned_from_value {
    ($($t:ty),*) => {$(
        impl FromRosValue for $t {
            fn from_value(value: &RosValue) -> Result<Self> {
                value
                    .as_u64_checked()
                    .and_then(|v| <$t>::try_from(v).ok())
                    .ok_or_else(|| {
                        BagError::type_mismatch(stringify!($t), value.value_type().name())
                    })
            }
        }
    )*};
}

signed_from_value!(i8, i16, i32, i64);
unsigned_from_value!(u8, u16, u32, u64);

impl FromRosValue for bool {
    fn from_value(value: &RosValue) -> Result<Self> {
        match value {
            RosValue::Bool(v) => Ok(*v),
            other => Err(BagError::type_mismatch("bool", other.value_type().name())),
        }
    }
}

impl FromRosValue for f32 {
    fn from_value(value: &RosValue) -> Result<Self> {
        match value {
            RosValue::Float32(v) => Ok(*v),
            other => Err(BagError::type_mismatch("f32", other.value_type().name())),
        }
    }
}

impl FromRosValue for f64 {
    fn from_value(value: &RosValue) -> Result<Self> {
        match value {
            RosValue::Float32(v) => Ok(*v as f64),
            RosValue::Float64(v) => Ok(*v),
            other => Err(BagError::type_mismatch("f64", other.value_type().name())),
        }
    }
}

impl FromRosValue for String {
    fn from_value(value: &RosValue) -> Result<Self> {
        match value {
            RosValue::String(v) => Ok(v.clone()),
            other => Err(BagError::type_mismatch("string", other.value_type().name())),
        }
    }
}

impl FromRosValue for BagTime {
    fn from_value(value: &RosValue) -> Result<Self> {
        match value {
            RosValue::Time(v) | RosValue::Duration(v) => Ok(*v),
            other => Err(BagError::type_mismatch("time", other.value_type().name())),
        }
    }
}
