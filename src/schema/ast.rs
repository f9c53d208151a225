// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! AST types for parsed message definitions.
//!
//! A definition is an ordered list of members (fields and constants)
//! followed by zero or more named embedded types, each with its own
//! members. Embedded types are referenced by name, never by pointer, so
//! the tree is a DAG by construction.

use serde::Serialize;

use crate::core::value::ValueType;

/// Array size marker for a dynamic (`[]`) array field.
pub const ARRAY_DYNAMIC: i32 = -1;
/// Array size marker for a scalar (non-array) field.
pub const ARRAY_NONE: i32 = 0;

/// A field declaration: `type[size]? name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    /// Type name, with any `std_msgs/` prefix already stripped
    pub type_name: String,
    /// `0` scalar, `-1` dynamic array, `n > 0` fixed array of n
    pub array_size: i32,
    /// Field name
    pub name: String,
}

impl FieldDef {
    /// Whether this field is a plain scalar (not an array).
    pub fn is_scalar(&self) -> bool {
        self.array_size == ARRAY_NONE
    }

    /// The primitive tag of the field's element type, if it is primitive.
    pub fn primitive(&self) -> Option<ValueType> {
        ValueType::from_primitive_name(&self.type_name)
    }
}

/// A constant declaration: `type name=value`.
///
/// Constants are advertised through the schema only; they never consume
/// payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantDef {
    /// Type name
    pub type_name: String,
    /// Constant name
    pub name: String,
    /// Literal text, with any trailing comment removed
    pub value: String,
}

/// One member line of a message definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Member {
    /// A field declaration
    Field(FieldDef),
    /// A constant declaration
    Constant(ConstantDef),
}

impl Member {
    /// This member as a field, if it is one.
    pub fn as_field(&self) -> Option<&FieldDef> {
        match self {
            Member::Field(field) => Some(field),
            Member::Constant(_) => None,
        }
    }

    /// This member as a constant, if it is one.
    pub fn as_constant(&self) -> Option<&ConstantDef> {
        match self {
            Member::Constant(constant) => Some(constant),
            Member::Field(_) => None,
        }
    }
}

/// A named embedded type from a `MSG:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedMessageDef {
    /// Type name, with any `std_msgs/` prefix already stripped
    pub type_name: String,
    /// Ordered members
    pub members: Vec<Member>,
}

/// A parsed message definition: the top-level members plus all embedded
/// types the definition carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageDef {
    /// Ordered members of the top-level message
    pub members: Vec<Member>,
    /// Named embedded types, in definition order
    pub embedded_types: Vec<EmbeddedMessageDef>,
}

impl MessageDef {
    /// Iterate the top-level fields, skipping constants.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.members.iter().filter_map(Member::as_field)
    }

    /// Resolve a field's type name against the embedded types.
    ///
    /// Tries an exact name match first, then a match modulo a leading
    /// `scope + "/"` on either side, where `scope` is the connection's
    /// package (e.g. `sensor_msgs`). Primitive names never reach this
    /// lookup.
    pub fn resolve_embedded(
        &self,
        scope: &str,
        type_name: &str,
    ) -> Option<&EmbeddedMessageDef> {
        if let Some(def) = self
            .embedded_types
            .iter()
            .find(|e| e.type_name == type_name)
        {
            return Some(def);
        }

        if scope.is_empty() {
            return None;
        }

        let prefix = format!("{scope}/");
        self.embedded_types.iter().find(|e| {
            e.type_name.strip_prefix(&prefix) == Some(type_name)
                || type_name.strip_prefix(&prefix) == Some(e.type_name.as_str())
        })
    }
}
