// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message definition schemas: AST and parser.

pub mod ast;
pub mod parser;

pub use ast::{
    ConstantDef, EmbeddedMessageDef, FieldDef, Member, MessageDef, ARRAY_DYNAMIC, ARRAY_NONE,
};
pub use parser::parse_definition;
