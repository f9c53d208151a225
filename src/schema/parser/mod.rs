// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message definition parser.
//!
//! The Pest grammar (`msg.pest`) segments a definition into the root
//! member lines and `MSG:`-headed embedded sections, skipping comments,
//! blank lines, and 80-`=` separator lines anywhere. Each member line is
//! then parsed by hand into a field or constant. `SOI`/`EOI` anchoring
//! makes the parse consume-all-or-fail; failures carry a 30-byte context
//! window at the failure position.

use pest::Parser;
use pest_derive::Parser;

use crate::core::error::{BagError, Result};
use crate::schema::ast::{
    ConstantDef, EmbeddedMessageDef, FieldDef, Member, MessageDef, ARRAY_DYNAMIC, ARRAY_NONE,
};

/// Bytes of input reported alongside a parse failure.
const ERROR_CONTEXT_LEN: usize = 30;

/// Pest parser for embedded message definitions.
#[derive(Parser)]
#[grammar = "schema/parser/msg.pest"]
struct MsgParser;

/// Parse a connection's `message_definition` text.
///
/// `topic` only labels errors; the definition itself carries no topic.
pub fn parse_definition(topic: &str, definition: &str) -> Result<MessageDef> {
    let pairs = MsgParser::parse(Rule::schema, definition)
        .map_err(|e| BagError::schema_parse(topic, pest_error_context(definition, &e)))?;

    let mut def = MessageDef::default();

    for pair in pairs {
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::EOI => {}
                Rule::root_def => {
                    for line in item.into_inner() {
                        if line.as_rule() == Rule::member_line {
                            def.members.push(parse_member(topic, line.as_str())?);
                        }
                    }
                }
                Rule::embedded_def => {
                    let mut inner = item.into_inner();
                    let header = inner
                        .next()
                        .ok_or_else(|| BagError::schema_parse(topic, "empty MSG: section"))?;
                    let type_name = parse_msg_header(topic, header.as_str())?;

                    let mut members = Vec::new();
                    for line in inner {
                        if line.as_rule() == Rule::member_line {
                            members.push(parse_member(topic, line.as_str())?);
                        }
                    }

                    def.embedded_types.push(EmbeddedMessageDef { type_name, members });
                }
                _ => {}
            }
        }
    }

    Ok(def)
}

/// The `std_msgs` package lives in the global namespace; drop its prefix
/// so `Header` and `std_msgs/Header` are the same name.
fn strip_std_msgs(name: &str) -> &str {
    name.strip_prefix("std_msgs/").unwrap_or(name)
}

fn comment_stripped(line: &str) -> &str {
    line.find('#').map_or(line, |at| &line[..at])
}

fn member_error(topic: &str, line: &str) -> BagError {
    BagError::schema_parse(topic, context_at(line, 0))
}

/// Parse the type name out of a `MSG: <name>` section header.
fn parse_msg_header(topic: &str, raw: &str) -> Result<String> {
    let name = raw.strip_prefix("MSG:").unwrap_or(raw);
    let name = strip_std_msgs(comment_stripped(name).trim());
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(member_error(topic, raw.trim()));
    }
    Ok(name.to_string())
}

/// Parse one member line into a field or constant.
fn parse_member(topic: &str, raw: &str) -> Result<Member> {
    let line = comment_stripped(raw).trim();

    // A '=' can only come from a constant declaration; field identifiers
    // exclude it.
    if let Some(eq) = line.find('=') {
        let decl = line[..eq].trim_end();
        let value = line[eq + 1..].trim().to_string();

        let mut tokens = decl.split_whitespace();
        let (type_name, const_name) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(type_name), Some(const_name), None) => (type_name, const_name),
            _ => return Err(member_error(topic, line)),
        };

        return Ok(Member::Constant(ConstantDef {
            type_name: strip_std_msgs(type_name).to_string(),
            name: const_name.to_string(),
            value,
        }));
    }

    let mut tokens = line.split_whitespace();
    let (type_spec, field_name) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(type_spec), Some(field_name), None) => (type_spec, field_name),
        _ => return Err(member_error(topic, line)),
    };
    if field_name.contains('[') || field_name.contains(']') {
        return Err(member_error(topic, line));
    }

    let (base, array_size) = parse_type_spec(topic, line, type_spec)?;
    Ok(Member::Field(FieldDef {
        type_name: strip_std_msgs(base).to_string(),
        array_size,
        name: field_name.to_string(),
    }))
}

/// Split a type token into its base name and array size.
fn parse_type_spec<'a>(topic: &str, line: &str, spec: &'a str) -> Result<(&'a str, i32)> {
    let open = match spec.find('[') {
        None => return Ok((spec, ARRAY_NONE)),
        Some(open) => open,
    };

    let base = &spec[..open];
    let inner = spec[open..]
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'));
    let inner = match (base.is_empty(), inner) {
        (false, Some(inner)) => inner,
        _ => return Err(member_error(topic, line)),
    };

    if inner.is_empty() {
        return Ok((base, ARRAY_DYNAMIC));
    }
    match inner.parse::<u32>() {
        Ok(n) if n > 0 && n <= i32::MAX as u32 => Ok((base, n as i32)),
        _ => Err(member_error(topic, line)),
    }
}

fn pest_error_context(definition: &str, err: &pest::error::Error<Rule>) -> String {
    let pos = match &err.location {
        pest::error::InputLocation::Pos(pos) => *pos,
        pest::error::InputLocation::Span((start, _)) => *start,
    };
    context_at(definition, pos)
}

fn context_at(text: &str, pos: usize) -> String {
    let bytes = text.as_bytes();
    let start = pos.min(bytes.len());
    let end = (start + ERROR_CONTEXT_LEN).min(bytes.len());
    String::from_utf8_lossy(&bytes[start..end]).into_owned()
}
