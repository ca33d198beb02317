//! Keyset cursor tokens.
//!
//! A cursor is the sort tuple of the last hit on a page. It travels as an
//! ordered list of strings (one `searchAfterKey` parameter per position) and
//! is decoded against the positional schema of the active sort, never by
//! inspecting token content.

use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Int(i64),
    Float(f64),
    /// Tie-breaker value carried verbatim.
    Raw(String),
    /// Sort value of a document missing the field.
    Null,
}

pub type Cursor = Vec<SortValue>;

/// Expected type of one cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSlot {
    Int,
    Float,
    Opaque,
}

const NULL_TOKEN: &str = "null";

impl SortValue {
    pub fn to_token(&self) -> String {
        match self {
            SortValue::Int(i) => i.to_string(),
            // shortest round-trip form; also covers inf, -inf and NaN
            SortValue::Float(f) => f.to_string(),
            SortValue::Raw(s) => s.clone(),
            SortValue::Null => NULL_TOKEN.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            SortValue::Int(i) => json!(i),
            SortValue::Float(f) if f.is_finite() => json!(f),
            SortValue::Float(f) if f.is_nan() => json!("NaN"),
            SortValue::Float(f) if *f > 0.0 => json!("Infinity"),
            SortValue::Float(_) => json!("-Infinity"),
            SortValue::Raw(s) => json!(s),
            SortValue::Null => JsonValue::Null,
        }
    }

    /// Reads one entry of an engine hit's sort array.
    pub fn from_json(v: &JsonValue) -> Self {
        match v {
            JsonValue::Null => SortValue::Null,
            JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SortValue::Int(i),
                (None, Some(f)) if !n.is_u64() => SortValue::Float(f),
                _ => SortValue::Raw(n.to_string()),
            },
            JsonValue::String(s) => match s.as_str() {
                "Infinity" => SortValue::Float(f64::INFINITY),
                "-Infinity" => SortValue::Float(f64::NEG_INFINITY),
                "NaN" => SortValue::Float(f64::NAN),
                _ => SortValue::Raw(s.clone()),
            },
            other => SortValue::Raw(other.to_string()),
        }
    }
}

pub fn encode(values: &[SortValue]) -> Vec<String> {
    values.iter().map(SortValue::to_token).collect()
}

/// Decodes `tokens` against `schema`. Anything that does not fit the schema
/// (empty input, wrong arity, unparsable number) yields `None`, which callers
/// treat as "start from the beginning".
pub fn decode(tokens: &[String], schema: &[CursorSlot]) -> Option<Cursor> {
    if tokens.is_empty() || tokens.len() != schema.len() {
        if !tokens.is_empty() {
            tracing::debug!(
                tokens = tokens.len(),
                expected = schema.len(),
                "cursor arity mismatch; restarting"
            );
        }
        return None;
    }
    tokens
        .iter()
        .zip(schema)
        .map(|(token, slot)| decode_one(token, *slot))
        .collect()
}

fn decode_one(token: &str, slot: CursorSlot) -> Option<SortValue> {
    match slot {
        CursorSlot::Opaque => Some(SortValue::Raw(token.to_string())),
        _ if token == NULL_TOKEN => Some(SortValue::Null),
        CursorSlot::Int => token.parse().ok().map(SortValue::Int),
        CursorSlot::Float => token.parse().ok().map(SortValue::Float),
    }
}
