//! Shape and type checks for inbound book payloads.
//!
//! The schema is a fixed list of field rules evaluated eagerly: every
//! violation is collected instead of stopping at the first one. Fields not
//! named by the schema are ignored.

use std::fmt;

use serde_json::{json, Map, Value};

/// JSON type a field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// String that must not be empty; used for the isbn, which is also a path segment.
    NonEmptyString,
    /// JSON integer within the 32-bit signed range. Numeric strings are rejected.
    Integer,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::NonEmptyString => "string",
            FieldKind::Integer => "integer",
        }
    }
}

/// A required field and the type it must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Every book field is required on create and on full update.
pub const BOOK_SCHEMA: &[FieldRule] = &[
    FieldRule::new("isbn", FieldKind::NonEmptyString),
    FieldRule::new("amazon_url", FieldKind::String),
    FieldRule::new("author", FieldKind::String),
    FieldRule::new("language", FieldKind::String),
    FieldRule::new("pages", FieldKind::Integer),
    FieldRule::new("publisher", FieldKind::String),
    FieldRule::new("title", FieldKind::String),
    FieldRule::new("year", FieldKind::Integer),
];

/// Why a field failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The payload itself is not a JSON object
    NotAnObject { found: &'static str },
    Missing,
    Empty,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    OutOfRange,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::NotAnObject { found } => write!(f, "expected object, found {}", found),
            ViolationKind::Missing => f.write_str("required"),
            ViolationKind::Empty => f.write_str("must not be empty"),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ViolationKind::OutOfRange => f.write_str("integer out of range"),
        }
    }
}

/// A single (field, reason) failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(field: &str, kind: ViolationKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }

    /// JSON shape used in error response details.
    pub fn to_detail(&self) -> Value {
        json!({
            "field": self.field,
            "error": self.kind.to_string(),
        })
    }
}

/// Check `payload` against `schema`. An empty result means valid.
pub fn validate(payload: &Value, schema: &[FieldRule]) -> Vec<Violation> {
    let Some(object) = payload.as_object() else {
        return vec![Violation::new(
            "$root",
            ViolationKind::NotAnObject {
                found: json_type_name(payload),
            },
        )];
    };

    schema
        .iter()
        .filter_map(|rule| check_field(object, rule))
        .collect()
}

fn check_field(object: &Map<String, Value>, rule: &FieldRule) -> Option<Violation> {
    let Some(value) = object.get(rule.name) else {
        return Some(Violation::new(rule.name, ViolationKind::Missing));
    };

    let kind = match (rule.kind, value) {
        (FieldKind::String, Value::String(_)) => return None,
        (FieldKind::NonEmptyString, Value::String(s)) if s.is_empty() => ViolationKind::Empty,
        (FieldKind::NonEmptyString, Value::String(_)) => return None,
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            let in_range = n.as_i64().is_some_and(|v| i32::try_from(v).is_ok());
            if in_range {
                return None;
            }
            ViolationKind::OutOfRange
        }
        (expected, found) => ViolationKind::WrongType {
            expected: expected.name(),
            found: json_type_name(found),
        },
    };

    Some(Violation::new(rule.name, kind))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
