//! Row validator: checks an upload batch against declared column types and
//! reports every offending row instead of stopping at the first one.

use crate::domain::schema::ColumnDef;
use crate::storage::{CatalogColumn, Row};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use utoipa::ToSchema;

/// One row of an upload batch, keys in the order they were received.
pub type InputRow = Row;

/// Columns with this name are never checked (usually store-generated).
pub const EXEMPT_COLUMN: &str = "id";

/// The JSON value kinds a declared column type can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    WholeNumber,
    RealNumber,
    Boolean,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// `None` for declared types the validator does not know; those accept
    /// any value.
    pub fn for_declared(data_type: &str) -> Option<Self> {
        let kind = match data_type.trim().to_lowercase().as_str() {
            "string" | "text" | "character varying" | "date" | "timestamp"
            | "timestamp with time zone" | "timestamp without time zone" => ValueKind::Text,
            "integer" | "int" | "bigint" | "smallint" => ValueKind::WholeNumber,
            "float" | "double precision" | "real" | "numeric" => ValueKind::RealNumber,
            "boolean" => ValueKind::Boolean,
            "array" => ValueKind::Sequence,
            "object" => ValueKind::Mapping,
            _ => return None,
        };
        Some(kind)
    }

    pub fn accepts(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (ValueKind::Text, JsonValue::String(_)) => true,
            (ValueKind::WholeNumber, JsonValue::Number(n)) => n.is_i64() || n.is_u64(),
            (ValueKind::RealNumber, JsonValue::Number(_)) => true,
            (ValueKind::Boolean, JsonValue::Bool(_)) => true,
            (ValueKind::Sequence, JsonValue::Array(_)) => true,
            (ValueKind::Mapping, JsonValue::Object(_)) => true,
            _ => false,
        }
    }
}

/// Short name of a JSON value's kind, used in messages.
pub fn json_kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// A column the rows are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedColumn {
    pub column_name: String,
    pub data_type: String,
}

impl ExpectedColumn {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

impl From<&CatalogColumn> for ExpectedColumn {
    fn from(c: &CatalogColumn) -> Self {
        Self::new(c.column_name.clone(), c.data_type.clone())
    }
}

impl From<&ColumnDef> for ExpectedColumn {
    fn from(c: &ColumnDef) -> Self {
        Self::new(c.column_name.clone(), c.data_type.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingField {
        field: String,
    },
    TypeMismatch {
        field: String,
        expected: String,
        actual: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingField { field } => write!(f, "Missing field: {}", field),
            Violation::TypeMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "Field '{}' has invalid type. Expected {}, got {}.",
                field, expected, actual
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InvalidEntry {
    /// 1-based position of the row in the batch.
    pub row_index: usize,
    #[schema(value_type = Object)]
    pub original_row: InputRow,
    pub error_messages: Vec<String>,
    #[serde(skip)]
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub invalid_entries: Vec<InvalidEntry>,
}

/// Checks every row against `schema`. Never fails; the report covers the whole
/// batch in input order.
pub fn validate(rows: &[InputRow], schema: &[ExpectedColumn]) -> ValidationReport {
    // Keyed by name, first position kept, last declared type wins.
    let mut expected: Vec<(&str, &str)> = Vec::with_capacity(schema.len());
    for col in schema {
        if col.column_name == EXEMPT_COLUMN {
            continue;
        }
        match expected.iter_mut().find(|(name, _)| *name == col.column_name) {
            Some(slot) => slot.1 = col.data_type.as_str(),
            None => expected.push((col.column_name.as_str(), col.data_type.as_str())),
        }
    }

    let invalid_entries: Vec<InvalidEntry> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let violations = check_row(row, &expected);
            if violations.is_empty() {
                return None;
            }
            Some(InvalidEntry {
                row_index: i + 1,
                original_row: row.clone(),
                error_messages: violations.iter().map(ToString::to_string).collect(),
                violations,
            })
        })
        .collect();

    ValidationReport {
        is_valid: invalid_entries.is_empty(),
        invalid_entries,
    }
}

fn check_row(row: &InputRow, expected: &[(&str, &str)]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (name, data_type) in expected {
        let Some(value) = row.get(*name) else {
            violations.push(Violation::MissingField {
                field: name.to_string(),
            });
            continue;
        };
        let Some(kind) = ValueKind::for_declared(data_type) else {
            continue;
        };
        if !kind.accepts(value) {
            violations.push(Violation::TypeMismatch {
                field: name.to_string(),
                expected: data_type.to_string(),
                actual: json_kind_name(value),
            });
        }
    }
    violations
}
