//! Generic data operations over tables whose shape is only known at runtime.

use crate::domain::error::QueryError;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

pub mod builder;

pub use builder::QueryBuilder;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRequest {
    pub primary_key_column: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub primary_key_value: Option<JsonValue>,
    /// Column -> new value, applied in the given order.
    #[schema(value_type = Option<Object>)]
    pub update_data: Option<Map<String, JsonValue>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeleteRequest {
    pub primary_key_column: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub primary_key_value: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Column -> value equality filters, joined with AND.
    #[schema(value_type = Option<Object>)]
    pub search_params: Option<Map<String, JsonValue>>,
    pub order_by: Option<String>,
    /// `asc` or `desc`, any case. Defaults to `asc`.
    pub order_direction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn parse(raw: Option<&str>) -> Result<Self, QueryError> {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            None | Some("ASC") => Ok(OrderDirection::Asc),
            Some("DESC") => Ok(OrderDirection::Desc),
            Some(_) => Err(QueryError::InvalidRequest(format!(
                "Invalid order direction: {}. Use ASC or DESC.",
                raw.unwrap_or_default()
            ))),
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Cast target for a catalog data type, if it is one we bind through a cast.
pub fn sql_cast(data_type: &str) -> Option<&'static str> {
    let cast = match data_type {
        "character varying" => "varchar",
        "text" => "text",
        "integer" => "integer",
        "bigint" => "bigint",
        "smallint" => "smallint",
        "double precision" => "double precision",
        "real" => "real",
        "numeric" => "numeric",
        "boolean" => "boolean",
        "date" => "date",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "jsonb" => "jsonb",
        "json" => "json",
        "uuid" => "uuid",
        _ => return None,
    };
    Some(cast)
}

/// `$n`, cast to the column type when it has a known cast.
pub fn placeholder(index: usize, data_type: &str) -> String {
    match sql_cast(data_type) {
        Some(cast) => format!("${}::{}", index, cast),
        None => format!("${}", index),
    }
}

/// Renders a key value for messages: strings unquoted, everything else as JSON.
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_direction_is_case_insensitive_and_strict() {
        assert_eq!(OrderDirection::parse(None).unwrap(), OrderDirection::Asc);
        assert_eq!(OrderDirection::parse(Some("desc")).unwrap(), OrderDirection::Desc);
        assert_eq!(OrderDirection::parse(Some("Asc")).unwrap(), OrderDirection::Asc);
        assert!(matches!(
            OrderDirection::parse(Some("DESC; DROP TABLE people")),
            Err(QueryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn placeholders_carry_known_casts() {
        assert_eq!(placeholder(1, "character varying"), "$1::varchar");
        assert_eq!(placeholder(2, "timestamp with time zone"), "$2::timestamptz");
        assert_eq!(placeholder(3, "USER-DEFINED"), "$3");
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("abc")), "abc");
        assert_eq!(display_value(&json!(5)), "5");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
