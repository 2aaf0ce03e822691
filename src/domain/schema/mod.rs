//! Logical schemas: the client's description of a table, independent of the
//! physical table that gets created for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

pub mod builder;
pub mod registry;

pub use builder::{CreateTablePlan, PhysicalType, TableBuilder};
pub use registry::{SchemaRegistry, REGISTRY_TABLE};

fn default_nullable() -> bool {
    true
}

/// One client-declared column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnDef {
    pub column_name: String,
    /// Declared type, e.g. `string`, `integer`, `float`, `boolean`, `date`.
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub default_value: Option<JsonValue>,
    #[serde(default)]
    pub is_primary: bool,
}

impl ColumnDef {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_unique: false,
            default_value: None,
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogicalSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
}

impl LogicalSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_primary)
    }
}

/// A logical schema as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegisteredSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
    pub created_at: DateTime<Utc>,
}
