//! The store-client contract.
//!
//! Everything the service knows about the relational engine goes through
//! [`StoreClient`]: parameterized statement execution, row fetching, one
//! transactional batch primitive, and catalog lookups. The PostgreSQL
//! implementation lives in [`super::postgres`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use utoipa::ToSchema;

/// A result row as a column name -> value mapping.
pub type Row = Map<String, JsonValue>;

/// SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for `duplicate_table`.
pub const DUPLICATE_TABLE: &str = "42P07";

/// A SQL statement with positional (`$1`, `$2`, ...) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<JsonValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<JsonValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// One column as reported by the store catalog (`information_schema.columns`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogColumn {
    pub column_name: String,
    /// Catalog data type, e.g. `character varying`, `integer`, `date`.
    pub data_type: String,
    pub is_nullable: bool,
}

impl CatalogColumn {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    /// Raised by stores that are not backed by sqlx, or when a result has an
    /// unexpected shape.
    #[error("{message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        StoreError::Rejected {
            code: None,
            message: message.into(),
        }
    }

    /// SQLSTATE of the failing statement, when the engine reported one.
    pub fn code(&self) -> Option<String> {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
            StoreError::Database(_) => None,
            StoreError::Rejected { code, .. } => code.clone(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code().as_deref() == Some(UNIQUE_VIOLATION)
    }

    pub fn is_duplicate_table(&self) -> bool {
        self.code().as_deref() == Some(DUPLICATE_TABLE)
    }
}

/// Capability the core needs from the backing relational store.
///
/// Implementations must release every connection/transaction they open before
/// returning, on success and on failure.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Runs one statement and reports the affected-row count.
    async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError>;

    /// Runs all statements in order inside one transaction. The first failure
    /// rolls the whole batch back and is returned.
    async fn execute_atomic(&self, stmts: &[Statement]) -> Result<Vec<u64>, StoreError>;

    /// Runs a query whose first output column is a JSON object per row
    /// (built with `row_to_json` / `json_build_object`).
    async fn fetch_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StoreError>;

    /// Names of the base tables visible in the configured schema.
    async fn catalog_tables(&self) -> Result<Vec<String>, StoreError>;

    async fn catalog_has_table(&self, table_name: &str) -> Result<bool, StoreError>;

    /// Columns of `table_name` in ordinal order (empty when the table is unknown).
    async fn catalog_columns(&self, table_name: &str) -> Result<Vec<CatalogColumn>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
