//! Error types for the schema engine and the query executor.

use crate::domain::validator::ValidationReport;
use crate::storage::StoreError;
use thiserror::Error;

/// How an error is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    ServerError,
}

/// Failures of the physical table builder. Everything except `Store` is
/// detected before any DDL runs.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid identifier '{0}'.")]
    InvalidIdentifier(String),
    #[error("At least one column must be defined.")]
    NoColumns,
    #[error("Column '{0}' is defined more than once.")]
    DuplicateColumn(String),
    #[error("Primary key must be explicitly defined.")]
    MissingPrimaryKey,
    #[error("Only one column can be set as the primary key (got: {}).", .0.join(", "))]
    MultiplePrimaryKeys(Vec<String>),
    #[error("Unsupported field type: {0}")]
    UnsupportedType(String),
    #[error("Invalid default for column '{column}': {reason}")]
    InvalidDefault { column: String, reason: String },
    #[error("Table '{0}' already exists.")]
    TableExists(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BuildError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BuildError::Store(_) => ErrorClass::ServerError,
            _ => ErrorClass::BadRequest,
        }
    }
}

/// Failures of the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Table '{0}' is already registered.")]
    DuplicateTable(String),
    #[error("Registry entry for '{table}' is unreadable: {reason}")]
    Unreadable { table: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchemaError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SchemaError::DuplicateTable(_) => ErrorClass::BadRequest,
            SchemaError::Unreadable { .. } | SchemaError::Store(_) => ErrorClass::ServerError,
        }
    }
}

/// Failures of the data operations (upload, update, delete, search).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Table {0} not found in the database.")]
    TableNotFound(String),
    #[error("No columns found for table {0}.")]
    NoColumns(String),
    #[error("Invalid columns: {}.", .0.join(", "))]
    InvalidColumns(Vec<String>),
    #[error("Primary key column '{0}' does not exist in the table.")]
    InvalidPrimaryKey(String),
    /// Malformed or incomplete request shape.
    #[error("{0}")]
    InvalidRequest(String),
    #[error("No row found with {column} = {value}.")]
    RowNotFound { column: String, value: String },
    #[error("No records found matching the search criteria.")]
    NoMatches,
    #[error("Validation failed")]
    ValidationFailed(ValidationReport),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            QueryError::TableNotFound(_)
            | QueryError::NoColumns(_)
            | QueryError::RowNotFound { .. }
            | QueryError::NoMatches => ErrorClass::NotFound,
            QueryError::InvalidColumns(_)
            | QueryError::InvalidPrimaryKey(_)
            | QueryError::InvalidRequest(_)
            | QueryError::ValidationFailed(_) => ErrorClass::BadRequest,
            QueryError::Store(_) => ErrorClass::ServerError,
        }
    }
}
