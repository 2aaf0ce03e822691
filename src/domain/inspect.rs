//! Metadata inspector: the store catalog is the ground truth for which tables
//! exist and which column names a request may reference.

use crate::domain::error::QueryError;
use crate::domain::ident::validate_ident;
use crate::domain::schema::REGISTRY_TABLE;
use crate::storage::{CatalogColumn, StoreClient, StoreError};
use std::sync::Arc;

/// Tables owned by the service itself. They are invisible to data operations.
pub const INTERNAL_TABLES: &[&str] = &[REGISTRY_TABLE];

fn is_internal(table_name: &str) -> bool {
    INTERNAL_TABLES.contains(&table_name)
}

/// The live column set of one table. Only names taken from here are ever
/// embedded in generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Whitelist {
    table: String,
    columns: Vec<CatalogColumn>,
}

impl Whitelist {
    pub fn new(table: impl Into<String>, columns: Vec<CatalogColumn>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get(&self, column_name: &str) -> Option<&CatalogColumn> {
        self.columns.iter().find(|c| c.column_name == column_name)
    }

    pub fn contains(&self, column_name: &str) -> bool {
        self.get(column_name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name.as_str()).collect()
    }

    pub fn columns(&self) -> &[CatalogColumn] {
        &self.columns
    }
}

pub struct MetadataInspector {
    store: Arc<dyn StoreClient>,
}

impl MetadataInspector {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, StoreError> {
        if is_internal(table_name) {
            return Ok(false);
        }
        self.store.catalog_has_table(table_name).await
    }

    /// Columns in ordinal order; empty for unknown or internal tables.
    pub async fn columns_of(&self, table_name: &str) -> Result<Vec<CatalogColumn>, StoreError> {
        if is_internal(table_name) {
            return Ok(Vec::new());
        }
        self.store.catalog_columns(table_name).await
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut tables = self.store.catalog_tables().await?;
        tables.retain(|t| !is_internal(t));
        Ok(tables)
    }

    /// Existence check plus column lookup, as every data operation needs.
    pub async fn require_columns(&self, table_name: &str) -> Result<Whitelist, QueryError> {
        // A name that could never be a table is reported like any missing one.
        if !validate_ident(table_name) || !self.table_exists(table_name).await? {
            return Err(QueryError::TableNotFound(table_name.to_string()));
        }
        let columns = self.columns_of(table_name).await?;
        if columns.is_empty() {
            return Err(QueryError::NoColumns(table_name.to_string()));
        }
        Ok(Whitelist::new(table_name, columns))
    }
}
