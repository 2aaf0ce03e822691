//! The dynamic table service.
//!
//! Orchestrates the schema engine and the data operations over one injected
//! store handle:
//! 1.  Creating a table: DDL plus registry entry, committed together.
//! 2.  Bulk upload: catalog whitelist, row validation, then one transaction of
//!     inserts.
//! 3.  Update, delete and search by whitelisted columns.

use crate::domain::error::{BuildError, ErrorClass, QueryError, SchemaError};
use crate::domain::inspect::MetadataInspector;
use crate::domain::query::{display_value, DeleteRequest, QueryBuilder, SearchRequest, UpdateRequest};
use crate::domain::schema::{
    ColumnDef, CreateTablePlan, LogicalSchema, RegisteredSchema, SchemaRegistry, TableBuilder,
};
use crate::domain::validator::{self, ExpectedColumn, InputRow};
use crate::storage::{CatalogColumn, Row, StoreClient, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Schema for table {0} not found in the system.")]
    NotRegistered(String),
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ServiceError::Build(e) => e.class(),
            ServiceError::Schema(e) => e.class(),
            ServiceError::Query(e) => e.class(),
            ServiceError::Store(_) => ErrorClass::ServerError,
            ServiceError::NotRegistered(_) => ErrorClass::NotFound,
        }
    }
}

/// A registered schema next to the columns the store currently reports.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableDescription {
    pub schema: RegisteredSchema,
    pub columns: Vec<CatalogColumn>,
}

pub struct TableService {
    store: Arc<dyn StoreClient>,
    builder: TableBuilder,
    registry: SchemaRegistry,
    inspector: MetadataInspector,
}

impl TableService {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            builder: TableBuilder::new(store.clone()),
            registry: SchemaRegistry::new(store.clone()),
            inspector: MetadataInspector::new(store.clone()),
            store,
        }
    }

    /// Prepares the service's own storage. Safe to call on every start.
    pub async fn init(&self) -> Result<(), ServiceError> {
        self.registry.ensure_storage().await?;
        Ok(())
    }

    pub fn builder(&self) -> &TableBuilder {
        &self.builder
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn inspector(&self) -> &MetadataInspector {
        &self.inspector
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ping().await?;
        Ok(())
    }

    /// Creates the physical table and registers its schema in one transaction.
    pub async fn create_table(
        &self,
        table_name: &str,
        columns: Vec<ColumnDef>,
    ) -> Result<CreateTablePlan, ServiceError> {
        let plan = TableBuilder::plan(table_name, &columns)?;
        if self.registry.is_registered(table_name).await? {
            return Err(SchemaError::DuplicateTable(table_name.to_string()).into());
        }

        let schema = LogicalSchema::new(table_name, columns);
        let statements = vec![
            plan.statement.clone(),
            SchemaRegistry::insert_statement(&schema)?,
        ];

        match self.store.execute_atomic(&statements).await {
            Ok(_) => {
                tracing::info!(
                    table = %plan.table_name,
                    primary_key = %plan.primary_key,
                    columns = schema.columns.len(),
                    "table created and registered"
                );
                Ok(plan)
            }
            Err(e) if e.is_duplicate_table() => {
                Err(BuildError::TableExists(plan.table_name).into())
            }
            Err(e) if e.is_unique_violation() => {
                Err(SchemaError::DuplicateTable(plan.table_name).into())
            }
            Err(e) => {
                tracing::error!(table = %table_name, error = %e, "create table failed");
                Err(BuildError::Store(e).into())
            }
        }
    }

    /// Validates and inserts a whole batch. Nothing is written unless every row
    /// passes validation and every insert succeeds.
    pub async fn upload(&self, table_name: &str, rows: &[InputRow]) -> Result<usize, ServiceError> {
        let whitelist = self.inspector.require_columns(table_name).await?;

        let expected: Vec<ExpectedColumn> =
            whitelist.columns().iter().map(ExpectedColumn::from).collect();
        let report = validator::validate(rows, &expected);
        if !report.is_valid {
            tracing::warn!(
                table = %table_name,
                rows = rows.len(),
                invalid = report.invalid_entries.len(),
                "upload rejected by validation"
            );
            return Err(QueryError::ValidationFailed(report).into());
        }

        let statements = QueryBuilder::new(&whitelist).insert(rows)?;
        if statements.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.store.execute_atomic(&statements).await {
            tracing::error!(table = %table_name, error = %e, "bulk insert failed, batch rolled back");
            return Err(QueryError::Store(e).into());
        }
        tracing::info!(table = %table_name, inserted = rows.len(), "rows inserted");
        Ok(rows.len())
    }

    /// Returns the affected-row count, which is never 0.
    pub async fn update(&self, table_name: &str, req: &UpdateRequest) -> Result<u64, ServiceError> {
        let whitelist = self.inspector.require_columns(table_name).await?;
        let (stmt, key) = QueryBuilder::new(&whitelist).update(req)?;

        let affected = self.store.execute(&stmt).await.map_err(QueryError::Store)?;
        if affected == 0 {
            return Err(QueryError::RowNotFound {
                column: key.column.to_string(),
                value: display_value(key.value),
            }
            .into());
        }
        tracing::info!(table = %table_name, key = %key.column, affected, "rows updated");
        Ok(affected)
    }

    pub async fn delete(&self, table_name: &str, req: &DeleteRequest) -> Result<u64, ServiceError> {
        let whitelist = self.inspector.require_columns(table_name).await?;
        let (stmt, key) = QueryBuilder::new(&whitelist).delete(req)?;

        let affected = self.store.execute(&stmt).await.map_err(QueryError::Store)?;
        if affected == 0 {
            return Err(QueryError::RowNotFound {
                column: key.column.to_string(),
                value: display_value(key.value),
            }
            .into());
        }
        tracing::info!(table = %table_name, key = %key.column, affected, "rows deleted");
        Ok(affected)
    }

    /// Every matching row; an empty result is an error.
    pub async fn search(&self, table_name: &str, req: &SearchRequest) -> Result<Vec<Row>, ServiceError> {
        let whitelist = self.inspector.require_columns(table_name).await?;
        let stmt = QueryBuilder::new(&whitelist).search(req)?;

        let rows = self.store.fetch_rows(&stmt).await.map_err(QueryError::Store)?;
        if rows.is_empty() {
            return Err(QueryError::NoMatches.into());
        }
        tracing::debug!(table = %table_name, rows = rows.len(), "search matched");
        Ok(rows)
    }

    pub async fn list_schemas(&self) -> Result<Vec<RegisteredSchema>, ServiceError> {
        Ok(self.registry.list().await?)
    }

    pub async fn describe(&self, table_name: &str) -> Result<TableDescription, ServiceError> {
        let schema = self
            .registry
            .get(table_name)
            .await?
            .ok_or_else(|| ServiceError::NotRegistered(table_name.to_string()))?;
        let columns = self.inspector.columns_of(table_name).await?;
        Ok(TableDescription { schema, columns })
    }
}
