//! Schema registry: persists logical schemas in the `dynamic_table_schemas`
//! table so they survive restarts and can be listed.

use crate::domain::error::SchemaError;
use crate::domain::schema::{LogicalSchema, RegisteredSchema};
use crate::storage::{Row, Statement, StoreClient};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const REGISTRY_TABLE: &str = "dynamic_table_schemas";

const SELECT_ENTRY: &str = "SELECT json_build_object(
        'table_name', table_name,
        'columns', columns,
        'created_at', created_at
    ) AS record
    FROM dynamic_table_schemas";

pub struct SchemaRegistry {
    store: Arc<dyn StoreClient>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    /// Creates the registry table if it does not exist yet.
    pub async fn ensure_storage(&self) -> Result<(), SchemaError> {
        self.store
            .execute(&Statement::new(
                "CREATE TABLE IF NOT EXISTS dynamic_table_schemas (
                    id BIGSERIAL PRIMARY KEY,
                    table_name TEXT NOT NULL UNIQUE,
                    columns JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
            ))
            .await?;
        Ok(())
    }

    /// The insert used to register `schema`; exposed so table creation can run
    /// it in the same transaction as the DDL.
    pub fn insert_statement(schema: &LogicalSchema) -> Result<Statement, SchemaError> {
        let columns = serde_json::to_value(&schema.columns).map_err(|e| SchemaError::Unreadable {
            table: schema.table_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Statement::with_params(
            "INSERT INTO dynamic_table_schemas (table_name, columns) VALUES ($1, $2::jsonb)",
            vec![JsonValue::from(schema.table_name.as_str()), columns],
        ))
    }

    pub async fn is_registered(&self, table_name: &str) -> Result<bool, SchemaError> {
        Ok(self.get(table_name).await?.is_some())
    }

    /// Records `schema`. Must only run after the physical table exists.
    pub async fn register(&self, schema: &LogicalSchema) -> Result<(), SchemaError> {
        if self.is_registered(&schema.table_name).await? {
            return Err(SchemaError::DuplicateTable(schema.table_name.clone()));
        }
        let stmt = Self::insert_statement(schema)?;
        match self.store.execute(&stmt).await {
            Ok(_) => Ok(()),
            // Lost a race with a concurrent registration.
            Err(e) if e.is_unique_violation() => {
                Err(SchemaError::DuplicateTable(schema.table_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, table_name: &str) -> Result<Option<RegisteredSchema>, SchemaError> {
        let stmt = Statement::with_params(
            format!("{} WHERE table_name = $1", SELECT_ENTRY),
            vec![JsonValue::from(table_name)],
        );
        let rows = self.store.fetch_rows(&stmt).await?;
        rows.into_iter().next().map(parse_entry).transpose()
    }

    pub async fn list(&self) -> Result<Vec<RegisteredSchema>, SchemaError> {
        let stmt = Statement::new(format!("{} ORDER BY table_name", SELECT_ENTRY));
        let rows = self.store.fetch_rows(&stmt).await?;
        rows.into_iter().map(parse_entry).collect()
    }
}

fn parse_entry(row: Row) -> Result<RegisteredSchema, SchemaError> {
    let table = row
        .get("table_name")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>")
        .to_string();
    serde_json::from_value(JsonValue::Object(row)).map_err(|e| SchemaError::Unreadable {
        table,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::ColumnDef;
    use crate::storage::testing::RecordingStore;
    use serde_json::json;

    fn people() -> LogicalSchema {
        LogicalSchema::new(
            "people",
            vec![
                ColumnDef::new("id", "integer").primary(),
                ColumnDef::new("name", "string"),
            ],
        )
    }

    fn entry_row() -> Row {
        json!({
            "table_name": "people",
            "columns": [
                {"column_name": "id", "data_type": "integer", "is_primary": true},
                {"column_name": "name", "data_type": "string"}
            ],
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[tokio::test]
    async fn register_inserts_columns_as_json() {
        let store = Arc::new(RecordingStore::new());
        let registry = SchemaRegistry::new(store.clone());

        registry.register(&people()).await.unwrap();

        let committed = store.committed();
        assert_eq!(committed.len(), 1);
        assert!(committed[0].sql.starts_with("INSERT INTO dynamic_table_schemas"));
        assert_eq!(committed[0].params[0], json!("people"));
        assert_eq!(committed[0].params[1][0]["column_name"], json!("id"));
        assert_eq!(committed[0].params[1][0]["is_primary"], json!(true));
        assert_eq!(committed[0].params[1][1]["is_nullable"], json!(true));
    }

    #[tokio::test]
    async fn register_rejects_known_tables() {
        let store = Arc::new(RecordingStore::new());
        store.push_rows(vec![entry_row()]);
        let registry = SchemaRegistry::new(store.clone());

        assert!(matches!(
            registry.register(&people()).await,
            Err(SchemaError::DuplicateTable(t)) if t == "people"
        ));
        assert!(store.committed().is_empty());
    }

    #[tokio::test]
    async fn unique_violation_is_a_duplicate() {
        let store = Arc::new(RecordingStore::new());
        // statement 0 is the lookup, statement 1 the insert
        store.fail_statement(1, Some("23505"), "duplicate key value");
        let registry = SchemaRegistry::new(store.clone());

        assert!(matches!(
            registry.register(&people()).await,
            Err(SchemaError::DuplicateTable(_))
        ));
    }

    #[tokio::test]
    async fn get_reads_back_an_entry() {
        let store = Arc::new(RecordingStore::new());
        store.push_rows(vec![entry_row()]);
        let registry = SchemaRegistry::new(store.clone());

        let entry = registry.get("people").await.unwrap().unwrap();
        assert_eq!(entry.table_name, "people");
        assert_eq!(entry.columns, people().columns);
        assert_eq!(store.attempted()[0].params, vec![json!("people")]);
    }

    #[tokio::test]
    async fn list_surfaces_unreadable_entries() {
        let store = Arc::new(RecordingStore::new());
        store.push_rows(vec![json!({"table_name": "broken", "columns": 5})
            .as_object()
            .cloned()
            .unwrap()]);
        let registry = SchemaRegistry::new(store);

        assert!(matches!(
            registry.list().await,
            Err(SchemaError::Unreadable { table, .. }) if table == "broken"
        ));
    }
}
