//! Physical table builder: turns a list of declared columns into one
//! `CREATE TABLE` statement and runs it.

use crate::domain::error::BuildError;
use crate::domain::ident::{quote_ident, quote_literal, validate_ident};
use crate::domain::schema::ColumnDef;
use crate::domain::validator::json_kind_name;
use crate::storage::{Statement, StoreClient};
use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum length of a `string` column.
pub const VARCHAR_LEN: usize = 255;

/// Store-native column types a declared type can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    VarChar,
    Integer,
    Float,
    Boolean,
    Date,
}

impl PhysicalType {
    /// Maps a declared `data_type` (case-insensitive). `None` means unsupported.
    pub fn from_declared(data_type: &str) -> Option<Self> {
        match data_type.trim().to_lowercase().as_str() {
            "string" => Some(PhysicalType::VarChar),
            "int" | "integer" => Some(PhysicalType::Integer),
            "float" => Some(PhysicalType::Float),
            "boolean" => Some(PhysicalType::Boolean),
            "date" => Some(PhysicalType::Date),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            PhysicalType::VarChar => "VARCHAR(255)",
            PhysicalType::Integer => "INTEGER",
            PhysicalType::Float => "DOUBLE PRECISION",
            PhysicalType::Boolean => "BOOLEAN",
            PhysicalType::Date => "DATE",
        }
    }

    fn expects(&self) -> &'static str {
        match self {
            PhysicalType::VarChar => "a string",
            PhysicalType::Integer => "a whole number",
            PhysicalType::Float => "a number",
            PhysicalType::Boolean => "a boolean",
            PhysicalType::Date => "a YYYY-MM-DD string",
        }
    }

    /// Renders a DDL default literal. DDL cannot bind parameters, so the value
    /// must match the column type exactly before it is embedded.
    fn default_literal(&self, value: &JsonValue) -> Result<String, String> {
        match (self, value) {
            (PhysicalType::VarChar, JsonValue::String(s)) => {
                if s.chars().count() > VARCHAR_LEN {
                    return Err(format!("longer than {} characters", VARCHAR_LEN));
                }
                Ok(quote_literal(s))
            }
            (PhysicalType::Integer, JsonValue::Number(n)) if n.is_i64() || n.is_u64() => {
                match n.as_i64() {
                    Some(i) if i >= i32::MIN as i64 && i <= i32::MAX as i64 => Ok(i.to_string()),
                    _ => Err(format!("out of range for integer: {}", n)),
                }
            }
            (PhysicalType::Float, JsonValue::Number(n)) => Ok(n.to_string()),
            (PhysicalType::Boolean, JsonValue::Bool(b)) => {
                Ok(if *b { "TRUE" } else { "FALSE" }.to_string())
            }
            (PhysicalType::Date, JsonValue::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| quote_literal(&d.format("%Y-%m-%d").to_string()))
                .map_err(|_| format!("expected a YYYY-MM-DD date, got '{}'", s)),
            (t, v) => Err(format!("expected {}, got {}", t.expects(), json_kind_name(v))),
        }
    }
}

/// Validated DDL for one table, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTablePlan {
    pub table_name: String,
    pub primary_key: String,
    pub statement: Statement,
}

pub struct TableBuilder {
    store: Arc<dyn StoreClient>,
}

impl TableBuilder {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    /// Validates the column list and renders the DDL without touching the store.
    pub fn plan(table_name: &str, columns: &[ColumnDef]) -> Result<CreateTablePlan, BuildError> {
        if !validate_ident(table_name) {
            return Err(BuildError::InvalidIdentifier(table_name.to_string()));
        }
        if columns.is_empty() {
            return Err(BuildError::NoColumns);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for c in columns {
            if !validate_ident(&c.column_name) {
                return Err(BuildError::InvalidIdentifier(c.column_name.clone()));
            }
            if !seen.insert(c.column_name.as_str()) {
                return Err(BuildError::DuplicateColumn(c.column_name.clone()));
            }
        }

        let primary: Vec<&ColumnDef> = columns.iter().filter(|c| c.is_primary).collect();
        let primary_key = match primary.as_slice() {
            [] => return Err(BuildError::MissingPrimaryKey),
            [pk] => pk.column_name.clone(),
            many => {
                return Err(BuildError::MultiplePrimaryKeys(
                    many.iter().map(|c| c.column_name.clone()).collect(),
                ))
            }
        };

        let mut cols_sql: Vec<String> = Vec::with_capacity(columns.len());
        for c in columns {
            cols_sql.push(column_sql(c)?);
        }

        let sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(table_name),
            cols_sql.join(", ")
        );

        Ok(CreateTablePlan {
            table_name: table_name.to_string(),
            primary_key,
            statement: Statement::new(sql),
        })
    }

    /// Creates the physical table. Nothing is executed unless the whole column
    /// list is valid.
    pub async fn build(
        &self,
        table_name: &str,
        columns: &[ColumnDef],
    ) -> Result<CreateTablePlan, BuildError> {
        let plan = Self::plan(table_name, columns)?;
        match self.store.execute(&plan.statement).await {
            Ok(_) => {
                tracing::info!(table = %plan.table_name, primary_key = %plan.primary_key, "created table");
                Ok(plan)
            }
            Err(e) if e.is_duplicate_table() => Err(BuildError::TableExists(plan.table_name)),
            Err(e) => Err(e.into()),
        }
    }
}

fn column_sql(c: &ColumnDef) -> Result<String, BuildError> {
    let physical = PhysicalType::from_declared(&c.data_type)
        .ok_or_else(|| BuildError::UnsupportedType(c.data_type.trim().to_lowercase()))?;

    let mut col = format!("{} {}", quote_ident(&c.column_name), physical.sql());
    if c.is_primary {
        col.push_str(" PRIMARY KEY");
    } else {
        if !c.is_nullable {
            col.push_str(" NOT NULL");
        }
        if c.is_unique {
            col.push_str(" UNIQUE");
        }
    }

    if let Some(default) = c.default_value.as_ref().filter(|v| !v.is_null()) {
        let literal = physical
            .default_literal(default)
            .map_err(|reason| BuildError::InvalidDefault {
                column: c.column_name.clone(),
                reason,
            })?;
        col.push_str(" DEFAULT ");
        col.push_str(&literal);
    }
    Ok(col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::RecordingStore;
    use serde_json::json;

    fn people() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", "integer").primary(),
            ColumnDef::new("name", "string"),
        ]
    }

    #[test]
    fn plans_people_table() {
        let plan = TableBuilder::plan("people", &people()).unwrap();
        assert_eq!(plan.primary_key, "id");
        assert_eq!(
            plan.statement.sql,
            "CREATE TABLE \"people\" (\"id\" INTEGER PRIMARY KEY, \"name\" VARCHAR(255))"
        );
        assert!(plan.statement.params.is_empty());
    }

    #[test]
    fn maps_every_supported_type_and_constraint() {
        let columns = vec![
            ColumnDef::new("code", "String").primary(),
            ColumnDef::new("qty", "INT").not_null().default_value(json!(0)),
            ColumnDef::new("price", "float").default_value(json!(9.5)),
            ColumnDef::new("active", "boolean").default_value(json!(true)),
            ColumnDef::new("born", "date").unique().default_value(json!("2020-02-29")),
            ColumnDef::new("note", "string").default_value(json!("it's")),
        ];
        let plan = TableBuilder::plan("items", &columns).unwrap();
        assert_eq!(
            plan.statement.sql,
            "CREATE TABLE \"items\" (\
             \"code\" VARCHAR(255) PRIMARY KEY, \
             \"qty\" INTEGER NOT NULL DEFAULT 0, \
             \"price\" DOUBLE PRECISION DEFAULT 9.5, \
             \"active\" BOOLEAN DEFAULT TRUE, \
             \"born\" DATE UNIQUE DEFAULT '2020-02-29', \
             \"note\" VARCHAR(255) DEFAULT 'it''s')"
        );
    }

    #[test]
    fn null_default_means_no_default() {
        let columns = vec![
            ColumnDef::new("id", "integer").primary(),
            ColumnDef::new("name", "string").default_value(JsonValue::Null),
        ];
        let plan = TableBuilder::plan("t", &columns).unwrap();
        assert!(!plan.statement.sql.contains("DEFAULT"));
    }

    #[test]
    fn primary_key_count_is_enforced() {
        let none = vec![ColumnDef::new("id", "integer"), ColumnDef::new("name", "string")];
        assert!(matches!(
            TableBuilder::plan("t", &none),
            Err(BuildError::MissingPrimaryKey)
        ));

        let two = vec![
            ColumnDef::new("id", "integer").primary(),
            ColumnDef::new("name", "string").primary(),
        ];
        match TableBuilder::plan("t", &two) {
            Err(BuildError::MultiplePrimaryKeys(cols)) => assert_eq!(cols, vec!["id", "name"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn rejects_unsupported_types() {
        let columns = vec![
            ColumnDef::new("id", "integer").primary(),
            ColumnDef::new("tags", "Array"),
        ];
        match TableBuilder::plan("t", &columns) {
            Err(BuildError::UnsupportedType(t)) => assert_eq!(t, "array"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_identifiers_and_shapes() {
        assert!(matches!(
            TableBuilder::plan("bad name", &people()),
            Err(BuildError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            TableBuilder::plan("t", &[]),
            Err(BuildError::NoColumns)
        ));

        let injected = vec![ColumnDef::new("id\" INT); --", "integer").primary()];
        assert!(matches!(
            TableBuilder::plan("t", &injected),
            Err(BuildError::InvalidIdentifier(_))
        ));

        let dup = vec![
            ColumnDef::new("id", "integer").primary(),
            ColumnDef::new("id", "string"),
        ];
        assert!(matches!(
            TableBuilder::plan("t", &dup),
            Err(BuildError::DuplicateColumn(c)) if c == "id"
        ));
    }

    #[test]
    fn rejects_defaults_that_do_not_fit_the_column() {
        let cases = vec![
            ColumnDef::new("c", "integer").default_value(json!("5")),
            ColumnDef::new("c", "integer").default_value(json!(1.5)),
            ColumnDef::new("c", "integer").default_value(json!(3_000_000_000_i64)),
            ColumnDef::new("c", "boolean").default_value(json!(1)),
            ColumnDef::new("c", "date").default_value(json!("31/12/2020")),
            ColumnDef::new("c", "string").default_value(json!("x".repeat(256))),
        ];
        for c in cases {
            let columns = vec![ColumnDef::new("id", "integer").primary(), c.clone()];
            assert!(
                matches!(
                    TableBuilder::plan("t", &columns),
                    Err(BuildError::InvalidDefault { .. })
                ),
                "default {:?} should be rejected",
                c.default_value
            );
        }
    }

    #[tokio::test]
    async fn build_executes_nothing_when_invalid() {
        let store = Arc::new(RecordingStore::new());
        let builder = TableBuilder::new(store.clone());

        let columns = vec![ColumnDef::new("id", "integer"), ColumnDef::new("x", "uuid")];
        assert!(builder.build("t", &columns).await.is_err());
        assert!(store.attempted().is_empty());
    }

    #[tokio::test]
    async fn build_runs_the_planned_ddl() {
        let store = Arc::new(RecordingStore::new());
        let builder = TableBuilder::new(store.clone());

        let plan = builder.build("people", &people()).await.unwrap();
        assert_eq!(store.committed(), vec![plan.statement]);
    }

    #[tokio::test]
    async fn build_reports_existing_table() {
        let store = Arc::new(RecordingStore::new());
        store.fail_statement(0, Some("42P07"), "relation \"people\" already exists");
        let builder = TableBuilder::new(store.clone());

        assert!(matches!(
            builder.build("people", &people()).await,
            Err(BuildError::TableExists(t)) if t == "people"
        ));
    }
}
