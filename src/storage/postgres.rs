//! PostgreSQL store client backed by a `sqlx` connection pool.

use crate::domain::ident::quote_ident;
use crate::storage::store::{CatalogColumn, Row, Statement, StoreClient, StoreError};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{Executor, PgPool, Postgres, Row as _};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    /// Wraps an existing pool. Catalog lookups are scoped to `schema`; the pool's
    /// `search_path` should point at the same schema.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connects a pool whose connections resolve unqualified names in `schema`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        schema: &str,
    ) -> Result<Self, StoreError> {
        let search_path = format!("SET search_path TO {}", quote_ident(schema));
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(move |conn, _meta| {
                let sql = search_path.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

/// Binds a JSON value with the closest native Postgres type. Placeholders carry
/// explicit casts to the target column type, so only the value family matters.
fn bind_json<'q>(query: PgQuery<'q>, value: &'q JsonValue) -> PgQuery<'q> {
    match value {
        JsonValue::Null => query.bind::<Option<String>>(None),
        JsonValue::Bool(b) => query.bind(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        JsonValue::String(s) => query.bind(s.as_str()),
        JsonValue::Array(_) | JsonValue::Object(_) => query.bind(sqlx::types::Json(value)),
    }
}

fn build_query(stmt: &Statement) -> PgQuery<'_> {
    let mut query = sqlx::query(&stmt.sql);
    for param in &stmt.params {
        query = bind_json(query, param);
    }
    query
}

#[async_trait]
impl StoreClient for PgStore {
    async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError> {
        tracing::debug!(sql = %stmt.sql, bind_count = stmt.params.len(), "executing statement");
        let done = build_query(stmt).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn execute_atomic(&self, stmts: &[Statement]) -> Result<Vec<u64>, StoreError> {
        let mut transaction = self.pool.begin().await?;
        let mut counts = Vec::with_capacity(stmts.len());

        for (idx, stmt) in stmts.iter().enumerate() {
            tracing::debug!(sql = %stmt.sql, bind_count = stmt.params.len(), idx, "executing statement in transaction");
            match build_query(stmt).execute(&mut *transaction).await {
                Ok(done) => counts.push(done.rows_affected()),
                Err(e) => {
                    if let Err(rollback_err) = transaction.rollback().await {
                        tracing::warn!(error = %rollback_err, "rollback failed after statement error");
                    }
                    return Err(e.into());
                }
            }
        }

        transaction.commit().await?;
        Ok(counts)
    }

    async fn fetch_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StoreError> {
        tracing::debug!(sql = %stmt.sql, bind_count = stmt.params.len(), "fetching rows");
        let rows = build_query(stmt).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let record: JsonValue = row.try_get(0)?;
            match record {
                JsonValue::Object(map) => out.push(map),
                other => {
                    return Err(StoreError::rejected(format!(
                        "expected a JSON object per row, got {}",
                        other
                    )))
                }
            }
        }
        Ok(out)
    }

    async fn catalog_tables(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT table_name::text AS table_name
             FROM information_schema.tables
             WHERE table_schema = $1 AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for r in rows {
            tables.push(r.try_get::<String, _>("table_name")?);
        }
        Ok(tables)
    }

    async fn catalog_has_table(&self, table_name: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE'
             )",
        )
        .bind(&self.schema)
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn catalog_columns(&self, table_name: &str) -> Result<Vec<CatalogColumn>, StoreError> {
        let rows = sqlx::query(
            "SELECT column_name::text AS column_name,
                    data_type::text AS data_type,
                    is_nullable::text AS is_nullable
             FROM information_schema.columns
             WHERE table_schema = $1 AND table_name = $2
             ORDER BY ordinal_position",
        )
        .bind(&self.schema)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for r in rows {
            let is_nullable: String = r.try_get("is_nullable")?;
            columns.push(CatalogColumn {
                column_name: r.try_get("column_name")?,
                data_type: r.try_get("data_type")?,
                is_nullable: is_nullable.eq_ignore_ascii_case("YES"),
            });
        }
        Ok(columns)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
