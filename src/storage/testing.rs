//! In-memory store double for unit tests: a fixed catalog, scripted results,
//! and a log of every statement the code under test produced.

use crate::storage::store::{CatalogColumn, Row, Statement, StoreClient, StoreError};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingStore {
    tables: Mutex<BTreeMap<String, Vec<CatalogColumn>>>,
    affected: Mutex<VecDeque<u64>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    /// (statement index, SQLSTATE, message) of a scripted failure.
    failure: Mutex<Option<(usize, Option<String>, String)>>,
    attempted: Mutex<Vec<Statement>>,
    committed: Mutex<Vec<Statement>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the catalog; columns are `(name, catalog data type)`.
    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let cols = columns
            .iter()
            .map(|(n, t)| CatalogColumn::new(*n, *t))
            .collect();
        self.tables.lock().unwrap().insert(name.to_string(), cols);
        self
    }

    /// Scripts the affected-row count of the next executed statement (default 1).
    pub fn push_affected(&self, n: u64) {
        self.affected.lock().unwrap().push_back(n);
    }

    /// Scripts the result set of the next fetch (default empty).
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    /// Makes the `index`-th statement (0-based, over all statements seen) fail.
    pub fn fail_statement(&self, index: usize, code: Option<&str>, message: &str) {
        *self.failure.lock().unwrap() =
            Some((index, code.map(str::to_string), message.to_string()));
    }

    pub fn attempted(&self) -> Vec<Statement> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn committed(&self) -> Vec<Statement> {
        self.committed.lock().unwrap().clone()
    }

    fn record(&self, stmt: &Statement) -> Result<u64, StoreError> {
        let mut attempted = self.attempted.lock().unwrap();
        let index = attempted.len();
        attempted.push(stmt.clone());

        if let Some((fail_at, code, message)) = self.failure.lock().unwrap().as_ref() {
            if *fail_at == index {
                return Err(StoreError::Rejected {
                    code: code.clone(),
                    message: message.clone(),
                });
            }
        }
        Ok(self.affected.lock().unwrap().pop_front().unwrap_or(1))
    }
}

#[async_trait]
impl StoreClient for RecordingStore {
    async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError> {
        let n = self.record(stmt)?;
        self.committed.lock().unwrap().push(stmt.clone());
        Ok(n)
    }

    async fn execute_atomic(&self, stmts: &[Statement]) -> Result<Vec<u64>, StoreError> {
        let mut counts = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            counts.push(self.record(stmt)?);
        }
        self.committed.lock().unwrap().extend(stmts.iter().cloned());
        Ok(counts)
    }

    async fn fetch_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StoreError> {
        self.record(stmt)?;
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn catalog_tables(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn catalog_has_table(&self, table_name: &str) -> Result<bool, StoreError> {
        Ok(self.tables.lock().unwrap().contains_key(table_name))
    }

    async fn catalog_columns(&self, table_name: &str) -> Result<Vec<CatalogColumn>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
