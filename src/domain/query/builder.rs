//! Statement builder for insert, update, delete and search.
//!
//! Identifiers come only from the table's [`Whitelist`]; every value is a bound
//! parameter.

use crate::domain::error::QueryError;
use crate::domain::ident::quote_ident;
use crate::domain::inspect::Whitelist;
use crate::domain::query::{placeholder, DeleteRequest, OrderDirection, SearchRequest, UpdateRequest};
use crate::domain::validator::InputRow;
use crate::storage::Statement;
use serde_json::{Map, Value as JsonValue};

const MISSING_UPDATE_FIELDS: &str =
    "Missing required fields: 'primary_key_column', 'primary_key_value', or 'update_data'.";
const MISSING_DELETE_FIELDS: &str =
    "Missing required fields: 'primary_key_column' or 'primary_key_value'.";
const MISSING_SEARCH_PARAMS: &str = "Missing 'search_params' in request.";

/// A primary-key column and value taken from a request.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRef<'r> {
    pub column: &'r str,
    pub value: &'r JsonValue,
}

pub struct QueryBuilder<'a> {
    whitelist: &'a Whitelist,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(whitelist: &'a Whitelist) -> Self {
        Self { whitelist }
    }

    fn table(&self) -> String {
        quote_ident(self.whitelist.table())
    }

    fn data_type(&self, column: &str) -> &str {
        self.whitelist
            .get(column)
            .map(|c| c.data_type.as_str())
            .unwrap_or_default()
    }

    /// Keys outside the whitelist, in first-seen order without repeats.
    fn unknown_columns<'k>(&self, keys: impl IntoIterator<Item = &'k String>) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for key in keys {
            if !self.whitelist.contains(key) && !unknown.contains(key) {
                unknown.push(key.clone());
            }
        }
        unknown
    }

    /// Equality conditions (or assignments) over `pairs`, numbering placeholders
    /// from `first`.
    fn assignments(&self, pairs: &Map<String, JsonValue>, first: usize) -> Vec<String> {
        pairs
            .keys()
            .enumerate()
            .map(|(i, col)| {
                format!(
                    "{} = {}",
                    quote_ident(col),
                    placeholder(first + i, self.data_type(col))
                )
            })
            .collect()
    }

    /// One `INSERT` per row listing exactly that row's keys.
    pub fn insert(&self, rows: &[InputRow]) -> Result<Vec<Statement>, QueryError> {
        let unknown = self.unknown_columns(rows.iter().flat_map(|r| r.keys()));
        if !unknown.is_empty() {
            return Err(QueryError::InvalidColumns(unknown));
        }

        let table = self.table();
        let statements = rows
            .iter()
            .map(|row| {
                if row.is_empty() {
                    return Statement::new(format!("INSERT INTO {} DEFAULT VALUES", table));
                }
                let columns: Vec<String> = row.keys().map(|k| quote_ident(k)).collect();
                let values: Vec<String> = row
                    .keys()
                    .enumerate()
                    .map(|(i, k)| placeholder(i + 1, self.data_type(k)))
                    .collect();
                Statement::with_params(
                    format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        table,
                        columns.join(", "),
                        values.join(", ")
                    ),
                    row.values().cloned().collect(),
                )
            })
            .collect();
        Ok(statements)
    }

    pub fn update<'r>(&self, req: &'r UpdateRequest) -> Result<(Statement, KeyRef<'r>), QueryError> {
        let (Some(key), Some(data)) = (
            required_key(req.primary_key_column.as_deref(), req.primary_key_value.as_ref()),
            req.update_data.as_ref().filter(|d| !d.is_empty()),
        ) else {
            return Err(QueryError::InvalidRequest(MISSING_UPDATE_FIELDS.to_string()));
        };

        let unknown = self.unknown_columns(data.keys());
        if !unknown.is_empty() {
            return Err(QueryError::InvalidColumns(unknown));
        }
        self.check_key(&key)?;

        let set_clause = self.assignments(data, 1).join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table(),
            set_clause,
            quote_ident(key.column),
            placeholder(data.len() + 1, self.data_type(key.column))
        );
        let mut params: Vec<JsonValue> = data.values().cloned().collect();
        params.push(key.value.clone());
        Ok((Statement::with_params(sql, params), key))
    }

    pub fn delete<'r>(&self, req: &'r DeleteRequest) -> Result<(Statement, KeyRef<'r>), QueryError> {
        let key = required_key(req.primary_key_column.as_deref(), req.primary_key_value.as_ref())
            .ok_or_else(|| QueryError::InvalidRequest(MISSING_DELETE_FIELDS.to_string()))?;
        self.check_key(&key)?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table(),
            quote_ident(key.column),
            placeholder(1, self.data_type(key.column))
        );
        Ok((Statement::with_params(sql, vec![key.value.clone()]), key))
    }

    /// `SELECT` producing one JSON object per matching row.
    pub fn search(&self, req: &SearchRequest) -> Result<Statement, QueryError> {
        let params = req
            .search_params
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| QueryError::InvalidRequest(MISSING_SEARCH_PARAMS.to_string()))?;

        let mut unknown = self.unknown_columns(params.keys());
        if let Some(order_by) = &req.order_by {
            if !self.whitelist.contains(order_by) && !unknown.contains(order_by) {
                unknown.push(order_by.clone());
            }
        }
        if !unknown.is_empty() {
            return Err(QueryError::InvalidColumns(unknown));
        }
        let order = match &req.order_by {
            Some(order_by) => Some((order_by, OrderDirection::parse(req.order_direction.as_deref())?)),
            None => None,
        };

        let table = self.table();
        let mut sql = format!(
            "SELECT row_to_json({}.*) AS record FROM {} WHERE {}",
            table,
            table,
            self.assignments(params, 1).join(" AND ")
        );
        if let Some((order_by, direction)) = order {
            sql.push_str(&format!(" ORDER BY {} {}", quote_ident(order_by), direction.sql()));
        }
        Ok(Statement::with_params(sql, params.values().cloned().collect()))
    }

    fn check_key(&self, key: &KeyRef<'_>) -> Result<(), QueryError> {
        if self.whitelist.contains(key.column) {
            Ok(())
        } else {
            Err(QueryError::InvalidPrimaryKey(key.column.to_string()))
        }
    }
}

/// Both parts of a key must be present; `0` and `""` are valid values, `null`
/// is not.
fn required_key<'r>(column: Option<&'r str>, value: Option<&'r JsonValue>) -> Option<KeyRef<'r>> {
    let column = column.filter(|c| !c.is_empty())?;
    let value = value.filter(|v| !v.is_null())?;
    Some(KeyRef { column, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CatalogColumn;
    use serde_json::json;

    fn people() -> Whitelist {
        Whitelist::new(
            "people",
            vec![
                CatalogColumn::new("id", "integer"),
                CatalogColumn::new("name", "character varying"),
                CatalogColumn::new("born", "date"),
            ],
        )
    }

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_lists_each_rows_own_keys() {
        let wl = people();
        let rows = vec![
            map(json!({"name": "Alice", "id": 1})),
            map(json!({"name": "Bob"})),
            map(json!({})),
        ];
        let stmts = QueryBuilder::new(&wl).insert(&rows).unwrap();

        assert_eq!(
            stmts[0].sql,
            "INSERT INTO \"people\" (\"name\", \"id\") VALUES ($1::varchar, $2::integer)"
        );
        assert_eq!(stmts[0].params, vec![json!("Alice"), json!(1)]);
        assert_eq!(stmts[1].sql, "INSERT INTO \"people\" (\"name\") VALUES ($1::varchar)");
        assert_eq!(stmts[2].sql, "INSERT INTO \"people\" DEFAULT VALUES");
        assert!(stmts[2].params.is_empty());
    }

    #[test]
    fn insert_rejects_keys_outside_the_whitelist() {
        let wl = people();
        let rows = vec![
            map(json!({"name": "Alice", "age": 3})),
            map(json!({"name\" ) ; --": 1, "age": 4})),
        ];
        match QueryBuilder::new(&wl).insert(&rows) {
            Err(QueryError::InvalidColumns(cols)) => {
                assert_eq!(cols, vec!["age", "name\" ) ; --"])
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(QueryBuilder::new(&wl).insert(&[]).unwrap().is_empty());
    }

    #[test]
    fn update_binds_data_then_key() {
        let wl = people();
        let req = UpdateRequest {
            primary_key_column: Some("id".into()),
            primary_key_value: Some(json!(1)),
            update_data: Some(map(json!({"name": "Alicia", "born": "1990-01-02"}))),
        };
        let (stmt, key) = QueryBuilder::new(&wl).update(&req).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"people\" SET \"name\" = $1::varchar, \"born\" = $2::date WHERE \"id\" = $3::integer"
        );
        assert_eq!(stmt.params, vec![json!("Alicia"), json!("1990-01-02"), json!(1)]);
        assert_eq!(key.column, "id");
    }

    #[test]
    fn update_validation_order() {
        let wl = people();
        let builder = QueryBuilder::new(&wl);

        let missing = UpdateRequest {
            primary_key_column: Some("id".into()),
            primary_key_value: Some(JsonValue::Null),
            update_data: Some(map(json!({"name": "x"}))),
        };
        assert!(matches!(builder.update(&missing), Err(QueryError::InvalidRequest(_))));

        let empty = UpdateRequest {
            primary_key_column: Some("id".into()),
            primary_key_value: Some(json!(1)),
            update_data: Some(Map::new()),
        };
        assert!(matches!(builder.update(&empty), Err(QueryError::InvalidRequest(_))));

        let bad_cols = UpdateRequest {
            primary_key_column: Some("pk".into()),
            primary_key_value: Some(json!(1)),
            update_data: Some(map(json!({"age": 1, "name": "x", "city": "y"}))),
        };
        match builder.update(&bad_cols) {
            Err(QueryError::InvalidColumns(cols)) => assert_eq!(cols, vec!["age", "city"]),
            other => panic!("unexpected: {:?}", other),
        }

        let bad_pk = UpdateRequest {
            update_data: Some(map(json!({"name": "x"}))),
            ..bad_cols
        };
        assert!(matches!(
            builder.update(&bad_pk),
            Err(QueryError::InvalidPrimaryKey(c)) if c == "pk"
        ));
    }

    #[test]
    fn delete_accepts_falsy_key_values() {
        let wl = people();
        let req = DeleteRequest {
            primary_key_column: Some("name".into()),
            primary_key_value: Some(json!("")),
        };
        let (stmt, _) = QueryBuilder::new(&wl).delete(&req).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"people\" WHERE \"name\" = $1::varchar");
        assert_eq!(stmt.params, vec![json!("")]);

        let zero = DeleteRequest {
            primary_key_column: Some("id".into()),
            primary_key_value: Some(json!(0)),
        };
        assert!(QueryBuilder::new(&wl).delete(&zero).is_ok());

        let no_column = DeleteRequest {
            primary_key_column: None,
            primary_key_value: Some(json!(1)),
        };
        assert!(matches!(
            QueryBuilder::new(&wl).delete(&no_column),
            Err(QueryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn search_filters_and_orders() {
        let wl = people();
        let req = SearchRequest {
            search_params: Some(map(json!({"name": "Alice", "born": "1990-01-02"}))),
            order_by: Some("id".into()),
            order_direction: Some("desc".into()),
        };
        let stmt = QueryBuilder::new(&wl).search(&req).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT row_to_json(\"people\".*) AS record FROM \"people\" \
             WHERE \"name\" = $1::varchar AND \"born\" = $2::date ORDER BY \"id\" DESC"
        );
        assert_eq!(stmt.params, vec![json!("Alice"), json!("1990-01-02")]);
    }

    #[test]
    fn search_rejections() {
        let wl = people();
        let builder = QueryBuilder::new(&wl);

        assert!(matches!(
            builder.search(&SearchRequest::default()),
            Err(QueryError::InvalidRequest(_))
        ));

        let bad_order = SearchRequest {
            search_params: Some(map(json!({"nickname": "Al"}))),
            order_by: Some("age".into()),
            order_direction: None,
        };
        match builder.search(&bad_order) {
            Err(QueryError::InvalidColumns(cols)) => assert_eq!(cols, vec!["nickname", "age"]),
            other => panic!("unexpected: {:?}", other),
        }

        let bad_direction = SearchRequest {
            search_params: Some(map(json!({"name": "Al"}))),
            order_by: Some("id".into()),
            order_direction: Some("sideways".into()),
        };
        assert!(matches!(
            builder.search(&bad_direction),
            Err(QueryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn direction_without_order_by_is_ignored() {
        let wl = people();
        let req = SearchRequest {
            search_params: Some(map(json!({"name": "Al"}))),
            order_by: None,
            order_direction: Some("sideways".into()),
        };
        let stmt = QueryBuilder::new(&wl).search(&req).unwrap();
        assert!(!stmt.sql.contains("ORDER BY"));
        assert!(stmt.sql.ends_with("WHERE \"name\" = $1::varchar"));
    }
}
