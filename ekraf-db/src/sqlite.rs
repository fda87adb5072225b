//! [`QueryBackend`] over the in-memory database.
//!
//! A [`SelectQuery`] becomes a parameterized `SELECT`. Identifiers are
//! validated before they are spliced into SQL text and always double-quoted;
//! every value is bound.

use crate::Database;
use ekraf_core::backend::QueryBackend;
use ekraf_core::error::QueryError;
use ekraf_core::query::{validate_identifier, Predicate, Row, SelectQuery};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;

pub(crate) fn backend_err(err: rusqlite::Error) -> QueryError {
    QueryError::Backend(err.to_string())
}

pub(crate) fn quoted(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

/// JSON value to a bindable SQL value.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// `WHERE` clause and its bound values. Empty string when there are no predicates.
pub(crate) fn where_clause(predicates: &[Predicate]) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::Eq(column, value) => {
                params.push(to_sql(value));
                clauses.push(format!("{} = ?{}", quoted(column), params.len()));
            }
            Predicate::Gte(column, value) => {
                params.push(to_sql(value));
                clauses.push(format!("{} >= ?{}", quoted(column), params.len()));
            }
            Predicate::Lte(column, value) => {
                params.push(to_sql(value));
                clauses.push(format!("{} <= ?{}", quoted(column), params.len()));
            }
            Predicate::AnyContains { columns, needle } => {
                params.push(SqlValue::Text(escape_like(needle)));
                let slot = params.len();
                let alternatives: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{} LIKE ?{} ESCAPE '\\'", quoted(c), slot))
                    .collect();
                clauses.push(format!("({})", alternatives.join(" OR ")));
            }
        }
    }
    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

/// Run `sql` and collect every row as a JSON object keyed by column name.
pub(crate) fn query_rows(
    conn: &Connection,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<Row>, QueryError> {
    let mut stmt = conn.prepare(sql).map_err(backend_err)?;
    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params))
        .map_err(backend_err)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(backend_err)? {
        let mut map = Row::new();
        for (index, name) in names.iter().enumerate() {
            let value = row.get_ref(index).map_err(backend_err)?;
            map.insert(name.clone(), to_json(value));
        }
        out.push(map);
    }
    Ok(out)
}

fn select_sql(query: &SelectQuery) -> (String, Vec<SqlValue>) {
    let columns = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| quoted(c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let (filter, mut params) = where_clause(&query.predicates);
    let mut sql = format!("SELECT {} FROM {}{}", columns, quoted(&query.table), filter);
    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|key| {
                format!(
                    "{} {}",
                    quoted(&key.column),
                    if key.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
    }
    if let Some(range) = query.range {
        params.push(SqlValue::Integer(range.limit as i64));
        params.push(SqlValue::Integer(range.offset as i64));
        sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", params.len() - 1, params.len()));
    }
    (sql, params)
}

fn fetch_by_id(conn: &Connection, table: &str, id: i64) -> Result<Option<Row>, QueryError> {
    let rows = query_rows(
        conn,
        &format!("SELECT * FROM {} WHERE \"id\" = ?1", quoted(table)),
        vec![SqlValue::Integer(id)],
    )?;
    Ok(rows.into_iter().next())
}

impl QueryBackend for Database {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
        query.validate()?;
        let (sql, params) = select_sql(query);
        let conn = self.conn.borrow();
        let rows = query_rows(&conn, &sql, params)?;
        log::debug!("[EKRAF] sqlite: select {} returned {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn count(&self, query: &SelectQuery) -> Result<u64, QueryError> {
        query.validate()?;
        let (filter, params) = where_clause(&query.predicates);
        let sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&query.table), filter);
        let conn = self.conn.borrow();
        let count: i64 = conn
            .query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))
            .map_err(backend_err)?;
        Ok(count as u64)
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, QueryError> {
        validate_identifier(table)?;
        let conn = self.conn.borrow();
        let tx = conn.unchecked_transaction().map_err(backend_err)?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let mut columns = Vec::new();
            let mut params = Vec::new();
            for (column, value) in row {
                if column == "id" && value.is_null() {
                    continue;
                }
                validate_identifier(column)?;
                columns.push(quoted(column));
                params.push(to_sql(value));
            }
            let sql = if columns.is_empty() {
                format!("INSERT INTO {} DEFAULT VALUES", quoted(table))
            } else {
                let slots: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quoted(table),
                    columns.join(", "),
                    slots.join(", ")
                )
            };
            tx.execute(&sql, rusqlite::params_from_iter(params))
                .map_err(backend_err)?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().map_err(backend_err)?;

        let mut inserted = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = fetch_by_id(&conn, table, id)? {
                inserted.push(row);
            }
        }
        log::info!("[EKRAF] sqlite: inserted {} rows into {}", inserted.len(), table);
        Ok(inserted)
    }

    async fn update(&self, table: &str, id: i64, patch: &Row) -> Result<Row, QueryError> {
        validate_identifier(table)?;
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in patch {
            if column == "id" {
                continue;
            }
            validate_identifier(column)?;
            params.push(to_sql(value));
            assignments.push(format!("{} = ?{}", quoted(column), params.len()));
        }
        let conn = self.conn.borrow();
        if !assignments.is_empty() {
            params.push(SqlValue::Integer(id));
            let sql = format!(
                "UPDATE {} SET {} WHERE \"id\" = ?{}",
                quoted(table),
                assignments.join(", "),
                params.len()
            );
            conn.execute(&sql, rusqlite::params_from_iter(params))
                .map_err(backend_err)?;
        }
        fetch_by_id(&conn, table, id)?.ok_or_else(|| QueryError::NotFound {
            table: table.to_string(),
            id,
        })
    }

    async fn rpc(&self, procedure: &str, args: &Row) -> Result<Vec<Row>, QueryError> {
        validate_identifier(procedure)?;
        self.call_procedure(procedure, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_core::query::OrderKey;
    use serde_json::json;

    fn db() -> Database {
        let db = Database::new().unwrap();
        db.load_table(
            "patent_registrations",
            "\
application_number,title,applicant,region,year,claim_count
P001,Alat Tenun Digital,CV Sinar Garut,Kabupaten Garut,2023,4
P002,Mesin Sangrai Kopi,PT Priangan,Kabupaten Garut,2024,7
P003,Aplikasi Kuliner 100%,PT Rasa,Kota Bandung,2024,2
",
        )
        .unwrap();
        db
    }

    #[tokio::test]
    async fn select_filters_orders_and_pages() {
        let db = db();
        let query = SelectQuery::new("patent_registrations")
            .filter(Predicate::Eq("year".into(), json!(2024)))
            .order_by(OrderKey::asc("application_number"))
            .range(1, 5);
        let rows = db.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("application_number"), Some(&json!("P003")));
        assert_eq!(db.count(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_literal() {
        let db = db();
        let search = |needle: &str| {
            SelectQuery::new("patent_registrations").filter(Predicate::AnyContains {
                columns: vec!["title".into(), "applicant".into()],
                needle: needle.into(),
            })
        };
        assert_eq!(db.count(&search("KOPI")).await.unwrap(), 1);
        assert_eq!(db.count(&search("priangan")).await.unwrap(), 1);
        assert_eq!(db.count(&search("100%")).await.unwrap(), 1);
        assert_eq!(db.count(&search("0%")).await.unwrap(), 1);
        assert_eq!(db.count(&search("_")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_identifiers_never_reach_sql() {
        let db = db();
        let query = SelectQuery::new("patent_registrations; DROP TABLE x");
        assert!(matches!(
            db.select(&query).await,
            Err(QueryError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn insert_returns_stored_rows() {
        let db = db();
        let row = json!({"title": "Wayang Interaktif", "year": 2024})
            .as_object()
            .cloned()
            .unwrap();
        let inserted = db.insert("patent_registrations", &[row]).await.unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0].get("id").and_then(Value::as_i64).is_some());
        assert!(inserted[0].get("created_at").is_some());
    }

    #[tokio::test]
    async fn insert_is_atomic_per_call() {
        let db = db();
        let good = json!({"title": "Baik"}).as_object().cloned().unwrap();
        let bad = json!({"title": "  "}).as_object().cloned().unwrap();
        assert!(db.insert("patent_registrations", &[good, bad]).await.is_err());
        assert_eq!(db.row_count("patent_registrations").unwrap(), 3);
    }

    #[tokio::test]
    async fn update_patches_and_reports_missing_rows() {
        let db = db();
        let patch = json!({"claim_count": 9}).as_object().cloned().unwrap();
        let row = db.update("patent_registrations", 1, &patch).await.unwrap();
        assert_eq!(row.get("claim_count"), Some(&json!(9)));
        assert_eq!(
            db.update("patent_registrations", 99, &patch).await,
            Err(QueryError::NotFound {
                table: "patent_registrations".into(),
                id: 99
            })
        );
    }
}
