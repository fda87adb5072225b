//! PostgREST-style client for the hosted backend.
//!
//! Wire mapping:
//! - select: `GET /rest/v1/{table}?select=..&col=eq.v&or=(..)&order=..&offset=..&limit=..`
//! - count: `HEAD` with `Prefer: count=exact`, total read from `Content-Range`
//! - insert: `POST /rest/v1/{table}` with `Prefer: return=representation`
//! - update: `PATCH /rest/v1/{table}?id=eq.{id}`
//! - rpc: `POST /rest/v1/rpc/{name}`

use crate::backend::QueryBackend;
use crate::config::BackendConfig;
use crate::error::QueryError;
use crate::query::{display_value, validate_identifier, Predicate, Row, SelectQuery};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

/// Cheaply cloneable handle to the hosted backend.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    config: BackendConfig,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Same backend acting on behalf of a signed-in user.
    pub fn with_access_token(&self, token: Option<String>) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone().with_access_token(token),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.bearer()))
    }
}

/// Characters PostgREST treats as syntax inside an `or=(...)` list.
const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\'];

fn quote_if_reserved(value: &str) -> String {
    if value.contains(RESERVED) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

/// Translate a select into PostgREST query parameters.
pub fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let select = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query.columns.join(",")
    };
    params.push(("select".to_string(), select));

    for predicate in &query.predicates {
        match predicate {
            Predicate::Eq(column, value) => {
                params.push((column.clone(), format!("eq.{}", display_value(value))))
            }
            Predicate::Gte(column, value) => {
                params.push((column.clone(), format!("gte.{}", display_value(value))))
            }
            Predicate::Lte(column, value) => {
                params.push((column.clone(), format!("lte.{}", display_value(value))))
            }
            Predicate::AnyContains { columns, needle } => {
                let pattern = quote_if_reserved(&format!("*{}*", needle));
                let alternatives: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{}.ilike.{}", column, pattern))
                    .collect();
                params.push(("or".to_string(), format!("({})", alternatives.join(","))));
            }
        }
    }

    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|key| {
                format!(
                    "{}.{}",
                    key.column,
                    if key.descending { "desc" } else { "asc" }
                )
            })
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some(range) = query.range {
        params.push(("offset".to_string(), range.offset.to_string()));
        params.push(("limit".to_string(), range.limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`.
pub fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Turn a non-success response into [`QueryError::Http`], preferring the
/// backend's own `message` field.
async fn check(response: Response) -> Result<Response, QueryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(QueryError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Normalize any JSON payload into rows.
pub fn rows_from_value(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .flat_map(rows_from_value)
            .collect(),
        Value::Object(map) => vec![map],
        Value::Null => Vec::new(),
        scalar => {
            let mut row = Row::new();
            row.insert("value".to_string(), scalar);
            vec![row]
        }
    }
}

impl QueryBackend for RestBackend {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
        query.validate()?;
        let request = self
            .client
            .get(self.table_url(&query.table))
            .query(&query_params(query));
        let response = check(self.authorize(request).send().await?).await?;
        let rows: Vec<Row> = response.json().await?;
        log::debug!(
            "[EKRAF] rest: select {} returned {} rows",
            query.table,
            rows.len()
        );
        Ok(rows)
    }

    async fn count(&self, query: &SelectQuery) -> Result<u64, QueryError> {
        query.validate()?;
        let request = self
            .client
            .head(self.table_url(&query.table))
            .query(&query_params(&query.unpaged()))
            .header("Prefer", "count=exact");
        let response = check(self.authorize(request).send().await?).await?;
        let header = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| QueryError::Decode("missing Content-Range header".to_string()))?;
        content_range_total(header)
            .ok_or_else(|| QueryError::Decode(format!("unexpected Content-Range {:?}", header)))
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, QueryError> {
        validate_identifier(table)?;
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(rows);
        let response = check(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, table: &str, id: i64, patch: &Row) -> Result<Row, QueryError> {
        validate_identifier(table)?;
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(patch);
        let response = check(self.authorize(request).send().await?).await?;
        let rows: Vec<Row> = response.json().await?;
        rows.into_iter().next().ok_or_else(|| QueryError::NotFound {
            table: table.to_string(),
            id,
        })
    }

    async fn rpc(&self, procedure: &str, args: &Row) -> Result<Vec<Row>, QueryError> {
        validate_identifier(procedure)?;
        let request = self
            .client
            .post(format!("{}/rest/v1/rpc/{}", self.config.url, procedure))
            .json(args);
        let response = check(self.authorize(request).send().await?).await?;
        let value: Value = response.json().await?;
        Ok(rows_from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderKey;
    use serde_json::json;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn builds_filtered_paged_params() {
        let query = SelectQuery::new("investment_records")
            .filter(Predicate::Eq("year".into(), json!(2024)))
            .filter(Predicate::Eq("capital_status".into(), json!("PMA")))
            .filter(Predicate::Gte("project_count".into(), json!(2)))
            .order_by(OrderKey::desc("created_at"))
            .order_by(OrderKey::desc("id"))
            .range(20, 10);
        let params = query_params(&query);
        assert_eq!(param(&params, "select"), vec!["*"]);
        assert_eq!(param(&params, "year"), vec!["eq.2024"]);
        assert_eq!(param(&params, "capital_status"), vec!["eq.PMA"]);
        assert_eq!(param(&params, "project_count"), vec!["gte.2"]);
        assert_eq!(param(&params, "order"), vec!["created_at.desc,id.desc"]);
        assert_eq!(param(&params, "offset"), vec!["20"]);
        assert_eq!(param(&params, "limit"), vec!["10"]);
    }

    #[test]
    fn search_becomes_or_of_ilike() {
        let query = SelectQuery::new("t").filter(Predicate::AnyContains {
            columns: vec!["company_name".into(), "kbli_code".into()],
            needle: "kopi".into(),
        });
        let params = query_params(&query);
        assert_eq!(
            param(&params, "or"),
            vec!["(company_name.ilike.*kopi*,kbli_code.ilike.*kopi*)"]
        );
    }

    #[test]
    fn search_with_reserved_characters_is_quoted() {
        let query = SelectQuery::new("t").filter(Predicate::AnyContains {
            columns: vec!["company_name".into()],
            needle: "PT. Maju, \"Jaya\"".into(),
        });
        let params = query_params(&query);
        assert_eq!(
            param(&params, "or"),
            vec![r#"(company_name.ilike."*PT. Maju, \"Jaya\"*")"#]
        );
    }

    #[test]
    fn parses_content_range() {
        assert_eq!(content_range_total("0-9/42"), Some(42));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-9/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn rpc_payloads_normalize_to_rows() {
        assert_eq!(rows_from_value(Value::Null).len(), 0);
        assert_eq!(rows_from_value(json!({"a": 1})).len(), 1);
        assert_eq!(rows_from_value(json!([{"a": 1}, {"a": 2}])).len(), 2);
        let scalar = rows_from_value(json!(7));
        assert_eq!(scalar[0].get("value"), Some(&json!(7)));
    }
}
