//! Backend-neutral description of a filtered, ordered, range-paginated select.
//!
//! A [`SelectQuery`] is built by the dataset service and translated by each
//! backend: the REST backend turns it into PostgREST query parameters, the
//! SQLite backend into a parameterized `SELECT`.

use crate::error::QueryError;
use serde_json::{Map, Value};

/// One row as returned by the backend: column name -> JSON value.
pub type Row = Map<String, Value>;

/// A single filter applied to a select.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`
    Eq(String, Value),
    /// `column >= value`
    Gte(String, Value),
    /// `column <= value`
    Lte(String, Value),
    /// Case-insensitive substring match OR-combined across `columns`.
    AnyContains { columns: Vec<String>, needle: String },
}

impl Predicate {
    /// Every column name the predicate touches.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Predicate::Eq(c, _) | Predicate::Gte(c, _) | Predicate::Lte(c, _) => vec![c.as_str()],
            Predicate::AnyContains { columns, .. } => columns.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Half-open row window `[offset, offset + limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<OrderKey>,
    pub range: Option<RowRange>,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            range: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order.push(key);
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some(RowRange { offset, limit });
        self
    }

    /// Same query without ordering or range; what a count request needs.
    pub fn unpaged(&self) -> Self {
        Self {
            table: self.table.clone(),
            columns: self.columns.clone(),
            predicates: self.predicates.clone(),
            order: Vec::new(),
            range: None,
        }
    }

    /// Check every identifier that will be spliced into a URL or SQL text.
    pub fn validate(&self) -> Result<(), QueryError> {
        validate_identifier(&self.table)?;
        for column in &self.columns {
            validate_identifier(column)?;
        }
        for predicate in &self.predicates {
            for column in predicate.columns() {
                validate_identifier(column)?;
            }
        }
        for key in &self.order {
            validate_identifier(&key.column)?;
        }
        Ok(())
    }
}

/// Accepts `[a-z_][a-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// Render a cell the way tables and CSV exports show it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Numeric view of a cell; numeric strings count, anything else is `None`.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_are_restricted() {
        assert!(validate_identifier("investment_records").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("name; drop table x").is_err());
        assert!(validate_identifier("Region").is_err());
    }

    #[test]
    fn validate_checks_predicate_columns() {
        let q = SelectQuery::new("investment_records").filter(Predicate::AnyContains {
            columns: vec!["company_name".into(), "bad-col".into()],
            needle: "x".into(),
        });
        assert_eq!(
            q.validate(),
            Err(QueryError::InvalidIdentifier("bad-col".into()))
        );
    }

    #[test]
    fn unpaged_drops_order_and_range() {
        let q = SelectQuery::new("t")
            .filter(Predicate::Eq("year".into(), json!(2024)))
            .order_by(OrderKey::desc("created_at"))
            .range(10, 10);
        let unpaged = q.unpaged();
        assert!(unpaged.order.is_empty());
        assert!(unpaged.range.is_none());
        assert_eq!(unpaged.predicates.len(), 1);
    }

    #[test]
    fn cell_rendering() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!("PMA")), "PMA");
        assert_eq!(display_value(&json!(12)), "12");
        assert_eq!(numeric_value(&json!("1.5")), Some(1.5));
        assert_eq!(numeric_value(&json!("n/a")), None);
        assert_eq!(numeric_value(&Value::Null), None);
    }
}
