//! User-selected filter values and their translation into query predicates.

use crate::dataset::{DatasetSpec, FilterKind, FilterOp};
use crate::query::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Select-control value meaning "no filter".
pub const ALL_SENTINEL: &str = "all";

/// Raw filter state as held by a filter bar: filter key -> selected value,
/// plus the free-text search box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub values: BTreeMap<String, String>,
    pub search: String,
}

/// One edit from a filter bar. Edits are merged into whatever filter state
/// is current when they arrive, so a late debounced search never rolls back a
/// select changed in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Field { key: String, value: String },
    Search(String),
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.to_string();
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `self` with one edit applied.
    pub fn merged(&self, change: &FilterChange) -> Filters {
        let mut next = self.clone();
        match change {
            FilterChange::Field { key, value } => next.set(key, value),
            FilterChange::Search(search) => next.search = search.clone(),
        }
        next
    }

    /// The active year filter, if one parses.
    pub fn year(&self) -> Option<i32> {
        self.get("year").and_then(|y| y.trim().parse().ok())
    }

    /// Filter values that survive normalization against `dataset`, typed as
    /// they are sent upstream. Sentinel `"all"` and blanks are absent,
    /// unparsable integers are dropped, unknown keys are ignored.
    pub fn normalized(&self, dataset: &DatasetSpec) -> BTreeMap<&'static str, Value> {
        let mut out = BTreeMap::new();
        for (key, raw) in &self.values {
            let Some(field) = dataset.filter(key) else {
                log::warn!(
                    "[EKRAF] filter: {} has no filter {:?}, ignoring",
                    dataset.name,
                    key
                );
                continue;
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
                continue;
            }
            let value = match field.kind {
                FilterKind::Text => Value::String(trimmed.to_string()),
                FilterKind::Integer => match trimmed.parse::<i64>() {
                    Ok(n) => Value::from(n),
                    Err(_) => {
                        log::debug!(
                            "[EKRAF] filter: dropping non-numeric {} value {:?}",
                            field.key,
                            trimmed
                        );
                        continue;
                    }
                },
            };
            out.insert(field.key, value);
        }
        out
    }

    /// Predicates to apply for `dataset`.
    pub fn predicates(&self, dataset: &DatasetSpec) -> Vec<Predicate> {
        let mut predicates: Vec<Predicate> = self
            .normalized(dataset)
            .into_iter()
            .filter_map(|(key, value)| {
                let field = dataset.filter(key)?;
                let column = field.column.to_string();
                Some(match field.op {
                    FilterOp::Eq => Predicate::Eq(column, value),
                    FilterOp::Gte => Predicate::Gte(column, value),
                    FilterOp::Lte => Predicate::Lte(column, value),
                })
            })
            .collect();

        let needle = self.search.trim();
        if !needle.is_empty() && !dataset.search_columns.is_empty() {
            predicates.push(Predicate::AnyContains {
                columns: dataset.search_columns.iter().map(|c| c.to_string()).collect(),
                needle: needle.to_string(),
            });
        }
        predicates
    }

    /// Arguments for a summary procedure: normalized values plus search.
    pub fn procedure_args(&self, dataset: &DatasetSpec) -> crate::query::Row {
        let mut args = crate::query::Row::new();
        args.insert("dataset".into(), Value::String(dataset.name.to_string()));
        let filters: serde_json::Map<String, Value> = self
            .normalized(dataset)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        args.insert("filters".into(), Value::Object(filters));
        args.insert("search".into(), Value::String(self.search.trim().to_string()));
        args
    }

    /// Rebuild filter state from procedure arguments (the inverse of
    /// [`Filters::procedure_args`]), used by backends that evaluate
    /// procedures locally.
    pub fn from_procedure_args(args: &crate::query::Row) -> Self {
        let mut filters = Filters::new();
        if let Some(Value::Object(values)) = args.get("filters") {
            for (key, value) in values {
                filters.set(key, &crate::query::display_value(value));
            }
        }
        if let Some(Value::String(search)) = args.get("search") {
            filters.search = search.clone();
        }
        filters
    }
}
