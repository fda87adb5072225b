//! Summary metrics: totals over a filtered row set plus a breakdown by
//! capital status.
//!
//! Two entry points produce the same [`SummaryMetrics`]: [`reduce`] walks raw
//! rows client-side, [`from_grouped`] assembles the per-status aggregates a
//! summary procedure returns.

use ekraf_core::query::{display_value, numeric_value, Row};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Column carrying the status value in grouped procedure output.
pub const GROUP_STATUS_KEY: &str = "status";
/// Column carrying the per-group row count in grouped procedure output.
pub const GROUP_COUNT_KEY: &str = "row_count";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusShare {
    pub row_count: u64,
    pub metric_total: f64,
    /// Share of the metric (or of the row count when there is no metric), 0-100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub row_count: u64,
    pub totals: BTreeMap<String, f64>,
    pub by_status: BTreeMap<String, StatusShare>,
}

impl SummaryMetrics {
    pub fn total(&self, column: &str) -> f64 {
        self.totals.get(column).copied().unwrap_or(0.0)
    }

    fn finish_percentages(&mut self, by_metric: bool) {
        let denominator: f64 = if by_metric {
            self.by_status.values().map(|s| s.metric_total).sum()
        } else {
            // Rows without a status have no share.
            self.by_status.values().map(|s| s.row_count as f64).sum()
        };
        for share in self.by_status.values_mut() {
            let numerator = if by_metric {
                share.metric_total
            } else {
                share.row_count as f64
            };
            share.percentage = if denominator > 0.0 {
                numerator / denominator * 100.0
            } else {
                0.0
            };
        }
    }
}

fn cell(row: &Row, column: &str) -> f64 {
    row.get(column).and_then(numeric_value).unwrap_or(0.0)
}

fn status_of(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .filter(|v| !v.is_null())
        .map(display_value)
        .filter(|s| !s.is_empty())
}

/// Reduce raw rows client-side.
pub fn reduce(
    rows: &[Row],
    numeric_columns: &[&str],
    status_column: Option<&str>,
    metric: Option<&str>,
) -> SummaryMetrics {
    let mut summary = SummaryMetrics {
        row_count: rows.len() as u64,
        totals: numeric_columns.iter().map(|c| (c.to_string(), 0.0)).collect(),
        by_status: BTreeMap::new(),
    };

    for row in rows {
        for column in numeric_columns {
            *summary.totals.entry(column.to_string()).or_default() += cell(row, column);
        }
        if let Some(status) = status_column.and_then(|c| status_of(row, c)) {
            let share = summary.by_status.entry(status).or_default();
            share.row_count += 1;
            if let Some(metric) = metric {
                share.metric_total += cell(row, metric);
            }
        }
    }

    summary.finish_percentages(metric.is_some());
    summary
}

/// Assemble metrics from grouped aggregates: one row per status with
/// `status`, `row_count` and a sum per numeric column.
pub fn from_grouped(groups: &[Row], numeric_columns: &[&str], metric: Option<&str>) -> SummaryMetrics {
    let mut summary = SummaryMetrics {
        row_count: 0,
        totals: numeric_columns.iter().map(|c| (c.to_string(), 0.0)).collect(),
        by_status: BTreeMap::new(),
    };

    for group in groups {
        let count = group
            .get(GROUP_COUNT_KEY)
            .and_then(numeric_value)
            .unwrap_or(0.0) as u64;
        summary.row_count += count;
        for column in numeric_columns {
            *summary.totals.entry(column.to_string()).or_default() += cell(group, column);
        }
        if let Some(status) = status_of(group, GROUP_STATUS_KEY) {
            let share = summary.by_status.entry(status).or_default();
            share.row_count += count;
            if let Some(metric) = metric {
                share.metric_total += cell(group, metric);
            }
        }
    }

    summary.finish_percentages(metric.is_some());
    summary
}

/// Serialize for JSON consumers (CLI output, chart bridge).
pub fn to_value(summary: &SummaryMetrics) -> Value {
    serde_json::to_value(summary).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Vec<Row> {
        vec![
            row(json!({"capital_status": "PMA", "investment_idr": 300.0, "project_count": 1})),
            row(json!({"capital_status": "PMDN", "investment_idr": 100.0, "project_count": 2})),
            row(json!({"capital_status": "PMA", "investment_idr": 600.0, "project_count": 3})),
            row(json!({"capital_status": null, "investment_idr": 0.0, "project_count": 0})),
        ]
    }

    #[test]
    fn test_reduce_totals_and_shares() {
        let summary = reduce(
            &sample(),
            &["investment_idr", "project_count"],
            Some("capital_status"),
            Some("investment_idr"),
        );
        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.total("investment_idr"), 1000.0);
        assert_eq!(summary.total("project_count"), 6.0);
        let pma = &summary.by_status["PMA"];
        assert_eq!(pma.row_count, 2);
        assert_eq!(pma.metric_total, 900.0);
        assert_eq!(pma.percentage, 90.0);
        assert_eq!(summary.by_status["PMDN"].percentage, 10.0);
    }

    #[test]
    fn test_percentages_by_count_without_metric() {
        let summary = reduce(&sample()[..3], &[], Some("capital_status"), None);
        let pma = summary.by_status["PMA"].percentage;
        assert!((pma - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_shares_ignore_rows_without_status() {
        let summary = reduce(&sample(), &[], Some("capital_status"), None);
        assert_eq!(summary.row_count, 4);
        let pma = summary.by_status["PMA"].percentage;
        let pmdn = summary.by_status["PMDN"].percentage;
        assert!((pma - 200.0 / 3.0).abs() < 1e-9);
        assert!((pma + pmdn - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouped_matches_reduce() {
        let rows = sample();
        let direct = reduce(
            &rows,
            &["investment_idr", "project_count"],
            Some("capital_status"),
            Some("investment_idr"),
        );
        let groups = vec![
            row(json!({"status": "PMA", "row_count": 2, "investment_idr": 900.0, "project_count": 4})),
            row(json!({"status": "PMDN", "row_count": 1, "investment_idr": 100.0, "project_count": 2})),
            row(json!({"status": null, "row_count": 1, "investment_idr": 0.0, "project_count": 0})),
        ];
        let grouped = from_grouped(&groups, &["investment_idr", "project_count"], Some("investment_idr"));
        assert_eq!(grouped, direct);
    }

    #[test]
    fn test_empty_set() {
        let summary = reduce(&[], &["investment_idr"], Some("capital_status"), Some("investment_idr"));
        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.total("investment_idr"), 0.0);
        assert!(summary.by_status.is_empty());
    }
}
