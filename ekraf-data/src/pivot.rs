//! Reshape (key, year, capital status) aggregates into a key x year grid
//! with per-status lines, per-key subtotals and a grand total.

use crate::totals::number_value;
use ekraf_core::capital_status::CapitalStatus;
use ekraf_core::query::Row;
use ekraf_core::ranking::PivotSource;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const SUBTOTAL_LABEL: &str = "Subtotal";
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotLine {
    pub label: String,
    /// One cell per grid year, zero-filled.
    pub cells: BTreeMap<i32, f64>,
    pub total: f64,
}

impl PivotLine {
    fn zeroed(label: &str, years: &[i32]) -> Self {
        Self {
            label: label.to_string(),
            cells: years.iter().map(|y| (*y, 0.0)).collect(),
            total: 0.0,
        }
    }

    fn add(&mut self, year: i32, value: f64) {
        *self.cells.entry(year).or_default() += value;
        self.total += value;
    }

    pub fn cell(&self, year: i32) -> f64 {
        self.cells.get(&year).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotGroup {
    pub key: String,
    /// One line per capital status, PMA first.
    pub lines: Vec<PivotLine>,
    pub subtotal: PivotLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotGrid {
    pub years: Vec<i32>,
    pub groups: Vec<PivotGroup>,
    pub grand_total: PivotLine,
}

/// Build the display grid. Groups are sorted by key, years ascending;
/// duplicate (key, year, status) sources are summed.
pub fn reshape(sources: &[PivotSource]) -> PivotGrid {
    let years: Vec<i32> = sources
        .iter()
        .map(|s| s.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_key: BTreeMap<&str, Vec<&PivotSource>> = BTreeMap::new();
    for source in sources {
        by_key.entry(source.key.as_str()).or_default().push(source);
    }

    let mut grand_total = PivotLine::zeroed(GRAND_TOTAL_LABEL, &years);
    let groups = by_key
        .into_iter()
        .map(|(key, entries)| {
            let mut lines: Vec<PivotLine> = CapitalStatus::ALL
                .iter()
                .map(|status| PivotLine::zeroed(status.code(), &years))
                .collect();
            let mut subtotal = PivotLine::zeroed(SUBTOTAL_LABEL, &years);
            for entry in entries {
                let index = match entry.capital_status {
                    CapitalStatus::Pma => 0,
                    CapitalStatus::Pmdn => 1,
                };
                lines[index].add(entry.year, entry.value);
                subtotal.add(entry.year, entry.value);
            }
            for year in &years {
                grand_total.add(*year, subtotal.cell(*year));
            }
            PivotGroup {
                key: key.to_string(),
                lines,
                subtotal,
            }
        })
        .collect();

    PivotGrid {
        years,
        groups,
        grand_total,
    }
}

impl PivotGrid {
    /// Export/display columns: key, line label, one per year, total.
    pub fn columns(&self, key_label: &str) -> Vec<(String, String)> {
        let mut columns = vec![
            ("key".to_string(), key_label.to_string()),
            ("line".to_string(), "Status".to_string()),
        ];
        for year in &self.years {
            columns.push((format!("y{}", year), year.to_string()));
        }
        columns.push(("total".to_string(), "Total".to_string()));
        columns
    }

    /// Flatten into table rows in display order.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for group in &self.groups {
            for line in group.lines.iter().chain(std::iter::once(&group.subtotal)) {
                rows.push(self.line_row(&group.key, line));
            }
        }
        rows.push(self.line_row("", &self.grand_total));
        rows
    }

    fn line_row(&self, key: &str, line: &PivotLine) -> Row {
        let mut row = Row::new();
        row.insert("key".into(), Value::String(key.to_string()));
        row.insert("line".into(), Value::String(line.label.clone()));
        for year in &self.years {
            row.insert(format!("y{}", year), number_value(line.cell(*year)));
        }
        row.insert("total".into(), number_value(line.total));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn source(key: &str, year: i32, status: CapitalStatus, value: f64) -> PivotSource {
        PivotSource {
            key: key.to_string(),
            year,
            capital_status: status,
            value,
        }
    }

    #[test]
    fn test_reshape_small_grid() {
        let grid = reshape(&[
            source("Kota Bandung", 2023, CapitalStatus::Pma, 10.0),
            source("Kota Bandung", 2023, CapitalStatus::Pmdn, 5.0),
            source("Kota Bandung", 2024, CapitalStatus::Pma, 7.0),
            source("Bekasi", 2024, CapitalStatus::Pmdn, 3.0),
        ]);
        assert_eq!(grid.years, vec![2023, 2024]);
        assert_eq!(grid.groups.len(), 2);
        assert_eq!(grid.groups[0].key, "Bekasi");

        let bandung = &grid.groups[1];
        assert_eq!(bandung.lines[0].label, "PMA");
        assert_eq!(bandung.lines[0].cell(2023), 10.0);
        assert_eq!(bandung.lines[1].cell(2024), 0.0);
        assert_eq!(bandung.subtotal.cell(2023), 15.0);
        assert_eq!(bandung.subtotal.total, 22.0);

        assert_eq!(grid.grand_total.cell(2024), 10.0);
        assert_eq!(grid.grand_total.total, 25.0);
    }

    #[test]
    fn test_rows_flatten_in_display_order() {
        let grid = reshape(&[
            source("A", 2024, CapitalStatus::Pma, 1.0),
            source("B", 2024, CapitalStatus::Pmdn, 2.0),
        ]);
        let rows = grid.rows();
        // two groups x (PMA, PMDN, Subtotal) + grand total
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[2].get("line"), Some(&Value::from("Subtotal")));
        assert_eq!(rows[6].get("line"), Some(&Value::from("Grand Total")));
        assert_eq!(rows[6].get("y2024"), Some(&Value::from(3)));
        assert_eq!(grid.columns("Kabupaten/Kota").len(), 4);
    }

    #[test]
    fn test_empty_sources() {
        let grid = reshape(&[]);
        assert!(grid.years.is_empty());
        assert!(grid.groups.is_empty());
        assert_eq!(grid.grand_total.total, 0.0);
    }

    fn arb_source() -> impl Strategy<Value = PivotSource> {
        (
            prop::sample::select(vec!["Bandung", "Bogor", "Cirebon", "Depok"]),
            2019i32..2025,
            prop::bool::ANY,
            0u32..1_000_000,
        )
            .prop_map(|(key, year, pma, value)| PivotSource {
                key: key.to_string(),
                year,
                capital_status: if pma { CapitalStatus::Pma } else { CapitalStatus::Pmdn },
                value: f64::from(value),
            })
    }

    proptest! {
        #[test]
        fn pma_plus_pmdn_is_subtotal(sources in prop::collection::vec(arb_source(), 0..200)) {
            let grid = reshape(&sources);
            for group in &grid.groups {
                for year in &grid.years {
                    let pma = group.lines[0].cell(*year);
                    let pmdn = group.lines[1].cell(*year);
                    prop_assert_eq!(pma + pmdn, group.subtotal.cell(*year));
                }
            }
        }

        #[test]
        fn grand_total_is_sum_of_subtotals(sources in prop::collection::vec(arb_source(), 0..200)) {
            let grid = reshape(&sources);
            for year in &grid.years {
                let sum: f64 = grid.groups.iter().map(|g| g.subtotal.cell(*year)).sum();
                prop_assert_eq!(sum, grid.grand_total.cell(*year));
            }
            let total: f64 = sources.iter().map(|s| s.value).sum();
            prop_assert_eq!(total, grid.grand_total.total);
        }
    }
}
