//! Pure, synchronous transforms over already-queried rows.
//!
//! Everything here works on small in-memory result sets (one page, or a
//! few hundred pre-aggregated rows) and never touches a backend.

pub mod pivot;
pub mod summary;
pub mod table;

/// Page arithmetic shared by the dataset service and the table state.
pub mod pagination {
    use ekraf_core::query::Row;
    use serde::Serialize;

    /// One page of a filtered result.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Page<T = Row> {
        pub rows: Vec<T>,
        pub total_count: u64,
        pub total_pages: u32,
        /// 1-based.
        pub current_page: u32,
        pub page_size: u32,
    }

    impl<T> Page<T> {
        /// An empty page that still reports the true count.
        pub fn empty(total_count: u64, current_page: u32, page_size: u32) -> Self {
            Self {
                rows: Vec::new(),
                total_count,
                total_pages: total_pages(total_count, page_size),
                current_page,
                page_size,
            }
        }
    }

    /// `ceil(total_count / page_size)`; zero rows (or a zero page size) is zero pages.
    pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        let pages = total_count.div_ceil(u64::from(page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Row window `(offset, limit)` of a 1-based page: `[(page-1)*size, page*size)`.
    pub fn slice_bounds(page: u32, page_size: u32) -> (u64, u64) {
        let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
        (offset, u64::from(page_size))
    }

    pub fn in_bounds(page: u32, total_pages: u32) -> bool {
        page >= 1 && page <= total_pages
    }

}

/// Synthetic "Grand Total" rows appended to rendered tables.
pub mod totals {
    use ekraf_core::dataset::Column;
    use ekraf_core::query::{numeric_value, Row};
    use serde_json::Value;

    pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

    /// JSON number for a sum; whole values stay integers so `12` doesn't
    /// render as `12.0`.
    pub fn number_value(value: f64) -> Value {
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Value::from(value as i64)
        } else {
            serde_json::Number::from_f64(value)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
    }

    /// Sum every numeric column over `rows`. Non-numeric cells count as zero;
    /// the label column carries [`GRAND_TOTAL_LABEL`], other text columns are null.
    pub fn grand_total(rows: &[Row], columns: &[Column], label_column: &str) -> Row {
        let mut total = Row::new();
        for column in columns {
            let value = if column.key == label_column {
                Value::String(GRAND_TOTAL_LABEL.to_string())
            } else if column.numeric {
                let sum: f64 = rows
                    .iter()
                    .filter_map(|row| row.get(column.key).and_then(numeric_value))
                    .sum();
                number_value(sum)
            } else {
                Value::Null
            };
            total.insert(column.key.to_string(), value);
        }
        total
    }

    /// Grand-total row built from precomputed column sums (filtered-set scope).
    pub fn grand_total_from_sums(
        sums: &std::collections::BTreeMap<String, f64>,
        columns: &[Column],
        label_column: &str,
    ) -> Row {
        let mut total = Row::new();
        for column in columns {
            let value = if column.key == label_column {
                Value::String(GRAND_TOTAL_LABEL.to_string())
            } else if column.numeric {
                number_value(sums.get(column.key).copied().unwrap_or(0.0))
            } else {
                Value::Null
            };
            total.insert(column.key.to_string(), value);
        }
        total
    }

}
