//! CSV export of in-memory table rows.
//!
//! The header row carries the visible column labels, text fields are
//! double-quoted, numbers are written bare and nulls become empty fields.
//! Nothing here talks to the backend: an export serializes exactly the rows
//! the caller already holds.

use anyhow::{bail, Context, Result};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use ekraf_core::dataset::{Column, DatasetSpec};
use ekraf_core::query::{display_value, Row};
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    pub key: String,
    pub label: String,
    pub numeric: bool,
}

impl ExportColumn {
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            numeric: false,
        }
    }

    pub fn number(key: &str, label: &str) -> Self {
        Self {
            numeric: true,
            ..Self::text(key, label)
        }
    }
}

impl From<&Column> for ExportColumn {
    fn from(column: &Column) -> Self {
        Self {
            key: column.key.to_string(),
            label: column.label.to_string(),
            numeric: column.numeric,
        }
    }
}

pub fn dataset_columns(dataset: &DatasetSpec) -> Vec<ExportColumn> {
    dataset.columns.iter().map(ExportColumn::from).collect()
}

/// Columns of a reshaped pivot grid: the group key and line label are text,
/// every year cell and the total are numbers.
pub fn pivot_columns(pairs: &[(String, String)]) -> Vec<ExportColumn> {
    pairs
        .iter()
        .map(|(key, label)| match key.as_str() {
            "key" | "line" => ExportColumn::text(key, label),
            _ => ExportColumn::number(key, label),
        })
        .collect()
}

/// Double-quote a text field, doubling embedded quotes.
fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// One exported cell. Quoting follows the column type, not the value: a
/// text column holding `01111` stays quoted so the leading zero survives.
fn export_cell(column: &ExportColumn, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) if column.numeric => n.to_string(),
        Some(other) => quoted(&display_value(other)),
    }
}

/// Serialize `rows` under `columns` into CSV text.
pub fn to_csv(columns: &[ExportColumn], rows: &[Row]) -> Result<String> {
    // Fields arrive pre-quoted; the writer only joins them.
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    writer
        .write_record(columns.iter().map(|c| quoted(&c.label)))
        .context("failed to write CSV header")?;
    for (index, row) in rows.iter().enumerate() {
        let record: Vec<String> = columns
            .iter()
            .map(|c| export_cell(c, row.get(&c.key)))
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("failed to write CSV row {}", index + 1))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV export: {}", e))?;
    let text = String::from_utf8(bytes).context("CSV export is not valid UTF-8")?;
    log::debug!(
        "[EKRAF] export: {} rows x {} columns",
        rows.len(),
        columns.len()
    );
    Ok(text)
}

fn parse_number(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    match raw.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}

/// Parse a file written by [`to_csv`] back into rows keyed by column key.
///
/// The header must list exactly the column labels, in order.
pub fn read_exported(text: &str, columns: &[ExportColumn]) -> Result<Vec<Row>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let labels: Vec<&str> = columns.iter().map(|c| c.label.as_str()).collect();
    if headers.iter().collect::<Vec<_>>() != labels {
        bail!(
            "CSV header {:?} does not match expected columns {:?}",
            headers,
            labels
        );
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {}", index + 1))?;
        let mut row = Row::new();
        for (column, field) in columns.iter().zip(record.iter()) {
            let value = if field.is_empty() {
                Value::Null
            } else if column.numeric {
                parse_number(field)
            } else {
                Value::String(field.to_string())
            };
            row.insert(column.key.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// File name for an export: the dataset, the active year filter and, for
/// single-page exports, the page number.
///
/// `investment_2024.csv`, `investment_all-years.csv`, `investment_2024_page-3.csv`
pub fn export_filename(dataset: &str, year: Option<i32>, page: Option<u32>) -> String {
    let year = match year {
        Some(year) => year.to_string(),
        None => "all-years".to_string(),
    };
    match page {
        Some(page) => format!("{}_{}_page-{}.csv", dataset, year, page),
        None => format!("{}_{}.csv", dataset, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_core::dataset::{INVESTMENT, PATENTS};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn columns() -> Vec<ExportColumn> {
        vec![
            ExportColumn::text("company_name", "Nama Perusahaan"),
            ExportColumn::text("region", "Kabupaten/Kota"),
            ExportColumn::number("investment_idr", "Investasi (Rp)"),
            ExportColumn::number("year", "Tahun"),
        ]
    }

    #[test]
    fn text_is_quoted_and_numbers_are_bare() {
        let rows = vec![row(json!({
            "company_name": "PT Kopi, Teh & Co",
            "region": "Kota Bandung",
            "investment_idr": 1250000.5,
            "year": 2024
        }))];
        let csv = to_csv(&columns(), &rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("\"Nama Perusahaan\",\"Kabupaten/Kota\",\"Investasi (Rp)\",\"Tahun\"")
        );
        assert_eq!(
            lines.next(),
            Some("\"PT Kopi, Teh & Co\",\"Kota Bandung\",1250000.5,2024")
        );
    }

    #[test]
    fn digit_only_text_fields_stay_quoted() {
        let rows = vec![row(json!({
            "company_name": "PT A",
            "permit_number": "0220001234567",
            "kbli_code": "01111",
            "year": 2024,
            "investment_idr": 900
        }))];
        let columns = dataset_columns(&INVESTMENT);
        let csv = to_csv(&columns, &rows).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("\"PT A\",\"0220001234567\",\"01111\","), "{}", line);
        assert!(line.contains(",\"2024\","), "{}", line);
        assert!(line.contains(",900,"), "{}", line);

        let back = read_exported(&csv, &columns).unwrap();
        assert_eq!(back[0]["kbli_code"], json!("01111"));
        assert_eq!(back[0]["permit_number"], json!("0220001234567"));
    }

    #[test]
    fn non_numeric_value_in_numeric_column_is_quoted() {
        let rows = vec![row(json!({"company_name": "PT B", "investment_idr": "n/a"}))];
        let csv = to_csv(&columns(), &rows).unwrap();
        assert_eq!(csv.lines().nth(1), Some("\"PT B\",,\"n/a\","));
    }

    #[test]
    fn null_and_missing_cells_export_empty() {
        let rows = vec![row(json!({"company_name": "PT A", "region": null}))];
        let csv = to_csv(&columns(), &rows).unwrap();
        let back = read_exported(&csv, &columns()).unwrap();
        assert_eq!(back[0].get("region"), Some(&Value::Null));
        assert_eq!(back[0].get("investment_idr"), Some(&Value::Null));
    }

    #[test]
    fn exported_rows_read_back_field_for_field() {
        let rows = vec![
            row(json!({
                "company_name": "CV \"Batik\" Sejahtera",
                "region": "Kabupaten Garut",
                "investment_idr": 500000000,
                "year": 2023
            })),
            row(json!({
                "company_name": "PT Multi\nBaris",
                "region": "Kota Cimahi",
                "investment_idr": 12.75,
                "year": 2024
            })),
        ];
        let csv = to_csv(&columns(), &rows).unwrap();
        let back = read_exported(&csv, &columns()).unwrap();
        assert_eq!(back.len(), rows.len());
        for (original, parsed) in rows.iter().zip(&back) {
            for column in columns() {
                assert_eq!(
                    display_value(&original[&column.key]),
                    display_value(&parsed[&column.key]),
                    "column {}",
                    column.key
                );
            }
        }
    }

    #[test]
    fn read_rejects_foreign_header() {
        let err = read_exported("a,b\n1,2\n", &columns()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn dataset_columns_follow_visible_columns() {
        let cols = dataset_columns(&INVESTMENT);
        assert_eq!(cols.len(), INVESTMENT.columns.len());
        assert!(cols.iter().any(|c| c.key == "investment_idr" && c.numeric));
        assert!(dataset_columns(&PATENTS).iter().any(|c| !c.numeric));
    }

    #[test]
    fn pivot_columns_mark_year_cells_numeric() {
        let cols = pivot_columns(&[
            ("key".into(), "Kabupaten/Kota".into()),
            ("line".into(), "Status".into()),
            ("y2024".into(), "2024".into()),
            ("total".into(), "Total".into()),
        ]);
        let numeric: Vec<_> = cols.iter().map(|c| c.numeric).collect();
        assert_eq!(numeric, vec![false, false, true, true]);
    }

    #[test]
    fn filenames_encode_year_and_page() {
        assert_eq!(export_filename("investment", Some(2024), None), "investment_2024.csv");
        assert_eq!(export_filename("investment", None, None), "investment_all-years.csv");
        assert_eq!(
            export_filename("investment", Some(2024), Some(3)),
            "investment_2024_page-3.csv"
        );
    }
}
