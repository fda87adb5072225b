//! Spreadsheet parsing for bulk import.
//!
//! Both CSV and `.xlsx` files become the same thing: one map per data row,
//! keyed by the canonical record field when the header is a recognized
//! alias and by the normalized header otherwise. Validation happens later,
//! per dataset.

use anyhow::{anyhow, Context, Result};
use calamine::{Data, Reader, Xlsx};
use csv::ReaderBuilder;
use ekraf_core::record::{canonical_field, normalize_header};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

pub type ParsedRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
}

impl FileKind {
    /// Pick the parser from a file name; anything that is not a workbook is
    /// treated as CSV.
    pub fn from_name(name: &str) -> FileKind {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
            FileKind::Xlsx
        } else {
            FileKind::Csv
        }
    }
}

pub fn header_key(raw: &str) -> String {
    let normalized = normalize_header(raw);
    match canonical_field(&normalized) {
        Some(field) => field.to_string(),
        None => normalized,
    }
}

fn to_rows<I, R>(headers: &[String], records: I) -> Vec<ParsedRow>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut rows = Vec::new();
    for record in records {
        let row: ParsedRow = headers
            .iter()
            .zip(record)
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect();
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    rows
}

/// Parse CSV text whose first line holds the header names.
pub fn parse_csv(text: &str) -> Result<Vec<ParsedRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(header_key)
        .collect();

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to parse CSV row {}", index + 2))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let rows = to_rows(&headers, records);
    log::info!("[EKRAF] import: parsed {} CSV rows", rows.len());
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

/// Parse the first worksheet of an `.xlsx` workbook held in memory.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> Result<Vec<ParsedRow>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).context("failed to open xlsx workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?
        .context("failed to read first worksheet")?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|c| header_key(&cell_to_string(c))).collect(),
        None => return Ok(Vec::new()),
    };
    let rows = to_rows(
        &headers,
        sheet_rows.map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>()),
    );
    log::info!("[EKRAF] import: parsed {} worksheet rows", rows.len());
    Ok(rows)
}

/// Parse an import file from disk, choosing the format by extension.
pub fn parse_file(path: &Path) -> Result<Vec<ParsedRow>> {
    let name = path.to_string_lossy();
    match FileKind::from_name(&name) {
        FileKind::Xlsx => {
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            parse_xlsx_bytes(&bytes)
        }
        FileKind::Csv => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_csv(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_map_onto_record_fields() {
        let rows = parse_csv(
            "Nama Perusahaan,Kabupaten/Kota,Investasi (US$),Tahun,Catatan\n\
             PT Angklung Jaya,Kota Bandung,1500,2024,baru\n",
        )
        .unwrap();
        let row = &rows[0];
        assert_eq!(row.get("company_name").map(String::as_str), Some("PT Angklung Jaya"));
        assert_eq!(row.get("region").map(String::as_str), Some("Kota Bandung"));
        assert_eq!(row.get("investment_usd").map(String::as_str), Some("1500"));
        assert_eq!(row.get("year").map(String::as_str), Some("2024"));
        assert_eq!(row.get("catatan").map(String::as_str), Some("baru"));
    }

    #[test]
    fn quoted_commas_and_newlines_stay_in_one_field() {
        let rows = parse_csv(
            "company_name,address\n\
             \"PT Kopi, Teh\",\"Jl. Braga 1\nBandung\"\n\
             PT B,Jl. Asia Afrika\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["company_name"], "PT Kopi, Teh");
        assert_eq!(rows[0]["address"], "Jl. Braga 1\nBandung");
    }

    #[test]
    fn blank_lines_and_short_rows_are_tolerated() {
        let rows = parse_csv("company_name,region,year\nPT A,Kota Bogor\n,,\nPT B,Kota Depok,2023\n")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].contains_key("year"));
        assert_eq!(rows[1]["year"], "2023");
    }

    #[test]
    fn bom_prefixed_header_is_recognized() {
        let rows = parse_csv("\u{feff}Tahun,Nama Perusahaan\n2022,PT C\n").unwrap();
        assert_eq!(rows[0]["year"], "2022");
    }

    #[test]
    fn invalid_workbook_is_an_error() {
        assert!(parse_xlsx_bytes(b"not a zip archive").is_err());
    }

    #[test]
    fn file_kind_follows_extension() {
        assert_eq!(FileKind::from_name("data.XLSX"), FileKind::Xlsx);
        assert_eq!(FileKind::from_name("data.csv"), FileKind::Csv);
        assert_eq!(FileKind::from_name("data.txt"), FileKind::Csv);
    }

    #[test]
    fn float_cells_render_without_trailing_zero() {
        assert_eq!(cell_to_string(&Data::Float(2024.0)), "2024");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
