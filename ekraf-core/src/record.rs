//! The core investment record (one company/project entry) and its mapping
//! from imported spreadsheet rows.

use crate::capital_status::CapitalStatus;
use crate::period::Period;
use crate::query::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A company/project entry of the `investment_records` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub sector: String,
    pub subsector: String,
    pub company_name: String,
    #[serde(default)]
    pub permit_number: Option<String>,
    #[serde(default)]
    pub project_code: Option<String>,
    #[serde(default)]
    pub kbli_code: Option<String>,
    #[serde(default)]
    pub kbli_title: Option<String>,
    pub region: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub investment_usd: f64,
    pub investment_idr: f64,
    #[serde(default)]
    pub additional_investment_idr: f64,
    #[serde(default)]
    pub project_count: i64,
    #[serde(default)]
    pub workers_domestic: i64,
    #[serde(default)]
    pub workers_foreign: i64,
    #[serde(default)]
    pub workers_total: i64,
    pub capital_status: CapitalStatus,
    pub year: i32,
    pub period: Period,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Why an imported row could not become a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    MissingField(&'static str),
    InvalidNumber { field: &'static str, value: String },
    InvalidValue { field: &'static str, value: String },
    Negative(&'static str),
    InvalidYear(i32),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field {}", field),
            Self::InvalidNumber { field, value } => {
                write!(f, "field {} is not a number: {:?}", field, value)
            }
            Self::InvalidValue { field, value } => {
                write!(f, "field {} has an unrecognized value: {:?}", field, value)
            }
            Self::Negative(field) => write!(f, "field {} must not be negative", field),
            Self::InvalidYear(year) => write!(f, "year must be positive, got {}", year),
        }
    }
}

impl std::error::Error for RecordError {}

/// Recognized import columns: canonical field name and the header spellings
/// (already normalized to lowercase snake case) that map onto it.
pub const IMPORT_FIELDS: &[(&str, &[&str])] = &[
    ("sector", &["sector", "sektor"]),
    ("subsector", &["subsector", "sub_sector", "subsektor", "sub_sektor"]),
    ("company_name", &["company_name", "nama_perusahaan", "company", "perusahaan"]),
    ("permit_number", &["permit_number", "nib", "nomor_izin"]),
    ("project_code", &["project_code", "id_proyek", "kode_proyek"]),
    ("kbli_code", &["kbli_code", "kbli", "kode_kbli"]),
    ("kbli_title", &["kbli_title", "judul_kbli", "uraian_kbli"]),
    ("region", &["region", "kabupaten_kota", "kab_kota", "wilayah"]),
    ("district", &["district", "kecamatan"]),
    ("address", &["address", "alamat"]),
    ("country", &["country", "negara"]),
    ("investment_usd", &["investment_usd", "investasi_us$", "investasi_usd", "usd"]),
    ("investment_idr", &["investment_idr", "investasi_rp", "investasi_idr", "rp"]),
    (
        "additional_investment_idr",
        &["additional_investment_idr", "tambahan_investasi", "tambahan_investasi_rp"],
    ),
    ("project_count", &["project_count", "jumlah_proyek", "proyek"]),
    ("workers_domestic", &["workers_domestic", "tki", "tenaga_kerja_indonesia"]),
    ("workers_foreign", &["workers_foreign", "tka", "tenaga_kerja_asing"]),
    ("workers_total", &["workers_total", "total_tenaga_kerja", "tenaga_kerja"]),
    ("capital_status", &["capital_status", "status_pm", "status_modal", "pma_pmdn"]),
    ("year", &["year", "tahun"]),
    ("period", &["period", "periode", "triwulan", "semester"]),
    ("phone", &["phone", "telepon", "no_telp"]),
    ("email", &["email", "e_mail"]),
];

/// Normalize a spreadsheet header: lowercase, separators to `_`, brackets
/// and dots dropped. `"Investasi (US$)"` becomes `"investasi_us$"`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim_start_matches('\u{feff}').trim().chars() {
        match c {
            ' ' | '-' | '/' | '\t' => out.push('_'),
            '(' | ')' | '.' => {}
            c => out.extend(c.to_lowercase()),
        }
    }
    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('_').to_string()
}

/// Map a normalized header onto its canonical record field.
pub fn canonical_field(header: &str) -> Option<&'static str> {
    IMPORT_FIELDS
        .iter()
        .find(|(_, aliases)| aliases.contains(&header))
        .map(|(field, _)| *field)
}

fn text(fields: &BTreeMap<String, String>, field: &'static str) -> Option<String> {
    fields
        .get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(fields: &BTreeMap<String, String>, field: &'static str) -> Result<String, RecordError> {
    text(fields, field).ok_or(RecordError::MissingField(field))
}

/// Parse an amount such as `1,250,000.50` or `Rp 500000`; blank is zero.
fn amount(fields: &BTreeMap<String, String>, field: &'static str) -> Result<f64, RecordError> {
    let Some(raw) = text(fields, field) else {
        return Ok(0.0);
    };
    let cleaned: String = raw
        .trim_start_matches("Rp")
        .trim_start_matches('$')
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '_'))
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| RecordError::InvalidNumber { field, value: raw })
}

fn count(fields: &BTreeMap<String, String>, field: &'static str) -> Result<i64, RecordError> {
    let value = amount(fields, field)?;
    Ok(value.round() as i64)
}

impl Record {
    /// Build a record from an import row keyed by canonical field names.
    ///
    /// `company_name`, `region`, `capital_status`, `year` and `period` are
    /// required; numeric blanks are zero and a blank `workers_total` is
    /// derived from the domestic and foreign counts.
    pub fn from_import_row(fields: &BTreeMap<String, String>) -> Result<Record, RecordError> {
        let capital_raw = required(fields, "capital_status")?;
        let capital_status = capital_raw
            .parse::<CapitalStatus>()
            .map_err(|_| RecordError::InvalidValue {
                field: "capital_status",
                value: capital_raw.clone(),
            })?;
        let period_raw = required(fields, "period")?;
        let period = period_raw
            .parse::<Period>()
            .map_err(|_| RecordError::InvalidValue {
                field: "period",
                value: period_raw.clone(),
            })?;
        let year_raw = required(fields, "year")?;
        let year = year_raw
            .parse::<i32>()
            .map_err(|_| RecordError::InvalidNumber {
                field: "year",
                value: year_raw.clone(),
            })?;

        let workers_domestic = count(fields, "workers_domestic")?;
        let workers_foreign = count(fields, "workers_foreign")?;
        let workers_total = match text(fields, "workers_total") {
            Some(_) => count(fields, "workers_total")?,
            None => workers_domestic + workers_foreign,
        };

        let record = Record {
            id: None,
            sector: text(fields, "sector").unwrap_or_default(),
            subsector: text(fields, "subsector").unwrap_or_default(),
            company_name: required(fields, "company_name")?,
            permit_number: text(fields, "permit_number"),
            project_code: text(fields, "project_code"),
            kbli_code: text(fields, "kbli_code"),
            kbli_title: text(fields, "kbli_title"),
            region: required(fields, "region")?,
            district: text(fields, "district"),
            address: text(fields, "address"),
            country: text(fields, "country"),
            investment_usd: amount(fields, "investment_usd")?,
            investment_idr: amount(fields, "investment_idr")?,
            additional_investment_idr: amount(fields, "additional_investment_idr")?,
            project_count: count(fields, "project_count")?,
            workers_domestic,
            workers_foreign,
            workers_total,
            capital_status,
            year,
            period,
            phone: text(fields, "phone"),
            email: text(fields, "email"),
            created_at: None,
        };
        record.validate()?;
        Ok(record)
    }

    /// Year is positive; money and head counts are non-negative.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.year <= 0 {
            return Err(RecordError::InvalidYear(self.year));
        }
        let amounts = [
            ("investment_usd", self.investment_usd),
            ("investment_idr", self.investment_idr),
            ("additional_investment_idr", self.additional_investment_idr),
        ];
        for (field, value) in amounts {
            if value < 0.0 {
                return Err(RecordError::Negative(field));
            }
        }
        let counts = [
            ("project_count", self.project_count),
            ("workers_domestic", self.workers_domestic),
            ("workers_foreign", self.workers_foreign),
            ("workers_total", self.workers_total),
        ];
        for (field, value) in counts {
            if value < 0 {
                return Err(RecordError::Negative(field));
            }
        }
        Ok(())
    }

    /// Backend row for insertion.
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Row::new(),
        }
    }

    pub fn from_row(row: &Row) -> Result<Record, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(row.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> BTreeMap<String, String> {
        import_row(&[
            ("company_name", "PT Kreasi Nusantara"),
            ("region", "Kota Bandung"),
            ("subsector", "Kuliner"),
            ("capital_status", "pmdn"),
            ("year", "2024"),
            ("period", "Triwulan II"),
            ("investment_idr", "1,500,000,000"),
            ("workers_domestic", "12"),
            ("workers_foreign", "1"),
        ])
    }

    #[test]
    fn builds_record_from_import_row() {
        let record = Record::from_import_row(&minimal()).unwrap();
        assert_eq!(record.company_name, "PT Kreasi Nusantara");
        assert_eq!(record.capital_status, CapitalStatus::Pmdn);
        assert_eq!(record.period, Period::Q2);
        assert_eq!(record.investment_idr, 1_500_000_000.0);
        assert_eq!(record.investment_usd, 0.0);
        assert_eq!(record.workers_total, 13);
    }

    #[test]
    fn missing_company_name_is_reported() {
        let mut fields = minimal();
        fields.insert("company_name".into(), "   ".into());
        assert_eq!(
            Record::from_import_row(&fields),
            Err(RecordError::MissingField("company_name"))
        );
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut fields = minimal();
        fields.insert("investment_usd".into(), "-5".into());
        assert_eq!(
            Record::from_import_row(&fields),
            Err(RecordError::Negative("investment_usd"))
        );
    }

    #[test]
    fn bad_capital_status_is_rejected() {
        let mut fields = minimal();
        fields.insert("capital_status".into(), "joint".into());
        assert!(matches!(
            Record::from_import_row(&fields),
            Err(RecordError::InvalidValue { field: "capital_status", .. })
        ));
    }

    #[test]
    fn header_aliases_resolve() {
        assert_eq!(canonical_field("nama_perusahaan"), Some("company_name"));
        assert_eq!(canonical_field("tahun"), Some("year"));
        assert_eq!(canonical_field("status_pm"), Some("capital_status"));
        assert_eq!(canonical_field("unrelated"), None);
    }

    #[test]
    fn headers_normalize_before_lookup() {
        assert_eq!(normalize_header(" Investasi (US$) "), "investasi_us$");
        assert_eq!(normalize_header("Kabupaten/Kota"), "kabupaten_kota");
        assert_eq!(normalize_header("\u{feff}Nama Perusahaan"), "nama_perusahaan");
        assert_eq!(canonical_field(&normalize_header("Status PM")), Some("capital_status"));
    }

    #[test]
    fn row_round_trip_keeps_fields() {
        let record = Record::from_import_row(&minimal()).unwrap();
        let row = record.to_row();
        assert_eq!(row.get("capital_status"), Some(&serde_json::json!("PMDN")));
        assert!(!row.contains_key("id"));
        let back = Record::from_row(&row).unwrap();
        assert_eq!(back, record);
    }
}
