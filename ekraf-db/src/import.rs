//! Bulk import: validate parsed spreadsheet rows, then insert them through a
//! [`DatasetService`] in sequential fixed-size batches.
//!
//! A batch is atomic. When batch `k` is rejected, batches `1..k-1` stay
//! committed, nothing after `k` is sent, and the report carries the
//! committed count together with the backend's error message.

use crate::service::DatasetService;
use ekraf_core::backend::QueryBackend;
use ekraf_core::dataset::{DatasetSpec, ImportShape};
use ekraf_core::query::Row;
use ekraf_core::record::{normalize_header, Record, RecordError};
use ekraf_data::totals::number_value;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What to do with a row that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Leave the row out and count it.
    #[default]
    SkipInvalid,
    /// Refuse the whole file before anything is inserted.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    /// The dataset does not accept imports.
    NotImportable(&'static str),
    /// A row failed validation under [`ImportPolicy::Strict`]. `line` is the
    /// 1-based data row number (the header is not counted).
    InvalidRow { line: usize, reason: String },
    /// Nothing importable was left.
    Empty,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImportable(name) => write!(f, "dataset {} does not accept imports", name),
            Self::InvalidRow { line, reason } => write!(f, "row {}: {}", line, reason),
            Self::Empty => write!(f, "no valid rows to import"),
        }
    }
}

impl std::error::Error for ImportError {}

/// Rows ready for insertion plus the ones left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prepared {
    pub rows: Vec<Row>,
    /// `(line, reason)` for every skipped row.
    pub skipped: Vec<(usize, String)>,
}

fn field<'a>(fields: &'a BTreeMap<String, String>, key: &str, label: &str) -> Option<&'a str> {
    fields
        .get(key)
        .or_else(|| fields.get(&normalize_header(label)))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Copy a dataset's visible columns out of an import row. Numeric columns
/// and the year column are parsed; anything else is kept as text.
fn column_row(dataset: &DatasetSpec, fields: &BTreeMap<String, String>) -> Result<Row, RecordError> {
    let mut row = Row::new();
    for column in dataset.columns {
        let Some(raw) = field(fields, column.key, column.label) else {
            continue;
        };
        let value = if column.numeric {
            let cleaned: String = raw.chars().filter(|c| !matches!(c, ',' | ' ')).collect();
            let number = cleaned.parse::<f64>().map_err(|_| RecordError::InvalidNumber {
                field: column.key,
                value: raw.to_string(),
            })?;
            number_value(number)
        } else if Some(column.key) == dataset.year_column {
            let year = raw.parse::<i32>().map_err(|_| RecordError::InvalidNumber {
                field: column.key,
                value: raw.to_string(),
            })?;
            if year <= 0 {
                return Err(RecordError::InvalidYear(year));
            }
            Value::from(year)
        } else {
            Value::String(raw.to_string())
        };
        row.insert(column.key.to_string(), value);
    }
    Ok(row)
}

/// Validate and convert parsed rows for `dataset`.
///
/// The dataset's required field must be non-blank; investment rows must also
/// satisfy [`Record`]'s invariants.
pub fn prepare(
    dataset: &'static DatasetSpec,
    parsed: &[BTreeMap<String, String>],
    policy: ImportPolicy,
) -> Result<Prepared, ImportError> {
    let config = dataset
        .import
        .ok_or(ImportError::NotImportable(dataset.name))?;
    let required_label = dataset
        .columns
        .iter()
        .find(|c| c.key == config.required_field)
        .map_or(config.required_field, |c| c.label);
    let mut prepared = Prepared::default();

    for (index, fields) in parsed.iter().enumerate() {
        let line = index + 1;
        let converted = if field(fields, config.required_field, required_label).is_none() {
            Err(RecordError::MissingField(config.required_field))
        } else {
            match config.shape {
                ImportShape::InvestmentRecord => {
                    Record::from_import_row(fields).map(|record| record.to_row())
                }
                ImportShape::Columns => column_row(dataset, fields),
            }
        };

        match (converted, policy) {
            (Ok(row), _) => prepared.rows.push(row),
            (Err(err), ImportPolicy::Strict) => {
                return Err(ImportError::InvalidRow {
                    line,
                    reason: err.to_string(),
                })
            }
            (Err(err), ImportPolicy::SkipInvalid) => {
                log::debug!("[EKRAF] import: skipping row {}: {}", line, err);
                prepared.skipped.push((line, err.to_string()));
            }
        }
    }

    if !prepared.skipped.is_empty() {
        log::warn!(
            "[EKRAF] import: {} of {} rows skipped for {}",
            prepared.skipped.len(),
            parsed.len(),
            dataset.name
        );
    }
    if prepared.rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(prepared)
}

/// Progress after a committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Whole percent, 0-100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100) / self.total).min(100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    /// Rows committed before the run ended.
    pub inserted: usize,
    /// Message of the batch rejection that stopped the run.
    pub error: Option<String>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImportJob {
    batch_size: usize,
}

impl Default for ImportJob {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Insert `rows` batch by batch, calling `on_progress` after each commit.
    /// Stops at the first rejected batch.
    pub async fn run<B, F>(&self, service: &DatasetService<B>, rows: &[Row], mut on_progress: F) -> ImportReport
    where
        B: QueryBackend,
        F: FnMut(Progress),
    {
        let total = rows.len();
        let mut inserted = 0;
        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            match service.bulk_insert(batch).await {
                Ok(_) => {
                    inserted += batch.len();
                    on_progress(Progress {
                        processed: inserted,
                        total,
                    });
                }
                Err(err) => {
                    log::error!(
                        "[EKRAF] import: batch {} rejected after {} of {} rows: {}",
                        index + 1,
                        inserted,
                        total,
                        err
                    );
                    return ImportReport {
                        total,
                        inserted,
                        error: Some(err.to_string()),
                    };
                }
            }
        }
        log::info!(
            "[EKRAF] import: {} rows imported into {}",
            inserted,
            service.dataset().table
        );
        ImportReport {
            total,
            inserted,
            error: None,
        }
    }
}

/// Import panel lifecycle: `Idle -> Uploading -> Processing -> Success | Error`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImportPhase {
    #[default]
    Idle,
    Uploading { file_name: String },
    Processing { file_name: String, progress: Progress },
    Success { inserted: usize, skipped: usize },
    Error { message: String, inserted: usize },
}

impl ImportPhase {
    pub fn start(&mut self, file_name: &str) {
        *self = ImportPhase::Uploading {
            file_name: file_name.to_string(),
        };
    }

    /// Rows parsed and validated; inserts begin.
    pub fn processing(&mut self, total: usize) {
        let file_name = match self {
            ImportPhase::Uploading { file_name } | ImportPhase::Processing { file_name, .. } => {
                std::mem::take(file_name)
            }
            _ => String::new(),
        };
        *self = ImportPhase::Processing {
            file_name,
            progress: Progress {
                processed: 0,
                total,
            },
        };
    }

    pub fn advance(&mut self, update: Progress) {
        if let ImportPhase::Processing { progress, .. } = self {
            *progress = update;
        }
    }

    pub fn finish(&mut self, report: &ImportReport, skipped: usize) {
        *self = match &report.error {
            None => ImportPhase::Success {
                inserted: report.inserted,
                skipped,
            },
            Some(message) => ImportPhase::Error {
                message: message.clone(),
                inserted: report.inserted,
            },
        };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = ImportPhase::Error {
            message: message.into(),
            inserted: 0,
        };
    }

    /// Back to `Idle`, dropping any held state.
    pub fn reset(&mut self) {
        *self = ImportPhase::Idle;
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ImportPhase::Uploading { .. } | ImportPhase::Processing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use ekraf_core::dataset::{INVESTMENT, PATENTS, WORKFORCE};
    use ekraf_core::error::QueryError;
    use ekraf_core::query::SelectQuery;
    use std::cell::RefCell;

    fn parsed(pairs: &[&[(&str, &str)]]) -> Vec<BTreeMap<String, String>> {
        pairs
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    fn investment_row(name: &str) -> Vec<(&str, &str)> {
        vec![
            ("company_name", name),
            ("region", "Kota Bandung"),
            ("capital_status", "PMDN"),
            ("year", "2024"),
            ("period", "Q1"),
            ("investment_idr", "250000000"),
        ]
    }

    /// Accepts inserts until call `fail_on`, then rejects.
    #[derive(Default)]
    struct Flaky {
        committed: RefCell<Vec<Row>>,
        calls: RefCell<usize>,
        fail_on: Option<usize>,
    }

    impl QueryBackend for Flaky {
        async fn select(&self, _query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
            Ok(Vec::new())
        }

        async fn count(&self, _query: &SelectQuery) -> Result<u64, QueryError> {
            Ok(0)
        }

        async fn insert(&self, _table: &str, rows: &[Row]) -> Result<Vec<Row>, QueryError> {
            *self.calls.borrow_mut() += 1;
            if Some(*self.calls.borrow()) == self.fail_on {
                return Err(QueryError::Http {
                    status: 400,
                    message: "value too long for type character varying(255)".into(),
                });
            }
            self.committed.borrow_mut().extend(rows.iter().cloned());
            Ok(rows.to_vec())
        }

        async fn update(&self, table: &str, id: i64, _patch: &Row) -> Result<Row, QueryError> {
            Err(QueryError::NotFound {
                table: table.into(),
                id,
            })
        }

        async fn rpc(&self, _procedure: &str, _args: &Row) -> Result<Vec<Row>, QueryError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn skip_invalid_keeps_exactly_the_valid_rows() {
        let mut rows = Vec::new();
        for i in 0..7 {
            rows.push(investment_row(if i % 3 == 0 { "  " } else { "PT Valid" }));
        }
        let refs: Vec<&[(&str, &str)]> = rows.iter().map(|r| r.as_slice()).collect();
        let prepared = prepare(&INVESTMENT, &parsed(&refs), ImportPolicy::SkipInvalid).unwrap();
        assert_eq!(prepared.rows.len(), 4);
        assert_eq!(
            prepared.skipped.iter().map(|(line, _)| *line).collect::<Vec<_>>(),
            vec![1, 4, 7]
        );
    }

    #[test]
    fn strict_rejects_the_file() {
        let good = investment_row("PT Valid");
        let bad = investment_row("");
        let result = prepare(
            &INVESTMENT,
            &parsed(&[good.as_slice(), bad.as_slice()]),
            ImportPolicy::Strict,
        );
        assert_eq!(
            result,
            Err(ImportError::InvalidRow {
                line: 2,
                reason: "missing required field company_name".into()
            })
        );
    }

    #[test]
    fn column_datasets_accept_labels_and_parse_numbers() {
        let rows = parsed(&[
            &[("judul", "Alat Tenun Digital"), ("tahun", "2023"), ("jumlah_klaim", "4")],
            &[("title", "Wayang Interaktif"), ("year", "2024")],
            &[("applicant", "CV Tanpa Judul")],
        ]);
        let prepared = prepare(&PATENTS, &rows, ImportPolicy::SkipInvalid).unwrap();
        assert_eq!(prepared.rows.len(), 2);
        assert_eq!(prepared.rows[0].get("year"), Some(&Value::from(2023)));
        assert_eq!(prepared.rows[0].get("claim_count"), Some(&Value::from(4)));
        assert_eq!(prepared.skipped.len(), 1);
    }

    #[test]
    fn datasets_without_import_are_refused() {
        assert_eq!(
            prepare(&WORKFORCE, &[], ImportPolicy::SkipInvalid),
            Err(ImportError::NotImportable("workforce"))
        );
        assert_eq!(
            prepare(&PATENTS, &parsed(&[&[("title", " ")]]), ImportPolicy::SkipInvalid),
            Err(ImportError::Empty)
        );
    }

    #[tokio::test]
    async fn batches_report_progress_in_order() {
        let service = DatasetService::new(Flaky::default(), &INVESTMENT);
        let rows = vec![Row::new(); 250];
        let mut seen = Vec::new();
        let report = ImportJob::new()
            .run(&service, &rows, |p| seen.push(p.percent()))
            .await;
        assert!(report.is_success());
        assert_eq!(report.inserted, 250);
        assert_eq!(seen, vec![40, 80, 100]);
    }

    #[tokio::test]
    async fn rejected_batch_keeps_earlier_batches() {
        let backend = Flaky {
            fail_on: Some(3),
            ..Flaky::default()
        };
        let service = DatasetService::new(backend, &INVESTMENT);
        let rows = vec![Row::new(); 450];
        let mut progress = Vec::new();
        let report = ImportJob::new()
            .run(&service, &rows, |p| progress.push(p.processed))
            .await;
        assert_eq!(report.inserted, 200);
        assert_eq!(progress, vec![100, 200]);
        assert!(report
            .error
            .as_deref()
            .is_some_and(|m| m.contains("character varying")));
        assert_eq!(service.backend().committed.borrow().len(), 200);
        assert_eq!(*service.backend().calls.borrow(), 3, "no batch after the failure");
    }

    #[tokio::test]
    async fn valid_rows_reach_the_database() {
        let mut rows = Vec::new();
        for i in 0..130 {
            rows.push(investment_row(if i % 10 == 0 { "" } else { "PT Impor" }));
        }
        let refs: Vec<&[(&str, &str)]> = rows.iter().map(|r| r.as_slice()).collect();
        let prepared = prepare(&INVESTMENT, &parsed(&refs), ImportPolicy::default()).unwrap();
        assert_eq!(prepared.rows.len(), 117);

        let db = Database::new().unwrap();
        let service = DatasetService::new(db.clone(), &INVESTMENT);
        let report = ImportJob::new().run(&service, &prepared.rows, |_| {}).await;
        assert_eq!(report.inserted, 117);
        assert_eq!(db.row_count("investment_records").unwrap(), 117);
        assert!(db.row_count("region_rankings").unwrap() > 0);
    }

    #[test]
    fn phase_walks_the_happy_path() {
        let mut phase = ImportPhase::default();
        phase.start("investasi_2024.xlsx");
        assert!(phase.is_busy());
        phase.processing(300);
        phase.advance(Progress {
            processed: 100,
            total: 300,
        });
        assert!(matches!(
            &phase,
            ImportPhase::Processing { file_name, progress } if file_name == "investasi_2024.xlsx" && progress.percent() == 33
        ));
        phase.finish(
            &ImportReport {
                total: 300,
                inserted: 300,
                error: None,
            },
            4,
        );
        assert_eq!(
            phase,
            ImportPhase::Success {
                inserted: 300,
                skipped: 4
            }
        );
        phase.reset();
        assert_eq!(phase, ImportPhase::Idle);
    }
}
