//! Commands that move rows in or out: CSV export, bulk import, inline update.

use anyhow::{bail, Context};
use ekraf_core::dataset::{self, DatasetSpec};
use ekraf_core::filter::Filters;
use ekraf_core::query::Row;
use ekraf_core::QueryBackend;
use ekraf_data::totals::number_value;
use ekraf_db::import::{self, ImportJob, ImportPolicy};
use ekraf_db::DatasetService;
use ekraf_utils::export::{self, dataset_columns};
use ekraf_utils::import::parse_file;
use log::info;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Page(u32),
    FilteredSet,
}

/// Write the selected rows to `<out_dir>/<dataset>_<year>[_page-N].csv` and
/// return the path.
pub async fn export<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
    filters: &Filters,
    scope: ExportScope,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let spec = dataset::by_name(name)?;
    let service = DatasetService::new(backend.clone(), spec);
    let (rows, page) = match scope {
        ExportScope::Page(page) => (service.list(filters, page).await?.rows, Some(page)),
        ExportScope::FilteredSet => (service.fetch_all(filters).await?, None),
    };

    let csv = export::to_csv(&dataset_columns(spec), &rows)?;
    let path = out_dir.join(export::export_filename(spec.name, filters.year(), page));
    std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Parse, validate and insert a spreadsheet. A rejected batch is an error
/// that still reports how many rows made it in.
pub async fn import<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
    file: &Path,
    strict: bool,
    batch_size: usize,
) -> anyhow::Result<String> {
    let spec = dataset::by_name(name)?;
    let parsed = parse_file(file)?;
    let policy = if strict {
        ImportPolicy::Strict
    } else {
        ImportPolicy::SkipInvalid
    };
    let prepared = import::prepare(spec, &parsed, policy)?;

    let service = DatasetService::new(backend.clone(), spec);
    let report = ImportJob::new()
        .batch_size(batch_size)
        .run(&service, &prepared.rows, |progress| {
            info!(
                "{}/{} rows ({}%)",
                progress.processed,
                progress.total,
                progress.percent()
            )
        })
        .await;

    if let Some(error) = report.error {
        bail!(
            "import stopped after {} of {} rows: {}",
            report.inserted,
            report.total,
            error
        );
    }
    Ok(format!(
        "imported {} rows into {} ({} skipped)",
        report.inserted,
        spec.table,
        prepared.skipped.len()
    ))
}

/// Build a typed patch from `key=value` pairs: numeric columns become
/// numbers, an empty value clears the cell.
pub fn patch_row(spec: &DatasetSpec, assignments: &[(String, String)]) -> anyhow::Result<Row> {
    let mut patch = Row::new();
    for (key, raw) in assignments {
        let Some(column) = spec.columns.iter().find(|c| c.key == key) else {
            bail!("{} has no editable column {:?}", spec.name, key);
        };
        let value = if raw.is_empty() {
            Value::Null
        } else if column.numeric {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("{} must be a number, got {:?}", key, raw))?;
            number_value(number)
        } else {
            Value::String(raw.clone())
        };
        patch.insert(key.clone(), value);
    }
    Ok(patch)
}

pub async fn update<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
    id: i64,
    assignments: &[(String, String)],
) -> anyhow::Result<Row> {
    let spec = dataset::by_name(name)?;
    let patch = patch_row(spec, assignments)?;
    let row = DatasetService::new(backend.clone(), spec)
        .update(id, &patch)
        .await?;
    info!("Updated {} row {}", spec.table, id);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_core::dataset::INVESTMENT;
    use ekraf_db::{Backend, Database};
    use serde_json::json;

    fn fixtures() -> Backend {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures");
        Backend::Local(Database::from_fixture_dir(&dir).unwrap())
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ekraf-cmd-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn page_export_is_named_after_year_and_page() {
        let dir = scratch_dir("export");
        let filters = Filters::new().with("year", "2024");
        let path = export(&fixtures(), "investment", &filters, ExportScope::Page(2), &dir)
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "investment_2024_page-2.csv");

        let text = std::fs::read_to_string(&path).unwrap();
        let rows = export::read_exported(&text, &dataset_columns(&INVESTMENT)).unwrap();
        assert_eq!(rows.len(), 10);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn full_export_covers_the_filtered_set() {
        let dir = scratch_dir("export-all");
        let path = export(&fixtures(), "patents", &Filters::new(), ExportScope::FilteredSet, &dir)
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "patents_all-years.csv");
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + 15);
        std::fs::remove_dir_all(dir).ok();
    }

    const UPLOAD: &str = "\
Nama Perusahaan,Kabupaten/Kota,Status PM,Tahun,Periode,Investasi (Rp)
PT Wayang Digital,Kota Bandung,PMDN,2025,Q1,150000000
,Kota Bogor,PMA,2025,Q1,900
CV Angklung,Kabupaten Sumedang,PMDN,2025,Q2,75000000
";

    #[tokio::test]
    async fn import_skips_rows_without_company_name() {
        let dir = scratch_dir("import");
        let file = dir.join("upload.csv");
        std::fs::write(&file, UPLOAD).unwrap();

        let backend = fixtures();
        let summary = import(&backend, "investment", &file, false, 100).await.unwrap();
        assert_eq!(summary, "imported 2 rows into investment_records (1 skipped)");
        let db = backend.local().unwrap();
        assert_eq!(db.row_count("investment_records").unwrap(), 64);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn strict_import_rejects_the_file() {
        let dir = scratch_dir("import-strict");
        let file = dir.join("upload.csv");
        std::fs::write(&file, UPLOAD).unwrap();

        let backend = fixtures();
        assert!(import(&backend, "investment", &file, true, 100).await.is_err());
        assert_eq!(
            backend.local().unwrap().row_count("investment_records").unwrap(),
            62
        );
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn patches_are_typed_by_column() {
        let patch = patch_row(
            &INVESTMENT,
            &[
                ("project_count".into(), "3".into()),
                ("region".into(), "Kota Depok".into()),
                ("permit_number".into(), "".into()),
            ],
        )
        .unwrap();
        assert_eq!(patch["project_count"], json!(3));
        assert_eq!(patch["region"], json!("Kota Depok"));
        assert_eq!(patch["permit_number"], Value::Null);

        assert!(patch_row(&INVESTMENT, &[("id".into(), "1".into())]).is_err());
        assert!(patch_row(&INVESTMENT, &[("project_count".into(), "many".into())]).is_err());
    }

    #[tokio::test]
    async fn update_returns_the_stored_row() {
        let row = update(
            &fixtures(),
            "investment",
            1,
            &[("project_count".into(), "9".into())],
        )
        .await
        .unwrap();
        assert_eq!(row["project_count"], json!(9));
        assert_eq!(row["id"], json!(1));
    }
}
