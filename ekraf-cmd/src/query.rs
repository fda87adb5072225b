//! Read-only commands: list, filter options, years, summary, ranking, pivot.
//!
//! Each returns the text to print so the commands can be checked without
//! capturing stdout.

use anyhow::Context;
use ekraf_core::dataset::{self, REGION_RANKING, SUBSECTOR_RANKING};
use ekraf_core::filter::Filters;
use ekraf_core::query::Row;
use ekraf_core::ranking::{Dimension, PivotMetric};
use ekraf_core::QueryBackend;
use ekraf_data::{pivot, summary};
use ekraf_db::DatasetService;
use ekraf_utils::export::{self, dataset_columns, pivot_columns};
use log::info;

pub fn datasets() -> String {
    let mut out = String::new();
    for spec in dataset::all() {
        out.push_str(&format!("{}\t{}\t{}\n", spec.name, spec.table, spec.title));
    }
    out
}

fn service<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
) -> anyhow::Result<DatasetService<B>> {
    let spec = dataset::by_name(name)?;
    Ok(DatasetService::new(backend.clone(), spec))
}

/// One page as CSV, followed by the dataset's grand-total row.
pub async fn list<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
    filters: &Filters,
    page: u32,
    page_size: Option<u32>,
) -> anyhow::Result<String> {
    let service = service(backend, name)?;
    let spec = service.dataset();
    let page = service
        .list_sized(filters, page, page_size.unwrap_or(spec.page_size))
        .await?;
    info!(
        "Page {} of {} ({} matching rows)",
        page.current_page, page.total_pages, page.total_count
    );

    let mut rows = page.rows;
    if !rows.is_empty() {
        let total = service.grand_total(filters, &rows).await?;
        rows.push(total);
    }
    export::to_csv(&dataset_columns(spec), &rows)
}

pub async fn options<B: QueryBackend + Clone>(backend: &B, name: &str) -> anyhow::Result<String> {
    let options = service(backend, name)?.filter_options().await?;
    let mut out = String::new();
    for (key, values) in options {
        out.push_str(&format!("{}: {}\n", key, values.join(", ")));
    }
    Ok(out)
}

pub async fn years<B: QueryBackend + Clone>(backend: &B, name: &str) -> anyhow::Result<String> {
    let years = service(backend, name)?.available_years().await?;
    Ok(years.iter().map(|y| format!("{}\n", y)).collect())
}

pub async fn summary<B: QueryBackend + Clone>(
    backend: &B,
    name: &str,
    filters: &Filters,
) -> anyhow::Result<String> {
    let metrics = service(backend, name)?.summary_metrics(filters).await?;
    Ok(serde_json::to_string_pretty(&summary::to_value(&metrics))?)
}

fn parse_dimension(raw: &str) -> anyhow::Result<Dimension> {
    raw.parse::<Dimension>().map_err(anyhow::Error::msg)
}

pub async fn ranking<B: QueryBackend + Clone>(
    backend: &B,
    dimension: &str,
    year: Option<i32>,
) -> anyhow::Result<String> {
    let dimension = parse_dimension(dimension)?;
    let spec = match dimension {
        Dimension::Region => &REGION_RANKING,
        Dimension::Subsector => &SUBSECTOR_RANKING,
    };
    let entries = DatasetService::new(backend.clone(), spec)
        .ranking(dimension, year)
        .await?;
    info!("{} {} ranking entries", entries.len(), dimension.label());

    let rows = entries
        .iter()
        .map(|entry| {
            serde_json::to_value(entry).map(|v| v.as_object().cloned().unwrap_or_default())
        })
        .collect::<Result<Vec<Row>, _>>()
        .context("failed to serialize ranking entries")?;
    export::to_csv(&dataset_columns(spec), &rows)
}

pub async fn pivot<B: QueryBackend + Clone>(
    backend: &B,
    dimension: &str,
    metric: &str,
) -> anyhow::Result<String> {
    let dimension = parse_dimension(dimension)?;
    let metric = metric.parse::<PivotMetric>().map_err(anyhow::Error::msg)?;
    let sources = DatasetService::new(backend.clone(), &dataset::INVESTMENT)
        .pivot(dimension, metric)
        .await?;
    let grid = pivot::reshape(&sources);
    info!(
        "{} by {}: {} groups over {} years",
        metric.label(),
        dimension.label(),
        grid.groups.len(),
        grid.years.len()
    );
    export::to_csv(&pivot_columns(&grid.columns(dimension.label())), &grid.rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_db::{Backend, Database};
    use serde_json::Value;
    use std::path::Path;

    fn fixtures() -> Backend {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures");
        Backend::Local(Database::from_fixture_dir(&dir).unwrap())
    }

    #[test]
    fn datasets_lists_every_registered_dataset() {
        let out = datasets();
        assert_eq!(out.lines().count(), dataset::all().len());
        assert!(out.lines().any(|l| l.starts_with("investment\tinvestment_records")));
    }

    #[tokio::test]
    async fn list_prints_page_and_grand_total() {
        let filters = Filters::new().with("year", "2024").with("capital_status", "PMA");
        let out = list(&fixtures(), "investment", &filters, 1, None).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("\"Nama Perusahaan\""));
        assert_eq!(lines.len(), 1 + 10 + 1);
        assert!(lines[11].starts_with("\"Grand Total\""));
    }

    #[tokio::test]
    async fn list_past_the_end_is_header_only() {
        let out = list(&fixtures(), "patents", &Filters::new(), 99, None)
            .await
            .unwrap();
        assert_eq!(out.lines().count(), 1);
    }

    #[tokio::test]
    async fn unknown_dataset_is_an_error() {
        let err = years(&fixtures(), "museums").await.unwrap_err();
        assert!(err.to_string().contains("museums"));
    }

    #[tokio::test]
    async fn years_come_back_ascending() {
        let out = years(&fixtures(), "investment").await.unwrap();
        assert_eq!(out, "2022\n2023\n2024\n");
    }

    #[tokio::test]
    async fn summary_is_json_with_status_breakdown() {
        let out = summary(&fixtures(), "investment", &Filters::new()).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["row_count"], 62);
        assert!(value["by_status"].get("PMA").is_some());
        assert!(value["by_status"].get("PMDN").is_some());
    }

    #[tokio::test]
    async fn pivot_ends_with_grand_total() {
        let out = pivot(&fixtures(), "subsector", "project_count").await.unwrap();
        let last = out.lines().last().unwrap();
        assert!(last.contains("\"Grand Total\""), "{}", last);
    }

    #[tokio::test]
    async fn ranking_rejects_unknown_dimension() {
        assert!(ranking(&fixtures(), "country", None).await.is_err());
        let out = ranking(&fixtures(), "region", Some(2024)).await.unwrap();
        assert!(out.lines().nth(1).unwrap().starts_with("\"1\","));
    }
}
