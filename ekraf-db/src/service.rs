//! The per-dataset query service.
//!
//! One generic implementation of list / filter options / summary / years /
//! bulk insert / update / export, parameterized by a [`DatasetSpec`] and a
//! [`QueryBackend`]. Every dashboard table is an instance of it.
//!
//! Failures are logged here and returned unchanged; nothing is retried.

use crate::procedures::{PIVOT_PROCEDURE, RANKING_PROCEDURE};
use ekraf_core::backend::QueryBackend;
use ekraf_core::dataset::{DatasetSpec, FilterKind, FilterOp, TotalScope};
use ekraf_core::error::QueryError;
use ekraf_core::filter::Filters;
use ekraf_core::query::{display_value, numeric_value, Row, SelectQuery};
use ekraf_core::ranking::{Dimension, PivotMetric, PivotSource, RankingRow};
use ekraf_data::pagination::{slice_bounds, total_pages, Page};
use ekraf_data::summary::{self, SummaryMetrics};
use ekraf_data::totals;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Rows per request when walking an entire filtered set.
pub const FETCH_CHUNK: u64 = 1000;

#[derive(Debug, Clone)]
pub struct DatasetService<B> {
    backend: B,
    dataset: &'static DatasetSpec,
}

impl<B: QueryBackend> DatasetService<B> {
    pub fn new(backend: B, dataset: &'static DatasetSpec) -> Self {
        Self { backend, dataset }
    }

    pub fn dataset(&self) -> &'static DatasetSpec {
        self.dataset
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn logged<T>(&self, operation: &str, result: Result<T, QueryError>) -> Result<T, QueryError> {
        if let Err(err) = &result {
            log::error!(
                "[EKRAF] service: {} {} failed: {}",
                operation,
                self.dataset.name,
                err
            );
        }
        result
    }

    /// Filtered select in the dataset's stable order, not yet paged.
    fn filtered(&self, filters: &Filters) -> SelectQuery {
        let mut query =
            SelectQuery::new(self.dataset.table).filters(filters.predicates(self.dataset));
        query.order = self.dataset.order_keys();
        query
    }

    /// One page at the dataset's own page size.
    pub async fn list(&self, filters: &Filters, page: u32) -> Result<Page, QueryError> {
        self.list_sized(filters, page, self.dataset.page_size).await
    }

    /// One page of the filtered set. The exact count is taken first; when it
    /// is zero or `page` lies past the end, no rows are requested and an
    /// empty page carrying the true count comes back.
    pub async fn list_sized(
        &self,
        filters: &Filters,
        page: u32,
        page_size: u32,
    ) -> Result<Page, QueryError> {
        if page == 0 || page_size == 0 {
            return self.logged("list", Err(QueryError::InvalidPage(page)));
        }
        let query = self.filtered(filters);
        let total_count = self.logged("count", self.backend.count(&query).await)?;
        let pages = total_pages(total_count, page_size);
        if total_count == 0 || page > pages {
            log::debug!(
                "[EKRAF] service: list {} page {} of {}, nothing to fetch",
                self.dataset.name,
                page,
                pages
            );
            return Ok(Page::empty(total_count, page, page_size));
        }

        let (offset, limit) = slice_bounds(page, page_size);
        let rows = self.logged("list", self.backend.select(&query.range(offset, limit)).await)?;
        log::info!(
            "[EKRAF] service: list {} returned {} of {} rows",
            self.dataset.name,
            rows.len(),
            total_count
        );
        Ok(Page {
            rows,
            total_count,
            total_pages: pages,
            current_page: page,
            page_size,
        })
    }

    /// Distinct values per equality filter, sorted ascending (numerically
    /// for integer filters). Blank values are left out.
    pub async fn filter_options(&self) -> Result<BTreeMap<String, Vec<String>>, QueryError> {
        let mut options = BTreeMap::new();
        for field in self.dataset.filters.iter().filter(|f| f.op == FilterOp::Eq) {
            let query = SelectQuery::new(self.dataset.table).columns(&[field.column]);
            let rows = self.logged("filter options", self.backend.select(&query).await)?;
            let values = distinct(&rows, field.column);
            let sorted = match field.kind {
                FilterKind::Integer => {
                    let mut numbers: Vec<i64> =
                        values.iter().filter_map(|v| v.parse().ok()).collect();
                    numbers.sort_unstable();
                    numbers.dedup();
                    numbers.into_iter().map(|n| n.to_string()).collect()
                }
                FilterKind::Text => values.into_iter().collect(),
            };
            options.insert(field.key.to_string(), sorted);
        }
        Ok(options)
    }

    /// Totals and the per-status breakdown over the whole filtered set.
    ///
    /// Datasets with a summary procedure aggregate server-side; the others
    /// fetch every matching row and reduce here. Both give the same result.
    pub async fn summary_metrics(&self, filters: &Filters) -> Result<SummaryMetrics, QueryError> {
        match self.dataset.summary_procedure {
            Some(procedure) => {
                let args = filters.procedure_args(self.dataset);
                let groups = self.logged("summary", self.backend.rpc(procedure, &args).await)?;
                Ok(summary::from_grouped(
                    &groups,
                    &self.dataset.numeric_columns(),
                    self.dataset.primary_metric,
                ))
            }
            None => self.summary_by_scan(filters).await,
        }
    }

    /// Client-side reduction over every matching row.
    pub async fn summary_by_scan(&self, filters: &Filters) -> Result<SummaryMetrics, QueryError> {
        let rows = self.fetch_all(filters).await?;
        Ok(summary::reduce(
            &rows,
            &self.dataset.numeric_columns(),
            self.dataset.status_column,
            self.dataset.primary_metric,
        ))
    }

    /// "Grand Total" row for a rendered page, scoped per dataset.
    pub async fn grand_total(&self, filters: &Filters, page_rows: &[Row]) -> Result<Row, QueryError> {
        let label = self.dataset.label_column();
        match self.dataset.total_scope {
            TotalScope::CurrentPage => Ok(totals::grand_total(page_rows, self.dataset.columns, label)),
            TotalScope::FilteredSet => {
                let metrics = self.summary_metrics(filters).await?;
                Ok(totals::grand_total_from_sums(
                    &metrics.totals,
                    self.dataset.columns,
                    label,
                ))
            }
        }
    }

    /// Distinct years present in the dataset, ascending.
    pub async fn available_years(&self) -> Result<Vec<i32>, QueryError> {
        let Some(column) = self.dataset.year_column else {
            return Ok(Vec::new());
        };
        let query = SelectQuery::new(self.dataset.table).columns(&[column]);
        let rows = self.logged("years", self.backend.select(&query).await)?;
        let years: BTreeSet<i32> = rows
            .iter()
            .filter_map(|row| row.get(column).and_then(numeric_value))
            .map(|year| year as i32)
            .collect();
        Ok(years.into_iter().collect())
    }

    /// Insert a batch in one round trip, then refresh server-side aggregates
    /// when the dataset has any. A rejected batch inserts nothing.
    pub async fn bulk_insert(&self, rows: &[Row]) -> Result<Vec<Row>, QueryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let inserted = self.logged(
            "bulk insert",
            self.backend.insert(self.dataset.table, rows).await,
        )?;
        if let Some(procedure) = self.dataset.refresh_procedure {
            self.logged("refresh", self.backend.rpc(procedure, &Row::new()).await)?;
        }
        log::info!(
            "[EKRAF] service: inserted {} rows into {}",
            inserted.len(),
            self.dataset.table
        );
        Ok(inserted)
    }

    /// Inline edit of one row; returns the row as stored.
    pub async fn update(&self, id: i64, patch: &Row) -> Result<Row, QueryError> {
        self.logged(
            "update",
            self.backend.update(self.dataset.table, id, patch).await,
        )
    }

    /// Every matching row in list order, fetched in chunks.
    pub async fn fetch_all(&self, filters: &Filters) -> Result<Vec<Row>, QueryError> {
        let query = self.filtered(filters);
        let mut rows = Vec::new();
        let mut offset = 0u64;
        loop {
            let chunk = self.logged(
                "fetch all",
                self.backend.select(&query.clone().range(offset, FETCH_CHUNK)).await,
            )?;
            let fetched = chunk.len() as u64;
            rows.extend(chunk);
            if fetched < FETCH_CHUNK {
                break;
            }
            offset += FETCH_CHUNK;
        }
        Ok(rows)
    }

    /// Ranking entries from the ranking procedure, optionally for one year.
    pub async fn ranking(
        &self,
        dimension: Dimension,
        year: Option<i32>,
    ) -> Result<Vec<RankingRow>, QueryError> {
        let mut args = Row::new();
        args.insert("dimension".into(), Value::String(dimension.column().to_string()));
        args.insert("year".into(), year.map_or(Value::Null, Value::from));
        let rows = self.logged("ranking", self.backend.rpc(RANKING_PROCEDURE, &args).await)?;
        decode_rows(rows)
    }

    /// (key, year, capital status) aggregates feeding a pivot grid.
    pub async fn pivot(
        &self,
        dimension: Dimension,
        metric: PivotMetric,
    ) -> Result<Vec<PivotSource>, QueryError> {
        let mut args = Row::new();
        args.insert("dimension".into(), Value::String(dimension.column().to_string()));
        args.insert("metric".into(), Value::String(metric.column().to_string()));
        let rows = self.logged("pivot", self.backend.rpc(PIVOT_PROCEDURE, &args).await)?;
        decode_rows(rows)
    }
}

fn distinct(rows: &[Row], column: &str) -> BTreeSet<String> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .map(display_value)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn decode_rows<T: serde::de::DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, QueryError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(QueryError::from))
        .collect()
}
