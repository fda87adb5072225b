//! The generic dataset table: filter bar, summary cards, one page of rows
//! with a grand-total row, pager, CSV export and optional inline edits.
//!
//! Fetching goes through [`TableState`] tickets, so a response that arrives
//! after a newer page or filter request is dropped instead of overwriting it.

use crate::components::{ErrorDisplay, FilterBar, Pager, SummaryCards};
use crate::format::format_cell;
use crate::js_bridge;
use crate::state::AppState;
use dioxus::prelude::*;
use ekraf_core::dataset::DatasetSpec;
use ekraf_core::filter::{FilterChange, Filters};
use ekraf_core::query::{display_value, Row};
use ekraf_data::summary::SummaryMetrics;
use ekraf_data::table::{TableState, Ticket};
use ekraf_data::totals::number_value;
use ekraf_db::DatasetService;
use ekraf_utils::export::{dataset_columns, export_filename, to_csv};
use serde_json::Value;
use std::collections::BTreeMap;

const CELL: &str = "padding: 6px 10px; border-top: 1px solid #E0E0E0; white-space: nowrap;";
const BUTTON: &str = "padding: 4px 12px; border: 1px solid #1565C0; background: white; color: #1565C0; border-radius: 4px; cursor: pointer;";

fn cell_style(numeric: bool) -> String {
    if numeric {
        format!("{} text-align: right;", CELL)
    } else {
        CELL.to_string()
    }
}

fn row_id(row: &Row) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

/// Patch holding only the edited cells. Numeric columns must parse; a
/// cleared cell becomes null.
pub fn edited_patch(
    dataset: &DatasetSpec,
    original: &Row,
    edits: &BTreeMap<String, String>,
) -> Result<Row, String> {
    let mut patch = Row::new();
    for column in dataset.columns {
        let Some(raw) = edits.get(column.key) else {
            continue;
        };
        let before = original.get(column.key).map(display_value).unwrap_or_default();
        if raw.trim() == before.trim() {
            continue;
        }
        let value = if raw.trim().is_empty() {
            Value::Null
        } else if column.numeric {
            let cleaned: String = raw.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
            let number: f64 = cleaned
                .replace(',', ".")
                .parse()
                .map_err(|_| format!("{} harus berupa angka", column.label))?;
            number_value(number)
        } else {
            Value::String(raw.trim().to_string())
        };
        patch.insert(column.key.to_string(), value);
    }
    Ok(patch)
}

#[component]
pub fn PaginatedTable(
    dataset: &'static DatasetSpec,
    #[props(default = false)] editable: bool,
) -> Element {
    let state = use_context::<AppState>();
    let mut table = use_signal(|| TableState::new(dataset.page_size));
    let mut total_row = use_signal(|| None::<Row>);
    let mut options = use_signal(BTreeMap::<String, Vec<String>>::new);
    let mut summary = use_signal(|| None::<SummaryMetrics>);
    let mut editing = use_signal(|| None::<Row>);
    let mut export_error = use_signal(|| None::<String>);

    let service = move || {
        state
            .backend
            .peek()
            .clone()
            .map(|backend| DatasetService::new(backend, dataset))
    };

    let load = move |ticket: Ticket| {
        let Some(service) = service() else {
            return;
        };
        spawn(async move {
            let outcome = service
                .list_sized(&ticket.filters, ticket.page, ticket.page_size)
                .await;
            let total = match &outcome {
                Ok(page) if !page.rows.is_empty() => {
                    match service.grand_total(&ticket.filters, &page.rows).await {
                        Ok(total) => Some(total),
                        Err(e) => {
                            log::warn!("[EKRAF] table: grand total for {} failed: {}", dataset.name, e);
                            None
                        }
                    }
                }
                _ => None,
            };
            if table.write().commit(&ticket, outcome.map_err(|e| e.to_string())) {
                total_row.set(total);
            }
        });
    };

    let load_summary = move |filters: Filters| {
        if dataset.status_column.is_none() {
            return;
        }
        let Some(service) = service() else {
            return;
        };
        spawn(async move {
            match service.summary_metrics(&filters).await {
                Ok(metrics) if table.peek().filters == filters => summary.set(Some(metrics)),
                Ok(_) => {}
                Err(e) => log::warn!("[EKRAF] table: summary for {} failed: {}", dataset.name, e),
            }
        });
    };

    // Initial load, and again whenever the backend or the data changes.
    use_effect(move || {
        let _version = (state.data_version)();
        if state.backend.read().is_none() {
            return;
        }
        let ticket = table.write().reload();
        load_summary(ticket.filters.clone());
        load(ticket);
        if let Some(service) = service() {
            spawn(async move {
                match service.filter_options().await {
                    Ok(found) => options.set(found),
                    Err(e) => log::warn!("[EKRAF] table: filter options for {} failed: {}", dataset.name, e),
                }
            });
        }
    });

    let on_filters = move |change: FilterChange| {
        let next = table.peek().filters.merged(&change);
        let ticket = table.write().set_filters(next);
        load_summary(ticket.filters.clone());
        load(ticket);
    };

    let export_page = move |_| {
        let snapshot = table.read();
        match to_csv(&dataset_columns(dataset), &snapshot.rows) {
            Ok(csv) => {
                let name = export_filename(dataset.name, snapshot.filters.year(), Some(snapshot.page));
                js_bridge::download_csv(&name, &csv);
            }
            Err(e) => export_error.set(Some(e.to_string())),
        }
    };

    let export_all = move |_| {
        let Some(service) = service() else {
            return;
        };
        let filters = table.peek().filters.clone();
        spawn(async move {
            let result = match service.fetch_all(&filters).await {
                Ok(rows) => to_csv(&dataset_columns(dataset), &rows).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(csv) => {
                    js_bridge::download_csv(&export_filename(dataset.name, filters.year(), None), &csv)
                }
                Err(e) => export_error.set(Some(e)),
            }
        });
    };

    let on_save = move |(id, patch): (i64, Row)| {
        let Some(service) = service() else {
            return;
        };
        spawn(async move {
            match service.update(id, &patch).await {
                Ok(stored) => {
                    table.write().apply_patch(id, stored);
                    editing.set(None);
                }
                Err(e) => export_error.set(Some(format!("Gagal menyimpan baris {}: {}", id, e))),
            }
        });
    };

    let snapshot = table.read();
    let columns = dataset.columns;

    rsx! {
        div {
            style: "margin: 12px 0;",
            FilterBar {
                dataset,
                options: options(),
                filters: snapshot.filters.clone(),
                on_change: on_filters,
            }

            if let Some(metrics) = summary() {
                SummaryCards { dataset, metrics }
            }

            if let Some(message) = snapshot.error() {
                ErrorDisplay {
                    message: message.to_string(),
                    on_retry: move |_| {
                        let ticket = table.write().retry();
                        if let Some(ticket) = ticket {
                            load(ticket);
                        }
                    },
                }
            }
            if let Some(message) = export_error() {
                ErrorDisplay { message }
            }

            div {
                style: "overflow-x: auto; position: relative;",
                if snapshot.is_loading() {
                    div {
                        style: "position: absolute; top: 4px; right: 8px; font-size: 12px; color: #666;",
                        "Memuat..."
                    }
                }
                table {
                    style: "width: 100%; border-collapse: collapse; font-size: 13px; background: white;",
                    thead {
                        tr {
                            style: "background: #1565C0; color: white;",
                            for column in columns.iter() {
                                th {
                                    key: "{column.key}",
                                    style: if column.numeric { "padding: 8px 10px; text-align: right;" } else { "padding: 8px 10px; text-align: left;" },
                                    "{column.label}"
                                }
                            }
                            if editable { th { style: "padding: 8px 10px;" } }
                        }
                    }
                    tbody {
                        if snapshot.rows.is_empty() && !snapshot.is_loading() {
                            tr {
                                td {
                                    colspan: (columns.len() + 1).to_string(),
                                    style: "padding: 20px; text-align: center; color: #666;",
                                    "Tidak ada data"
                                }
                            }
                        }
                        for (idx, row) in snapshot.rows.iter().enumerate() {
                            {
                                let key = row_id(row).map_or_else(|| format!("row-{}", idx), |id| id.to_string());
                                let edit_row = row.clone();
                                rsx! {
                                    tr {
                                        key: "{key}",
                                        style: if idx % 2 == 0 { "background: #FAFAFA;" } else { "background: white;" },
                                        for column in columns.iter() {
                                            td {
                                                key: "{column.key}",
                                                style: cell_style(column.numeric),
                                                {format_cell(row.get(column.key), column.numeric)}
                                            }
                                        }
                                        if editable {
                                            td {
                                                style: CELL,
                                                button {
                                                    style: BUTTON,
                                                    onclick: move |_| editing.set(Some(edit_row.clone())),
                                                    "Ubah"
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        if let Some(total) = total_row() {
                            tr {
                                style: "background: #E3F2FD; font-weight: 600;",
                                for column in columns.iter() {
                                    td {
                                        key: "{column.key}",
                                        style: cell_style(column.numeric),
                                        {format_cell(total.get(column.key), column.numeric)}
                                    }
                                }
                                if editable { td { style: CELL } }
                            }
                        }
                    }
                }
            }

            Pager {
                page: snapshot.page,
                total_pages: snapshot.total_pages,
                total_count: snapshot.total_count,
                can_prev: snapshot.can_prev() && !snapshot.is_loading(),
                can_next: snapshot.can_next() && !snapshot.is_loading(),
                on_prev: move |_| {
                    let ticket = table.write().prev_page();
                    if let Some(ticket) = ticket {
                        load(ticket);
                    }
                },
                on_next: move |_| {
                    let ticket = table.write().next_page();
                    if let Some(ticket) = ticket {
                        load(ticket);
                    }
                },
            }

            div {
                style: "display: flex; gap: 8px;",
                button { style: BUTTON, onclick: export_page, "Ekspor halaman (CSV)" }
                button { style: BUTTON, onclick: export_all, "Ekspor semua (CSV)" }
            }

            if let Some(row) = editing() {
                RowEditor {
                    dataset,
                    row,
                    on_save,
                    on_cancel: move |_| editing.set(None),
                }
            }
        }
    }
}

/// Inline form for one row; saves only the cells that changed.
#[component]
fn RowEditor(
    dataset: &'static DatasetSpec,
    row: Row,
    on_save: EventHandler<(i64, Row)>,
    on_cancel: EventHandler<()>,
) -> Element {
    let original = row.clone();
    let mut edits = use_signal(BTreeMap::<String, String>::new);
    let mut problem = use_signal(|| None::<String>);
    let Some(id) = row_id(&row) else {
        return rsx! {
            ErrorDisplay { message: "Baris ini tidak memiliki id dan tidak dapat diubah".to_string() }
        };
    };

    let submit = move |_| match edited_patch(dataset, &original, &edits.read()) {
        Ok(patch) if patch.is_empty() => on_cancel.call(()),
        Ok(patch) => {
            problem.set(None);
            on_save.call((id, patch));
        }
        Err(message) => problem.set(Some(message)),
    };

    rsx! {
        div {
            style: "margin-top: 12px; padding: 12px; border: 1px solid #BBDEFB; border-radius: 6px; background: #F5F9FF;",
            h4 { style: "margin: 0 0 8px 0;", "Ubah baris #{id}" }
            div {
                style: "display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 8px;",
                for column in dataset.columns.iter() {
                    label {
                        key: "{column.key}",
                        style: "font-size: 12px; display: flex; flex-direction: column; gap: 2px;",
                        "{column.label}"
                        input {
                            value: row.get(column.key).map(display_value).unwrap_or_default(),
                            oninput: move |evt: Event<FormData>| {
                                edits.write().insert(column.key.to_string(), evt.value());
                            },
                        }
                    }
                }
            }
            if let Some(message) = problem() {
                ErrorDisplay { message }
            }
            div {
                style: "display: flex; gap: 8px; margin-top: 8px;",
                button { style: BUTTON, onclick: submit, "Simpan" }
                button { style: BUTTON, onclick: move |_| on_cancel.call(()), "Batal" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_core::dataset::INVESTMENT;
    use serde_json::json;

    fn original() -> Row {
        json!({
            "id": 7,
            "company_name": "PT Sekar Nusantara",
            "region": "Kota Bekasi",
            "investment_idr": 6804500000.0,
            "project_count": 4
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn edits(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn unchanged_cells_are_left_out() {
        let patch = edited_patch(
            &INVESTMENT,
            &original(),
            &edits(&[("company_name", "PT Sekar Nusantara"), ("project_count", "5")]),
        )
        .unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["project_count"], json!(5));
    }

    #[test]
    fn grouped_numbers_are_accepted() {
        let patch = edited_patch(
            &INVESTMENT,
            &original(),
            &edits(&[("investment_idr", "7.000.000.000")]),
        )
        .unwrap();
        assert_eq!(patch["investment_idr"], json!(7000000000i64));
    }

    #[test]
    fn bad_numbers_and_cleared_cells() {
        let err = edited_patch(&INVESTMENT, &original(), &edits(&[("project_count", "empat")]))
            .unwrap_err();
        assert!(err.contains("Jumlah Proyek"));

        let patch = edited_patch(&INVESTMENT, &original(), &edits(&[("region", " ")])).unwrap();
        assert_eq!(patch["region"], Value::Null);
    }
}
