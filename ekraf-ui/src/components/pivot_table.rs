//! Investment pivot: one block per region or subsector, a line per capital
//! status plus a subtotal, year columns, and a closing grand-total line.

use crate::components::{ErrorDisplay, LoadingSpinner};
use crate::format::format_number;
use crate::js_bridge;
use crate::state::AppState;
use dioxus::prelude::*;
use ekraf_core::dataset::INVESTMENT;
use ekraf_core::ranking::{Dimension, PivotMetric};
use ekraf_data::pivot::{reshape, PivotGrid, PivotLine};
use ekraf_db::DatasetService;
use ekraf_utils::export::{pivot_columns, to_csv};

pub const METRICS: [PivotMetric; 4] = [
    PivotMetric::InvestmentIdr,
    PivotMetric::InvestmentUsd,
    PivotMetric::ProjectCount,
    PivotMetric::WorkersTotal,
];

const CELL: &str = "padding: 6px 10px; border-top: 1px solid #E0E0E0; text-align: right;";

#[component]
pub fn PivotTable() -> Element {
    let state = use_context::<AppState>();
    let mut dimension = use_signal(|| Dimension::Region);
    let mut metric = use_signal(|| PivotMetric::InvestmentIdr);
    let mut grid = use_signal(|| None::<PivotGrid>);
    let mut error_msg = use_signal(|| None::<String>);
    let mut loading = use_signal(|| false);
    let mut request = use_signal(|| 0u64);
    let mut retry = use_signal(|| 0u64);

    use_effect(move || {
        let _version = (state.data_version)();
        let _retry = retry();
        let (dimension, metric) = (dimension(), metric());
        let Some(backend) = state.backend.read().clone() else {
            return;
        };
        let issued = *request.peek() + 1;
        request.set(issued);
        loading.set(true);
        spawn(async move {
            let service = DatasetService::new(backend, &INVESTMENT);
            let result = service.pivot(dimension, metric).await;
            if *request.peek() != issued {
                return;
            }
            match result {
                Ok(sources) => {
                    grid.set(Some(reshape(&sources)));
                    error_msg.set(None);
                }
                Err(e) => error_msg.set(Some(e.to_string())),
            }
            loading.set(false);
        });
    });

    let export = move |_| {
        let Some(current) = grid() else {
            return;
        };
        let columns = pivot_columns(&current.columns(dimension().label()));
        match to_csv(&columns, &current.rows()) {
            Ok(csv) => {
                let name = format!("pivot_{}_{}.csv", dimension().column(), metric().column());
                js_bridge::download_csv(&name, &csv);
            }
            Err(e) => error_msg.set(Some(e.to_string())),
        }
    };

    rsx! {
        div {
            style: "margin: 12px 0;",
            div {
                style: "display: flex; gap: 12px; align-items: center; margin-bottom: 8px; font-size: 13px;",
                label {
                    "Dimensi: "
                    select {
                        onchange: move |evt: Event<FormData>| {
                            if let Ok(parsed) = evt.value().parse::<Dimension>() {
                                dimension.set(parsed);
                            }
                        },
                        option { value: "region", selected: dimension() == Dimension::Region, "Kabupaten/Kota" }
                        option { value: "subsector", selected: dimension() == Dimension::Subsector, "Subsektor" }
                    }
                }
                label {
                    "Nilai: "
                    select {
                        onchange: move |evt: Event<FormData>| {
                            if let Ok(parsed) = evt.value().parse::<PivotMetric>() {
                                metric.set(parsed);
                            }
                        },
                        for option_metric in METRICS {
                            option {
                                key: "{option_metric:?}",
                                value: option_metric.column(),
                                selected: metric() == option_metric,
                                {option_metric.label()}
                            }
                        }
                    }
                }
                button {
                    style: "padding: 4px 12px; border: 1px solid #1565C0; background: white; color: #1565C0; border-radius: 4px; cursor: pointer;",
                    disabled: grid().is_none(),
                    onclick: export,
                    "Ekspor (CSV)"
                }
            }

            if let Some(message) = error_msg() {
                ErrorDisplay {
                    message,
                    on_retry: move |_| retry += 1,
                }
            }

            if loading() && grid().is_none() {
                LoadingSpinner {}
            } else if let Some(current) = grid() {
                PivotGridView { grid: current, key_label: dimension().label().to_string() }
            }
        }
    }
}

#[component]
fn PivotGridView(grid: PivotGrid, key_label: String) -> Element {
    let years = grid.years.clone();
    rsx! {
        div {
            style: "overflow-x: auto;",
            table {
                style: "width: 100%; border-collapse: collapse; font-size: 13px; background: white;",
                thead {
                    tr {
                        style: "background: #1565C0; color: white;",
                        th { style: "padding: 8px 10px; text-align: left;", "{key_label}" }
                        th { style: "padding: 8px 10px; text-align: left;", "Status" }
                        for year in years.iter() {
                            th { key: "{year}", style: "padding: 8px 10px; text-align: right;", "{year}" }
                        }
                        th { style: "padding: 8px 10px; text-align: right;", "Total" }
                    }
                }
                tbody {
                    for group in grid.groups.iter() {
                        for (idx, line) in group.lines.iter().enumerate() {
                            PivotLineRow {
                                key: "{group.key}-{line.label}",
                                group_label: if idx == 0 { group.key.clone() } else { String::new() },
                                line: line.clone(),
                                years: years.clone(),
                                emphasis: false,
                            }
                        }
                        PivotLineRow {
                            key: "{group.key}-subtotal",
                            group_label: String::new(),
                            line: group.subtotal.clone(),
                            years: years.clone(),
                            emphasis: true,
                        }
                    }
                    PivotLineRow {
                        key: "grand-total",
                        group_label: String::new(),
                        line: grid.grand_total.clone(),
                        years: years.clone(),
                        emphasis: true,
                    }
                }
            }
        }
    }
}

#[component]
fn PivotLineRow(group_label: String, line: PivotLine, years: Vec<i32>, emphasis: bool) -> Element {
    let style = if emphasis {
        "background: #E3F2FD; font-weight: 600;"
    } else {
        "background: white;"
    };
    rsx! {
        tr {
            style,
            td { style: "padding: 6px 10px; border-top: 1px solid #E0E0E0;", "{group_label}" }
            td { style: "padding: 6px 10px; border-top: 1px solid #E0E0E0;", "{line.label}" }
            for year in years.iter() {
                td { key: "{year}", style: CELL, {format_number(line.cell(*year))} }
            }
            td { style: CELL, {format_number(line.total)} }
        }
    }
}
