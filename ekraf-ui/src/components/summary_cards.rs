//! Summary metric cards: totals over the filtered set and the PMA / PMDN split.

use crate::format::{format_number, format_percent};
use dioxus::prelude::*;
use ekraf_core::dataset::DatasetSpec;
use ekraf_data::summary::SummaryMetrics;

const CARD: &str = "flex: 1; min-width: 160px; padding: 10px 14px; background: #F5F7FA; border: 1px solid #E0E0E0; border-radius: 6px;";

#[component]
pub fn SummaryCards(dataset: &'static DatasetSpec, metrics: SummaryMetrics) -> Element {
    let numeric: Vec<_> = dataset.columns.iter().filter(|c| c.numeric).collect();
    rsx! {
        div {
            style: "display: flex; flex-wrap: wrap; gap: 8px; margin: 8px 0;",
            div {
                style: CARD,
                div { style: "font-size: 12px; color: #666;", "Jumlah Data" }
                div { style: "font-size: 18px; font-weight: 600;", {format_number(metrics.row_count as f64)} }
            }
            for column in numeric {
                div {
                    key: "{column.key}",
                    style: CARD,
                    div { style: "font-size: 12px; color: #666;", "{column.label}" }
                    div { style: "font-size: 18px; font-weight: 600;", {format_number(metrics.total(column.key))} }
                }
            }
            for (status, share) in metrics.by_status.iter() {
                div {
                    key: "{status}",
                    style: CARD,
                    div { style: "font-size: 12px; color: #666;", "{status}" }
                    div { style: "font-size: 18px; font-weight: 600;", {format_percent(share.percentage)} }
                    div { style: "font-size: 11px; color: #888;", "{share.row_count} baris" }
                }
            }
        }
    }
}
