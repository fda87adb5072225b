//! Investment-by-year bar chart, PMA and PMDN side by side.

use crate::components::pivot_table::METRICS;
use crate::components::{ChartContainer, ChartHeader, ErrorDisplay};
use crate::js_bridge;
use crate::state::AppState;
use dioxus::prelude::*;
use ekraf_core::capital_status::CapitalStatus;
use ekraf_core::dataset::INVESTMENT;
use ekraf_core::ranking::{Dimension, PivotMetric, PivotSource};
use ekraf_db::DatasetService;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const CONTAINER_ID: &str = "investment-year-chart";
const COLORS: [&str; 2] = ["#1565C0", "#EF6C00"];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YearBar {
    pub year: i32,
    pub pma: f64,
    pub pmdn: f64,
}

/// Sum pivot sources per year and capital status, years ascending.
pub fn yearly_series(sources: &[PivotSource]) -> Vec<YearBar> {
    let mut by_year: BTreeMap<i32, YearBar> = BTreeMap::new();
    for source in sources {
        let bar = by_year.entry(source.year).or_insert(YearBar {
            year: source.year,
            ..YearBar::default()
        });
        match source.capital_status {
            CapitalStatus::Pma => bar.pma += source.value,
            CapitalStatus::Pmdn => bar.pmdn += source.value,
        }
    }
    by_year.into_values().collect()
}

/// Data payload for `renderBarChart`.
pub fn chart_data(bars: &[YearBar]) -> Value {
    Value::Array(
        bars.iter()
            .map(|bar| {
                json!({
                    "label": bar.year.to_string(),
                    "values": {
                        (CapitalStatus::Pma.code()): bar.pma,
                        (CapitalStatus::Pmdn.code()): bar.pmdn,
                    },
                })
            })
            .collect(),
    )
}

pub fn chart_config(metric: PivotMetric) -> Value {
    json!({
        "series": CapitalStatus::ALL.iter().map(CapitalStatus::code).collect::<Vec<_>>(),
        "colors": COLORS,
        "yLabel": metric.label(),
        "height": 360,
    })
}

#[component]
pub fn ChartPanel() -> Element {
    let state = use_context::<AppState>();
    let mut metric = use_signal(|| PivotMetric::InvestmentIdr);
    let mut bars = use_signal(Vec::<YearBar>::new);
    let mut loading = use_signal(|| true);
    let mut error_msg = use_signal(|| None::<String>);
    let mut request = use_signal(|| 0u64);
    let mut retry = use_signal(|| 0u64);

    use_hook(js_bridge::init_charts);
    use_drop(|| js_bridge::destroy_chart(CONTAINER_ID));

    use_effect(move || {
        let _version = (state.data_version)();
        let _retry = retry();
        let metric = metric();
        let Some(backend) = state.backend.read().clone() else {
            return;
        };
        let issued = *request.peek() + 1;
        request.set(issued);
        loading.set(true);
        spawn(async move {
            let service = DatasetService::new(backend, &INVESTMENT);
            let result = service.pivot(Dimension::Region, metric).await;
            if *request.peek() != issued {
                return;
            }
            match result {
                Ok(sources) => {
                    bars.set(yearly_series(&sources));
                    error_msg.set(None);
                }
                Err(e) => {
                    log::warn!("[EKRAF] chart: {}", e);
                    error_msg.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    });

    use_effect(move || {
        let current = bars();
        if loading() || current.is_empty() {
            return;
        }
        js_bridge::render_bar_chart(
            CONTAINER_ID,
            &chart_data(&current).to_string(),
            &chart_config(metric()).to_string(),
        );
    });

    rsx! {
        div {
            style: "margin: 12px 0;",
            ChartHeader {
                title: "Investasi per Tahun",
                subtitle: metric().label().to_string(),
            }
            label {
                style: "font-size: 13px;",
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
            if let Some(message) = error_msg() {
                ErrorDisplay {
                    message,
                    on_retry: move |_| retry += 1,
                }
            }
            if !loading() && bars().is_empty() && error_msg().is_none() {
                p { style: "color: #666;", "Belum ada data investasi." }
            }
            ChartContainer { id: CONTAINER_ID.to_string(), loading: loading() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(key: &str, year: i32, status: CapitalStatus, value: f64) -> PivotSource {
        PivotSource {
            key: key.into(),
            year,
            capital_status: status,
            value,
        }
    }

    #[test]
    fn sums_across_keys_per_year() {
        let bars = yearly_series(&[
            source("Kota Bandung", 2024, CapitalStatus::Pma, 10.0),
            source("Kabupaten Garut", 2024, CapitalStatus::Pma, 5.0),
            source("Kota Bandung", 2023, CapitalStatus::Pmdn, 7.0),
            source("Kota Bandung", 2024, CapitalStatus::Pmdn, 1.5),
        ]);
        assert_eq!(
            bars,
            vec![
                YearBar { year: 2023, pma: 0.0, pmdn: 7.0 },
                YearBar { year: 2024, pma: 15.0, pmdn: 1.5 },
            ]
        );
    }

    #[test]
    fn empty_sources_give_no_bars() {
        assert!(yearly_series(&[]).is_empty());
        assert_eq!(chart_data(&[]), json!([]));
    }

    #[test]
    fn payload_matches_chart_script_shape() {
        let data = chart_data(&[YearBar { year: 2024, pma: 2.0, pmdn: 3.0 }]);
        assert_eq!(data, json!([{ "label": "2024", "values": { "PMA": 2.0, "PMDN": 3.0 } }]));

        let config = chart_config(PivotMetric::ProjectCount);
        assert_eq!(config["series"], json!(["PMA", "PMDN"]));
        assert_eq!(config["yLabel"], json!(PivotMetric::ProjectCount.label()));
    }
}
