//! West Java creative-economy dashboard.
//!
//! With `EKRAF_BACKEND_URL` and `EKRAF_ANON_KEY` set at build time the app
//! talks to the hosted backend and requires sign-in. Without them it runs in
//! demo mode over the embedded fixture CSVs loaded into an in-memory SQLite
//! database.

use dioxus::prelude::*;
use ekraf_core::auth::AuthClient;
use ekraf_core::config::BackendConfig;
use ekraf_core::dataset::{self, DatasetSpec};
use ekraf_core::rest::RestBackend;
use ekraf_db::{Backend, Database};
use ekraf_ui::components::{
    AuthGate, ChartPanel, ErrorDisplay, ImportPanel, LoadingSpinner, PaginatedTable, PivotTable,
};
use ekraf_ui::state::AppState;

/// Demo data, one CSV per table.
const FIXTURES: [(&str, &str); 3] = [
    (
        "investment_records",
        include_str!(concat!(env!("OUT_DIR"), "/investment_records.csv")),
    ),
    (
        "patent_registrations",
        include_str!(concat!(env!("OUT_DIR"), "/patent_registrations.csv")),
    ),
    (
        "pdki_filings",
        include_str!(concat!(env!("OUT_DIR"), "/pdki_filings.csv")),
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Investment,
    Workforce,
    Rankings,
    Pivot,
    Patents,
    Pdki,
    Charts,
    Import,
}

impl Tab {
    const ALL: [Tab; 8] = [
        Tab::Investment,
        Tab::Workforce,
        Tab::Rankings,
        Tab::Pivot,
        Tab::Patents,
        Tab::Pdki,
        Tab::Charts,
        Tab::Import,
    ];

    fn label(&self) -> &'static str {
        match self {
            Tab::Investment => "Investasi",
            Tab::Workforce => "Tenaga Kerja",
            Tab::Rankings => "Peringkat",
            Tab::Pivot => "Pivot",
            Tab::Patents => "Paten",
            Tab::Pdki => "PDKI",
            Tab::Charts => "Grafik",
            Tab::Import => "Impor",
        }
    }
}

/// In-memory database seeded with the embedded fixtures, rankings rebuilt.
fn demo_database() -> anyhow::Result<Database> {
    let db = Database::new()?;
    for (table, csv_data) in FIXTURES {
        if csv_data.trim().is_empty() {
            log::warn!("[EKRAF] dashboard: no demo data for {}", table);
            continue;
        }
        db.load_table(table, csv_data)?;
    }
    db.refresh_rankings()?;
    Ok(db)
}

fn main() {
    dioxus_logger::init(dioxus_logger::tracing::Level::INFO).expect("failed to init logger");
    dioxus::LaunchBuilder::new()
        .with_cfg(dioxus::web::Config::new().rootname("ekraf-dashboard-root"))
        .launch(App);
}

#[component]
fn App() -> Element {
    let mut state = use_context_provider(AppState::new);

    // Pick the backend once on mount
    use_effect(move || {
        match BackendConfig::from_build_env() {
            Some(config) => {
                log::info!("[EKRAF] dashboard: using backend {}", config.url);
                state.auth.set(Some(AuthClient::new(config.clone())));
                state
                    .backend
                    .set(Some(Backend::Remote(RestBackend::new(config))));
            }
            None => match demo_database() {
                Ok(db) => {
                    log::info!("[EKRAF] dashboard: no backend configured, running in demo mode");
                    state.backend.set(Some(Backend::Local(db)));
                }
                Err(e) => {
                    log::error!("[EKRAF] dashboard: failed to load demo data: {}", e);
                    state
                        .error_msg
                        .set(Some(format!("Gagal memuat data demo: {}", e)));
                }
            },
        }
        state.loading.set(false);
    });

    rsx! {
        div {
            style: "max-width: 1280px; margin: 0 auto; padding: 20px; font-family: sans-serif; background: #FAFAFA;",
            h1 {
                style: "margin: 0 0 4px 0; font-size: 24px; color: #0D47A1;",
                "Dashboard Ekonomi Kreatif Jawa Barat"
            }
            p {
                style: "margin: 0 0 16px 0; color: #666; font-size: 14px;",
                "Investasi, tenaga kerja, paten dan merek subsektor ekonomi kreatif"
            }

            if (state.loading)() {
                LoadingSpinner { message: "Menyiapkan dashboard..." }
            } else if let Some(message) = (state.error_msg)() {
                ErrorDisplay { message }
            } else {
                AuthGate {
                    Shell {}
                }
            }
        }
    }
}

#[component]
fn Shell() -> Element {
    let state = use_context::<AppState>();
    let mut active = use_signal(|| Tab::Investment);
    let demo = state.is_demo();

    rsx! {
        if demo {
            div {
                style: "padding: 8px 12px; margin-bottom: 12px; background: #FFF8E1; border: 1px solid #FFE082; border-radius: 4px; font-size: 13px;",
                "Mode demo: data contoh disimpan di browser dan hilang saat halaman dimuat ulang."
            }
        }
        nav {
            style: "display: flex; flex-wrap: wrap; gap: 4px; border-bottom: 2px solid #1565C0; margin-bottom: 12px;",
            for tab in Tab::ALL {
                button {
                    key: "{tab:?}",
                    style: tab_style(active() == tab),
                    onclick: move |_| active.set(tab),
                    {tab.label()}
                }
            }
        }
        {
            let investment_key = "investment";
            let workforce_key = "workforce";
            let region_ranking_key = "region-ranking";
            let subsector_ranking_key = "subsector-ranking";
            let patents_key = "patents";
            let pdki_key = "pdki";
            match active() {
            Tab::Investment => rsx! { DatasetTab { key: "{investment_key}", dataset: &dataset::INVESTMENT, editable: true } },
            Tab::Workforce => rsx! { DatasetTab { key: "{workforce_key}", dataset: &dataset::WORKFORCE } },
            Tab::Rankings => rsx! {
                DatasetTab { key: "{region_ranking_key}", dataset: &dataset::REGION_RANKING }
                DatasetTab { key: "{subsector_ranking_key}", dataset: &dataset::SUBSECTOR_RANKING }
            },
            Tab::Pivot => rsx! {
                h2 { style: "font-size: 18px;", "Pivot Investasi" }
                PivotTable {}
            },
            Tab::Patents => rsx! { DatasetTab { key: "{patents_key}", dataset: &dataset::PATENTS } },
            Tab::Pdki => rsx! { DatasetTab { key: "{pdki_key}", dataset: &dataset::PDKI } },
            Tab::Charts => rsx! { ChartPanel {} },
            Tab::Import => rsx! { ImportPanel {} },
        }}
    }
}

fn tab_style(active: bool) -> &'static str {
    if active {
        "padding: 8px 16px; border: none; background: #1565C0; color: white; border-radius: 4px 4px 0 0; cursor: pointer;"
    } else {
        "padding: 8px 16px; border: none; background: #E3F2FD; color: #0D47A1; border-radius: 4px 4px 0 0; cursor: pointer;"
    }
}

#[component]
fn DatasetTab(dataset: &'static DatasetSpec, #[props(default = false)] editable: bool) -> Element {
    rsx! {
        section {
            style: "margin-bottom: 24px;",
            h2 { style: "font-size: 18px; margin: 8px 0;", {dataset.title} }
            PaginatedTable { dataset, editable }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_database_loads_fixtures_and_rankings() {
        let db = demo_database().unwrap();
        assert_eq!(db.row_count("investment_records").unwrap(), 62);
        assert_eq!(db.row_count("patent_registrations").unwrap(), 15);
        assert_eq!(db.row_count("pdki_filings").unwrap(), 15);
        assert!(db.row_count("region_rankings").unwrap() > 0);
        assert!(db.row_count("subsector_rankings").unwrap() > 0);
    }

    #[test]
    fn every_tab_has_a_distinct_label() {
        let mut labels: Vec<_> = Tab::ALL.iter().map(Tab::label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Tab::ALL.len());
    }
}
