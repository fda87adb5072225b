//! Spreadsheet upload: pick a dataset and a .csv/.xlsx file, then watch the
//! batched insert progress.

use crate::js_bridge;
use crate::state::AppState;
use dioxus::prelude::*;
use ekraf_core::dataset::{self, DatasetSpec};
use ekraf_db::import::{prepare, ImportJob, ImportPhase, ImportPolicy};
use ekraf_db::DatasetService;
use ekraf_utils::import::{parse_csv, parse_xlsx_bytes, FileKind, ParsedRow};

const FILE_INPUT_ID: &str = "ekraf-import-file";

pub fn importable() -> Vec<&'static DatasetSpec> {
    dataset::all()
        .iter()
        .copied()
        .filter(|d| d.import.is_some())
        .collect()
}

/// Parse an uploaded file by its extension.
pub fn parse_upload(file_name: &str, bytes: &[u8]) -> anyhow::Result<Vec<ParsedRow>> {
    match FileKind::from_name(file_name) {
        FileKind::Csv => parse_csv(&String::from_utf8_lossy(bytes)),
        FileKind::Xlsx => parse_xlsx_bytes(bytes),
    }
}

#[component]
pub fn ImportPanel() -> Element {
    let mut state = use_context::<AppState>();
    let mut phase = use_signal(ImportPhase::default);
    let mut target = use_signal(|| &dataset::INVESTMENT);
    let mut strict = use_signal(|| false);

    let start_import = move |_| {
        if phase.peek().is_busy() {
            return;
        }
        let Some(backend) = state.backend.peek().clone() else {
            phase.write().fail("Backend belum siap");
            return;
        };
        let spec = *target.peek();
        let policy = if *strict.peek() {
            ImportPolicy::Strict
        } else {
            ImportPolicy::SkipInvalid
        };
        phase.write().start("");
        spawn(async move {
            let (file_name, bytes) = match js_bridge::read_selected_file(FILE_INPUT_ID).await {
                Ok(file) => file,
                Err(e) => {
                    phase.write().fail(e);
                    return;
                }
            };
            phase.write().start(&file_name);
            log::info!("[EKRAF] import: {} ({} bytes) into {}", file_name, bytes.len(), spec.name);

            let parsed = match parse_upload(&file_name, &bytes) {
                Ok(parsed) => parsed,
                Err(e) => {
                    phase.write().fail(format!("Gagal membaca berkas: {}", e));
                    return;
                }
            };
            let prepared = match prepare(spec, &parsed, policy) {
                Ok(prepared) => prepared,
                Err(e) => {
                    phase.write().fail(e.to_string());
                    return;
                }
            };

            phase.write().processing(prepared.rows.len());
            let service = DatasetService::new(backend, spec);
            let report = ImportJob::new()
                .run(&service, &prepared.rows, |progress| phase.write().advance(progress))
                .await;
            phase.write().finish(&report, prepared.skipped.len());
            if report.inserted > 0 {
                state.data_version += 1;
            }
        });
    };

    let reset = move |_| {
        phase.write().reset();
        js_bridge::reset_file_input(FILE_INPUT_ID);
    };

    let busy = phase.read().is_busy();

    rsx! {
        div {
            style: "background: white; border: 1px solid #E0E0E0; border-radius: 8px; padding: 16px; margin: 12px 0; font-size: 13px;",
            h3 { style: "margin: 0 0 12px 0; font-size: 16px;", "Impor Data" }
            div {
                style: "display: flex; flex-wrap: wrap; gap: 12px; align-items: center;",
                label {
                    "Dataset: "
                    select {
                        disabled: busy,
                        onchange: move |evt: Event<FormData>| {
                            if let Ok(spec) = dataset::by_name(&evt.value()) {
                                target.set(spec);
                            }
                        },
                        for spec in importable() {
                            option {
                                key: "{spec.name}",
                                value: spec.name,
                                selected: target().name == spec.name,
                                {spec.title}
                            }
                        }
                    }
                }
                input {
                    id: FILE_INPUT_ID,
                    r#type: "file",
                    accept: ".csv,.xlsx",
                    disabled: busy,
                }
                label {
                    input {
                        r#type: "checkbox",
                        checked: strict(),
                        disabled: busy,
                        onchange: move |evt: Event<FormData>| strict.set(evt.checked()),
                    }
                    " Tolak seluruh berkas jika ada baris tidak valid"
                }
                button {
                    style: "padding: 6px 14px; border: none; background: #1565C0; color: white; border-radius: 4px; cursor: pointer;",
                    disabled: busy,
                    onclick: start_import,
                    "Unggah"
                }
            }
            ImportStatus { phase: phase(), on_reset: reset }
        }
    }
}

#[component]
fn ImportStatus(phase: ImportPhase, on_reset: EventHandler<()>) -> Element {
    match phase {
        ImportPhase::Idle => rsx! {},
        ImportPhase::Uploading { file_name } => rsx! {
            p { style: "color: #666;", "Membaca {file_name}..." }
        },
        ImportPhase::Processing { file_name, progress } => {
            let percent = progress.percent();
            rsx! {
                div {
                    style: "margin-top: 12px;",
                    p { "Memproses {file_name}: {progress.processed} / {progress.total} baris ({percent}%)" }
                    div {
                        style: "background: #E0E0E0; border-radius: 4px; height: 8px; width: 100%;",
                        div { style: "background: #1565C0; border-radius: 4px; height: 8px; width: {percent}%;" }
                    }
                }
            }
        }
        ImportPhase::Success { inserted, skipped } => rsx! {
            div {
                style: "margin-top: 12px; color: #2E7D32;",
                "Berhasil mengimpor {inserted} baris"
                if skipped > 0 {
                    " ({skipped} baris dilewati karena tidak valid)"
                }
                button { style: "margin-left: 12px;", onclick: move |_| on_reset.call(()), "Impor lagi" }
            }
        },
        ImportPhase::Error { message, inserted } => rsx! {
            div {
                style: "margin-top: 12px; color: #C62828;",
                "Impor gagal: {message}"
                if inserted > 0 {
                    " ({inserted} baris sudah tersimpan)"
                }
                button { style: "margin-left: 12px;", onclick: move |_| on_reset.call(()), "Tutup" }
            }
        },
    }
}
