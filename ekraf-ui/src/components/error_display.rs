//! Error display component with an optional retry button.

use dioxus::prelude::*;

#[derive(Props, Clone, PartialEq)]
pub struct ErrorDisplayProps {
    pub message: String,
    /// Shown as a "Coba lagi" button when set; re-issues the failed request.
    pub on_retry: Option<EventHandler<()>>,
}

#[component]
pub fn ErrorDisplay(props: ErrorDisplayProps) -> Element {
    rsx! {
        div {
            style: "padding: 12px 16px; margin: 8px 0; background: #FFEBEE; color: #C62828; border-radius: 4px; border: 1px solid #EF9A9A; display: flex; align-items: center; gap: 12px;",
            div {
                style: "flex: 1;",
                strong { "Gagal: " }
                "{props.message}"
            }
            if let Some(on_retry) = props.on_retry {
                button {
                    style: "padding: 4px 12px; border: 1px solid #C62828; background: white; color: #C62828; border-radius: 4px; cursor: pointer;",
                    onclick: move |_| on_retry.call(()),
                    "Coba lagi"
                }
            }
        }
    }
}
