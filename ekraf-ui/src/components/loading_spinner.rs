//! Loading indicator.

use dioxus::prelude::*;

#[component]
pub fn LoadingSpinner(#[props(default = "Memuat data...".to_string())] message: String) -> Element {
    rsx! {
        div {
            style: "display: flex; justify-content: center; align-items: center; padding: 40px; color: #666;",
            "{message}"
        }
    }
}
