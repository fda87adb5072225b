//! Previous / next page controls, disabled at the bounds.

use dioxus::prelude::*;

const BUTTON: &str = "padding: 4px 12px; border: 1px solid #BDBDBD; background: white; border-radius: 4px; cursor: pointer;";

#[component]
pub fn Pager(
    page: u32,
    total_pages: u32,
    total_count: u64,
    can_prev: bool,
    can_next: bool,
    on_prev: EventHandler<()>,
    on_next: EventHandler<()>,
) -> Element {
    let shown_pages = total_pages.max(1);
    rsx! {
        div {
            style: "display: flex; align-items: center; gap: 12px; margin: 8px 0; font-size: 13px;",
            button {
                style: BUTTON,
                disabled: !can_prev,
                onclick: move |_| on_prev.call(()),
                "‹ Sebelumnya"
            }
            span { "Halaman {page} dari {shown_pages} ({total_count} baris)" }
            button {
                style: BUTTON,
                disabled: !can_next,
                onclick: move |_| on_next.call(()),
                "Berikutnya ›"
            }
        }
    }
}
