//! Filter controls for one dataset: a select per equality filter, number
//! inputs for range bounds, and a debounced free-text search box.

use dioxus::prelude::*;
use ekraf_core::dataset::{DatasetSpec, FilterOp};
use ekraf_core::filter::{FilterChange, Filters, ALL_SENTINEL};
use ekraf_utils::debounce::Debouncer;
use gloo_timers::future::TimeoutFuture;
use std::collections::BTreeMap;

const CONTROL: &str = "padding: 4px 6px; border: 1px solid #BDBDBD; border-radius: 4px;";

/// Selects and range inputs report immediately; the search box reports once
/// typing has paused for the debounce delay. Each report carries only the
/// edited field; the owner merges it into its current filter state.
#[component]
pub fn FilterBar(
    dataset: &'static DatasetSpec,
    options: BTreeMap<String, Vec<String>>,
    filters: Filters,
    on_change: EventHandler<FilterChange>,
) -> Element {
    let debouncer = use_hook(Debouncer::default);
    let mut search = use_signal(|| filters.search.clone());

    let on_search = move |evt: Event<FormData>| {
        let value = evt.value();
        search.set(value.clone());
        let ticket = debouncer.arm();
        let debouncer = debouncer.clone();
        spawn(async move {
            let delay = debouncer.delay().as_millis() as u32;
            if debouncer.settled(ticket, TimeoutFuture::new(delay)).await {
                on_change.call(FilterChange::Search(value));
            }
        });
    };

    rsx! {
        div {
            style: "display: flex; flex-wrap: wrap; gap: 12px; align-items: center; margin: 8px 0;",
            for field in dataset.filters.iter() {
                {
                    let current = filters.get(field.key).unwrap_or(ALL_SENTINEL).to_string();
                    let on_field = move |evt: Event<FormData>| {
                        on_change.call(FilterChange::Field {
                            key: field.key.to_string(),
                            value: evt.value(),
                        });
                    };
                    match field.op {
                        FilterOp::Eq => {
                            let choices = options.get(field.key).cloned().unwrap_or_default();
                            rsx! {
                                label {
                                    key: "{field.key}",
                                    style: "font-size: 13px;",
                                    "{field.label}: "
                                    select {
                                        style: CONTROL,
                                        onchange: on_field,
                                        option { value: ALL_SENTINEL, selected: current == ALL_SENTINEL, "Semua" }
                                        for choice in choices {
                                            option {
                                                key: "{choice}",
                                                value: "{choice}",
                                                selected: current == choice,
                                                "{choice}"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        FilterOp::Gte | FilterOp::Lte => {
                            let shown = if current == ALL_SENTINEL { String::new() } else { current };
                            rsx! {
                                label {
                                    key: "{field.key}",
                                    style: "font-size: 13px;",
                                    "{field.label}: "
                                    input {
                                        r#type: "number",
                                        style: "{CONTROL} width: 90px;",
                                        value: "{shown}",
                                        onchange: on_field,
                                    }
                                }
                            }
                        }
                    }
                }
            }
            if !dataset.search_columns.is_empty() {
                input {
                    r#type: "search",
                    style: "{CONTROL} min-width: 220px;",
                    placeholder: "Cari...",
                    value: "{search}",
                    oninput: on_search,
                }
            }
        }
    }
}
