//! Shared Dioxus components and D3.js bridge for the EKRAF dashboard.
//!
//! This crate provides:
//! - `js_bridge`: chart rendering, CSV downloads and file reads via `js_sys::eval()` and `web_sys`
//! - `state`: reactive AppState with Dioxus Signals, plus session persistence
//! - `format`: cell and number formatting shared by the tables
//! - `components`: the auth gate, filter bar, tables, chart and import panels

pub mod components;
pub mod format;
pub mod js_bridge;
pub mod state;
