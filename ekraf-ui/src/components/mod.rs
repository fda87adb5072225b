//! Dioxus components shared by the dashboard tabs.

mod auth_gate;
mod chart_container;
mod chart_header;
mod chart_panel;
mod error_display;
mod filter_bar;
mod import_panel;
mod loading_spinner;
mod paginated_table;
mod pager;
mod pivot_table;
mod summary_cards;

pub use auth_gate::{demo_user, AuthGate};
pub use chart_container::ChartContainer;
pub use chart_header::ChartHeader;
pub use chart_panel::{yearly_series, ChartPanel, YearBar};
pub use error_display::ErrorDisplay;
pub use filter_bar::FilterBar;
pub use import_panel::ImportPanel;
pub use loading_spinner::LoadingSpinner;
pub use paginated_table::{edited_patch, PaginatedTable};
pub use pager::Pager;
pub use pivot_table::PivotTable;
pub use summary_cards::SummaryCards;
