//! Paginated table state machine.
//!
//! The state never fetches anything itself. Every transition that needs data
//! returns a [`Ticket`]; the caller runs the request and hands the outcome
//! back through [`TableState::commit`]. Responses for a ticket older than the
//! latest one are dropped, so a slow page-1 response can never overwrite a
//! newer page-2 or filter change.

use crate::pagination::{in_bounds, total_pages, Page};
use ekraf_core::filter::Filters;
use ekraf_core::query::Row;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Errored(String),
}

/// One outstanding fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub generation: u64,
    pub page: u32,
    pub page_size: u32,
    pub filters: Filters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub filters: Filters,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub rows: Vec<Row>,
    pub load: LoadState,
    generation: u64,
    last: Option<Ticket>,
}

impl TableState {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: Filters::new(),
            page: 1,
            page_size,
            total_count: 0,
            total_pages: 0,
            rows: Vec::new(),
            load: LoadState::Idle,
            generation: 0,
            last: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The requested page lives on the ticket; `self.page` only moves when a
    /// response for it is committed.
    fn issue(&mut self, page: u32) -> Ticket {
        self.generation += 1;
        self.load = LoadState::Loading;
        let ticket = Ticket {
            generation: self.generation,
            page,
            page_size: self.page_size,
            filters: self.filters.clone(),
        };
        self.last = Some(ticket.clone());
        ticket
    }

    /// Fetch the current page again with the current filters.
    pub fn reload(&mut self) -> Ticket {
        self.issue(self.page.max(1))
    }

    /// Replace the filters and go back to page 1.
    pub fn set_filters(&mut self, filters: Filters) -> Ticket {
        self.filters = filters;
        self.page = 1;
        self.issue(1)
    }

    /// Move to `page`. Out-of-range pages are ignored: no ticket, no change.
    pub fn request_page(&mut self, page: u32) -> Option<Ticket> {
        if !in_bounds(page, self.total_pages) {
            log::debug!(
                "[EKRAF] table: page {} outside 1..={}, ignored",
                page,
                self.total_pages
            );
            return None;
        }
        Some(self.issue(page))
    }

    pub fn next_page(&mut self) -> Option<Ticket> {
        self.request_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Option<Ticket> {
        self.request_page(self.page.saturating_sub(1))
    }

    /// Re-issue the failed request. Only valid after an error.
    pub fn retry(&mut self) -> Option<Ticket> {
        if !matches!(self.load, LoadState::Errored(_)) {
            return None;
        }
        let last = self.last.clone()?;
        self.filters = last.filters;
        Some(self.issue(last.page))
    }

    /// Apply a fetch outcome. Returns `false` when the ticket is stale and
    /// the outcome was dropped.
    pub fn commit(&mut self, ticket: &Ticket, outcome: Result<Page, String>) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "[EKRAF] table: dropping stale response (generation {} < {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        match outcome {
            Ok(page) => {
                self.total_count = page.total_count;
                self.total_pages = total_pages(page.total_count, self.page_size);
                self.rows = page.rows;
                self.page = page.current_page;
                self.load = LoadState::Loaded;
            }
            Err(message) => {
                // Rows and counts from the last good load stay on screen.
                self.load = LoadState::Errored(message);
            }
        }
        true
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.load == LoadState::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.load {
            LoadState::Errored(message) => Some(message),
            _ => None,
        }
    }

    /// Replace the visible row with `id` after the backend confirmed a write.
    pub fn apply_patch(&mut self, id: i64, confirmed: Row) -> bool {
        let position = self
            .rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_i64) == Some(id));
        match position {
            Some(index) => {
                self.rows[index] = confirmed;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(ids: std::ops::Range<i64>) -> Vec<Row> {
        ids.map(|id| json!({"id": id, "company_name": format!("PT {}", id)}))
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn page(current: u32, total_count: u64, size: u32) -> Page {
        let start = i64::from((current - 1) * size);
        let end = (start + i64::from(size)).min(total_count as i64);
        Page {
            rows: rows(start..end.max(start)),
            total_count,
            total_pages: total_pages(total_count, size),
            current_page: current,
            page_size: size,
        }
    }

    fn loaded(total_count: u64) -> TableState {
        let mut state = TableState::new(10);
        let ticket = state.reload();
        assert!(state.commit(&ticket, Ok(page(1, total_count, 10))));
        state
    }

    #[test]
    fn test_first_load() {
        let state = loaded(42);
        assert_eq!(state.load, LoadState::Loaded);
        assert_eq!(state.total_pages, 5);
        assert_eq!(state.rows.len(), 10);
        assert!(!state.can_prev());
        assert!(state.can_next());
    }

    #[test]
    fn test_out_of_range_pages_do_nothing() {
        let mut state = loaded(42);
        let before = state.clone();
        assert!(state.request_page(0).is_none());
        assert!(state.request_page(6).is_none());
        assert!(state.prev_page().is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn test_last_page_is_partial() {
        let mut state = loaded(42);
        let ticket = state.request_page(5).unwrap();
        state.commit(&ticket, Ok(page(5, 42, 10)));
        assert_eq!(state.rows.len(), 2);
        assert!(!state.can_next());
        assert!(state.next_page().is_none());
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut state = loaded(42);
        let ticket = state.request_page(3).unwrap();
        state.commit(&ticket, Ok(page(3, 42, 10)));
        let ticket = state.set_filters(Filters::new().with("year", "2024"));
        assert_eq!(ticket.page, 1);
        assert_eq!(state.page, 1);
        assert!(state.is_loading());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut state = loaded(42);
        let slow = state.request_page(2).unwrap();
        let fast = state.set_filters(Filters::new().with("capital_status", "PMA"));
        assert!(state.commit(&fast, Ok(page(1, 7, 10))));
        assert!(!state.commit(&slow, Ok(page(2, 42, 10))));
        assert_eq!(state.total_count, 7);
        assert_eq!(state.page, 1);
        assert_eq!(state.rows.len(), 7);
    }

    #[test]
    fn test_error_keeps_rows_and_retry_repeats_request() {
        let mut state = loaded(42);
        let ticket = state.request_page(2).unwrap();
        state.commit(&ticket, Err("network down".into()));
        assert_eq!(state.error(), Some("network down"));
        assert_eq!(state.rows.len(), 10);

        let again = state.retry().unwrap();
        assert_eq!(again.page, 2);
        assert_eq!(again.filters, ticket.filters);
        assert!(again.generation > ticket.generation);
        assert!(state.commit(&again, Ok(page(2, 42, 10))));
        assert_eq!(state.load, LoadState::Loaded);
        assert!(state.retry().is_none());
    }

    #[test]
    fn test_failed_page_change_keeps_current_page() {
        let mut state = loaded(42);
        let ticket = state.request_page(2).unwrap();
        assert_eq!(state.page, 1);
        state.commit(&ticket, Err("timeout".into()));
        assert_eq!(state.page, 1);
        assert!(state.can_next());
        assert!(!state.can_prev());

        let next = state.next_page().unwrap();
        assert_eq!(next.page, 2);
        state.commit(&next, Ok(page(2, 42, 10)));
        assert_eq!(state.page, 2);
    }

    #[test]
    fn test_empty_result() {
        let state = loaded(0);
        assert_eq!(state.total_pages, 0);
        assert!(state.rows.is_empty());
        assert!(!state.can_next());
        assert!(!state.can_prev());
    }

    #[test]
    fn test_apply_patch() {
        let mut state = loaded(42);
        let confirmed = json!({"id": 3, "company_name": "PT Baru"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(state.apply_patch(3, confirmed));
        assert_eq!(state.rows[3].get("company_name"), Some(&json!("PT Baru")));
        assert!(!state.apply_patch(999, Row::new()));
    }
}
