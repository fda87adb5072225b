//! Core types and remote query client for the West Java creative-economy
//! dashboard.
//!
//! - `query` / `backend`: the remote query surface every dataset goes through
//! - `dataset` / `filter`: static per-dataset configuration and filter handling
//! - `record` / `ranking`: typed rows mirrored from the hosted backend
//! - `session`: the auth gate state machine
//! - `rest` / `auth` (feature `api`): PostgREST and auth endpoints over `reqwest`

pub mod backend;
pub mod capital_status;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod period;
pub mod query;
pub mod ranking;
pub mod record;
pub mod session;

#[cfg(feature = "api")]
pub mod auth;
#[cfg(feature = "api")]
pub mod rest;

pub use backend::QueryBackend;
pub use error::QueryError;
pub use query::Row;
