//! The remote query surface, abstracted so the dataset service can run
//! against the hosted backend or the in-memory SQLite database alike.

use crate::error::QueryError;
use crate::query::{Row, SelectQuery};

/// Operations the hosted backend exposes to the dashboard.
///
/// Implementations are single-threaded (the browser event loop, or a
/// current-thread runtime in the CLI), so the futures carry no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait QueryBackend {
    /// Rows matching `query`, honouring its order and range.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError>;

    /// Exact number of rows matching `query`'s predicates.
    async fn count(&self, query: &SelectQuery) -> Result<u64, QueryError>;

    /// Insert `rows` in a single round trip; all or nothing.
    async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, QueryError>;

    /// Patch one row by id and return it as stored.
    async fn update(&self, table: &str, id: i64, patch: &Row) -> Result<Row, QueryError>;

    /// Call a named server-side procedure.
    async fn rpc(&self, procedure: &str, args: &Row) -> Result<Vec<Row>, QueryError>;
}
