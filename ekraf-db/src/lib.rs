//! Dataset query service and local database for the creative-economy dashboard.
//!
//! # Architecture
//!
//! - [`service::DatasetService`] is the one list / filter / paginate /
//!   aggregate contract every dashboard table goes through. It is generic
//!   over [`ekraf_core::QueryBackend`].
//! - [`Database`] is an in-memory SQLite mirror of the hosted tables
//!   (`Rc<RefCell<Connection>>`, single-threaded like the browser event loop).
//!   It backs demo mode, the CLI's offline mode and the tests.
//! - [`import`] turns parsed spreadsheet rows into insertable rows and runs
//!   them through the service in sequential batches.
//!
//! # Usage
//!
//! ```rust
//! use ekraf_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_table(
//!     "pdki_filings",
//!     "registration_number,brand_name,owner,year\nIDM000123,Kopi Priangan,CV Priangan,2024\n",
//! )
//! .unwrap();
//! assert_eq!(db.row_count("pdki_filings").unwrap(), 1);
//! ```

pub mod import;
mod loader;
pub mod procedures;
pub mod schema;
pub mod service;
mod sqlite;

pub use service::DatasetService;

use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory SQLite database mirroring the hosted tables.
///
/// Cheaply cloneable (via `Rc`); clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create an empty in-memory database with the full schema applied.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }

    pub fn row_count(&self, table: &str) -> anyhow::Result<u64> {
        ekraf_core::query::validate_identifier(table)?;
        let conn = self.conn.borrow();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

/// Either the hosted backend or the local database, picked at startup.
#[cfg(feature = "api")]
#[derive(Clone)]
pub enum Backend {
    Remote(ekraf_core::rest::RestBackend),
    Local(Database),
}

#[cfg(feature = "api")]
mod remote_or_local {
    use super::{Backend, Database};
    use ekraf_core::query::SelectQuery;
    use ekraf_core::{QueryBackend, QueryError, Row};

    impl Backend {
        pub fn is_local(&self) -> bool {
            matches!(self, Backend::Local(_))
        }

        pub fn local(&self) -> Option<&Database> {
            match self {
                Backend::Local(db) => Some(db),
                Backend::Remote(_) => None,
            }
        }
    }

    impl QueryBackend for Backend {
        async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
            match self {
                Backend::Remote(remote) => remote.select(query).await,
                Backend::Local(db) => db.select(query).await,
            }
        }

        async fn count(&self, query: &SelectQuery) -> Result<u64, QueryError> {
            match self {
                Backend::Remote(remote) => remote.count(query).await,
                Backend::Local(db) => db.count(query).await,
            }
        }

        async fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, QueryError> {
            match self {
                Backend::Remote(remote) => remote.insert(table, rows).await,
                Backend::Local(db) => db.insert(table, rows).await,
            }
        }

        async fn update(&self, table: &str, id: i64, patch: &Row) -> Result<Row, QueryError> {
            match self {
                Backend::Remote(remote) => remote.update(table, id, patch).await,
                Backend::Local(db) => db.update(table, id, patch).await,
            }
        }

        async fn rpc(&self, procedure: &str, args: &Row) -> Result<Vec<Row>, QueryError> {
            match self {
                Backend::Remote(remote) => remote.rpc(procedure, args).await,
                Backend::Local(db) => db.rpc(procedure, args).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_creates_successfully() {
        assert!(Database::new().is_ok());
    }

    #[test]
    fn database_is_cloneable() {
        let db = Database::new().unwrap();
        let db2 = db.clone();
        db.load_table("patent_registrations", "title,year\nAlat Tenun Digital,2023\n")
            .unwrap();
        assert_eq!(
            db2.row_count("patent_registrations").unwrap(),
            1,
            "Clone should see same data via shared Rc"
        );
    }

    #[test]
    fn database_starts_empty() {
        let db = Database::new().unwrap();
        for table in schema::TABLES {
            assert_eq!(db.row_count(table).unwrap(), 0);
        }
    }
}
