//! SQL schema for the in-memory mirror of the hosted tables.
//!
//! Column names match the hosted backend one to one so the same
//! [`ekraf_core::dataset::DatasetSpec`] drives both.

/// Tables created by [`create_schema`], in load order.
pub const TABLES: [&str; 5] = [
    "investment_records",
    "region_rankings",
    "subsector_rankings",
    "patent_registrations",
    "pdki_filings",
];

/// Materialized ranking tables rebuilt from `investment_records`.
pub const RANKING_TABLES: [&str; 2] = ["region_rankings", "subsector_rankings"];

/// Returns the full SQL schema as a single batch string.
///
/// `created_at` defaults to an RFC 3339 UTC timestamp with milliseconds so
/// it sorts lexically and decodes into `chrono::DateTime<Utc>`.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS investment_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sector TEXT NOT NULL DEFAULT '',
        subsector TEXT NOT NULL DEFAULT '',
        company_name TEXT NOT NULL CHECK (length(trim(company_name)) > 0),
        permit_number TEXT,
        project_code TEXT,
        kbli_code TEXT,
        kbli_title TEXT,
        region TEXT NOT NULL,
        district TEXT,
        address TEXT,
        country TEXT,
        investment_usd REAL NOT NULL DEFAULT 0 CHECK (investment_usd >= 0),
        investment_idr REAL NOT NULL DEFAULT 0 CHECK (investment_idr >= 0),
        additional_investment_idr REAL NOT NULL DEFAULT 0,
        project_count INTEGER NOT NULL DEFAULT 0 CHECK (project_count >= 0),
        workers_domestic INTEGER NOT NULL DEFAULT 0 CHECK (workers_domestic >= 0),
        workers_foreign INTEGER NOT NULL DEFAULT 0 CHECK (workers_foreign >= 0),
        workers_total INTEGER NOT NULL DEFAULT 0 CHECK (workers_total >= 0),
        capital_status TEXT NOT NULL CHECK (capital_status IN ('PMA', 'PMDN')),
        year INTEGER NOT NULL CHECK (year > 0),
        period TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );
    CREATE INDEX IF NOT EXISTS idx_records_year ON investment_records(year);
    CREATE INDEX IF NOT EXISTS idx_records_status ON investment_records(capital_status);
    CREATE INDEX IF NOT EXISTS idx_records_created ON investment_records(created_at, id);

    CREATE TABLE IF NOT EXISTS region_rankings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rank INTEGER NOT NULL,
        name TEXT NOT NULL,
        year INTEGER NOT NULL,
        investment_idr REAL NOT NULL DEFAULT 0,
        investment_usd REAL NOT NULL DEFAULT 0,
        project_count INTEGER NOT NULL DEFAULT 0,
        percentage REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS subsector_rankings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rank INTEGER NOT NULL,
        name TEXT NOT NULL,
        year INTEGER NOT NULL,
        investment_idr REAL NOT NULL DEFAULT 0,
        investment_usd REAL NOT NULL DEFAULT 0,
        project_count INTEGER NOT NULL DEFAULT 0,
        percentage REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS patent_registrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_number TEXT,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        applicant TEXT,
        region TEXT,
        patent_type TEXT,
        status TEXT,
        year INTEGER,
        claim_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS pdki_filings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        registration_number TEXT,
        brand_name TEXT NOT NULL CHECK (length(trim(brand_name)) > 0),
        owner TEXT,
        nice_class TEXT,
        region TEXT,
        subsector TEXT,
        status TEXT,
        year INTEGER,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );
    "#
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();

        for table in TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        conn.execute_batch(create_schema())
            .expect("Applying schema twice should succeed due to IF NOT EXISTS");
    }

    #[test]
    fn schema_rejects_unknown_capital_status() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        let result = conn.execute(
            "INSERT INTO investment_records (company_name, region, capital_status, year, period)
             VALUES ('PT A', 'Kota Bandung', 'JOINT', 2024, 'Q1')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn created_at_defaults_to_rfc3339() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        conn.execute(
            "INSERT INTO pdki_filings (brand_name) VALUES ('Kopi Priangan')",
            [],
        )
        .unwrap();
        let created: String = conn
            .query_row("SELECT created_at FROM pdki_filings", [], |row| row.get(0))
            .unwrap();
        assert!(created.ends_with('Z'));
        assert_eq!(created.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
