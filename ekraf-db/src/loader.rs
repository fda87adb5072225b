//! CSV loading for populating the in-memory database.
//!
//! Fixture files carry a header row of column names. Blank cells are left out
//! of the insert so column defaults (`created_at`, zero amounts) apply.
//! Headers that name no column of the table are skipped with a warning.

use crate::schema::{RANKING_TABLES, TABLES};
use crate::Database;
use ekraf_core::query::validate_identifier;
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeSet;
use std::path::Path;

impl Database {
    fn table_columns(&self, table: &str) -> anyhow::Result<BTreeSet<String>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        if columns.is_empty() {
            anyhow::bail!("unknown table {}", table);
        }
        Ok(columns)
    }

    /// Load rows for `table` from a CSV string with a header row.
    ///
    /// Returns the number of rows inserted. The whole file loads in one
    /// transaction; a rejected row rolls back every row before it.
    ///
    /// # Example CSV
    /// ```text
    /// title,applicant,year,claim_count
    /// Alat Tenun Digital,CV Sinar Garut,2023,4
    /// ```
    pub fn load_table(&self, table: &str, csv_data: &str) -> anyhow::Result<usize> {
        validate_identifier(table)?;
        let known = self.table_columns(table)?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<Option<String>> = rdr
            .headers()?
            .iter()
            .map(|h| {
                if known.contains(h) {
                    Some(h.to_string())
                } else {
                    log::warn!("[EKRAF] loader: {} has no column {:?}, skipping", table, h);
                    None
                }
            })
            .collect();

        let conn = self.conn.borrow();
        let tx = conn.unchecked_transaction()?;
        let mut count = 0usize;
        for result in rdr.records() {
            let record = result?;
            let mut columns = Vec::new();
            let mut values = Vec::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if let (Some(column), false) = (header, cell.is_empty()) {
                    columns.push(format!("\"{}\"", column));
                    values.push(SqlValue::Text(cell.to_string()));
                }
            }
            if columns.is_empty() {
                continue;
            }
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            tx.execute(
                &format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders.join(", ")
                ),
                rusqlite::params_from_iter(values),
            )?;
            count += 1;
        }
        tx.commit()?;
        log::info!("[EKRAF] loader: Loaded {} rows into {}", count, table);
        Ok(count)
    }

    /// Load every `<table>.csv` found in `dir`. Ranking tables without a
    /// file of their own are materialized from `investment_records`.
    pub fn load_fixture_dir(&self, dir: &Path) -> anyhow::Result<()> {
        let mut rankings_loaded = false;
        for table in TABLES {
            let path = dir.join(format!("{}.csv", table));
            if !path.exists() {
                log::debug!("[EKRAF] loader: no fixture {}", path.display());
                continue;
            }
            let csv_data = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
            self.load_table(table, &csv_data)?;
            rankings_loaded |= RANKING_TABLES.contains(&table);
        }
        if !rankings_loaded {
            self.refresh_rankings()?;
        }
        Ok(())
    }

    /// A database loaded from a fixture directory.
    pub fn from_fixture_dir(dir: &Path) -> anyhow::Result<Self> {
        let db = Self::new()?;
        db.load_fixture_dir(dir)?;
        Ok(db)
    }
}
