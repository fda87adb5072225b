//! Named procedures the hosted backend exposes over `rpc`, evaluated locally.
//!
//! - `get_investment_ranking { dimension, year? }`: per-year rank by
//!   `investment_idr` with each entry's share of the year total
//! - `get_investment_pivot { dimension, metric }`: metric sums per
//!   (key, year, capital status)
//! - `get_dataset_summary { dataset, filters, search }`: per-status row
//!   counts and numeric sums over the filtered set
//! - `refresh_investment_aggregates {}`: rebuild the ranking tables

use crate::schema::RANKING_TABLES;
use crate::sqlite::{query_rows, quoted, where_clause};
use crate::Database;
use ekraf_core::dataset;
use ekraf_core::error::QueryError;
use ekraf_core::filter::Filters;
use ekraf_core::query::Row;
use ekraf_core::ranking::{Dimension, PivotMetric};
use ekraf_data::summary::{GROUP_COUNT_KEY, GROUP_STATUS_KEY};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

pub const RANKING_PROCEDURE: &str = "get_investment_ranking";
pub const PIVOT_PROCEDURE: &str = "get_investment_pivot";
pub const SUMMARY_PROCEDURE: &str = "get_dataset_summary";
pub const REFRESH_PROCEDURE: &str = "refresh_investment_aggregates";

fn string_arg<'a>(args: &'a Row, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn dimension_arg(args: &Row) -> Result<Dimension, QueryError> {
    string_arg(args, "dimension")
        .unwrap_or("region")
        .parse()
        .map_err(QueryError::Backend)
}

fn year_arg(args: &Row) -> Option<i64> {
    match args.get("year") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ranking SQL shared by the procedure and the table refresh.
fn ranking_sql(dimension: Dimension) -> String {
    let key = quoted(dimension.column());
    format!(
        "SELECT
            RANK() OVER (PARTITION BY year ORDER BY SUM(investment_idr) DESC) AS \"rank\",
            {key} AS name,
            year,
            SUM(investment_idr) AS investment_idr,
            SUM(investment_usd) AS investment_usd,
            SUM(project_count) AS project_count,
            COALESCE(
                SUM(investment_idr) * 100.0
                    / NULLIF(SUM(SUM(investment_idr)) OVER (PARTITION BY year), 0),
                0.0
            ) AS percentage
         FROM investment_records
         WHERE ?1 IS NULL OR year = ?1
         GROUP BY {key}, year
         ORDER BY year DESC, \"rank\" ASC, name ASC",
        key = key
    )
}

impl Database {
    pub(crate) fn call_procedure(&self, procedure: &str, args: &Row) -> Result<Vec<Row>, QueryError> {
        log::debug!("[EKRAF] sqlite: rpc {}", procedure);
        match procedure {
            RANKING_PROCEDURE => {
                let dimension = dimension_arg(args)?;
                let year = year_arg(args).map_or(SqlValue::Null, SqlValue::Integer);
                let conn = self.conn.borrow();
                query_rows(&conn, &ranking_sql(dimension), vec![year])
            }
            PIVOT_PROCEDURE => {
                let dimension = dimension_arg(args)?;
                let metric: PivotMetric = string_arg(args, "metric")
                    .unwrap_or("investment_idr")
                    .parse()
                    .map_err(QueryError::Backend)?;
                let key = quoted(dimension.column());
                let sql = format!(
                    "SELECT {key} AS \"key\", year, capital_status, SUM({metric}) AS value
                     FROM investment_records
                     GROUP BY {key}, year, capital_status
                     ORDER BY \"key\", year, capital_status",
                    key = key,
                    metric = quoted(metric.column())
                );
                let conn = self.conn.borrow();
                query_rows(&conn, &sql, Vec::new())
            }
            SUMMARY_PROCEDURE => self.dataset_summary(args),
            REFRESH_PROCEDURE => {
                self.refresh_rankings().map_err(|e| QueryError::Backend(e.to_string()))?;
                Ok(Vec::new())
            }
            other => Err(QueryError::UnknownProcedure(other.to_string())),
        }
    }

    fn dataset_summary(&self, args: &Row) -> Result<Vec<Row>, QueryError> {
        let spec = dataset::by_name(string_arg(args, "dataset").unwrap_or_default())?;
        let filters = Filters::from_procedure_args(args);
        let (filter, params) = where_clause(&filters.predicates(spec));

        let mut select = vec![match spec.status_column {
            Some(column) => format!("{} AS {}", quoted(column), GROUP_STATUS_KEY),
            None => format!("NULL AS {}", GROUP_STATUS_KEY),
        }];
        select.push(format!("COUNT(*) AS {}", GROUP_COUNT_KEY));
        for column in spec.numeric_columns() {
            select.push(format!("SUM({col}) AS {col}", col = quoted(column)));
        }
        let group = match spec.status_column {
            Some(column) => format!(" GROUP BY {}", quoted(column)),
            None => String::new(),
        };
        let sql = format!(
            "SELECT {} FROM {}{}{}",
            select.join(", "),
            quoted(spec.table),
            filter,
            group
        );
        let conn = self.conn.borrow();
        query_rows(&conn, &sql, params)
    }

    /// Rebuild `region_rankings` and `subsector_rankings` from the current
    /// `investment_records`.
    pub fn refresh_rankings(&self) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        let tx = conn.unchecked_transaction()?;
        for (table, dimension) in RANKING_TABLES
            .iter()
            .zip([Dimension::Region, Dimension::Subsector])
        {
            tx.execute(&format!("DELETE FROM {}", quoted(table)), [])?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (\"rank\", name, year, investment_idr, investment_usd, project_count, percentage)
                     SELECT \"rank\", name, year, investment_idr, investment_usd, project_count, percentage
                     FROM ({})",
                    quoted(table),
                    ranking_sql(dimension)
                ),
                [SqlValue::Null],
            )?;
        }
        tx.commit()?;
        log::info!("[EKRAF] sqlite: refreshed ranking tables");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekraf_core::dataset::INVESTMENT;
    use serde_json::json;

    const RECORDS: &str = "\
company_name,region,subsector,capital_status,year,period,investment_idr,investment_usd,project_count
PT A,Kota Bandung,Kuliner,PMA,2024,Q1,600,40,1
PT B,Kota Bandung,Fesyen,PMDN,2024,Q2,200,0,2
PT C,Kabupaten Garut,Kriya,PMDN,2024,Q1,200,0,1
PT D,Kabupaten Garut,Kriya,PMA,2023,Q4,500,35,1
";

    fn db() -> Database {
        let db = Database::new().unwrap();
        db.load_table("investment_records", RECORDS).unwrap();
        db
    }

    fn args(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn ranking_ranks_within_year() {
        let rows = db()
            .call_procedure(RANKING_PROCEDURE, &args(json!({"dimension": "region", "year": 2024})))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("Kota Bandung")));
        assert_eq!(rows[0].get("rank"), Some(&json!(1)));
        assert_eq!(rows[0].get("percentage"), Some(&json!(80.0)));
        assert_eq!(rows[1].get("percentage"), Some(&json!(20.0)));
    }

    #[test]
    fn ranking_without_year_covers_every_year() {
        let rows = db()
            .call_procedure(RANKING_PROCEDURE, &args(json!({"dimension": "subsector"})))
            .unwrap();
        let years: Vec<_> = rows.iter().filter_map(|r| r.get("year")).collect();
        assert_eq!(years.first(), Some(&&json!(2024)));
        assert_eq!(years.last(), Some(&&json!(2023)));
    }

    #[test]
    fn pivot_groups_by_key_year_status() {
        let rows = db()
            .call_procedure(
                PIVOT_PROCEDURE,
                &args(json!({"dimension": "region", "metric": "project_count"})),
            )
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].get("key"), Some(&json!("Kabupaten Garut")));
        assert_eq!(rows[0].get("year"), Some(&json!(2023)));
        assert_eq!(rows[0].get("value"), Some(&json!(1)));
    }

    #[test]
    fn summary_groups_filtered_rows_by_status() {
        let filters = Filters::new().with("year", "2024");
        let rows = db()
            .call_procedure(SUMMARY_PROCEDURE, &filters.procedure_args(&INVESTMENT))
            .unwrap();
        assert_eq!(rows.len(), 2);
        let pmdn = rows
            .iter()
            .find(|r| r.get("status") == Some(&json!("PMDN")))
            .unwrap();
        assert_eq!(pmdn.get("row_count"), Some(&json!(2)));
        assert_eq!(pmdn.get("investment_idr"), Some(&json!(400.0)));
    }

    #[test]
    fn refresh_rebuilds_ranking_tables() {
        let db = db();
        db.refresh_rankings().unwrap();
        assert_eq!(db.row_count("region_rankings").unwrap(), 3);
        assert_eq!(db.row_count("subsector_rankings").unwrap(), 4);
        db.refresh_rankings().unwrap();
        assert_eq!(db.row_count("region_rankings").unwrap(), 3);
    }

    #[test]
    fn unknown_procedure_is_reported() {
        assert_eq!(
            db().call_procedure("drop_everything", &Row::new()),
            Err(QueryError::UnknownProcedure("drop_everything".into()))
        );
    }
}
