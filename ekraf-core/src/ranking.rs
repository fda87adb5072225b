//! Pre-aggregated rows produced by the ranking and pivot procedures.

use crate::capital_status::CapitalStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grouping dimension for rankings and pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Region,
    Subsector,
}

impl Dimension {
    /// Column of `investment_records` the dimension groups on.
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::Subsector => "subsector",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Region => "Kabupaten/Kota",
            Dimension::Subsector => "Subsektor",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "region" | "wilayah" => Ok(Dimension::Region),
            "subsector" | "subsektor" => Ok(Dimension::Subsector),
            other => Err(format!("unknown dimension {:?}", other)),
        }
    }
}

/// Metric summed into pivot cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotMetric {
    InvestmentIdr,
    InvestmentUsd,
    ProjectCount,
    WorkersTotal,
}

impl PivotMetric {
    pub fn column(&self) -> &'static str {
        match self {
            PivotMetric::InvestmentIdr => "investment_idr",
            PivotMetric::InvestmentUsd => "investment_usd",
            PivotMetric::ProjectCount => "project_count",
            PivotMetric::WorkersTotal => "workers_total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PivotMetric::InvestmentIdr => "Investasi (Rp)",
            PivotMetric::InvestmentUsd => "Investasi (US$)",
            PivotMetric::ProjectCount => "Jumlah Proyek",
            PivotMetric::WorkersTotal => "Tenaga Kerja",
        }
    }
}

impl FromStr for PivotMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "investment_idr" | "idr" => Ok(PivotMetric::InvestmentIdr),
            "investment_usd" | "usd" => Ok(PivotMetric::InvestmentUsd),
            "project_count" | "projects" => Ok(PivotMetric::ProjectCount),
            "workers_total" | "workers" => Ok(PivotMetric::WorkersTotal),
            other => Err(format!("unknown metric {:?}", other)),
        }
    }
}

/// One rank-annotated entry of a ranking table for a (year, dimension).
///
/// `percentage` is the entry's share of `investment_idr` within the year;
/// across one (year, dimension) the shares sum to ~100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub rank: i64,
    pub name: String,
    pub year: i32,
    pub investment_idr: f64,
    pub investment_usd: f64,
    pub project_count: i64,
    pub percentage: f64,
}

/// One (key, year, capital status) aggregate cell feeding a pivot grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSource {
    pub key: String,
    pub year: i32,
    pub capital_status: CapitalStatus,
    pub value: f64,
}
