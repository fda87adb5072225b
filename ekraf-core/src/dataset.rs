//! Static per-dataset configuration.
//!
//! Every table in the dashboard is an instance of the same list / filter /
//! paginate / aggregate / export contract; a [`DatasetSpec`] carries the
//! parts that differ between them.

use crate::error::QueryError;
use crate::query::OrderKey;

/// A visible table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    /// Summed into grand-total rows and summary metrics.
    pub numeric: bool,
}

const fn text(key: &'static str, label: &'static str) -> Column {
    Column {
        key,
        label,
        numeric: false,
    }
}

const fn number(key: &'static str, label: &'static str) -> Column {
    Column {
        key,
        label,
        numeric: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    /// Parsed as an integer; unparsable input is dropped.
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// One user-facing filter control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Key in the filter state; differs from `column` for range bounds.
    pub key: &'static str,
    pub column: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
    pub op: FilterOp,
}

const fn select(key: &'static str, label: &'static str) -> FilterField {
    FilterField {
        key,
        column: key,
        label,
        kind: FilterKind::Text,
        op: FilterOp::Eq,
    }
}

const fn year(label: &'static str) -> FilterField {
    FilterField {
        key: "year",
        column: "year",
        label,
        kind: FilterKind::Integer,
        op: FilterOp::Eq,
    }
}

/// Which rows a table's grand-total row sums over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalScope {
    CurrentPage,
    FilteredSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportShape {
    /// Typed [`crate::record::Record`] with invariant checks.
    InvestmentRecord,
    /// Visible columns copied through, numeric columns parsed.
    Columns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    pub required_field: &'static str,
    pub shape: ImportShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub filters: &'static [FilterField],
    /// Columns matched by the free-text search box.
    pub search_columns: &'static [&'static str],
    pub order: &'static [Order],
    pub page_size: u32,
    pub year_column: Option<&'static str>,
    /// Column whose values split summary metrics (capital status).
    pub status_column: Option<&'static str>,
    /// Column the status breakdown percentages are computed over.
    pub primary_metric: Option<&'static str>,
    pub total_scope: TotalScope,
    pub summary_procedure: Option<&'static str>,
    /// Refreshes server-side materialized aggregates after a bulk insert.
    pub refresh_procedure: Option<&'static str>,
    pub import: Option<ImportConfig>,
}

impl DatasetSpec {
    pub fn numeric_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.numeric)
            .map(|c| c.key)
            .collect()
    }

    pub fn column_keys(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.key).collect()
    }

    pub fn filter(&self, key: &str) -> Option<&'static FilterField> {
        self.filters.iter().find(|f| f.key == key)
    }

    pub fn order_keys(&self) -> Vec<OrderKey> {
        self.order
            .iter()
            .map(|o| OrderKey {
                column: o.column.to_string(),
                descending: o.descending,
            })
            .collect()
    }

    /// First visible column; carries the "Grand Total" label.
    pub fn label_column(&self) -> &'static str {
        self.columns.first().map(|c| c.key).unwrap_or("id")
    }
}

const NEWEST_FIRST: &[Order] = &[
    Order {
        column: "created_at",
        descending: true,
    },
    Order {
        column: "id",
        descending: true,
    },
];

const BY_RANK: &[Order] = &[
    Order {
        column: "year",
        descending: true,
    },
    Order {
        column: "rank",
        descending: false,
    },
    Order {
        column: "id",
        descending: false,
    },
];

const RECORD_FILTERS: &[FilterField] = &[
    year("Tahun"),
    select("period", "Periode"),
    select("capital_status", "Status PM"),
    select("region", "Kabupaten/Kota"),
    select("subsector", "Subsektor"),
];

const RECORD_SEARCH: &[&str] = &["company_name", "permit_number", "kbli_code"];

pub static INVESTMENT: DatasetSpec = DatasetSpec {
    name: "investment",
    title: "Analisis Investasi",
    table: "investment_records",
    columns: &[
        text("company_name", "Nama Perusahaan"),
        text("permit_number", "NIB"),
        text("kbli_code", "KBLI"),
        text("region", "Kabupaten/Kota"),
        text("subsector", "Subsektor"),
        text("capital_status", "Status PM"),
        text("year", "Tahun"),
        text("period", "Periode"),
        number("investment_usd", "Investasi (US$)"),
        number("investment_idr", "Investasi (Rp)"),
        number("project_count", "Jumlah Proyek"),
    ],
    filters: RECORD_FILTERS,
    search_columns: RECORD_SEARCH,
    order: NEWEST_FIRST,
    page_size: 10,
    year_column: Some("year"),
    status_column: Some("capital_status"),
    primary_metric: Some("investment_idr"),
    total_scope: TotalScope::FilteredSet,
    summary_procedure: Some("get_dataset_summary"),
    refresh_procedure: Some("refresh_investment_aggregates"),
    import: Some(ImportConfig {
        required_field: "company_name",
        shape: ImportShape::InvestmentRecord,
    }),
};

pub static WORKFORCE: DatasetSpec = DatasetSpec {
    name: "workforce",
    title: "Analisis Tenaga Kerja",
    table: "investment_records",
    columns: &[
        text("company_name", "Nama Perusahaan"),
        text("region", "Kabupaten/Kota"),
        text("subsector", "Subsektor"),
        text("capital_status", "Status PM"),
        text("year", "Tahun"),
        number("workers_domestic", "TKI"),
        number("workers_foreign", "TKA"),
        number("workers_total", "Total Tenaga Kerja"),
    ],
    filters: RECORD_FILTERS,
    search_columns: RECORD_SEARCH,
    order: NEWEST_FIRST,
    page_size: 15,
    year_column: Some("year"),
    status_column: Some("capital_status"),
    primary_metric: Some("workers_total"),
    total_scope: TotalScope::CurrentPage,
    summary_procedure: None,
    refresh_procedure: None,
    import: None,
};

const RANKING_COLUMNS: &[Column] = &[
    text("rank", "Peringkat"),
    text("name", "Nama"),
    text("year", "Tahun"),
    number("investment_idr", "Investasi (Rp)"),
    number("investment_usd", "Investasi (US$)"),
    number("project_count", "Jumlah Proyek"),
    number("percentage", "Persentase (%)"),
];

const RANKING_FILTERS: &[FilterField] = &[year("Tahun")];

pub static REGION_RANKING: DatasetSpec = DatasetSpec {
    name: "region_ranking",
    title: "Peringkat Kabupaten/Kota",
    table: "region_rankings",
    columns: RANKING_COLUMNS,
    filters: RANKING_FILTERS,
    search_columns: &["name"],
    order: BY_RANK,
    page_size: 20,
    year_column: Some("year"),
    status_column: None,
    primary_metric: Some("investment_idr"),
    total_scope: TotalScope::CurrentPage,
    summary_procedure: None,
    refresh_procedure: None,
    import: None,
};

pub static SUBSECTOR_RANKING: DatasetSpec = DatasetSpec {
    name: "subsector_ranking",
    title: "Peringkat Subsektor",
    table: "subsector_rankings",
    columns: RANKING_COLUMNS,
    filters: RANKING_FILTERS,
    search_columns: &["name"],
    order: BY_RANK,
    page_size: 20,
    year_column: Some("year"),
    status_column: None,
    primary_metric: Some("investment_idr"),
    total_scope: TotalScope::CurrentPage,
    summary_procedure: None,
    refresh_procedure: None,
    import: None,
};

pub static PATENTS: DatasetSpec = DatasetSpec {
    name: "patents",
    title: "Pendaftaran Paten",
    table: "patent_registrations",
    columns: &[
        text("application_number", "Nomor Permohonan"),
        text("title", "Judul"),
        text("applicant", "Pemohon"),
        text("region", "Kabupaten/Kota"),
        text("patent_type", "Jenis Paten"),
        text("status", "Status"),
        text("year", "Tahun"),
        number("claim_count", "Jumlah Klaim"),
    ],
    filters: &[
        year("Tahun"),
        select("region", "Kabupaten/Kota"),
        select("patent_type", "Jenis Paten"),
        select("status", "Status"),
    ],
    search_columns: &["title", "applicant", "application_number"],
    order: NEWEST_FIRST,
    page_size: 10,
    year_column: Some("year"),
    status_column: None,
    primary_metric: None,
    total_scope: TotalScope::CurrentPage,
    summary_procedure: None,
    refresh_procedure: None,
    import: Some(ImportConfig {
        required_field: "title",
        shape: ImportShape::Columns,
    }),
};

pub static PDKI: DatasetSpec = DatasetSpec {
    name: "pdki",
    title: "Data PDKI (Merek)",
    table: "pdki_filings",
    columns: &[
        text("registration_number", "Nomor Pendaftaran"),
        text("brand_name", "Nama Merek"),
        text("owner", "Pemilik"),
        text("nice_class", "Kelas"),
        text("region", "Kabupaten/Kota"),
        text("subsector", "Subsektor"),
        text("status", "Status"),
        text("year", "Tahun"),
    ],
    filters: &[
        year("Tahun"),
        select("region", "Kabupaten/Kota"),
        select("subsector", "Subsektor"),
        select("status", "Status"),
    ],
    search_columns: &["brand_name", "owner", "registration_number"],
    order: NEWEST_FIRST,
    page_size: 15,
    year_column: Some("year"),
    status_column: None,
    primary_metric: None,
    total_scope: TotalScope::CurrentPage,
    summary_procedure: None,
    refresh_procedure: None,
    import: Some(ImportConfig {
        required_field: "brand_name",
        shape: ImportShape::Columns,
    }),
};

static ALL: [&DatasetSpec; 6] = [
    &INVESTMENT,
    &WORKFORCE,
    &REGION_RANKING,
    &SUBSECTOR_RANKING,
    &PATENTS,
    &PDKI,
];

pub fn all() -> &'static [&'static DatasetSpec] {
    &ALL
}

pub fn by_name(name: &str) -> Result<&'static DatasetSpec, QueryError> {
    ALL.iter()
        .copied()
        .find(|d| d.name == name)
        .ok_or_else(|| QueryError::UnknownDataset(name.to_string()))
}
