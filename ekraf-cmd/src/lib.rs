//! Command implementations for the EKRAF CLI.
//!
//! Every command runs against either the hosted backend or, with
//! `--fixtures`, an in-memory SQLite database loaded from CSV files.

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use ekraf_core::config::{BackendConfig, ACCESS_TOKEN_VAR, ANON_KEY_VAR, URL_VAR};
use ekraf_core::filter::Filters;
use ekraf_core::rest::RestBackend;
use ekraf_db::{Backend, Database};
use std::path::PathBuf;

pub mod query;
pub mod transfer;

/// Where the data comes from. Read once at startup.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Directory of fixture CSVs to serve from a local database instead of the hosted backend
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// Hosted backend base URL
    #[arg(long, global = true, env = URL_VAR)]
    pub backend_url: Option<String>,

    /// Anonymous API key for the hosted backend
    #[arg(long, global = true, env = ANON_KEY_VAR, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Signed-in user's access token, required for writes
    #[arg(long, global = true, env = ACCESS_TOKEN_VAR, hide_env_values = true)]
    pub access_token: Option<String>,
}

impl BackendArgs {
    pub fn connect(&self) -> anyhow::Result<Backend> {
        if let Some(dir) = &self.fixtures {
            let db = Database::from_fixture_dir(dir)
                .with_context(|| format!("failed to load fixtures from {}", dir.display()))?;
            log::info!("[EKRAF] cli: serving fixtures from {}", dir.display());
            return Ok(Backend::Local(db));
        }
        match (&self.backend_url, &self.anon_key) {
            (Some(url), Some(key)) => {
                let config =
                    BackendConfig::new(url, key)?.with_access_token(self.access_token.clone());
                log::info!("[EKRAF] cli: using backend {}", config.url);
                Ok(Backend::Remote(RestBackend::new(config)))
            }
            _ => bail!(
                "no backend configured: pass --fixtures <dir>, or set {} and {}",
                URL_VAR,
                ANON_KEY_VAR
            ),
        }
    }
}

/// Filter selection shared by the list-style commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Filter as key=value, e.g. year=2024 or capital_status=PMA (repeatable)
    #[arg(short = 'f', long = "filter", value_parser = parse_assignment)]
    pub filters: Vec<(String, String)>,

    /// Free-text search over the dataset's search columns
    #[arg(short = 's', long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        for (key, value) in &self.filters {
            filters.set(key, value);
        }
        if let Some(search) = &self.search {
            filters.search = search.clone();
        }
        filters
    }
}

/// Parse `key=value`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available datasets
    Datasets,

    /// Print one page of a dataset with its grand-total row, as CSV
    List {
        /// Dataset name (see `datasets`)
        dataset: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Rows per page (defaults to the dataset's own page size)
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Distinct values for each of a dataset's select filters
    Options { dataset: String },

    /// Years present in a dataset
    Years { dataset: String },

    /// Totals and per-capital-status breakdown over the filtered set, as JSON
    Summary {
        dataset: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Investment ranking by region or subsector
    Ranking {
        /// region or subsector
        #[arg(short, long, default_value = "region")]
        dimension: String,

        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Investment pivot (key x year x PMA/PMDN with subtotals), as CSV
    Pivot {
        /// region or subsector
        #[arg(short, long, default_value = "region")]
        dimension: String,

        /// investment_idr, investment_usd, project_count or workers_total
        #[arg(short, long, default_value = "investment_idr")]
        metric: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a dataset page (or the whole filtered set) to a CSV file
    Export {
        dataset: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Export this page only
        #[arg(short, long, conflicts_with = "all")]
        page: Option<u32>,

        /// Export every row matching the filters
        #[arg(long)]
        all: bool,

        /// Directory the file is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Bulk-import a CSV or XLSX file into a dataset
    Import {
        dataset: String,

        /// CSV or XLSX file
        file: PathBuf,

        /// Reject the whole file if any row is invalid
        #[arg(long)]
        strict: bool,

        /// Rows per insert batch
        #[arg(long, default_value_t = ekraf_db::import::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Update one row by id
    Update {
        dataset: String,

        id: i64,

        /// Column assignment as key=value (repeatable)
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
    },
}

pub async fn run(backend: &BackendArgs, command: Command) -> anyhow::Result<()> {
    if let Command::Datasets = command {
        print!("{}", query::datasets());
        return Ok(());
    }

    let backend = backend.connect()?;
    match command {
        Command::Datasets => {}
        Command::List {
            dataset,
            filter,
            page,
            page_size,
        } => {
            let out = query::list(&backend, &dataset, &filter.to_filters(), page, page_size).await?;
            print!("{}", out);
        }
        Command::Options { dataset } => print!("{}", query::options(&backend, &dataset).await?),
        Command::Years { dataset } => print!("{}", query::years(&backend, &dataset).await?),
        Command::Summary { dataset, filter } => {
            println!("{}", query::summary(&backend, &dataset, &filter.to_filters()).await?)
        }
        Command::Ranking { dimension, year } => {
            print!("{}", query::ranking(&backend, &dimension, year).await?)
        }
        Command::Pivot {
            dimension,
            metric,
            output,
        } => {
            let csv = query::pivot(&backend, &dimension, &metric).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    log::info!("[EKRAF] cli: pivot written to {}", path.display());
                }
                None => print!("{}", csv),
            }
        }
        Command::Export {
            dataset,
            filter,
            page,
            all,
            out_dir,
        } => {
            let scope = if all {
                transfer::ExportScope::FilteredSet
            } else {
                transfer::ExportScope::Page(page.unwrap_or(1))
            };
            let path =
                transfer::export(&backend, &dataset, &filter.to_filters(), scope, &out_dir).await?;
            println!("{}", path.display());
        }
        Command::Import {
            dataset,
            file,
            strict,
            batch_size,
        } => {
            if backend.is_local() {
                log::warn!("[EKRAF] cli: importing into the in-memory fixture database; nothing is persisted");
            }
            let summary = transfer::import(&backend, &dataset, &file, strict, batch_size).await?;
            println!("{}", summary);
        }
        Command::Update { dataset, id, set } => {
            let row = transfer::update(&backend, &dataset, id, &set).await?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
    }
    Ok(())
}
