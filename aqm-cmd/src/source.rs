//! Data source selection for the CLI.

use aqm_core::{DataSource, MemorySource};
use aqm_db::Database;
use clap::{Args, ValueEnum};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Keep rows in memory and filter them directly
    #[default]
    Memory,
    /// Load rows into an in-memory SQLite database
    Sqlite,
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Merged sensor CSV export (`.csv` or `.csv.gz`); `--url` takes precedence
    #[arg(long, env = "AQM_CSV_PATH")]
    pub csv: Option<PathBuf>,

    /// URL serving the merged sensor CSV export
    #[arg(long, env = "AQM_CSV_URL")]
    pub url: Option<String>,

    /// Storage backend for the loaded rows
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,
}

/// Fetch the CSV export over HTTP.
pub async fn fetch_csv(url: &str) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;
    info!("[AQM] source: fetching {}", url);
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    info!("[AQM] source: received {} bytes", body.len());
    Ok(body)
}

async fn load_csv_text(args: &SourceArgs) -> anyhow::Result<String> {
    match (&args.url, &args.csv) {
        (Some(url), _) => fetch_csv(url).await,
        (None, Some(path)) => Ok(aqm_core::csv_source::read_csv_text(path)?),
        (None, None) => anyhow::bail!(
            "no data source given; pass --csv <PATH> or --url <URL> (or set AQM_CSV_PATH / AQM_CSV_URL)"
        ),
    }
}

/// Load CSV text into the chosen backend.
pub fn source_from_text(csv_text: &str, backend: Backend) -> anyhow::Result<Box<dyn DataSource>> {
    Ok(match backend {
        Backend::Memory => Box::new(MemorySource::from_csv_str(csv_text)?),
        Backend::Sqlite => {
            let db = Database::new()?;
            db.load_merged_csv(csv_text)?;
            Box::new(db)
        }
    })
}

/// Build the data source described by `args`.
pub async fn open_source(args: &SourceArgs) -> anyhow::Result<Box<dyn DataSource>> {
    let text = load_csv_text(args).await?;
    source_from_text(&text, args.backend)
}
