// ./tracker/src/main.rs
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Application layer: the service front ends talk to
use application::{ApplicationError, TransactionService};
// Domain payloads read from the seed file and written to the report
use domain::{BalanceSummary, NewTransaction, Transaction};
// Infrastructure layer implementations
use infrastructure::{CollectionRegistry, MemoryStorageService};

mod config;

use config::TrackerConfig;

#[derive(Error, Debug)]
enum TrackerError {
    #[error("Failed to read seed file '{path}': {source}")]
    SeedRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// What gets printed to stdout.
#[derive(Serialize, Debug)]
struct Report {
    collection: String,
    summary: BalanceSummary,
    recent: Vec<Transaction>,
}

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    // stderr keeps stdout free for the JSON report.
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let mut config = TrackerConfig::from_env();
    if let Some(path) = env::args().nth(1) {
        info!("Using seed file {} from the command line.", path);
        config.seed_path = Some(PathBuf::from(path));
    }

    if let Err(e) = run(config).await {
        error!("Tracker failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: TrackerConfig) -> Result<(), TrackerError> {
    // --- Dependency Injection ---
    let registry = CollectionRegistry::new();
    let store = Arc::new(MemoryStorageService::new(&registry, config.collection.clone()));
    let service = TransactionService::new(store);
    info!(collection = %config.collection, "In-memory store initialized.");

    match &config.seed_path {
        Some(path) => {
            let entries = load_seed(path)?;
            let recorded = seed(&service, entries).await?;
            info!(count = recorded, "Seed entries recorded.");
        }
        None => warn!("No seed file given (TRACKER_SEED or first argument). Reporting an empty ledger."),
    }

    let report = build_report(&service, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_seed(path: &Path) -> Result<Vec<NewTransaction>, TrackerError> {
    let raw = fs::read_to_string(path).map_err(|source| TrackerError::SeedRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_seed(&raw)
}

fn parse_seed(raw: &str) -> Result<Vec<NewTransaction>, TrackerError> {
    Ok(serde_json::from_str(raw)?)
}

/// Records every entry in order; the first invalid one aborts the run.
async fn seed(
    service: &TransactionService,
    entries: Vec<NewTransaction>,
) -> Result<usize, TrackerError> {
    let total = entries.len();
    for (index, entry) in entries.into_iter().enumerate() {
        if let Err(e) = service.record(entry).await {
            error!(index, "Seed entry rejected: {}", e);
            return Err(e.into());
        }
    }
    Ok(total)
}

async fn build_report(
    service: &TransactionService,
    config: &TrackerConfig,
) -> Result<Report, TrackerError> {
    Ok(Report {
        collection: config.collection.clone(),
        summary: service.summary().await?,
        recent: service.list_recent(config.recent_limit).await?,
    })
}
