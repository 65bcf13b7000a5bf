//! TITLEMILL — pattern-driven parser for market-research report titles.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects to the pattern store (seeding it on first run), then streams
//! the input titles through the worker pool and writes one JSON result
//! per line to the output file.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use titlemill::config::AppConfig;
use titlemill::engine::pipeline::TitlePipeline;
use titlemill::engine::runner::BatchRunner;
use titlemill::patterns::store::{self, JsonPatternStore, PatternStore, SqlitePatternStore};
use titlemill::patterns::seed;

const BANNER: &str = r#"
 _____ ___ _____ _     _____ __  __ ___ _     _
|_   _|_ _|_   _| |   | ____|  \/  |_ _| |   | |
  | |  | |  | | | |   |  _| | |\/| || || |   | |
  | |  | |  | | | |___| |___| |  | || || |___| |___
  |_| |___| |_| |_____|_____|_|  |_|___|_____|_____|

  Market-Research Title Ingestion Mill
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        workers = cfg.pipeline.workers,
        title_budget_ms = cfg.pipeline.title_budget_ms,
        store_url = %cfg.store.database_url,
        "TITLEMILL starting up"
    );

    // Pattern store: connect, seed on first run, load the library.
    // An unreachable store or a missing boundary marker is fatal.
    let sqlite = SqlitePatternStore::connect(&cfg.store.database_url).await?;
    if cfg.store.seed_if_empty && sqlite.count().await? == 0 {
        let records = match &cfg.store.seed_file {
            Some(path) => {
                info!(path = %path, "Seeding empty pattern store from file");
                JsonPatternStore::new(path).fetch_patterns().await?
            }
            None => {
                info!("Seeding empty pattern store with the built-in library");
                seed::builtin_patterns()
            }
        };
        let seeded = sqlite.insert_all(&records).await?;
        info!(seeded, "Pattern store seeded");
    }
    let library = Arc::new(store::load_library(&sqlite).await?);

    // Read the input batch (one title per line, blanks skipped).
    let raw = std::fs::read_to_string(&cfg.io.input)
        .with_context(|| format!("Failed to read input file: {}", cfg.io.input))?;
    let titles: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if titles.is_empty() {
        warn!(input = %cfg.io.input, "No titles to process");
        return Ok(());
    }
    info!(titles = titles.len(), input = %cfg.io.input, "Input batch loaded");

    // Run the pool and emit JSONL.
    let pipeline = Arc::new(TitlePipeline::new(library, cfg.title_budget()));
    let runner = BatchRunner::new(pipeline, cfg.pipeline.workers);
    let (results, report) = runner.run(titles).await;

    let mut out = std::fs::File::create(&cfg.io.output)
        .with_context(|| format!("Failed to create output file: {}", cfg.io.output))?;
    for result in &results {
        let line = serde_json::to_string(result).context("Failed to serialise result")?;
        writeln!(out, "{line}").context("Failed to write result line")?;
    }

    info!(
        output = %cfg.io.output,
        processed = report.processed,
        ok = report.ok,
        timeouts = report.timeouts,
        invalid = report.invalid,
        "TITLEMILL finished"
    );
    Ok(())
}

/// Initialise the `tracing` subscriber.
///
/// - In development (RUST_LOG set), uses human-readable format.
/// - With TITLEMILL_LOG_JSON set, uses structured JSON logging to stdout.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("titlemill=info"));

    let json_logging = std::env::var("TITLEMILL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
