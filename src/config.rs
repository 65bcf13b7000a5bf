//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Everything has a sensible default so a bare file (or none of the
//! optional keys) still yields a runnable pipeline.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub io: IoSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Worker pool size for batch runs.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-title processing budget in milliseconds.
    #[serde(default = "default_title_budget_ms")]
    pub title_budget_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    /// SQLite URL of the pattern document store.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Seed an empty store on first run.
    #[serde(default = "default_true")]
    pub seed_if_empty: bool,
    /// Optional JSON seed file; the built-in seed is used when absent.
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IoSettings {
    /// Input file with one title per line.
    #[serde(default = "default_input")]
    pub input: String,
    /// Output JSONL file, one `PipelineResult` per line.
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_workers() -> usize {
    4
}

fn default_title_budget_ms() -> u64 {
    250
}

fn default_database_url() -> String {
    "sqlite://patterns.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_input() -> String {
    "titles.txt".to_string()
}

fn default_output() -> String {
    "results.jsonl".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            workers: default_workers(),
            title_budget_ms: default_title_budget_ms(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            database_url: default_database_url(),
            seed_if_empty: true,
            seed_file: None,
        }
    }
}

impl Default for IoSettings {
    fn default() -> Self {
        IoSettings {
            input: default_input(),
            output: default_output(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// The per-title budget as a `Duration`.
    pub fn title_budget(&self) -> Duration {
        Duration::from_millis(self.pipeline.title_budget_ms)
    }
}
