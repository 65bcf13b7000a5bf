//! Pattern store backends.
//!
//! The external document store is abstracted behind the [`PatternStore`]
//! trait; the pipeline only ever asks for the full set of pattern documents
//! once, at startup. Two backends are provided: SQLite (one JSON document
//! per row, the production stand-in) and a plain JSON array file used for
//! seed files and tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{PatternLibrary, PatternRecord};

/// Read access to the external pattern document store.
///
/// Implementors return every stored document; filtering (active flags,
/// compilation) happens in [`PatternLibrary::from_records`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Fetch all pattern documents. An error here is fatal to the run.
    async fn fetch_patterns(&self) -> Result<Vec<PatternRecord>>;
}

/// Fetch from the store and build the in-memory library.
///
/// Fails fast when the store is unreachable or the boundary-marker record
/// is missing; individual malformed documents were already dropped by the
/// backend, and non-compiling regexes are skipped with a warning.
pub async fn load_library(store: &dyn PatternStore) -> Result<PatternLibrary> {
    let records = store
        .fetch_patterns()
        .await
        .context("Pattern store unreachable at load")?;
    let total = records.len();
    let library = PatternLibrary::from_records(records)?;

    info!(
        documents = total,
        patterns = library.len(),
        "Pattern library loaded"
    );
    for (pattern_type, count) in library.type_counts() {
        debug!(%pattern_type, count, "Pattern type loaded");
    }
    Ok(library)
}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patterns (
    id  INTEGER PRIMARY KEY AUTOINCREMENT,
    doc TEXT NOT NULL
)
"#;

/// SQLite-backed store: one JSON pattern document per row.
pub struct SqlitePatternStore {
    pool: SqlitePool,
}

impl SqlitePatternStore {
    /// Connect (creating the file and schema if missing).
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid store URL: {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open pattern store: {url}"))?;
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to initialise pattern store schema")?;
        Ok(SqlitePatternStore { pool })
    }

    /// Number of stored documents.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM patterns")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count pattern documents")?;
        Ok(row.get::<i64, _>("n"))
    }

    /// Insert a batch of records (used for first-run seeding and by
    /// curation tooling). Returns the number inserted.
    pub async fn insert_all(&self, records: &[PatternRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        for record in records {
            let doc = serde_json::to_string(record)
                .with_context(|| format!("Failed to serialise pattern '{}'", record.term))?;
            sqlx::query("INSERT INTO patterns (doc) VALUES (?1)")
                .bind(doc)
                .execute(&mut *tx)
                .await
                .context("Failed to insert pattern document")?;
        }
        tx.commit().await.context("Failed to commit pattern batch")?;
        Ok(records.len() as u64)
    }
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    async fn fetch_patterns(&self) -> Result<Vec<PatternRecord>> {
        let rows = sqlx::query("SELECT doc FROM patterns ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch pattern documents")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: String = row.get("doc");
            match serde_json::from_str::<PatternRecord>(&doc) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Malformed pattern document skipped"),
            }
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// JSON file backend
// ---------------------------------------------------------------------------

/// JSON-array-file store, for seed files and tests.
pub struct JsonPatternStore {
    path: PathBuf,
}

impl JsonPatternStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonPatternStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write records out as a pretty-printed JSON array.
    pub fn save(path: impl AsRef<Path>, records: &[PatternRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .context("Failed to serialise pattern records")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }
}

#[async_trait]
impl PatternStore for JsonPatternStore {
    async fn fetch_patterns(&self) -> Result<Vec<PatternRecord>> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let records: Vec<PatternRecord> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
