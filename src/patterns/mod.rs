//! Pattern library: record model, compiled patterns, and in-memory indexes.
//!
//! The library is loaded once per run from a [`store::PatternStore`] backend,
//! compiled, and shared read-only across workers. Two indexes are kept
//! separate on purpose: the ordered match lists give deterministic priority,
//! the alias→term map gives O(1) canonicalisation.

pub mod seed;
pub mod store;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::text;
use crate::types::{DateFormat, MillError};

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Kind of a pattern record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    MarketTerm,
    DatePattern,
    ReportTypeDictionary,
    GeographicEntity,
    Separator,
    CleanupRule,
}

impl PatternType {
    /// All known pattern types (useful for iteration).
    pub const ALL: &'static [PatternType] = &[
        PatternType::MarketTerm,
        PatternType::DatePattern,
        PatternType::ReportTypeDictionary,
        PatternType::GeographicEntity,
        PatternType::Separator,
        PatternType::CleanupRule,
    ];
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternType::MarketTerm => "market_term",
            PatternType::DatePattern => "date_pattern",
            PatternType::ReportTypeDictionary => "report_type_dictionary",
            PatternType::GeographicEntity => "geographic_entity",
            PatternType::Separator => "separator",
            PatternType::CleanupRule => "cleanup_rule",
        };
        write!(f, "{s}")
    }
}

/// Role of a record inside the report-type dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictRole {
    PrimaryKeyword,
    SecondaryKeyword,
    Separator,
    BoundaryMarker,
}

impl std::str::FromStr for DictRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_keyword" => Ok(DictRole::PrimaryKeyword),
            "secondary_keyword" => Ok(DictRole::SecondaryKeyword),
            "separator" => Ok(DictRole::Separator),
            "boundary_marker" => Ok(DictRole::BoundaryMarker),
            _ => Err(anyhow::anyhow!("Unknown dictionary role: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern record
// ---------------------------------------------------------------------------

fn default_active() -> bool {
    true
}

/// One pattern document as stored in the external document store.
///
/// Unknown fields in stored documents are ignored on read. The counters and
/// `curation_notes` are observational metadata and never drive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub term: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub archived_aliases: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub format_type: Option<DateFormat>,
    #[serde(default)]
    pub curation_notes: Option<String>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PatternRecord {
    /// Minimal record; refine with the `with_*` builders.
    pub fn new(pattern_type: PatternType, term: impl Into<String>) -> Self {
        PatternRecord {
            pattern_type,
            term: term.into(),
            aliases: Vec::new(),
            archived_aliases: Vec::new(),
            pattern: None,
            priority: 0,
            subtype: None,
            active: true,
            format_type: None,
            curation_notes: None,
            success_count: 0,
            failure_count: 0,
            last_updated: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_archived_aliases(mut self, archived: &[&str]) -> Self {
        self.archived_aliases = archived.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_format(mut self, format: DateFormat) -> Self {
        self.format_type = Some(format);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.curation_notes = Some(notes.into());
        self
    }

    /// Parsed dictionary role, when this record belongs to the
    /// report-type dictionary and carries a recognised subtype.
    pub fn dict_role(&self) -> Option<DictRole> {
        if self.pattern_type != PatternType::ReportTypeDictionary {
            return None;
        }
        self.subtype.as_deref().and_then(|s| s.parse().ok())
    }

    /// Surfaces that may match: the term plus non-archived aliases.
    pub fn active_surfaces(&self) -> Vec<&str> {
        let mut surfaces = vec![self.term.as_str()];
        for alias in &self.aliases {
            if !self
                .archived_aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(alias))
            {
                surfaces.push(alias.as_str());
            }
        }
        surfaces
    }
}

// ---------------------------------------------------------------------------
// Compiled pattern
// ---------------------------------------------------------------------------

/// A pattern record with its regex compiled once at load time.
pub struct CompiledPattern {
    pub record: PatternRecord,
    pub regex: Regex,
}

// Manual Debug: the compiled Regex prints better as its source string.
impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("type", &self.record.pattern_type)
            .field("term", &self.record.term)
            .field("priority", &self.record.priority)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

impl CompiledPattern {
    /// Compile a record. An explicit `pattern` field is used verbatim
    /// (case-insensitive unless it sets its own flags); otherwise a
    /// word-bounded alternation over term + active aliases is built.
    pub fn compile(record: PatternRecord) -> Result<Self, MillError> {
        let source = match &record.pattern {
            Some(p) if p.starts_with("(?") => p.clone(),
            Some(p) => format!("(?i){p}"),
            None => text::literal_alternation(&record.active_surfaces()),
        };
        let regex = Regex::new(&source).map_err(|e| MillError::InvalidPattern {
            term: record.term.clone(),
            message: e.to_string(),
        })?;
        Ok(CompiledPattern { record, regex })
    }
}

// ---------------------------------------------------------------------------
// Pattern library
// ---------------------------------------------------------------------------

/// Immutable, in-memory view of the pattern store.
///
/// Constructed once at startup and shared by reference across all stages
/// and workers; per-title work never touches the store again.
#[derive(Debug)]
pub struct PatternLibrary {
    by_type: HashMap<PatternType, Vec<Arc<CompiledPattern>>>,
    alias_index: HashMap<(PatternType, String), String>,
    boundary: Arc<CompiledPattern>,
}

impl PatternLibrary {
    /// Build the library from raw records.
    ///
    /// Inactive records are dropped. Records whose regex fails to compile
    /// are logged and skipped; a missing `Market` boundary marker is fatal.
    pub fn from_records(records: Vec<PatternRecord>) -> Result<Self, MillError> {
        let mut by_type: HashMap<PatternType, Vec<Arc<CompiledPattern>>> = HashMap::new();
        let mut alias_index: HashMap<(PatternType, String), String> = HashMap::new();
        let mut seen_keys: std::collections::HashSet<(PatternType, String, Option<String>)> =
            std::collections::HashSet::new();
        let mut skipped = 0usize;

        for record in records {
            if !record.active {
                debug!(term = %record.term, "Skipping inactive pattern");
                continue;
            }

            let key = (
                record.pattern_type,
                record.term.to_lowercase(),
                record.subtype.clone(),
            );
            if !seen_keys.insert(key) {
                warn!(
                    pattern_type = %record.pattern_type,
                    term = %record.term,
                    "Duplicate (type, term, subtype) record skipped"
                );
                skipped += 1;
                continue;
            }

            let compiled = match CompiledPattern::compile(record) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "Pattern failed to compile, skipped");
                    skipped += 1;
                    continue;
                }
            };

            let record = &compiled.record;
            for surface in record.active_surfaces() {
                let key = (record.pattern_type, surface.to_lowercase());
                if let Some(existing) = alias_index.get(&key) {
                    if existing != &record.term {
                        warn!(
                            surface,
                            existing = %existing,
                            term = %record.term,
                            "Alias collision, keeping first mapping"
                        );
                    }
                } else {
                    alias_index.insert(key, record.term.clone());
                }
            }

            by_type
                .entry(compiled.record.pattern_type)
                .or_default()
                .push(Arc::new(compiled));
        }

        // Canonical ordering: priority asc, then longer terms, then lex.
        for patterns in by_type.values_mut() {
            patterns.sort_by(|a, b| {
                a.record
                    .priority
                    .cmp(&b.record.priority)
                    .then(b.record.term.len().cmp(&a.record.term.len()))
                    .then(a.record.term.cmp(&b.record.term))
            });
        }

        let boundary = by_type
            .get(&PatternType::ReportTypeDictionary)
            .and_then(|patterns| {
                patterns
                    .iter()
                    .find(|p| {
                        p.record.dict_role() == Some(DictRole::BoundaryMarker)
                            && p.record.term.eq_ignore_ascii_case("Market")
                    })
                    .cloned()
            })
            .ok_or(MillError::MissingBoundaryMarker)?;

        if skipped > 0 {
            warn!(skipped, "Some pattern records were skipped during load");
        }

        Ok(PatternLibrary {
            by_type,
            alias_index,
            boundary,
        })
    }

    /// Active patterns of a type, in canonical priority order.
    pub fn patterns_for(&self, pattern_type: PatternType) -> &[Arc<CompiledPattern>] {
        self.by_type
            .get(&pattern_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Report-type dictionary patterns carrying the given role.
    pub fn dictionary_with_role(&self, role: DictRole) -> Vec<&Arc<CompiledPattern>> {
        self.patterns_for(PatternType::ReportTypeDictionary)
            .iter()
            .filter(|p| p.record.dict_role() == Some(role))
            .collect()
    }

    /// The distinguished `Market` boundary-marker pattern.
    pub fn boundary_marker(&self) -> &CompiledPattern {
        &self.boundary
    }

    /// Canonicalise a surface form to its term. Archived aliases never
    /// appear in the index, so they resolve to None.
    pub fn resolve_alias(&self, pattern_type: PatternType, surface: &str) -> Option<&str> {
        self.alias_index
            .get(&(pattern_type, surface.trim().to_lowercase()))
            .map(|s| s.as_str())
    }

    /// Total number of loaded patterns.
    pub fn len(&self) -> usize {
        self.by_type.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (type, count) pairs for startup logging.
    pub fn type_counts(&self) -> Vec<(PatternType, usize)> {
        let mut counts: Vec<(PatternType, usize)> = PatternType::ALL
            .iter()
            .filter_map(|t| self.by_type.get(t).map(|v| (*t, v.len())))
            .collect();
        counts.sort_by_key(|(_, n)| std::cmp::Reverse(*n));
        counts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
