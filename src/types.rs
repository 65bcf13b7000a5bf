//! Shared types for the TITLEMILL pipeline.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that pattern, stage, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market term classification
// ---------------------------------------------------------------------------

/// Classification of the market-term phrase found in a title.
///
/// `Standard` titles have no prepositional market phrase; the other three
/// switch the report-type extractor into its context-preserving workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTermType {
    Standard,
    MarketFor,
    MarketIn,
    MarketBy,
}

impl MarketTermType {
    /// All known term types (useful for iteration).
    pub const ALL: &'static [MarketTermType] = &[
        MarketTermType::Standard,
        MarketTermType::MarketFor,
        MarketTermType::MarketIn,
        MarketTermType::MarketBy,
    ];

    /// The canonical market phrase, e.g. `"Market in"`. None for standard.
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            MarketTermType::Standard => None,
            MarketTermType::MarketFor => Some("Market for"),
            MarketTermType::MarketIn => Some("Market in"),
            MarketTermType::MarketBy => Some("Market by"),
        }
    }

    /// The connector word (`for` / `in` / `by`) that must be carried into
    /// the rebuilt title. None for standard.
    pub fn connector(&self) -> Option<&'static str> {
        match self {
            MarketTermType::Standard => None,
            MarketTermType::MarketFor => Some("for"),
            MarketTermType::MarketIn => Some("in"),
            MarketTermType::MarketBy => Some("by"),
        }
    }

    /// Whether this title needs the context-preserving report-type workflow.
    pub fn is_market_term(&self) -> bool {
        !matches!(self, MarketTermType::Standard)
    }
}

impl fmt::Display for MarketTermType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTermType::Standard => write!(f, "standard"),
            MarketTermType::MarketFor => write!(f, "market_for"),
            MarketTermType::MarketIn => write!(f, "market_in"),
            MarketTermType::MarketBy => write!(f, "market_by"),
        }
    }
}

impl std::str::FromStr for MarketTermType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(MarketTermType::Standard),
            "market_for" | "market for" => Ok(MarketTermType::MarketFor),
            "market_in" | "market in" => Ok(MarketTermType::MarketIn),
            "market_by" | "market by" => Ok(MarketTermType::MarketBy),
            _ => Err(anyhow::anyhow!("Unknown market term type: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Date extraction enums
// ---------------------------------------------------------------------------

/// Surface format family of a date pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    TerminalComma,
    Range,
    Bracket,
    Parenthesis,
    Embedded,
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DateFormat::TerminalComma => "terminal_comma",
            DateFormat::Range => "range",
            DateFormat::Bracket => "bracket",
            DateFormat::Parenthesis => "parenthesis",
            DateFormat::Embedded => "embedded",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the date extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStatus {
    Success,
    NoDatesPresent,
    DatesMissed,
}

impl fmt::Display for DateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DateStatus::Success => "success",
            DateStatus::NoDatesPresent => "no_dates_present",
            DateStatus::DatesMissed => "dates_missed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Pipeline status
// ---------------------------------------------------------------------------

/// Terminal status of a single title's run through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    Timeout,
    InvalidInput,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Ok => "ok",
            PipelineStatus::Timeout => "timeout",
            PipelineStatus::InvalidInput => "invalid_input",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Stage results
// ---------------------------------------------------------------------------

/// Result of the classifier. The title is labelled, never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub title: String,
    pub market_term_type: MarketTermType,
    pub confidence: f64,
    pub matched_phrase: Option<String>,
}

/// Result of the date extractor. `title` is the cleaned title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateResult {
    pub title: String,
    pub extracted_date_range: Option<String>,
    pub confidence: f64,
    pub format_type: Option<DateFormat>,
    pub status: DateStatus,
}

/// Result of the report-type extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTypeResult {
    pub title: String,
    pub extracted_report_type: Option<String>,
    pub confidence: f64,
    pub keywords_found: Vec<String>,
    pub market_boundary_detected: bool,
}

/// Result of the geographic extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographicResult {
    pub title: String,
    /// Canonical terms in first-occurrence order, no duplicates.
    pub extracted_regions: Vec<String>,
    pub confidence: f64,
    pub notes: Vec<String>,
}

/// Result of the topic normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResult {
    pub topic: String,
    /// Slug form: lowercase letters, digits, and `-`.
    pub topic_name: String,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Pipeline result
// ---------------------------------------------------------------------------

/// Per-stage confidence scores, all in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ConfidenceScores {
    pub classification: f64,
    pub date: f64,
    pub report_type: f64,
    pub geographic: f64,
    pub topic: f64,
}

impl ConfidenceScores {
    /// Lowest score across the five stages.
    pub fn floor(&self) -> f64 {
        self.classification
            .min(self.date)
            .min(self.report_type)
            .min(self.geographic)
            .min(self.topic)
    }
}

/// Aggregated output of the full pipeline for one title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub original_title: String,
    pub market_term_type: MarketTermType,
    pub extracted_date_range: Option<String>,
    pub extracted_report_type: Option<String>,
    pub extracted_regions: Vec<String>,
    pub topic: String,
    pub topic_name: String,
    pub confidence_scores: ConfidenceScores,
    pub processing_notes: Vec<String>,
    pub status: PipelineStatus,
    pub processed_at: DateTime<Utc>,
}

impl PipelineResult {
    /// Build a terminal result for input that failed validation.
    pub fn invalid_input(title: &str, note: impl Into<String>) -> Self {
        PipelineResult {
            original_title: title.to_string(),
            market_term_type: MarketTermType::Standard,
            extracted_date_range: None,
            extracted_report_type: None,
            extracted_regions: Vec::new(),
            topic: String::new(),
            topic_name: String::new(),
            confidence_scores: ConfidenceScores::default(),
            processing_notes: vec![note.into()],
            status: PipelineStatus::InvalidInput,
            processed_at: Utc::now(),
        }
    }

    /// Whether the title completed every stage.
    pub fn is_ok(&self) -> bool {
        self.status == PipelineStatus::Ok
    }
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] term={} date={} type={} regions={} topic={:?}",
            self.status,
            self.market_term_type,
            self.extracted_date_range.as_deref().unwrap_or("-"),
            self.extracted_report_type.as_deref().unwrap_or("-"),
            self.extracted_regions.len(),
            self.topic,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TITLEMILL.
#[derive(Debug, thiserror::Error)]
pub enum MillError {
    #[error("Pattern store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("Pattern library has no 'Market' boundary-marker record")]
    MissingBoundaryMarker,

    #[error("Invalid pattern '{term}': {message}")]
    InvalidPattern { term: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stage error ({stage}): {message}")]
    Stage { stage: String, message: String },

    #[error("Processing budget exceeded")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
