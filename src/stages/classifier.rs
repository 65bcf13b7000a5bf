//! Classifier: market-term detection.
//!
//! Labels a title as `standard` or as carrying one of the prepositional
//! market phrases (`Market for` / `Market in` / `Market by`) that switch
//! the report-type extractor into its context-preserving workflow. The
//! title itself is never modified here.

use std::sync::Arc;
use tracing::debug;

use crate::patterns::{PatternLibrary, PatternType};
use crate::types::{ClassificationResult, MarketTermType};

/// Confidence on a positive market-term match.
const MATCH_CONFIDENCE: f64 = 0.95;

/// Confidence when no phrase is present (standard is the certain default).
const STANDARD_CONFIDENCE: f64 = 1.0;

pub struct Classifier {
    library: Arc<PatternLibrary>,
}

impl Classifier {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Classifier { library }
    }

    /// Label the title. First matching phrase in priority order wins.
    ///
    /// Phrase regexes are word-bounded on both ends, so `Aftermarket` never
    /// anchors a match and `Market forecast` never passes as `Market for`.
    pub fn classify(&self, title: &str) -> ClassificationResult {
        for pattern in self.library.patterns_for(PatternType::MarketTerm) {
            let Some(m) = pattern.regex.find(title) else {
                continue;
            };
            let Ok(term_type) = pattern.record.term.parse::<MarketTermType>() else {
                debug!(term = %pattern.record.term, "Unrecognised market-term record");
                continue;
            };
            return ClassificationResult {
                title: title.to_string(),
                market_term_type: term_type,
                confidence: MATCH_CONFIDENCE,
                matched_phrase: Some(m.as_str().to_string()),
            };
        }

        ClassificationResult {
            title: title.to_string(),
            market_term_type: MarketTermType::Standard,
            confidence: STANDARD_CONFIDENCE,
            matched_phrase: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
