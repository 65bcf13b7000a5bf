//! Per-title pipeline orchestration.
//!
//! Runs the five stages sequentially over one title, enforcing the budget
//! cooperatively and converting stage failures into notes rather than
//! letting them cross the pipeline boundary. Later stages always run on
//! the last successful remaining title.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::patterns::PatternLibrary;
use crate::stages::classifier::Classifier;
use crate::stages::dates::DateExtractor;
use crate::stages::geography::GeographicExtractor;
use crate::stages::report_type::ReportTypeExtractor;
use crate::stages::topic::TopicNormalizer;
use crate::stages::CancelToken;
use crate::types::{
    ConfidenceScores, DateStatus, MillError, PipelineResult, PipelineStatus,
};

/// Default per-title processing budget.
pub const DEFAULT_TITLE_BUDGET: Duration = Duration::from_millis(250);

/// Inputs beyond this length are accepted; this is only a log hint.
const LONG_TITLE_HINT: usize = 512;

pub struct TitlePipeline {
    classifier: Classifier,
    dates: DateExtractor,
    report_type: ReportTypeExtractor,
    geography: GeographicExtractor,
    topic: TopicNormalizer,
    budget: Duration,
}

impl TitlePipeline {
    /// Build a pipeline over a shared pattern library.
    pub fn new(library: Arc<PatternLibrary>, budget: Duration) -> Self {
        TitlePipeline {
            classifier: Classifier::new(library.clone()),
            dates: DateExtractor::new(library.clone()),
            report_type: ReportTypeExtractor::new(library.clone()),
            geography: GeographicExtractor::new(library.clone()),
            topic: TopicNormalizer::new(library),
            budget,
        }
    }

    /// Process one title through all five stages.
    ///
    /// Never panics and never returns an error: invalid input, timeouts,
    /// and stage failures all surface as fields of the result.
    pub fn process(&self, title: &str) -> PipelineResult {
        if let Err(reason) = validate_input(title) {
            return PipelineResult::invalid_input(title, reason);
        }
        if title.len() > LONG_TITLE_HINT {
            debug!(len = title.len(), "Unusually long title accepted");
        }

        let cancel = CancelToken::with_budget(self.budget);
        let mut scores = ConfidenceScores::default();
        let mut notes: Vec<String> = Vec::new();
        let mut status = PipelineStatus::Ok;

        let mut extracted_date_range = None;
        let mut extracted_report_type = None;
        let mut extracted_regions = Vec::new();
        let mut topic = String::new();
        let mut topic_name = String::new();

        // Classification labels only; the title is untouched.
        let classification = self.classifier.classify(title);
        scores.classification = classification.confidence;
        let mut remaining = title.to_string();

        'stages: {
            // Date extraction.
            if cancel.expired() {
                status = PipelineStatus::Timeout;
                notes.push("budget exceeded before date extraction".to_string());
                break 'stages;
            }
            let date = self.dates.extract(&remaining);
            scores.date = date.confidence;
            if date.status == DateStatus::DatesMissed {
                notes.push("year candidate present but no date pattern matched".to_string());
            }
            extracted_date_range = date.extracted_date_range;
            remaining = date.title;

            // Report type.
            if cancel.expired() {
                status = PipelineStatus::Timeout;
                notes.push("budget exceeded before report-type extraction".to_string());
                break 'stages;
            }
            match self.report_type.extract(&remaining, &classification, &cancel) {
                Ok(report) => {
                    scores.report_type = report.confidence;
                    if !report.market_boundary_detected {
                        notes.push("no Market boundary detected".to_string());
                    }
                    extracted_report_type = report.extracted_report_type;
                    remaining = report.title;
                }
                Err(MillError::Cancelled) => {
                    status = PipelineStatus::Timeout;
                    notes.push("budget exceeded during report-type extraction".to_string());
                    break 'stages;
                }
                Err(e) => {
                    notes.push(format!("report-type stage failed: {e}"));
                }
            }

            // Geography.
            if cancel.expired() {
                status = PipelineStatus::Timeout;
                notes.push("budget exceeded before geographic extraction".to_string());
                break 'stages;
            }
            match self.geography.extract(&remaining, &cancel) {
                Ok(geo) => {
                    scores.geographic = geo.confidence;
                    extracted_regions = geo.extracted_regions;
                    notes.extend(geo.notes);
                    remaining = geo.title;
                }
                Err(MillError::Cancelled) => {
                    status = PipelineStatus::Timeout;
                    notes.push("budget exceeded during geographic extraction".to_string());
                    break 'stages;
                }
                Err(e) => {
                    notes.push(format!("geographic stage failed: {e}"));
                }
            }

            // Topic.
            if cancel.expired() {
                status = PipelineStatus::Timeout;
                notes.push("budget exceeded before topic normalization".to_string());
                break 'stages;
            }
            let topic_result = self.topic.normalize(&remaining);
            scores.topic = topic_result.confidence;
            if topic_result.topic.is_empty() {
                notes.push("empty topic flagged for review".to_string());
            }
            topic = topic_result.topic;
            topic_name = topic_result.topic_name;
        }

        PipelineResult {
            original_title: title.to_string(),
            market_term_type: classification.market_term_type,
            extracted_date_range,
            extracted_report_type,
            extracted_regions,
            topic,
            topic_name,
            confidence_scores: scores,
            processing_notes: notes,
            status,
            processed_at: Utc::now(),
        }
    }
}

/// A title must be non-empty and free of control characters other than
/// tab and newline. (UTF-8 validity is guaranteed by the `&str` boundary;
/// byte-level checks belong to the ingest edge.)
fn validate_input(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("empty title".to_string());
    }
    if let Some(c) = title
        .chars()
        .find(|c| c.is_control() && *c != '\t' && *c != '\n')
    {
        return Err(format!("control character U+{:04X} in title", c as u32));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{seed, PatternLibrary};
    use crate::types::MarketTermType;

    fn pipeline() -> TitlePipeline {
        let library = PatternLibrary::from_records(seed::builtin_patterns()).unwrap();
        TitlePipeline::new(Arc::new(library), DEFAULT_TITLE_BUDGET)
    }

    // -- Input validation --

    #[test]
    fn test_empty_input_rejected() {
        let result = pipeline().process("   ");
        assert_eq!(result.status, PipelineStatus::InvalidInput);
        assert!(result.processing_notes[0].contains("empty"));
    }

    #[test]
    fn test_control_character_rejected() {
        let result = pipeline().process("Widgets\u{0007} Market");
        assert_eq!(result.status, PipelineStatus::InvalidInput);
        assert!(result.processing_notes[0].contains("U+0007"));
    }

    #[test]
    fn test_tab_and_newline_accepted() {
        let result = pipeline().process("Widgets\tMarket\nReport");
        assert_eq!(result.status, PipelineStatus::Ok);
    }

    #[test]
    fn test_long_input_accepted() {
        let topic = "Very ".repeat(200);
        let result = pipeline().process(&format!("{topic}Market Report"));
        assert_eq!(result.status, PipelineStatus::Ok);
    }

    // -- Timeout --

    #[test]
    fn test_zero_budget_times_out_with_partial_result() {
        let library = PatternLibrary::from_records(seed::builtin_patterns()).unwrap();
        let pipeline = TitlePipeline::new(Arc::new(library), Duration::ZERO);
        let result = pipeline.process("Europe Widgets Market Report, 2030");
        assert_eq!(result.status, PipelineStatus::Timeout);
        // Classification completed before the budget check.
        assert!(result.confidence_scores.classification > 0.0);
        assert!(result.extracted_date_range.is_none());
        assert!(!result.processing_notes.is_empty());
    }

    // -- The "X Market" law --

    #[test]
    fn test_bare_market_law() {
        let result = pipeline().process("Underwater Basket Weaving Market");
        assert_eq!(result.status, PipelineStatus::Ok);
        assert_eq!(result.market_term_type, MarketTermType::Standard);
        assert_eq!(result.extracted_report_type.as_deref(), Some("Market"));
        assert!(result.extracted_date_range.is_none());
        assert!(result.extracted_regions.is_empty());
        assert_eq!(result.topic, "Underwater Basket Weaving");
    }

    // -- Stage flow --

    #[test]
    fn test_full_standard_flow() {
        let result = pipeline().process("APAC Personal Protective Equipment Market Analysis, 2024-2029");
        assert_eq!(result.status, PipelineStatus::Ok);
        assert_eq!(result.market_term_type, MarketTermType::Standard);
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2029"));
        assert_eq!(result.extracted_report_type.as_deref(), Some("Market Analysis"));
        assert_eq!(result.extracted_regions, vec!["Asia Pacific"]);
        assert_eq!(result.topic, "Personal Protective Equipment");
        assert_eq!(result.topic_name, "personal-protective-equipment");
    }

    #[test]
    fn test_notes_aggregate_across_stages() {
        // Dateless, no Market keyword, no regions: the notes say why the
        // result is thin without repeating the title.
        let result = pipeline().process("Quantum Ledger Technology Review");
        assert_eq!(result.status, PipelineStatus::Ok);
        assert!(result
            .processing_notes
            .iter()
            .any(|n| n.contains("no Market boundary")));
        for note in &result.processing_notes {
            assert!(!note.contains("Quantum Ledger"));
        }
    }

    #[test]
    fn test_empty_topic_is_flagged() {
        let result = pipeline().process("Europe Market Report");
        assert_eq!(result.topic, "");
        assert!((result.confidence_scores.topic - 0.3).abs() < f64::EPSILON);
        assert!(result
            .processing_notes
            .iter()
            .any(|n| n.contains("empty topic")));
    }
}
