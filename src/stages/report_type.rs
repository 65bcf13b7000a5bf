//! Report-type extractor: dictionary keywords around the Market anchor.
//!
//! Scans the title for report-type dictionary keywords, selects the
//! contiguous span around the `Market` boundary marker, and removes it
//! while preserving topic content (acronyms, technical terms) that sits
//! between accepted keywords. Titles classified with a prepositional
//! market phrase go through a context-preserving variant that keeps the
//! preposition and its object in the remaining title.

use std::sync::Arc;

use crate::patterns::{DictRole, PatternLibrary, PatternType};
use crate::text;
use crate::types::{ClassificationResult, MillError, ReportTypeResult};

use super::CancelToken;

/// Confidence when at least one non-Market keyword joined the span.
const FULL_CONFIDENCE: f64 = 0.9;

/// Confidence when the span is the bare boundary marker.
const MARKET_ONLY_CONFIDENCE: f64 = 0.6;

/// A gap between accepted keywords may carry at most this many content
/// tokens; the tokens are preserved into the remaining title. Longer gaps
/// end the span so topic phrases are never pulled into the report type.
const MAX_GAP_CONTENT_TOKENS: usize = 2;

pub struct ReportTypeExtractor {
    library: Arc<PatternLibrary>,
}

// ---------------------------------------------------------------------------
// Keyword detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct KeywordHit {
    start: usize,
    end: usize,
    surface: String,
    term: String,
    is_boundary: bool,
}

/// How a gap between two keyword occurrences reads.
enum Gap {
    /// Whitespace, separator characters, and separator words only.
    SeparatorOnly,
    /// Bounded content (acronyms, short technical terms) to preserve.
    Content(Vec<String>),
    /// Real topic text; the span ends here.
    Blocked,
}

fn classify_gap(gap: &str) -> Gap {
    if text::is_separator_only(gap) {
        return Gap::SeparatorOnly;
    }
    let tokens = text::content_tokens(gap);
    if tokens.len() <= MAX_GAP_CONTENT_TOKENS {
        Gap::Content(tokens)
    } else {
        Gap::Blocked
    }
}

/// Whether any gap in the accepted span carries a punctuation separator
/// (comma, semicolon, dash, pipe, colon). When one does, every joiner in
/// the reconstruction normalizes to a single space; otherwise a literal
/// `&`/`+` between two keywords survives.
fn gap_has_punctuation(gap: &str) -> bool {
    gap.split_whitespace().any(|tok| {
        text::is_separator_token(tok)
            && tok
                .chars()
                .any(|c| matches!(c, ',' | ';' | '-' | '–' | '—' | '|' | ':'))
    })
}

/// The `&`/`+` joiner of a pure-conjunction gap, if that is all it holds.
fn gap_conjunction(gap: &str) -> Option<&'static str> {
    match gap.trim() {
        "&" => Some("&"),
        "+" => Some("+"),
        _ => None,
    }
}

impl ReportTypeExtractor {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        ReportTypeExtractor { library }
    }

    /// Run the extraction. `classification` decides the workflow; the
    /// cancel token is checked once keyword detection is done.
    pub fn extract(
        &self,
        title: &str,
        classification: &ClassificationResult,
        cancel: &CancelToken,
    ) -> Result<ReportTypeResult, MillError> {
        if classification.market_term_type.is_market_term() {
            self.extract_market_term(title, classification, cancel)
        } else {
            self.extract_standard(title, cancel)
        }
    }

    /// All dictionary keyword occurrences (separator records excluded),
    /// ordered by position, overlaps dropped in favour of earlier/longer.
    fn detect_keywords(&self, title: &str) -> Vec<KeywordHit> {
        let mut hits: Vec<KeywordHit> = Vec::new();
        for pattern in self.library.patterns_for(PatternType::ReportTypeDictionary) {
            if pattern.record.dict_role() == Some(DictRole::Separator) {
                continue;
            }
            let is_boundary = pattern.record.dict_role() == Some(DictRole::BoundaryMarker);
            for m in pattern.regex.find_iter(title) {
                hits.push(KeywordHit {
                    start: m.start(),
                    end: m.end(),
                    surface: m.as_str().to_string(),
                    term: pattern.record.term.clone(),
                    is_boundary,
                });
            }
        }
        hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut kept: Vec<KeywordHit> = Vec::new();
        for hit in hits {
            if kept.last().is_none_or(|prev| hit.start >= prev.end) {
                kept.push(hit);
            }
        }
        kept
    }

    // -- Standard workflow ------------------------------------------------

    fn extract_standard(
        &self,
        title: &str,
        cancel: &CancelToken,
    ) -> Result<ReportTypeResult, MillError> {
        let hits = self.detect_keywords(title);
        if cancel.expired() {
            return Err(MillError::Cancelled);
        }

        let Some(anchor) = hits.iter().position(|h| h.is_boundary) else {
            return Ok(ReportTypeResult {
                title: title.to_string(),
                extracted_report_type: None,
                confidence: 0.0,
                keywords_found: Vec::new(),
                market_boundary_detected: false,
            });
        };

        // Rightward span selection from the anchor.
        let mut right = anchor;
        let mut gap_contents: Vec<String> = Vec::new();
        while right + 1 < hits.len() {
            let gap = &title[hits[right].end..hits[right + 1].start];
            match classify_gap(gap) {
                Gap::SeparatorOnly => right += 1,
                Gap::Content(tokens) => {
                    gap_contents.push(tokens.join(" "));
                    right += 1;
                }
                Gap::Blocked => break,
            }
        }

        // Leftward: only separator-only gaps admit a preceding keyword.
        let mut left = anchor;
        while left > 0 {
            let gap = &title[hits[left - 1].end..hits[left].start];
            if text::is_separator_only(gap) {
                left -= 1;
            } else {
                break;
            }
        }

        let accepted = &hits[left..=right];
        let extracted = reconstruct(title, accepted, &[]);
        let remaining = rebuild_remaining(
            &title[..accepted[0].start],
            &gap_contents,
            &title[accepted[accepted.len() - 1].end..],
        );

        let non_market = accepted.iter().filter(|h| !h.is_boundary).count();
        Ok(ReportTypeResult {
            title: remaining,
            extracted_report_type: Some(extracted),
            confidence: if non_market > 0 {
                FULL_CONFIDENCE
            } else {
                MARKET_ONLY_CONFIDENCE
            },
            keywords_found: accepted.iter().map(|h| h.term.clone()).collect(),
            market_boundary_detected: true,
        })
    }

    // -- Market-term workflow ---------------------------------------------

    /// The report type excludes the preposition and its object; both are
    /// rebuilt into the remaining title so the topic keeps its context.
    fn extract_market_term(
        &self,
        title: &str,
        classification: &ClassificationResult,
        cancel: &CancelToken,
    ) -> Result<ReportTypeResult, MillError> {
        let Some(phrase) = classification.market_term_type.phrase() else {
            return self.extract_standard(title, cancel);
        };
        let Some(pattern) = self
            .library
            .patterns_for(PatternType::MarketTerm)
            .iter()
            .find(|p| p.record.term == phrase)
        else {
            return self.extract_standard(title, cancel);
        };
        let Some(phrase_match) = pattern.regex.find(title) else {
            return self.extract_standard(title, cancel);
        };

        let hits = self.detect_keywords(title);
        if cancel.expired() {
            return Err(MillError::Cancelled);
        }

        // Object of the preposition: forward from the phrase up to the
        // first keyword occurrence, or end of string.
        let context_end = hits
            .iter()
            .find(|h| h.start >= phrase_match.end())
            .map(|h| h.start)
            .unwrap_or(title.len());
        let market_context = strip_orphan_separators(&title[phrase_match.end()..context_end]);

        // Keywords left of the phrase joined by separator-only gaps are
        // report-type material too (the standard leftward rule).
        let left_of_phrase: Vec<&KeywordHit> =
            hits.iter().filter(|h| h.end <= phrase_match.start()).collect();
        let mut left_accepted: Vec<&KeywordHit> = Vec::new();
        let mut cursor = phrase_match.start();
        for hit in left_of_phrase.iter().rev() {
            if text::is_separator_only(&title[hit.end..cursor]) {
                left_accepted.insert(0, *hit);
                cursor = hit.start;
            } else {
                break;
            }
        }

        // Rightward acceptance over keywords past the object.
        let right_hits: Vec<&KeywordHit> =
            hits.iter().filter(|h| h.start >= context_end).collect();
        let mut accepted: Vec<&KeywordHit> = Vec::new();
        let mut gap_contents: Vec<String> = Vec::new();
        for (i, hit) in right_hits.iter().enumerate() {
            if i == 0 {
                accepted.push(*hit);
                continue;
            }
            let gap = &title[right_hits[i - 1].end..hit.start];
            match classify_gap(gap) {
                Gap::SeparatorOnly => accepted.push(*hit),
                Gap::Content(tokens) => {
                    gap_contents.push(tokens.join(" "));
                    accepted.push(*hit);
                }
                Gap::Blocked => break,
            }
        }

        let span: Vec<KeywordHit> = left_accepted
            .iter()
            .chain(accepted.iter())
            .map(|h| (*h).clone())
            .collect();
        let extracted = reconstruct(title, &span, &["Market"]);

        let prefix_end = left_accepted
            .first()
            .map(|h| h.start)
            .unwrap_or(phrase_match.start());
        let after = accepted
            .last()
            .map(|h| &title[h.end..])
            .unwrap_or(&title[context_end..]);

        let connector = classification.market_term_type.connector().unwrap_or("");
        let remaining = rebuild_remaining(
            &format!("{} {} {}", &title[..prefix_end], connector, market_context),
            &gap_contents,
            after,
        );

        let keywords_found: Vec<String> = std::iter::once("Market".to_string())
            .chain(span.iter().map(|h| h.term.clone()))
            .collect();
        Ok(ReportTypeResult {
            title: remaining,
            extracted_report_type: Some(extracted),
            confidence: if span.is_empty() {
                MARKET_ONLY_CONFIDENCE
            } else {
                FULL_CONFIDENCE
            },
            keywords_found,
            market_boundary_detected: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Join accepted keywords in textual order, title-cased, with separators
/// normalized; `prepend` slots synthetic words (the market-term workflow's
/// `Market`) ahead of the span.
fn reconstruct(title: &str, accepted: &[KeywordHit], prepend: &[&str]) -> String {
    let punctuated = accepted.windows(2).any(|pair| {
        gap_has_punctuation(&title[pair[0].end..pair[1].start])
    });

    let mut parts: Vec<String> = prepend.iter().map(|s| s.to_string()).collect();
    for (i, hit) in accepted.iter().enumerate() {
        if i > 0 && !punctuated {
            let gap = &title[accepted[i - 1].end..hit.start];
            if let Some(conj) = gap_conjunction(gap) {
                parts.push(conj.to_string());
            }
        }
        parts.push(text::title_case(&hit.surface));
    }

    // Adjacent duplicates collapse ("Market Market" → "Market").
    let mut deduped: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        if deduped
            .last()
            .is_none_or(|prev| !prev.eq_ignore_ascii_case(&part))
        {
            deduped.push(part);
        }
    }
    deduped.join(" ")
}

/// Remaining title: non-accepted prefix, preserved gap content in textual
/// order, non-accepted suffix. Only removal-induced artifacts are cleaned;
/// topic words (including single-letter ones) are left for later stages.
fn rebuild_remaining(before: &str, gap_contents: &[String], after: &str) -> String {
    let raw = format!("{} {} {}", before, gap_contents.join(" "), after);
    let squeezed = text::squeeze_double_separators(&raw);
    strip_orphan_separators(&squeezed)
}

/// Edge-trim separator characters and drop orphan separator tokens/words
/// at either end.
fn strip_orphan_separators(s: &str) -> String {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || text::is_separator_char(c));
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let is_orphan = |tok: &str| text::is_separator_token(tok) || text::is_separator_word(tok);
    let start = tokens.iter().position(|t| !is_orphan(t));
    let end = tokens.iter().rposition(|t| !is_orphan(t));
    match (start, end) {
        (Some(s), Some(e)) => tokens[s..=e].join(" "),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
