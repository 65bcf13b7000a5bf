//! Geographic extractor: region removal with alias canonicalisation.
//!
//! Patterns are claimed in priority order (compound multi-word regions
//! first) over the stage input, then the title is rebuilt in a single pass:
//! claimed spans drop out together with their punctuation scaffolding, and
//! a separator word left dangling between two claims (`U.S. And Europe`)
//! is consumed with them. Residual cleanup then strips orphan prepositions
//! and separators from the ends.

use std::sync::Arc;

use crate::patterns::{PatternLibrary, PatternType};
use crate::text;
use crate::types::{GeographicResult, MillError};

use super::CancelToken;

/// Base confidence with at least one region and a clean residue.
const BASE_CONFIDENCE: f64 = 0.85;

/// Deduction per residual artifact cleaned after extraction.
const ARTIFACT_PENALTY: f64 = 0.05;

/// Confidence when no region matched (a valid outcome, not an error).
const NO_REGION_CONFIDENCE: f64 = 0.80;

/// Characters a claimed span expands over when it is removed.
const EXTENSION_CHARS: &[char] = &[',', ';', '-', '(', ')', '[', ']', '{', '}'];

pub struct GeographicExtractor {
    library: Arc<PatternLibrary>,
}

#[derive(Debug, Clone)]
struct Claim {
    start: usize,
    end: usize,
    term: String,
}

impl GeographicExtractor {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        GeographicExtractor { library }
    }

    /// Remove geographic entities and return the canonical list found.
    pub fn extract(
        &self,
        title: &str,
        cancel: &CancelToken,
    ) -> Result<GeographicResult, MillError> {
        let claims = self.claim_spans(title, cancel)?;

        // Canonical terms in first-occurrence order, no duplicates.
        let mut regions: Vec<String> = Vec::new();
        for claim in &claims {
            if !regions.contains(&claim.term) {
                regions.push(claim.term.clone());
            }
        }

        let mut notes: Vec<String> = Vec::new();
        let rebuilt = rebuild(title, &claims, &mut notes);
        let (cleaned, artifacts) = text::residual_cleanup(&rebuilt, true);
        if artifacts > 0 {
            notes.push(format!("{artifacts} residual artifact(s) cleaned"));
        }

        let confidence = if regions.is_empty() {
            NO_REGION_CONFIDENCE
        } else {
            (BASE_CONFIDENCE - ARTIFACT_PENALTY * artifacts as f64).max(0.0)
        };

        Ok(GeographicResult {
            title: cleaned,
            extracted_regions: regions,
            confidence,
            notes,
        })
    }

    /// Claim non-overlapping matches in priority order. Earlier (more
    /// specific, compound) patterns keep their spans; later patterns
    /// cannot claim text inside them.
    fn claim_spans(&self, title: &str, cancel: &CancelToken) -> Result<Vec<Claim>, MillError> {
        let mut claims: Vec<Claim> = Vec::new();
        for pattern in self.library.patterns_for(PatternType::GeographicEntity) {
            if cancel.expired() {
                return Err(MillError::Cancelled);
            }
            for m in pattern.regex.find_iter(title) {
                let overlaps = claims
                    .iter()
                    .any(|c| m.start() < c.end && c.start < m.end());
                if overlaps {
                    continue;
                }
                let term = self
                    .library
                    .resolve_alias(PatternType::GeographicEntity, m.as_str())
                    .unwrap_or(&pattern.record.term)
                    .to_string();
                claims.push(Claim {
                    start: m.start(),
                    end: m.end(),
                    term,
                });
            }
        }
        claims.sort_by_key(|c| c.start);
        Ok(claims)
    }
}

// ---------------------------------------------------------------------------
// Rebuild
// ---------------------------------------------------------------------------

/// One rebuild over the original string: claimed spans (extended over
/// adjacent whitespace/punctuation) drop out, dangling separators between
/// spans are consumed, and the unclaimed segments are rejoined.
fn rebuild(title: &str, claims: &[Claim], notes: &mut Vec<String>) -> String {
    if claims.is_empty() {
        return title.to_string();
    }

    let mut spans: Vec<(usize, usize)> = claims
        .iter()
        .map(|c| extend_span(title, c.start, c.end))
        .collect();
    spans.sort_by_key(|&(s, _)| s);

    // Merge overlapping or abutting extensions.
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (s, e) in spans {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }

    // Consume separators left dangling between spans or against an edge.
    let mut consumed = 0usize;
    let mut i = 0;
    while i + 1 < merged.len() {
        let gap = &title[merged[i].1..merged[i + 1].0];
        if is_dangling_separator(gap) {
            merged[i].1 = merged[i + 1].1;
            merged.remove(i + 1);
            consumed += 1;
        } else {
            i += 1;
        }
    }
    if let Some(first) = merged.first_mut() {
        if is_dangling_separator(&title[..first.0]) {
            first.0 = 0;
        }
    }
    if let Some(last) = merged.last_mut() {
        if is_dangling_separator(&title[last.1..]) {
            last.1 = title.len();
        }
    }
    if consumed > 0 {
        notes.push(format!("{consumed} separator(s) consumed with adjacent region"));
    }

    let mut segments: Vec<&str> = Vec::with_capacity(merged.len() + 1);
    let mut cursor = 0;
    for (s, e) in &merged {
        segments.push(&title[cursor..*s]);
        cursor = *e;
    }
    segments.push(&title[cursor..]);
    text::collapse_whitespace(&segments.join(" "))
}

/// Expand a matched span over adjacent whitespace and punctuation.
/// Conjunction characters (`&`, `+`) are left for the dangling-separator
/// rule, which knows whether another region sits on the far side.
fn extend_span(title: &str, start: usize, end: usize) -> (usize, usize) {
    let extendable = |c: char| c.is_whitespace() || EXTENSION_CHARS.contains(&c);

    let mut s = start;
    while let Some(prev) = title[..s].chars().next_back() {
        if extendable(prev) {
            s -= prev.len_utf8();
        } else {
            break;
        }
    }
    let mut e = end;
    while let Some(next) = title[e..].chars().next() {
        if extendable(next) {
            e += next.len_utf8();
        } else {
            break;
        }
    }
    (s, e)
}

/// A gap that is nothing but one separator word or conjunction character
/// (plus whitespace). Such a gap only existed to join the regions around
/// it, so it leaves with them.
fn is_dangling_separator(gap: &str) -> bool {
    let trimmed = gap.trim();
    if trimmed.is_empty() {
        return false;
    }
    text::is_separator_word(trimmed) || trimmed == "&" || trimmed == "+"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
