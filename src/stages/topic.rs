//! Topic normalizer: display topic and slug.
//!
//! The remaining title after geographic extraction gets one final cleanup
//! pass (library cleanup rules, then residual separator stripping) to
//! become the display topic; the slug form is derived from it. Original
//! casing, internal punctuation, balanced parentheses, ampersands, plus
//! signs, and slashes are preserved in the topic.

use std::sync::Arc;

use crate::patterns::{PatternLibrary, PatternType};
use crate::text;
use crate::types::TopicResult;

/// Confidence for a non-empty topic (the stage is deterministic).
const TOPIC_CONFIDENCE: f64 = 1.0;

/// Confidence for an empty topic, which is allowed but flagged.
const EMPTY_TOPIC_CONFIDENCE: f64 = 0.3;

pub struct TopicNormalizer {
    library: Arc<PatternLibrary>,
}

impl TopicNormalizer {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        TopicNormalizer { library }
    }

    /// Produce the display topic and its slug.
    pub fn normalize(&self, title: &str) -> TopicResult {
        let mut t = title.to_string();
        for pattern in self.library.patterns_for(PatternType::CleanupRule) {
            t = pattern.regex.replace_all(&t, " ").into_owned();
        }
        t = text::strip_if_unbalanced(&t, '(', ')');
        t = text::strip_if_unbalanced(&t, '[', ']');

        let (topic, _) = text::residual_cleanup(&t, false);
        let topic_name = slugify(&topic);
        let confidence = if topic.is_empty() {
            EMPTY_TOPIC_CONFIDENCE
        } else {
            TOPIC_CONFIDENCE
        };

        TopicResult {
            topic,
            topic_name,
            confidence,
        }
    }
}

/// Slug form: lowercase, `&`/`and` → `-and-`, `+` → `-plus-`, every other
/// non-alphanumeric run → a single `-`, no leading/trailing/doubled `-`.
fn slugify(topic: &str) -> String {
    let lowered = topic
        .to_lowercase()
        .replace(" & ", "-and-")
        .replace(" and ", "-and-")
        .replace(" + ", "-plus-");

    let mut slug = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
