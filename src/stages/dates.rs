//! Date extractor: forecast year / year-range removal.
//!
//! Locates at most one forecast date in the title using the library's
//! priority-ordered format families, returns it in canonical form, and
//! returns the title with the date and its syntactic scaffolding removed.
//! Returning the original title on a successful extraction is forbidden;
//! the cleaned title is always the stage output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::sync::Arc;

use crate::patterns::{PatternLibrary, PatternType};
use crate::text;
use crate::types::{DateFormat, DateResult, DateStatus};

/// Year connectors that may sit between range endpoints or trail a removal.
const CONNECTOR_WORDS: &[&str] = &["to", "through", "till", "until"];

/// Range expression inside a delimited pair.
static INNER_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(20\d{2})\s*(?:-|–|—|to|through|till|until)\s*(20\d{2})").unwrap()
});

/// Single year inside a delimited pair.
static INNER_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

pub struct DateExtractor {
    library: Arc<PatternLibrary>,
}

impl DateExtractor {
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        DateExtractor { library }
    }

    /// Extract the forecast date and clean the title.
    pub fn extract(&self, title: &str) -> DateResult {
        // Numeric pre-filter: no candidate year, no pattern work.
        if !contains_candidate_year(title) {
            return DateResult {
                title: title.to_string(),
                extracted_date_range: None,
                confidence: 0.0,
                format_type: None,
                status: DateStatus::NoDatesPresent,
            };
        }

        for pattern in self.library.patterns_for(PatternType::DatePattern) {
            let Some(format) = pattern.record.format_type else {
                continue;
            };
            for caps in pattern.regex.captures_iter(title) {
                let Some(extraction) = apply_match(title, &caps, format) else {
                    continue;
                };
                return DateResult {
                    title: finish_cleaning(&extraction.cleaned),
                    extracted_date_range: Some(extraction.canonical),
                    confidence: 1.0,
                    format_type: Some(format),
                    status: DateStatus::Success,
                };
            }
        }

        // A candidate year exists but no family claimed it.
        DateResult {
            title: title.to_string(),
            extracted_date_range: None,
            confidence: 0.5,
            format_type: None,
            status: DateStatus::DatesMissed,
        }
    }
}

// ---------------------------------------------------------------------------
// Match application
// ---------------------------------------------------------------------------

struct Extraction {
    canonical: String,
    cleaned: String,
}

/// Any `20xx` window is a candidate year; [2000, 2099] is exactly the
/// four-digit range starting `20`.
fn contains_candidate_year(title: &str) -> bool {
    title
        .as_bytes()
        .windows(4)
        .any(|w| w[0] == b'2' && w[1] == b'0' && w[2].is_ascii_digit() && w[3].is_ascii_digit())
}

fn parse_year(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().filter(|y| (2000..=2099).contains(y))
}

fn apply_match(title: &str, caps: &regex::Captures<'_>, format: DateFormat) -> Option<Extraction> {
    let whole = caps.get(0)?;
    match format {
        DateFormat::Range => {
            let start = parse_year(caps.get(1)?.as_str())?;
            let end = parse_year(caps.get(2)?.as_str())?;
            if start > end {
                return None;
            }
            Some(Extraction {
                canonical: format!("{start}-{end}"),
                cleaned: remove_span(title, whole.range(), ""),
            })
        }
        DateFormat::TerminalComma | DateFormat::Embedded => {
            let year = parse_year(caps.get(1)?.as_str())?;
            Some(Extraction {
                canonical: year.to_string(),
                cleaned: remove_span(title, whole.range(), ""),
            })
        }
        DateFormat::Bracket | DateFormat::Parenthesis => {
            // The match covers the whole delimited pair; the pair is removed
            // and any meaningful inner content is carried back into place.
            let inner = &title[whole.start() + 1..whole.end() - 1];
            let (canonical, leftover) = parse_pair_inner(inner)?;
            Some(Extraction {
                canonical,
                cleaned: remove_span(title, whole.range(), &trim_pair_leftover(&leftover)),
            })
        }
    }
}

/// Extract a range (preferred) or single year from pair content, returning
/// the canonical date and the non-date remainder.
fn parse_pair_inner(inner: &str) -> Option<(String, String)> {
    if let Some(caps) = INNER_RANGE.captures(inner) {
        let start = parse_year(caps.get(1)?.as_str())?;
        let end = parse_year(caps.get(2)?.as_str())?;
        if start <= end {
            let m = caps.get(0)?;
            return Some((format!("{start}-{end}"), remove_inner(inner, m.range())));
        }
    }
    let caps = INNER_YEAR.captures(inner)?;
    let year = parse_year(caps.get(1)?.as_str())?;
    let m = caps.get(0)?;
    Some((year.to_string(), remove_inner(inner, m.range())))
}

fn remove_inner(s: &str, range: Range<usize>) -> String {
    format!("{} {}", &s[..range.start], &s[range.end..])
}

/// Drop connector words and separators from the edges of preserved pair
/// content, so `(Forecast to 2030)` carries back `Forecast`, not
/// `Forecast to`.
fn trim_pair_leftover(leftover: &str) -> String {
    let tokens: Vec<&str> = leftover.split_whitespace().collect();
    let is_scaffold = |tok: &str| {
        text::is_separator_token(tok)
            || text::is_separator_word(tok)
            || CONNECTOR_WORDS.iter().any(|c| tok.eq_ignore_ascii_case(c))
    };
    let start = tokens.iter().position(|t| !is_scaffold(t));
    let end = tokens.iter().rposition(|t| !is_scaffold(t));
    match (start, end) {
        (Some(s), Some(e)) => tokens[s..=e].join(" "),
        _ => String::new(),
    }
}

fn remove_span(title: &str, range: Range<usize>, replacement: &str) -> String {
    if replacement.is_empty() {
        format!("{} {}", &title[..range.start], &title[range.end..])
    } else {
        format!(
            "{} {} {}",
            &title[..range.start],
            replacement,
            &title[range.end..]
        )
    }
}

// ---------------------------------------------------------------------------
// Post-removal cleaning
// ---------------------------------------------------------------------------

/// Applied atomically after extraction: balance delimiters, collapse
/// whitespace, strip the scaffolding the removal left behind.
fn finish_cleaning(s: &str) -> String {
    let mut t = text::drop_empty_pairs(s);
    t = text::strip_if_unbalanced(&t, '(', ')');
    t = text::strip_if_unbalanced(&t, '[', ']');
    t = text::collapse_whitespace(&t);
    strip_scaffolding(&t)
}

/// Trailing punctuation and orphan connectors introduced by date removal:
/// `,` `;` `:`, edge `&`/`and`, and connector tails (`to`, `through`,
/// `Forecast to`, ...).
fn strip_scaffolding(s: &str) -> String {
    let is_connector = |tok: &str| CONNECTOR_WORDS.iter().any(|c| tok.eq_ignore_ascii_case(c));
    let is_edge_conjunction = |tok: &str| tok == "&" || tok.eq_ignore_ascii_case("and");

    let mut text_out = s.to_string();
    loop {
        let trimmed = text_out
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—'));

        let mut tokens: Vec<String> = trimmed.split_whitespace().map(String::from).collect();
        let n = tokens.len();
        if n >= 2
            && is_connector(&tokens[n - 1])
            && tokens[n - 2].eq_ignore_ascii_case("forecast")
        {
            tokens.truncate(n - 2);
        } else if n >= 1 && (is_connector(&tokens[n - 1]) || is_edge_conjunction(&tokens[n - 1])) {
            tokens.truncate(n - 1);
        }
        if tokens.first().is_some_and(|t| is_edge_conjunction(t)) {
            tokens.remove(0);
        }

        let next = tokens.join(" ");
        if next == text_out {
            return next;
        }
        text_out = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::seed;

    fn extractor() -> DateExtractor {
        let library = PatternLibrary::from_records(seed::builtin_patterns()).unwrap();
        DateExtractor::new(Arc::new(library))
    }

    // -- Pre-filter --

    #[test]
    fn test_no_dates_present_returns_title_unchanged() {
        let title = "Global Widgets Market Size Report";
        let result = extractor().extract(title);
        assert_eq!(result.status, DateStatus::NoDatesPresent);
        assert_eq!(result.title, title);
        assert!(result.extracted_date_range.is_none());
        assert!((result.confidence - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pre_filter_ignores_years_outside_window() {
        let result = extractor().extract("Widgets Market Since 1999");
        assert_eq!(result.status, DateStatus::NoDatesPresent);
        let result = extractor().extract("Widgets 2100 Market");
        assert_eq!(result.status, DateStatus::NoDatesPresent);
    }

    #[test]
    fn test_dates_missed_when_candidate_never_matches() {
        // "20022" contains the window "2002" but no family matches it.
        let title = "ISO 20022 Payments Market";
        let result = extractor().extract(title);
        assert_eq!(result.status, DateStatus::DatesMissed);
        assert_eq!(result.title, title);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    // -- Terminal comma --

    #[test]
    fn test_terminal_comma_year() {
        let result = extractor().extract("In Vitro Diagnostics Market Size, Share Report, 2030");
        assert_eq!(result.status, DateStatus::Success);
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
        assert_eq!(result.format_type, Some(DateFormat::TerminalComma));
        assert_eq!(result.title, "In Vitro Diagnostics Market Size, Share Report");
    }

    #[test]
    fn test_terminal_comma_with_trailing_period() {
        let result = extractor().extract("Widgets Market Report, 2027.");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2027"));
        assert_eq!(result.title, "Widgets Market Report");
    }

    // -- Ranges --

    #[test]
    fn test_hyphen_range() {
        let result = extractor().extract("PPE Market Analysis, 2024-2029");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2029"));
        assert_eq!(result.format_type, Some(DateFormat::Range));
        assert_eq!(result.title, "PPE Market Analysis");
    }

    #[test]
    fn test_en_dash_range() {
        let result = extractor().extract("Widgets Market Outlook, 2024–2029");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2029"));
        assert_eq!(result.title, "Widgets Market Outlook");
    }

    #[test]
    fn test_worded_range() {
        let result = extractor().extract("Widgets Market Forecast 2024 to 2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2030"));
        assert_eq!(result.title, "Widgets Market Forecast");
    }

    #[test]
    fn test_inverted_range_falls_through() {
        // 2030-2020 fails start <= end; the embedded family still fires.
        let result = extractor().extract("Widgets Market 2030-2020");
        assert_eq!(result.status, DateStatus::Success);
        assert_eq!(result.format_type, Some(DateFormat::Embedded));
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
    }

    // -- Delimited pairs --

    #[test]
    fn test_bracket_year() {
        let result = extractor().extract("Widgets Study [2024]");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024"));
        assert_eq!(result.format_type, Some(DateFormat::Bracket));
        assert_eq!(result.title, "Widgets Study");
    }

    #[test]
    fn test_parenthesis_year() {
        let result = extractor().extract("Widgets Report (2024)");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024"));
        assert_eq!(result.format_type, Some(DateFormat::Parenthesis));
        assert_eq!(result.title, "Widgets Report");
    }

    #[test]
    fn test_parenthesis_range_preserves_meaningful_content() {
        let result = extractor().extract("Battery Fuel Gauge Market (Forecast 2020-2030)");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2020-2030"));
        assert_eq!(result.title, "Battery Fuel Gauge Market Forecast");
    }

    #[test]
    fn test_parenthesis_connector_tail_dropped() {
        let result = extractor().extract("Widgets Market (Forecast to 2030)");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
        assert_eq!(result.title, "Widgets Market Forecast");
    }

    // -- Embedded --

    #[test]
    fn test_embedded_year() {
        let result = extractor().extract("Smart Grid Market Outlook 2031");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2031"));
        assert_eq!(result.format_type, Some(DateFormat::Embedded));
        assert_eq!(result.title, "Smart Grid Market Outlook");
    }

    #[test]
    fn test_embedded_forecast_to_tail() {
        let result = extractor().extract("Widgets Market Forecast to 2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
        // Trailing "Forecast to" is scaffolding once the year is gone.
        assert_eq!(result.title, "Widgets Market");
    }

    // -- Cleaning --

    #[test]
    fn test_unbalanced_delimiters_stripped() {
        let result = extractor().extract("Widgets (2024 Market");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024"));
        assert_eq!(result.title, "Widgets Market");
    }

    #[test]
    fn test_whitespace_collapsed_after_removal() {
        let result = extractor().extract("Widgets   Market   Report,   2030");
        assert_eq!(result.title, "Widgets Market Report");
    }

    #[test]
    fn test_only_first_date_extracted() {
        let result = extractor().extract("Widgets (2020) Market, 2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2020"));
        assert!(result.title.contains("2030"));
    }

    #[test]
    fn test_idempotent_on_dateless_output() {
        let first = extractor().extract("Widgets Market Report, 2030");
        let second = extractor().extract(&first.title);
        assert_eq!(second.status, DateStatus::NoDatesPresent);
        assert_eq!(second.title, first.title);
    }
}
