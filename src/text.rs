//! Shared text helpers for the pipeline stages.
//!
//! Small pure functions over title strings: separator classification,
//! whitespace collapsing, orphan-token stripping, and word-boundary-safe
//! literal regex construction. Stages never mutate shared buffers; every
//! helper returns a fresh string.

// ---------------------------------------------------------------------------
// Separator classes
// ---------------------------------------------------------------------------

/// Punctuation characters that act as separators between title fragments.
pub const SEPARATOR_CHARS: &[char] = &[',', '&', '+', '-', '–', '—', '|', ';', ':'];

/// Word-form separators (always matched case-insensitively, whole word).
pub const SEPARATOR_WORDS: &[&str] = &["and", "plus", "or"];

/// Prepositions stripped when orphaned at either end of a title.
pub const ORPHAN_PREPOSITIONS: &[&str] = &["in", "for", "by", "of", "at", "to", "with", "from"];

/// Whether a character belongs to the separator class.
pub fn is_separator_char(c: char) -> bool {
    SEPARATOR_CHARS.contains(&c)
}

/// Whether a token is a word-form separator (`and`, `plus`, `or`).
pub fn is_separator_word(token: &str) -> bool {
    SEPARATOR_WORDS.iter().any(|w| token.eq_ignore_ascii_case(w))
}

/// Whether a token is entirely separator characters (`&`, `,`, `-`, ...).
pub fn is_separator_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_separator_char)
}

/// Whether a gap between two matched spans carries no content: only
/// whitespace, separator characters, and word-form separators.
pub fn is_separator_only(gap: &str) -> bool {
    gap.split_whitespace()
        .all(|tok| is_separator_token(tok) || is_separator_word(tok))
}

/// Content tokens inside a gap: whitespace-split tokens that are not
/// separators, with separator characters trimmed from their edges.
pub fn content_tokens(gap: &str) -> Vec<String> {
    gap.split_whitespace()
        .filter_map(|tok| {
            let trimmed = tok.trim_matches(is_separator_char);
            if trimmed.is_empty() || is_separator_word(trimmed) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Whitespace and casing
// ---------------------------------------------------------------------------

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case a single word: first alphabetic character uppercased, the
/// rest lowercased. Non-alphabetic tokens (`&`, `4.0`) pass through.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        _ => word.to_string(),
    }
}

/// Reduce doubled separator characters (`&&`, `++`) to a single one.
pub fn squeeze_double_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if (c == '&' || c == '+') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Residual cleanup
// ---------------------------------------------------------------------------

/// Residual cleanup applied after extraction passes.
///
/// Strips orphan prepositions (when `strip_prepositions`) and isolated
/// separators at both ends, removes isolated single-character tokens
/// (except `&` and `+`), and collapses whitespace. Returns the cleaned
/// string together with the number of artifacts removed.
pub fn residual_cleanup(s: &str, strip_prepositions: bool) -> (String, usize) {
    let mut artifacts = 0usize;
    let mut text = collapse_whitespace(s);

    // Each removal can expose another orphan (attached punctuation behind a
    // popped word, a conjunction whose partner token was dropped), so the
    // passes repeat until the string stops changing.
    loop {
        let before = text.clone();

        // Edge characters, so attached punctuation ("Pathology,") is seen.
        let trimmed = text
            .trim_matches(|c: char| c.is_whitespace() || is_separator_char(c))
            .to_string();
        if trimmed.len() != text.len() {
            artifacts += 1;
            text = trimmed;
        }

        // Orphan words at either end.
        let mut tokens: std::collections::VecDeque<String> =
            text.split_whitespace().map(String::from).collect();
        loop {
            let mut popped = false;
            for end in [true, false] {
                let candidate = if end { tokens.back() } else { tokens.front() };
                let Some(tok) = candidate else { continue };
                let orphan = is_separator_token(tok)
                    || is_separator_word(tok)
                    || (strip_prepositions
                        && ORPHAN_PREPOSITIONS.iter().any(|p| tok.eq_ignore_ascii_case(p)));
                if orphan {
                    if end {
                        tokens.pop_back();
                    } else {
                        tokens.pop_front();
                    }
                    artifacts += 1;
                    popped = true;
                }
            }
            if !popped {
                break;
            }
        }

        // Isolated single-character tokens except `&` and `+`.
        let kept: Vec<String> = tokens
            .into_iter()
            .filter(|tok| {
                let single = tok.chars().count() == 1;
                if single && tok != "&" && tok != "+" {
                    artifacts += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        text = kept.join(" ");
        if text == before {
            break;
        }
    }

    (text, artifacts)
}

// ---------------------------------------------------------------------------
// Delimiter balancing
// ---------------------------------------------------------------------------

/// If `open` and `close` counts disagree, strip every occurrence of both
/// so the string stays balanced. Matched pairs are left alone.
pub fn strip_if_unbalanced(s: &str, open: char, close: char) -> String {
    let opens = s.chars().filter(|&c| c == open).count();
    let closes = s.chars().filter(|&c| c == close).count();
    if opens == closes {
        s.to_string()
    } else {
        s.chars().filter(|&c| c != open && c != close).collect()
    }
}

/// Remove empty delimiter pairs (`()`, `[ ]`) left behind by extraction.
pub fn drop_empty_pairs(s: &str) -> String {
    let mut out = s.to_string();
    loop {
        let next = out
            .replace("()", " ")
            .replace("[]", " ")
            .replace("( )", " ")
            .replace("[ ]", " ");
        if next == out {
            return out;
        }
        out = next;
    }
}

// ---------------------------------------------------------------------------
// Literal regex construction
// ---------------------------------------------------------------------------

/// Escape a literal surface form for case-insensitive matching, with `\b`
/// anchors only where the literal's edge is a word character. Internal
/// whitespace matches flexibly (`\s+`).
///
/// Dotted forms like `U.S.` take a leading `\b` but no trailing one, since
/// `\b` after a final `.` would require a following word character.
pub fn bounded_literal(surface: &str) -> String {
    let escaped = surface
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let starts_word = surface.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
    let ends_word = surface.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_');

    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" },
    )
}

/// Build a case-insensitive alternation over literal surfaces, longest
/// surface first so compound forms win over their components.
pub fn literal_alternation(surfaces: &[&str]) -> String {
    let mut sorted: Vec<&str> = surfaces.iter().copied().filter(|s| !s.is_empty()).collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alts = sorted
        .iter()
        .map(|s| bounded_literal(s))
        .collect::<Vec<_>>()
        .join("|");
    format!("(?i)(?:{alts})")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
