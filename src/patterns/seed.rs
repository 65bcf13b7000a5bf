//! Built-in curated pattern seed.
//!
//! Bootstraps an empty store on first run so the pipeline is usable out of
//! the box. Curation happens upstream in the document store; this seed is a
//! snapshot of the working library, not a second source of truth.

use crate::types::DateFormat;

use super::{PatternRecord, PatternType};

/// The full built-in seed, in no particular order (the library sorts).
pub fn builtin_patterns() -> Vec<PatternRecord> {
    let mut records = Vec::new();
    records.extend(market_terms());
    records.extend(date_patterns());
    records.extend(report_type_dictionary());
    records.extend(geographic_entities());
    records.extend(separators());
    records.extend(cleanup_rules());
    records
}

// ---------------------------------------------------------------------------
// Market terms
// ---------------------------------------------------------------------------

fn market_terms() -> Vec<PatternRecord> {
    ["Market for", "Market in", "Market by"]
        .iter()
        .enumerate()
        .map(|(i, phrase)| {
            PatternRecord::new(PatternType::MarketTerm, *phrase)
                .with_subtype(*phrase)
                .with_priority(i as u32)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Date patterns
// ---------------------------------------------------------------------------

fn date_patterns() -> Vec<PatternRecord> {
    vec![
        // Delimited pairs first: most specific, and their removal has to
        // take the whole pair with it.
        PatternRecord::new(PatternType::DatePattern, "bracketed date")
            .with_pattern(r"\[[^\[\]]*20\d{2}[^\[\]]*\]")
            .with_format(DateFormat::Bracket)
            .with_priority(0),
        PatternRecord::new(PatternType::DatePattern, "parenthesized date")
            .with_pattern(r"\([^()]*20\d{2}[^()]*\)")
            .with_format(DateFormat::Parenthesis)
            .with_priority(1),
        PatternRecord::new(PatternType::DatePattern, "year range")
            .with_pattern(r"(20\d{2})\s*(?:-|–|—|to|through|till|until)\s*(20\d{2})")
            .with_format(DateFormat::Range)
            .with_priority(2),
        PatternRecord::new(PatternType::DatePattern, "terminal comma year")
            .with_pattern(r",\s*(20\d{2})\s*\.?\s*$")
            .with_format(DateFormat::TerminalComma)
            .with_priority(3),
        PatternRecord::new(PatternType::DatePattern, "embedded year")
            .with_pattern(r"\b(20\d{2})\b")
            .with_format(DateFormat::Embedded)
            .with_priority(4),
    ]
}

// ---------------------------------------------------------------------------
// Report-type dictionary
// ---------------------------------------------------------------------------

fn report_type_dictionary() -> Vec<PatternRecord> {
    let mut records = vec![PatternRecord::new(PatternType::ReportTypeDictionary, "Market")
        .with_subtype("boundary_marker")
        .with_priority(0)];

    let primary = [
        "Report",
        "Analysis",
        "Outlook",
        "Study",
        "Forecast",
        "Overview",
        "Insights",
        "Statistics",
        "Assessment",
        "Review",
        "Research",
    ];
    for term in primary {
        records.push(
            PatternRecord::new(PatternType::ReportTypeDictionary, term)
                .with_subtype("primary_keyword")
                .with_priority(1),
        );
    }

    let secondary = [
        "Size",
        "Share",
        "Growth",
        "Trends",
        "Industry",
        "Demand",
        "Revenue",
        "Opportunities",
    ];
    for term in secondary {
        records.push(
            PatternRecord::new(PatternType::ReportTypeDictionary, term)
                .with_subtype("secondary_keyword")
                .with_priority(2),
        );
    }

    for term in ["and", "plus", "or", "&"] {
        records.push(
            PatternRecord::new(PatternType::ReportTypeDictionary, term)
                .with_subtype("separator")
                .with_priority(3),
        );
    }

    records
}

// ---------------------------------------------------------------------------
// Geographic entities
// ---------------------------------------------------------------------------

/// Priority 0 = compound multi-word regions, 1 = single-word regions,
/// 2 = single-word countries. Ties break on term length so compounds like
/// `Central and South America` always claim before `South America`.
fn geographic_entities() -> Vec<PatternRecord> {
    let mut records = Vec::new();

    let compounds: &[(&str, &[&str])] = &[
        ("Europe, Middle East and Africa", &["EMEA"]),
        ("Middle East and Africa", &["MEA", "Middle East & Africa"]),
        ("Central and South America", &["LATAM", "Latin America"]),
        ("Bosnia and Herzegovina", &[]),
        ("Asia Pacific", &["APAC", "Asia-Pacific"]),
        ("Southeast Asia", &["South East Asia"]),
        ("Middle East", &[]),
        ("North America", &[]),
        ("South America", &[]),
        ("South Africa", &[]),
        ("South Korea", &["Republic of Korea", "Korea"]),
        ("North Korea", &[]),
        ("New Zealand", &["NZ"]),
        ("United States", &["U.S.", "USA", "U.S.A.", "United States of America"]),
        ("United Kingdom", &["UK", "U.K.", "Great Britain", "Britain"]),
        ("United Arab Emirates", &["UAE", "U.A.E."]),
        ("Saudi Arabia", &["KSA"]),
        ("Czech Republic", &["Czechia"]),
        ("Costa Rica", &[]),
        ("Hong Kong", &[]),
        ("Sri Lanka", &[]),
    ];
    for (term, aliases) in compounds {
        records.push(
            PatternRecord::new(PatternType::GeographicEntity, *term)
                .with_aliases(aliases)
                .with_priority(0),
        );
    }

    for (term, aliases) in [
        ("Europe", &["EU", "European Union"] as &[&str]),
        ("Africa", &[]),
        ("Asia", &[]),
        ("Oceania", &[]),
        ("Scandinavia", &["Nordics"]),
    ] {
        records.push(
            PatternRecord::new(PatternType::GeographicEntity, term)
                .with_aliases(aliases)
                .with_priority(1),
        );
    }

    let countries = [
        "Singapore",
        "Germany",
        "France",
        "Italy",
        "Spain",
        "Portugal",
        "Netherlands",
        "Belgium",
        "Switzerland",
        "Austria",
        "Sweden",
        "Norway",
        "Denmark",
        "Finland",
        "Poland",
        "Russia",
        "Turkey",
        "China",
        "India",
        "Japan",
        "Australia",
        "Indonesia",
        "Vietnam",
        "Thailand",
        "Malaysia",
        "Philippines",
        "Brazil",
        "Mexico",
        "Argentina",
        "Chile",
        "Colombia",
        "Peru",
        "Egypt",
        "Nigeria",
        "Kenya",
        "Israel",
        "Qatar",
        "Kuwait",
    ];
    for term in countries {
        records.push(
            PatternRecord::new(PatternType::GeographicEntity, term).with_priority(2),
        );
    }

    // Short forms that collide with English words stay archived.
    records.push(
        PatternRecord::new(PatternType::GeographicEntity, "Canada")
            .with_archived_aliases(&["CA"])
            .with_priority(2)
            .with_notes("CA collides with circa and certificate-authority usage"),
    );
    records.push(
        PatternRecord::new(PatternType::GeographicEntity, "Idaho")
            .with_archived_aliases(&["ID"])
            .with_priority(2)
            .with_notes("ID collides with 'ID card', 'ID verification'"),
    );
    if let Some(us) = records
        .iter_mut()
        .find(|r| r.term == "United States")
    {
        us.archived_aliases = vec!["US".to_string()];
        us.curation_notes = Some("US collides with the pronoun 'us'".to_string());
    }

    records
}

// ---------------------------------------------------------------------------
// Separators and cleanup rules
// ---------------------------------------------------------------------------

fn separators() -> Vec<PatternRecord> {
    ["&", "and", "plus", "or"]
        .iter()
        .enumerate()
        .map(|(i, term)| {
            PatternRecord::new(PatternType::Separator, *term).with_priority(i as u32)
        })
        .collect()
}

fn cleanup_rules() -> Vec<PatternRecord> {
    vec![
        PatternRecord::new(PatternType::CleanupRule, "empty parentheses")
            .with_pattern(r"\(\s*\)")
            .with_priority(0),
        PatternRecord::new(PatternType::CleanupRule, "empty brackets")
            .with_pattern(r"\[\s*\]")
            .with_priority(1),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{DictRole, PatternLibrary};

    #[test]
    fn test_seed_loads_into_library() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        assert!(library.len() > 80);
        assert_eq!(library.boundary_marker().record.term, "Market");
    }

    #[test]
    fn test_seed_has_all_types() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        for t in PatternType::ALL {
            assert!(
                !library.patterns_for(*t).is_empty(),
                "seed is missing pattern type {t}"
            );
        }
    }

    #[test]
    fn test_seed_market_terms() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        let terms: Vec<&str> = library
            .patterns_for(PatternType::MarketTerm)
            .iter()
            .map(|p| p.record.term.as_str())
            .collect();
        assert_eq!(terms, vec!["Market for", "Market in", "Market by"]);
    }

    #[test]
    fn test_seed_dictionary_roles() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        assert_eq!(library.dictionary_with_role(DictRole::BoundaryMarker).len(), 1);
        assert!(!library.dictionary_with_role(DictRole::PrimaryKeyword).is_empty());
        assert!(!library.dictionary_with_role(DictRole::SecondaryKeyword).is_empty());
        assert!(!library.dictionary_with_role(DictRole::Separator).is_empty());
    }

    #[test]
    fn test_seed_alias_resolution() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        assert_eq!(
            library.resolve_alias(PatternType::GeographicEntity, "APAC"),
            Some("Asia Pacific")
        );
        assert_eq!(
            library.resolve_alias(PatternType::GeographicEntity, "LATAM"),
            Some("Central and South America")
        );
        assert_eq!(
            library.resolve_alias(PatternType::GeographicEntity, "U.S."),
            Some("United States")
        );
    }

    #[test]
    fn test_seed_archived_aliases_do_not_resolve() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        assert_eq!(library.resolve_alias(PatternType::GeographicEntity, "ID"), None);
        assert_eq!(library.resolve_alias(PatternType::GeographicEntity, "US"), None);
        assert_eq!(library.resolve_alias(PatternType::GeographicEntity, "CA"), None);
    }

    #[test]
    fn test_seed_compounds_order_before_components() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        let geo = library.patterns_for(PatternType::GeographicEntity);
        let pos = |term: &str| geo.iter().position(|p| p.record.term == term).unwrap();
        assert!(pos("Middle East and Africa") < pos("Middle East"));
        assert!(pos("Middle East") < pos("Africa"));
        assert!(pos("Central and South America") < pos("South America"));
        assert!(pos("South Africa") < pos("Africa"));
    }

    #[test]
    fn test_seed_date_patterns_ordered_by_specificity() {
        let library = PatternLibrary::from_records(builtin_patterns()).unwrap();
        let formats: Vec<DateFormat> = library
            .patterns_for(PatternType::DatePattern)
            .iter()
            .filter_map(|p| p.record.format_type)
            .collect();
        assert_eq!(
            formats,
            vec![
                DateFormat::Bracket,
                DateFormat::Parenthesis,
                DateFormat::Range,
                DateFormat::TerminalComma,
                DateFormat::Embedded,
            ]
        );
    }
}
