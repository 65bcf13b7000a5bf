//! End-to-end pipeline tests against the built-in pattern seed.
//!
//! Covers the seed scenarios for the full five-stage flow plus the
//! cross-stage properties (word preservation, canonical regions, slug
//! shape, connector handling).

use std::collections::HashMap;
use std::sync::Arc;

use titlemill::engine::pipeline::{TitlePipeline, DEFAULT_TITLE_BUDGET};
use titlemill::engine::runner::BatchRunner;
use titlemill::patterns::store::{self, SqlitePatternStore};
use titlemill::patterns::{seed, PatternLibrary};
use titlemill::types::{MarketTermType, PipelineResult, PipelineStatus};

fn pipeline() -> TitlePipeline {
    let library = PatternLibrary::from_records(seed::builtin_patterns()).unwrap();
    TitlePipeline::new(Arc::new(library), DEFAULT_TITLE_BUDGET)
}

fn process(title: &str) -> PipelineResult {
    pipeline().process(title)
}

// ---------------------------------------------------------------------------
// Seed scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_standard_with_region_alias_and_range() {
    let result = process("APAC Personal Protective Equipment Market Analysis, 2024-2029");
    assert_eq!(result.status, PipelineStatus::Ok);
    assert_eq!(result.market_term_type, MarketTermType::Standard);
    assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2029"));
    assert_eq!(result.extracted_report_type.as_deref(), Some("Market Analysis"));
    assert_eq!(result.extracted_regions, vec!["Asia Pacific"]);
    assert_eq!(result.topic, "Personal Protective Equipment");
    assert_eq!(result.topic_name, "personal-protective-equipment");
}

#[test]
fn scenario_market_in_with_preserved_context() {
    let result =
        process("Artificial Intelligence (AI) Market in Automotive Outlook & Trends, 2025-2035");
    assert_eq!(result.market_term_type, MarketTermType::MarketIn);
    assert_eq!(result.extracted_date_range.as_deref(), Some("2025-2035"));
    assert_eq!(
        result.extracted_report_type.as_deref(),
        Some("Market Outlook & Trends")
    );
    assert!(result.extracted_regions.is_empty());
    assert_eq!(result.topic, "Artificial Intelligence (AI) in Automotive");
    assert_eq!(result.topic_name, "artificial-intelligence-ai-in-automotive");
}

#[test]
fn scenario_market_in_with_geographic_object() {
    let result = process("Retail Market in Singapore - Size, Outlook & Statistics");
    assert_eq!(result.market_term_type, MarketTermType::MarketIn);
    assert!(result.extracted_date_range.is_none());
    assert_eq!(
        result.extracted_report_type.as_deref(),
        Some("Market Size Outlook Statistics")
    );
    assert_eq!(result.extracted_regions, vec!["Singapore"]);
    assert_eq!(result.topic, "Retail");
    assert_eq!(result.topic_name, "retail");
}

#[test]
fn scenario_acronym_preserved_through_report_type() {
    let result = process("Real-Time Locating Systems Market Size, RTLS Industry Report, 2025");
    assert_eq!(result.extracted_date_range.as_deref(), Some("2025"));
    assert_eq!(
        result.extracted_report_type.as_deref(),
        Some("Market Size Industry Report")
    );
    assert!(result.extracted_regions.is_empty());
    assert!(result.topic.contains("RTLS"));
    assert_eq!(result.topic, "Real-Time Locating Systems RTLS");
}

#[test]
fn scenario_separator_consumed_between_regions() {
    let result = process("U.S. And Europe Digital Pathology Market");
    assert_eq!(
        result.extracted_regions,
        vec!["United States", "Europe"]
    );
    assert_eq!(result.topic, "Digital Pathology");
    assert_eq!(result.topic_name, "digital-pathology");
}

#[test]
fn scenario_parenthesized_range_with_preserved_word() {
    let result = process("Battery Fuel Gauge Market (Forecast 2020-2030)");
    assert_eq!(result.extracted_date_range.as_deref(), Some("2020-2030"));
    assert_eq!(
        result.extracted_report_type.as_deref(),
        Some("Market Forecast")
    );
    assert_eq!(result.topic, "Battery Fuel Gauge");
}

// ---------------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------------

#[test]
fn archived_alias_does_not_match() {
    let result = process("ID card printer Market");
    assert!(result.extracted_regions.is_empty());
    assert_eq!(result.topic, "ID card printer");
}

#[test]
fn compound_regions_win_over_components() {
    let result = process("North America and Europe Intravenous Infusion Pumps Market");
    assert_eq!(result.extracted_regions, vec!["North America", "Europe"]);
    assert_eq!(result.topic, "Intravenous Infusion Pumps");
}

#[test]
fn canonical_compound_stays_whole() {
    let result = process("Bosnia and Herzegovina Market");
    assert_eq!(result.extracted_regions, vec!["Bosnia and Herzegovina"]);
}

#[test]
fn bare_market_law() {
    for topic in ["Underwater Basket Weaving", "Graphene", "Cold Chain Logistics"] {
        let result = process(&format!("{topic} Market"));
        assert_eq!(result.extracted_report_type.as_deref(), Some("Market"));
        assert!(result.extracted_date_range.is_none());
        assert!(result.extracted_regions.is_empty());
        assert_eq!(result.topic, topic);
    }
}

// ---------------------------------------------------------------------------
// Cross-stage properties
// ---------------------------------------------------------------------------

/// Lower-cased non-separator words of a string, as a multiset.
fn word_multiset(s: &str) -> HashMap<String, usize> {
    let mut words = HashMap::new();
    for token in s.split_whitespace() {
        let cleaned = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if cleaned.is_empty() || ["and", "plus", "or"].contains(&cleaned.as_str()) {
            continue;
        }
        *words.entry(cleaned).or_insert(0) += 1;
    }
    words
}

#[test]
fn report_type_extraction_preserves_words() {
    // Report type + remaining title must carry every non-separator word of
    // the date-cleaned title, with the accepted keywords moved, not lost.
    let titles = [
        "Real-Time Locating Systems Market Size, RTLS Industry Report",
        "In Vitro Diagnostics Market Size, Share Report",
        "Oilfield Services Market Size & Share Report",
        "Global Industry Report Market Outlook",
    ];
    let library = Arc::new(PatternLibrary::from_records(seed::builtin_patterns()).unwrap());
    let classifier = titlemill::stages::classifier::Classifier::new(library.clone());
    let extractor = titlemill::stages::report_type::ReportTypeExtractor::new(library);

    for title in titles {
        let classification = classifier.classify(title);
        let result = extractor
            .extract(
                title,
                &classification,
                &titlemill::stages::CancelToken::unbounded(),
            )
            .unwrap();
        let recombined = format!(
            "{} {}",
            result.extracted_report_type.as_deref().unwrap_or(""),
            result.title
        );
        assert_eq!(
            word_multiset(title),
            word_multiset(&recombined),
            "word multiset drifted for: {title}"
        );
    }
}

#[test]
fn regions_are_canonical_and_unique() {
    let titles = [
        "APAC and Europe and APAC Widgets Market",
        "U.S. And Europe Digital Pathology Market",
        "LATAM Agricultural Drones Market Report",
    ];
    for title in titles {
        let result = process(title);
        let mut seen = std::collections::HashSet::new();
        for region in &result.extracted_regions {
            assert!(seen.insert(region.clone()), "duplicate region in {title}");
            // Canonical terms are title-like, never short-form aliases.
            assert!(region.len() > 3, "alias leaked for {title}: {region}");
        }
    }
}

#[test]
fn topic_name_shape_always_holds() {
    let titles = [
        "APAC Personal Protective Equipment Market Analysis, 2024-2029",
        "Oil & Gas Pipeline Market Outlook 2031",
        "A/B Testing Tools Market Report",
        "Bosnia and Herzegovina Market",
        "Design + Build Services Market Study",
    ];
    for title in titles {
        let result = process(title);
        let name = &result.topic_name;
        assert!(!name.starts_with('-') && !name.ends_with('-'), "{title}: {name}");
        assert!(!name.contains("--"), "{title}: {name}");
        assert!(
            name.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "{title}: {name}"
        );
    }
}

#[test]
fn connector_survives_iff_object_survives() {
    // Geographic object: connector stripped with it.
    let result = process("Retail Market in Singapore - Size, Outlook & Statistics");
    assert!(!result.topic.contains(" in"));

    // Non-geographic object: connector stays.
    let result = process("Artificial Intelligence (AI) Market in Automotive Outlook & Trends");
    assert!(result.topic.contains(" in "));
}

#[test]
fn empty_topic_is_valid_but_flagged() {
    let result = process("Europe Market Report, 2030");
    assert_eq!(result.status, PipelineStatus::Ok);
    assert_eq!(result.topic, "");
    assert_eq!(result.topic_name, "");
    assert!((result.confidence_scores.topic - 0.3).abs() < f64::EPSILON);
}

// ---------------------------------------------------------------------------
// Store-backed run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_through_sqlite_store_and_worker_pool() {
    let sqlite = SqlitePatternStore::connect("sqlite::memory:").await.unwrap();
    sqlite.insert_all(&seed::builtin_patterns()).await.unwrap();
    let library = Arc::new(store::load_library(&sqlite).await.unwrap());

    let pipeline = Arc::new(TitlePipeline::new(library, DEFAULT_TITLE_BUDGET));
    let runner = BatchRunner::new(pipeline, 3);

    let titles: Vec<String> = vec![
        "APAC Personal Protective Equipment Market Analysis, 2024-2029".to_string(),
        "Battery Fuel Gauge Market (Forecast 2020-2030)".to_string(),
        "U.S. And Europe Digital Pathology Market".to_string(),
        "Retail Market in Singapore - Size, Outlook & Statistics".to_string(),
    ];
    let (results, report) = runner.run(titles).await;

    assert_eq!(report.processed, 4);
    assert_eq!(report.ok, 4);
    assert_eq!(report.dates_found, 2);
    assert_eq!(report.titles_with_regions, 3);
    assert_eq!(results[0].extracted_regions, vec!["Asia Pacific"]);
    assert_eq!(results[3].topic, "Retail");
}
