//! End-to-end matching scenarios.

mod common;

use common::{entry, item, volume};
use dsr_match::models::{MatchType, TextBlock, DEFAULT_CATEGORY};
use dsr_match::service::matcher::match_all;
use dsr_match::{CodeExtractor, MatchEngine, MatchOptions, ReferenceStore, ReportBuilder};

fn approx(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn code_hit_with_similar_description_is_exact_match() {
    let store = ReferenceStore::ingest(&[volume(
        "Volume 1",
        vec![entry("15.12.2", "Dismantling doors, windows and other fixtures", "nos", 502.75)],
    )]);
    let items = vec![item(1, "15.12.2", "Dismantling doors and windows", 10.0, "nos")];

    let results = match_all(items, &store, 0.3).unwrap();
    let result = &results[0];
    assert_eq!(result.match_type, MatchType::ExactMatch);
    assert_eq!(result.matched_code.as_deref(), Some("15.12.2"));
    assert_eq!(result.rate, Some(502.75));
    approx(result.amount.unwrap(), 5027.50);
    assert!(result.description_score.unwrap() >= 0.5);
    assert!(result.similarity_score.is_none());
}

#[test]
fn missing_code_falls_back_to_similarity() {
    let store = ReferenceStore::ingest(&[volume(
        "Volume 1",
        vec![entry("15.1.1", "Brick work in superstructure using bricks", "cum", 450.0)],
    )]);
    let items = vec![item(1, "99.99.9", "brick work in superstructure", 2.0, "cum")];

    let results = match_all(items, &store, 0.3).unwrap();
    let result = &results[0];
    assert_eq!(result.match_type, MatchType::SimilarityMatch);
    assert_eq!(result.matched_code.as_deref(), Some("15.1.1"));
    approx(result.similarity_score.unwrap(), 0.7481159420289856);
    approx(result.amount.unwrap(), 900.0);
}

#[test]
fn empty_item_is_not_found() {
    let store = ReferenceStore::ingest(&[volume(
        "Volume 1",
        vec![
            entry("15.1.1", "Brick work in superstructure using bricks", "cum", 450.0),
            entry("2.8.1", "Earth work in excavation by mechanical means", "cum", 180.0),
        ],
    )]);
    let results = match_all(vec![item(1, "", "", 1.0, "")], &store, 0.5).unwrap();
    let result = &results[0];
    assert_eq!(result.match_type, MatchType::NotFound);
    assert!(result.matched_code.is_none());
    assert!(result.rate.is_none());
    assert!(result.amount.is_none());
}

#[test]
fn later_volume_overrides_duplicate_code() {
    let store = ReferenceStore::ingest(&[
        volume("Volume 1", vec![entry("15.12.2", "Dismantling doors", "nos", 400.0)]),
        volume("Volume 2", vec![entry("15.12.2", "Dismantling doors", "nos", 502.75)]),
    ]);
    let record = store.lookup("15.12.2", DEFAULT_CATEGORY).unwrap();
    assert_eq!(record.volume, "Volume 2");
    assert_eq!(record.rate, 502.75);
    assert_eq!(store.len(), 1);
}

#[test]
fn category_option_limits_code_lookup() {
    let mut civil = entry("1.1", "Carriage of materials", "each", 10.0);
    civil.category = Some("civil".to_string());
    let mut electrical = entry("1.1", "Wiring of light point", "each", 20.0);
    electrical.category = Some("electrical".to_string());
    let store = ReferenceStore::ingest(&[volume("Volume 1", vec![civil, electrical])]);

    let any = MatchEngine::new(&store, MatchOptions::default()).unwrap();
    let result = any.match_item(item(1, "1.1", "Wiring of light point", 1.0, "each"));
    assert_eq!(result.rate, Some(20.0));
    assert_eq!(result.match_type, MatchType::ExactMatch);

    let options = MatchOptions {
        category: Some("civil".to_string()),
        ..MatchOptions::default()
    };
    let civil_only = MatchEngine::new(&store, options).unwrap();
    let result = civil_only.match_item(item(1, "1.1", "Wiring of light point", 1.0, "each"));
    assert_eq!(result.rate, Some(10.0));
    assert_eq!(result.match_type, MatchType::CodeMatchDescriptionMismatch);
}

#[test]
fn raw_text_through_report() {
    let blocks = vec![
        TextBlock::new(1, vec!["DSR-2023-15.12.2".into(), "Dismantling doors and windows".into(), "10 Nos".into()]),
        TextBlock::new(1, vec!["2023-2.8.1".into(), "Excavation in ordinary soil".into(), "25.5 Cum".into()]),
        TextBlock::new(2, vec!["2023-7.7.7".into(), "Providing and laying cement concrete 1:2:4".into(), "3 Cum".into()]),
    ];
    let items = CodeExtractor::default().extract(&blocks).items;
    assert_eq!(items.len(), 3);

    let store = ReferenceStore::ingest(&[volume(
        "Volume 1",
        vec![
            entry("15.12.2", "Dismantling doors, windows and other fixtures", "nos", 502.75),
            entry("2.8.1", "Earth work in excavation by mechanical means", "cum", 180.0),
            entry("4.1.1", "Cement concrete 1:2:4", "cum", 300.0),
        ],
    )]);
    let report = ReportBuilder::build(match_all(items, &store, 0.3).unwrap());

    let types: Vec<MatchType> = report.items.iter().map(|r| r.match_type).collect();
    assert_eq!(
        types,
        vec![
            MatchType::ExactMatch,
            MatchType::CodeMatchDescriptionMismatch,
            MatchType::SimilarityMatch
        ]
    );
    assert_eq!(report.items[2].matched_code.as_deref(), Some("4.1.1"));
    assert_eq!(report.summary.total_items, 3);
    assert_eq!(report.summary.exact_matches, 1);
    assert_eq!(report.summary.code_match_description_mismatch, 1);
    assert_eq!(report.summary.similarity_matches, 1);
    assert_eq!(report.summary.not_found, 0);
    approx(report.summary.total_estimated_amount, 10517.5);
}

#[test]
fn zero_items_give_empty_report() {
    let store = ReferenceStore::ingest(&[volume("Volume 1", vec![entry("1.1", "a", "nos", 1.0)])]);
    let report = ReportBuilder::build(match_all(Vec::new(), &store, 0.3).unwrap());
    assert_eq!(report.summary.total_items, 0);
    assert_eq!(report.summary.total_estimated_amount, 0.0);
}
