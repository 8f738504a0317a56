//! Input format detection and item resolution.

mod common;

use common::write_structured_items;
use dsr_match::models::InputFormat;
use dsr_match::service::loader::{load_input, resolve_items};
use dsr_match::{CodeExtractor, DsrError};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn structured_marker_bypasses_extraction() {
    let dir = tempdir().unwrap();
    let path = write_structured_items(dir.path());
    let format = load_input(&path).unwrap();
    let InputFormat::Structured(items) = &format else {
        panic!("expected structured input");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].chapter, "15");
    assert!(items[0].keywords.contains("windows"));

    let items = resolve_items(format, &CodeExtractor::default());
    assert_eq!(items[2].item_number, 3);
    assert!(!items[2].has_code());
}

#[test]
fn raw_pdf_dump_is_unstructured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.json");
    let doc = json!({
        "document": {
            "pages_data": [
                { "blocks": [
                    { "lines": ["DSR-", "2023-", "15.12.2"] },
                    { "lines": [{ "text": "Dismantling doors and windows" }, "10 Nos"] }
                ]},
                { "blocks": [
                    { "lines": ["2023-2.8.1 Excavation in ordinary soil 25.5 Cum"] }
                ]}
            ]
        }
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let format = load_input(&path).unwrap();
    let InputFormat::Unstructured(blocks) = &format else {
        panic!("expected unstructured input");
    };
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[2].page, 2);

    let items = resolve_items(format, &CodeExtractor::default());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].code, "DSR-2023-15.12.2");
    assert_eq!(items[0].description, "Dismantling doors and windows");
    assert_eq!(items[0].quantity, 10.0);
    assert_eq!(items[1].clean_code, "2.8.1");
    assert_eq!(items[1].description, "Excavation in ordinary soil");
    assert_eq!(items[1].unit, "cum");
    assert_eq!(items[1].quantity, 25.5);
}

#[test]
fn text_without_codes_yields_no_items() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Abstract of cost\nSubject to revision\n").unwrap();
    let items = resolve_items(load_input(&path).unwrap(), &CodeExtractor::default());
    assert!(items.is_empty());
}

#[test]
fn missing_input_file() {
    let dir = tempdir().unwrap();
    let err = load_input(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, DsrError::InputNotFound { .. }));
}
