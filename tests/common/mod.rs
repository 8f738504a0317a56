//! Shared fixtures for integration tests.
#![allow(dead_code)]

use dsr_match::models::{chapter_and_section, ExtractedItem, VolumeEntry, VolumeFile, VolumeMetadata};
use dsr_match::service::normalizer::normalize;
use serde_json::json;
use std::path::{Path, PathBuf};

pub fn entry(code: &str, description: &str, unit: &str, rate: f64) -> VolumeEntry {
    VolumeEntry {
        code: code.to_string(),
        description: description.to_string(),
        unit: unit.to_string(),
        rate,
        ..VolumeEntry::default()
    }
}

pub fn volume(label: &str, entries: Vec<VolumeEntry>) -> VolumeFile {
    VolumeFile {
        metadata: VolumeMetadata {
            volume: label.to_string(),
            ..VolumeMetadata::default()
        },
        dsr_codes: entries,
    }
}

pub fn item(number: u32, clean_code: &str, description: &str, quantity: f64, unit: &str) -> ExtractedItem {
    let (chapter, section) = chapter_and_section(clean_code);
    ExtractedItem {
        item_number: number,
        code: if clean_code.is_empty() {
            String::new()
        } else {
            format!("DSR-2023-{clean_code}")
        },
        clean_code: clean_code.to_string(),
        chapter,
        section,
        description: description.to_string(),
        unit: unit.to_string(),
        quantity,
        keywords: normalize(description),
    }
}

/// Two overlapping volumes used across the CLI and store tests.
pub fn write_reference_volumes(dir: &Path) -> (PathBuf, PathBuf) {
    let v1 = json!({
        "metadata": { "volume": "Volume 1", "category": "civil" },
        "dsr_codes": [
            { "code": "15.12.2", "description": "Dismantling doors, windows and other fixtures", "unit": "nos", "rate": 480.0, "page": 12 },
            { "code": "2.8.1", "description": "Earth work in excavation by mechanical means", "unit": "cum", "rate": 180.0, "page": 3 }
        ]
    });
    let v2 = json!({
        "metadata": { "volume": "Volume 2", "category": "civil" },
        "dsr_codes": [
            { "code": "15.12.2", "description": "Dismantling doors, windows and other fixtures", "unit": "nos", "rate": 502.75, "page": 40 },
            { "code": "15.1.1", "description": "Brick work in superstructure using bricks", "unit": "cum", "rate": 450.0, "page": 41 }
        ]
    });
    let p1 = dir.join("volume1.json");
    let p2 = dir.join("volume2.json");
    std::fs::write(&p1, v1.to_string()).expect("write volume 1");
    std::fs::write(&p2, v2.to_string()).expect("write volume 2");
    (p1, p2)
}

pub fn write_structured_items(dir: &Path) -> PathBuf {
    let items = json!({
        "metadata": { "totalItems": 3, "type": "input_items" },
        "items": [
            { "itemNumber": 1, "code": "DSR-2023-15.12.2", "cleanCode": "15.12.2", "description": "Dismantling doors and windows", "unit": "nos", "quantity": 10 },
            { "itemNumber": 2, "code": "DSR-2023-99.99.9", "cleanCode": "99.99.9", "description": "brick work in superstructure", "unit": "cum", "quantity": 2 },
            { "itemNumber": 3, "description": "", "unit": "", "quantity": 1 }
        ]
    });
    let path = dir.join("items.json");
    std::fs::write(&path, items.to_string()).expect("write items");
    path
}
