//! Persistence round trips: volume JSON export and the SQLite reference table.

mod common;

use common::{entry, volume, write_reference_volumes};
use dsr_match::db::{self, create_pool};
use dsr_match::models::{RateRecord, DEFAULT_CATEGORY};
use dsr_match::service::loader::{load_volume, load_volumes, save_json};
use dsr_match::{DsrError, ReferenceStore};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn exported_volume_file_reingests_identically() {
    let dir = tempdir().unwrap();
    let (v1, v2) = write_reference_volumes(dir.path());
    let store = ReferenceStore::ingest(&load_volumes(&[v1, v2]).unwrap());
    assert_eq!(store.len(), 3);

    let export_path = dir.path().join("merged.json");
    save_json(&export_path, &store.export_volume("merged")).unwrap();
    let again = ReferenceStore::ingest(&[load_volume(&export_path).unwrap()]);

    assert_eq!(again, store);
    let record = again.lookup("15.12.2", DEFAULT_CATEGORY).unwrap();
    assert_eq!(record.volume, "Volume 2");
    assert_eq!(record.page, 40);
}

#[test]
fn missing_volume_is_reference_not_found() {
    let dir = tempdir().unwrap();
    let err = load_volumes(&[dir.path().join("nope.json")]).unwrap_err();
    assert!(matches!(err, DsrError::ReferenceNotFound { .. }));
}

#[test]
fn unlabelled_volumes_are_numbered_by_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.json");
    std::fs::write(&path, r#"{"dsr_codes":[{"code":"1.1","description":"a","unit":"nos","rate":2.0}]}"#).unwrap();
    let (other, _) = write_reference_volumes(dir.path());
    let volumes = load_volumes(&[other, path]).unwrap();
    assert_eq!(volumes[1].metadata.volume, "Volume 2");
    assert_eq!(volumes[1].metadata.source_file.as_deref(), Some("plain.json"));
}

#[tokio::test]
async fn sqlite_save_and_load() {
    let dir = tempdir().unwrap();
    let (v1, v2) = write_reference_volumes(dir.path());
    let store = ReferenceStore::ingest(&load_volumes(&[v1, v2]).unwrap());

    let url = format!("sqlite://{}", dir.path().join("reference.db").display());
    let pool = create_pool(&url).await.unwrap();
    assert_eq!(db::save_store(&pool, &store).await.unwrap(), 3);
    assert_eq!(db::count_records(&pool).await.unwrap(), 3);

    let loaded = db::load_store(&pool).await.unwrap();
    assert_eq!(loaded, store);

    let point = db::get_record(&pool, "15.12.2", DEFAULT_CATEGORY).await.unwrap().unwrap();
    assert_eq!(point.rate, 502.75);
    assert!(point.keywords.contains("dismantling"));
    let chapter = db::list_by_chapter(&pool, DEFAULT_CATEGORY, "15").await.unwrap();
    assert_eq!(chapter.len(), 2);

    // 再次保存覆盖而不是追加
    db::save_store(&pool, &store).await.unwrap();
    assert_eq!(db::count_records(&pool).await.unwrap(), 3);
}

#[tokio::test]
async fn empty_database_loads_empty_store() {
    let dir = tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("empty.db").display());
    let pool = create_pool(&url).await.unwrap();
    let store = db::load_store(&pool).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_save_keeps_previous_records() {
    let dir = tempdir().unwrap();
    let (v1, v2) = write_reference_volumes(dir.path());
    let store = ReferenceStore::ingest(&load_volumes(&[v1, v2]).unwrap());

    let url = format!("sqlite://{}", dir.path().join("reference.db").display());
    let pool = create_pool(&url).await.unwrap();
    db::save_store(&pool, &store).await.unwrap();

    let mut records = store.records().to_vec();
    records.push(RateRecord {
        code: "9.9.9".to_string(),
        category: DEFAULT_CATEGORY.to_string(),
        chapter: "9".to_string(),
        section: "9.9".to_string(),
        description: "Negative rate rejected by the table".to_string(),
        unit: "nos".to_string(),
        rate: -1.0,
        volume: "Volume 3".to_string(),
        page: 1,
        keywords: Default::default(),
    });
    let broken = ReferenceStore::from_records(records);
    assert!(matches!(db::save_store(&pool, &broken).await, Err(DsrError::Database(_))));

    assert_eq!(db::count_records(&pool).await.unwrap(), 3);
    assert_eq!(db::load_store(&pool).await.unwrap(), store);
}

#[tokio::test]
async fn keywords_with_commas_survive_the_database() {
    let mut doors = entry("15.12.2", "Dismantling doors", "nos", 480.0);
    doors.keywords = Some(["doors, windows".to_string(), "frames".to_string()].into_iter().collect());
    let store = ReferenceStore::ingest(&[volume("Volume 1", vec![doors])]);

    let dir = tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("reference.db").display());
    let pool = create_pool(&url).await.unwrap();
    db::save_store(&pool, &store).await.unwrap();

    let loaded = db::load_store(&pool).await.unwrap();
    assert_eq!(loaded, store);
    let record = loaded.lookup("15.12.2", DEFAULT_CATEGORY).unwrap();
    assert_eq!(record.keywords.len(), 2);
    assert!(record.keywords.contains("doors, windows"));
}

#[test]
fn raw_text_volume_is_extracted_on_load() {
    let dir = tempdir().unwrap();
    let raw = dir.path().join("dsr_vol2_raw.json");
    let doc = json!({
        "document": {
            "pages_data": [
                { "blocks": [
                    { "lines": ["DELHI SCHEDULE OF RATES"] },
                    { "lines": ["15.12.2", "Dismantling doors, windows and clerestory windows", "Nos", "502.75"] }
                ]},
                { "blocks": [
                    { "lines": ["15.1.1", "Brick work with common burnt clay bricks", "in superstructure", "Cu.m", "6,450.00"] }
                ]}
            ]
        }
    });
    std::fs::write(&raw, doc.to_string()).unwrap();
    let (v1, _) = write_reference_volumes(dir.path());

    let volumes = load_volumes(&[v1, raw]).unwrap();
    assert_eq!(volumes[1].metadata.volume, "Volume 2");
    assert_eq!(volumes[1].metadata.source_file.as_deref(), Some("dsr_vol2_raw.json"));
    assert_eq!(volumes[1].dsr_codes.len(), 2);

    let store = ReferenceStore::ingest(&volumes);
    let doors = store.lookup("15.12.2", DEFAULT_CATEGORY).unwrap();
    assert_eq!(doors.rate, 502.75);
    assert_eq!(doors.volume, "Volume 2");
    let bricks = store.lookup("15.1.1", DEFAULT_CATEGORY).unwrap();
    assert_eq!(bricks.rate, 6450.0);
    assert_eq!(bricks.unit, "cum");
    assert_eq!(bricks.page, 2);
    assert_eq!(bricks.description, "Brick work with common burnt clay bricks in superstructure");
    assert!(bricks.keywords.contains("brick"));
}
