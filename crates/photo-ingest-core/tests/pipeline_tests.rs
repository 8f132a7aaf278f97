mod common;

use common::{create_file, create_photo_tree, listing, tree};
use filetime::FileTime;
use photo_ingest_core::decision::FixedDecision;
use photo_ingest_core::progress::{ProgressEvent, RecordingProgress, SilentProgress};
use photo_ingest_core::store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
use photo_ingest_core::{Config, Error, IngestPipeline, PhotoRecord, SwapStrategy};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn record(name: &str, group: Option<&str>, year: Option<i32>) -> PhotoRecord {
    PhotoRecord {
        name: name.to_string(),
        group: group.map(str::to_string),
        year,
    }
}

fn flat_names() -> Vec<String> {
    vec![
        "IMG_19650101.png".to_string(),
        "IMG_20210305_tram.jpeg".to_string(),
        "cover.jpg".to_string(),
        "deep_20190501.jpg".to_string(),
    ]
}

#[test]
fn test_ingest_flattens_and_records() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let db_dir = tempdir().unwrap();
    let store = SqliteRecordStore::open(&db_dir.path().join("photos.db"), "photos").unwrap();
    let config = Config::default().with_source_dir(&source);

    let mut pipeline = IngestPipeline::new(&config, store, FixedDecision(true), &SilentProgress);
    let report = pipeline.run().unwrap();

    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.records_inserted, 4);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.strategy, Some(SwapStrategy::Rename));
    assert!(!report.used_content_copy);

    assert_eq!(listing(&source), flat_names());
    assert_eq!(fs::read(source.join("deep_20190501.jpg")).unwrap(), b"DEEP");
    assert_eq!(listing(dir.path()), ["photos"]);

    let records = pipeline.store().records().unwrap();
    assert_eq!(
        records,
        vec![
            record("cover.jpg", None, None),
            record("IMG_19650101.png", Some("lisbon"), None),
            record("IMG_20210305_tram.jpeg", Some("lisbon"), Some(2021)),
            record("deep_20190501.jpg", None, Some(2019)),
        ]
    );
}

#[test]
fn test_every_record_has_a_file_and_every_file_a_record() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let config = Config::default().with_source_dir(&source);

    let mut pipeline =
        IngestPipeline::new(&config, MemoryRecordStore::new(), FixedDecision(true), &SilentProgress);
    pipeline.run().unwrap();

    let on_disk: BTreeSet<String> = listing(&source).into_iter().collect();
    let recorded: BTreeSet<String> = pipeline
        .store()
        .records()
        .iter()
        .map(|r| r.name.clone())
        .collect();
    assert_eq!(on_disk, recorded);
}

#[test]
fn test_store_failure_is_atomic() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let before = tree(&source);
    let config = Config::default().with_source_dir(&source);

    let store = MemoryRecordStore::new().rejecting_inserts();
    let mut pipeline = IngestPipeline::new(&config, store, FixedDecision(true), &SilentProgress);

    assert!(matches!(pipeline.run(), Err(Error::Store(_))));
    assert_eq!(tree(&source), before);
    assert_eq!(listing(dir.path()), ["photos"]);
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let config = Config::default().with_source_dir(&source);
    let store = SqliteRecordStore::open_in_memory("photos").unwrap();

    let mut pipeline = IngestPipeline::new(&config, store, FixedDecision(true), &SilentProgress);
    pipeline.run().unwrap();
    let first_tree = tree(&source);

    let second = pipeline.run().unwrap();

    assert_eq!(second.files_skipped, 0);
    assert_eq!(second.records_inserted, 4);
    assert_eq!(tree(&source), first_tree);
    let store = pipeline.into_store();
    assert_eq!(store.count().unwrap(), 4);
    // groups are gone once the tree is flat
    assert!(store.records().unwrap().iter().all(|r| r.group.is_none()));
}

#[test]
fn test_append_keeps_existing_records() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let config = Config::default().with_source_dir(&source);
    let store = SqliteRecordStore::open_in_memory("photos").unwrap();

    let mut pipeline = IngestPipeline::new(&config, store, FixedDecision(false), &SilentProgress);
    pipeline.run().unwrap();
    let report = pipeline.run().unwrap();

    assert!(!report.cleared_existing);
    assert_eq!(pipeline.store().count().unwrap(), 8);
}

#[test]
fn test_no_eligible_images_empties_directory() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("photos");
    create_file(&source.join("a.txt"), b"text");
    create_file(&source.join("sub").join("b.md"), b"text");
    let config = Config::default().with_source_dir(&source);
    let progress = RecordingProgress::new();

    let mut store = MemoryRecordStore::new();
    store.insert_all(&[record("earlier.jpg", None, None)]).unwrap();
    let mut pipeline = IngestPipeline::new(&config, store, FixedDecision(true), &progress);
    let report = pipeline.run().unwrap();

    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.records_inserted, 0);
    assert!(source.is_dir());
    assert!(listing(&source).is_empty());
    assert!(pipeline.store().records().is_empty());
    assert!(progress.events().contains(&ProgressEvent::NoImages));
}

#[test]
fn test_empty_source_is_left_alone() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("photos");
    fs::create_dir_all(source.join("empty_sub")).unwrap();
    let config = Config::default().with_source_dir(&source);
    let progress = RecordingProgress::new();

    let mut pipeline =
        IngestPipeline::new(&config, MemoryRecordStore::new(), FixedDecision(true), &progress);
    let report = pipeline.run().unwrap();

    assert_eq!(report.files_scanned, 0);
    assert_eq!(report.strategy, None);
    assert_eq!(pipeline.store().clear_count(), 0);
    assert_eq!(listing(&source), ["empty_sub"]);
    assert!(progress
        .events()
        .contains(&ProgressEvent::NoFiles(source.clone())));
}

#[test]
fn test_missing_source_fails_without_side_effects() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("photos");
    let config = Config::default().with_source_dir(&source);

    let mut pipeline =
        IngestPipeline::new(&config, MemoryRecordStore::new(), FixedDecision(true), &SilentProgress);

    assert!(matches!(pipeline.run(), Err(Error::FileNotFound(_))));
    assert!(listing(dir.path()).is_empty());
}

#[test]
fn test_stale_directories_are_cleaned_up() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    create_file(&dir.path().join("photos_tmp").join("junk.jpg"), b"junk");
    create_file(&dir.path().join("photos_old").join("older.jpg"), b"older");
    let config = Config::default().with_source_dir(&source);

    let mut pipeline =
        IngestPipeline::new(&config, MemoryRecordStore::new(), FixedDecision(true), &SilentProgress);
    pipeline.run().unwrap();

    assert_eq!(listing(dir.path()), ["photos"]);
    assert_eq!(listing(&source), flat_names());
}

#[test]
fn test_modification_times_survive() {
    let dir = tempdir().unwrap();
    let source = create_photo_tree(dir.path());
    let original = source.join("lisbon").join("IMG_20210305_tram.jpeg");
    let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(86_400 * 400));
    filetime::set_file_mtime(&original, old).unwrap();
    let config = Config::default().with_source_dir(&source);

    let mut pipeline =
        IngestPipeline::new(&config, MemoryRecordStore::new(), FixedDecision(true), &SilentProgress);
    pipeline.run().unwrap();

    let ingested: PathBuf = source.join("IMG_20210305_tram.jpeg");
    let meta = fs::metadata(&ingested).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), old);
}
