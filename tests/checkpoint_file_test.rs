//! On-disk checkpoint layout and recovery

mod common;

use common::{options, TestContext, TASK_NAME};
use longtask::{Checkpoint, CheckpointFormat, CheckpointStore, Engine, FileStore};
use std::fs;

#[test]
fn test_checkpoint_file_is_named_after_task() {
    let ctx = TestContext::new().unwrap();
    ctx.run(3, &[], options(false, false));

    assert!(ctx.temp_dir.path().join(".number_crunch.task").exists());
}

#[test]
fn test_checkpoint_json_layout() {
    let ctx = TestContext::new().unwrap();
    ctx.run(4, &[3], options(false, false));

    let text = fs::read_to_string(ctx.store().path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(json["processed"], 4);
    assert_eq!(json["items_len"], 4);
    let groups = json["errors"]["Validation"].as_object().unwrap();
    assert_eq!(groups.len(), 1);
    let ids = groups.values().next().unwrap();
    assert_eq!(ids, &serde_json::json!([3]));
}

#[test]
fn test_corrupted_checkpoint_is_moved_aside() {
    let ctx = TestContext::new().unwrap();
    let store = ctx.store();
    fs::write(store.path(), "{ not json").unwrap();

    let task = common::failing_task(5, &[]);
    let mut engine = Engine::new(task, ctx.store(), options(true, false)).unwrap();
    assert_eq!(engine.processed(), 0);
    let summary = engine.run().unwrap();
    assert_eq!(summary.attempted, 5);

    let backups: Vec<_> = fs::read_dir(ctx.temp_dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".corrupted."))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(ctx.checkpoint().processed, 5);
}

#[test]
fn test_gzip_checkpoint_resumes() {
    let ctx = TestContext::new().unwrap();
    let store = FileStore::with_format(ctx.temp_dir.path(), TASK_NAME, CheckpointFormat::Gzip);
    assert!(store.path().to_string_lossy().ends_with(".number_crunch.task.gz"));

    let mut engine = Engine::new(
        common::failing_task(6, &[1]),
        store.clone(),
        options(false, false),
    )
    .unwrap();
    engine.run().unwrap();

    let saved: Checkpoint<u32> = store.load();
    assert_eq!(saved.processed, 6);
    assert!(saved.errors.contains(&1));

    let mut engine =
        Engine::new(common::failing_task(6, &[]), store.clone(), options(true, true)).unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.attempted, 1);
    let saved: Checkpoint<u32> = store.load();
    assert!(saved.errors.is_empty());
}

#[test]
fn test_handwritten_checkpoint_with_missing_fields() {
    let ctx = TestContext::new().unwrap();
    fs::write(ctx.store().path(), r#"{"processed": 2}"#).unwrap();

    let engine =
        Engine::new(common::failing_task(5, &[]), ctx.store(), options(true, false)).unwrap();

    assert_eq!(engine.processed(), 2);
    assert_eq!(engine.items_len(), 5);
    assert!(engine.errors().is_empty());
}
