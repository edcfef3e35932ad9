//! Integration tests for moderation: listing, actions, stats.

use std::sync::Arc;

use gallery_intake::blob::{BlobStore, MemoryBlobStore};
use gallery_intake::db::{self, Database, ImageStatus, StatusFilter};
use gallery_intake::error::IntakeError;
use gallery_intake::moderation::ModerationStore;
use tempfile::TempDir;

async fn setup() -> (ModerationStore, Database, Arc<MemoryBlobStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");

    let blob = Arc::new(MemoryBlobStore::new());
    let moderation = ModerationStore::new(db.clone(), blob.clone());

    (moderation, db, blob, temp_dir)
}

async fn seed(db: &Database, name: &str) {
    db::upsert_image(db.pool(), name, false, None)
        .await
        .expect("Failed to seed record");
}

#[tokio::test]
async fn test_list_is_newest_first_with_independent_total() {
    let (moderation, db, _blob, _temp_dir) = setup().await;

    for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        seed(&db, name).await;
    }

    let (records, total) = moderation.list(StatusFilter::All, 2, 0).await.unwrap();
    assert_eq!(total, 4);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "d.jpg");
    assert_eq!(records[1].name, "c.jpg");

    let (records, total) = moderation.list(StatusFilter::All, 2, 2).await.unwrap();
    assert_eq!(total, 4);
    assert_eq!(records[0].name, "b.jpg");
    assert_eq!(records[1].name, "a.jpg");
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let (moderation, db, _blob, _temp_dir) = setup().await;

    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        seed(&db, name).await;
    }
    db::set_image_status(db.pool(), "b.jpg", ImageStatus::Approved)
        .await
        .unwrap();

    let (records, total) = moderation
        .list(StatusFilter::Only(ImageStatus::Approved), 10, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "b.jpg");

    // The "all" sentinel bypasses the status predicate.
    let (_, total) = moderation.list(StatusFilter::All, 10, 0).await.unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_approve_sets_status() {
    let (moderation, db, _blob, _temp_dir) = setup().await;
    seed(&db, "cat.jpg").await;

    moderation.apply_action("cat.jpg", "approve").await.unwrap();

    let record = db::get_image(db.pool(), "cat.jpg").await.unwrap().unwrap();
    assert_eq!(record.status, "approved");
}

#[tokio::test]
async fn test_delete_removes_blob_and_record() {
    let (moderation, db, blob, _temp_dir) = setup().await;
    seed(&db, "cat.jpg").await;
    blob.put("original/cat.jpg", b"bytes", "image/jpeg")
        .await
        .unwrap();

    moderation.apply_action("cat.jpg", "delete").await.unwrap();

    assert!(blob.get("original/cat.jpg").is_none());
    assert!(db::get_image(db.pool(), "cat.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_with_absent_blob_still_removes_record() {
    let (moderation, db, blob, _temp_dir) = setup().await;
    seed(&db, "ghost.jpg").await;
    assert!(blob.is_empty());

    moderation.apply_action("ghost.jpg", "delete").await.unwrap();

    assert!(db::get_image(db.pool(), "ghost.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_action_is_rejected_without_mutation() {
    let (moderation, db, _blob, _temp_dir) = setup().await;
    seed(&db, "cat.jpg").await;

    let err = moderation
        .apply_action("cat.jpg", "publish")
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::InvalidAction(_)));

    let record = db::get_image(db.pool(), "cat.jpg").await.unwrap().unwrap();
    assert_eq!(record.status, "pending");
}

#[tokio::test]
async fn test_stats_scenario() {
    let (moderation, db, _blob, _temp_dir) = setup().await;

    seed(&db, "cat.jpg").await;
    db::upsert_image(db.pool(), "cat2.jpg", true, None)
        .await
        .unwrap();

    let stats = moderation.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.approved, 0);

    moderation.apply_action("cat.jpg", "approve").await.unwrap();

    let stats = moderation.stats().await.unwrap();
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.total, 2);
}
