//! Integration tests for the ingestion pipeline.

use std::sync::Arc;

use gallery_intake::blob::MemoryBlobStore;
use gallery_intake::db::{self, Database};
use gallery_intake::dedup::StoredFingerprintScan;
use gallery_intake::intake::{ImageIntake, UploadFile};
use tempfile::TempDir;

async fn setup() -> (ImageIntake, Database, Arc<MemoryBlobStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");

    let blob = Arc::new(MemoryBlobStore::new());
    let index = Arc::new(StoredFingerprintScan::new(db.clone()));
    let intake = ImageIntake::new(db.clone(), blob.clone(), index);

    (intake, db, blob, temp_dir)
}

/// Encode a left-to-right brightness ramp as PNG. `reversed` flips the ramp
/// direction, which flips every gradient bit in the perceptual hash.
fn ramp_png(reversed: bool) -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 64, |x, _y| {
        let v = u8::try_from(x * 4).unwrap_or(255);
        let v = if reversed { 255 - v } else { v };
        image::Rgb([v, v, v])
    });

    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    out
}

#[tokio::test]
async fn test_unsupported_extension_writes_nothing() {
    let (intake, db, blob, _temp_dir) = setup().await;

    let outcome = intake
        .intake(&ramp_png(false), "notes.txt")
        .await
        .expect("intake should not error");

    assert!(outcome.is_none());
    assert!(blob.is_empty());
    assert_eq!(
        db::count_images(db.pool(), gallery_intake::db::StatusFilter::All)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_undecodable_bytes_write_nothing() {
    let (intake, db, blob, _temp_dir) = setup().await;

    let outcome = intake
        .intake(b"this is not an image", "fake.png")
        .await
        .expect("intake should not error");

    assert!(outcome.is_none());
    assert!(blob.is_empty());
    assert_eq!(
        db::count_images(db.pool(), gallery_intake::db::StatusFilter::All)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_first_ingestion_is_pending_and_not_duplicate() {
    let (intake, db, blob, _temp_dir) = setup().await;

    let outcome = intake
        .intake(&ramp_png(false), "My Sunset Pic.png")
        .await
        .unwrap()
        .expect("supported image should ingest");

    assert_eq!(outcome.name, "My_Sunset_Pic.png");
    assert!(!outcome.duplicate);
    assert_eq!(outcome.url, "memory://original/My_Sunset_Pic.png");
    assert!(blob.get("original/My_Sunset_Pic.png").is_some());

    let record = db::get_image(db.pool(), "My_Sunset_Pic.png")
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(record.status, "pending");
    assert!(!record.duplicate);
    assert!(record.fingerprint.is_some());
}

#[tokio::test]
async fn test_identical_bytes_under_new_name_flag_duplicate() {
    let (intake, _db, _blob, _temp_dir) = setup().await;

    let bytes = ramp_png(false);

    let first = intake.intake(&bytes, "a.png").await.unwrap().unwrap();
    assert!(!first.duplicate);

    let second = intake.intake(&bytes, "b.png").await.unwrap().unwrap();
    assert!(second.duplicate);
}

#[tokio::test]
async fn test_visually_distinct_images_are_not_duplicates() {
    let (intake, _db, _blob, _temp_dir) = setup().await;

    let first = intake
        .intake(&ramp_png(false), "ltr.png")
        .await
        .unwrap()
        .unwrap();
    assert!(!first.duplicate);

    let second = intake
        .intake(&ramp_png(true), "rtl.png")
        .await
        .unwrap()
        .unwrap();
    assert!(!second.duplicate);
}

#[tokio::test]
async fn test_reingestion_upserts_without_touching_status() {
    let (intake, db, _blob, _temp_dir) = setup().await;

    intake
        .intake(&ramp_png(false), "cat.png")
        .await
        .unwrap()
        .unwrap();

    let before = db::get_image(db.pool(), "cat.png").await.unwrap().unwrap();

    db::set_image_status(
        db.pool(),
        "cat.png",
        gallery_intake::db::ImageStatus::Approved,
    )
    .await
    .unwrap();

    // Same name, different pixels: fingerprint refreshes, status survives,
    // and no second row appears.
    intake
        .intake(&ramp_png(true), "cat.png")
        .await
        .unwrap()
        .unwrap();

    let after = db::get_image(db.pool(), "cat.png").await.unwrap().unwrap();
    assert_eq!(after.status, "approved");
    assert_ne!(after.fingerprint, before.fingerprint);
    assert_eq!(
        db::count_images(db.pool(), gallery_intake::db::StatusFilter::All)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_batch_skips_bad_items_and_preserves_order() {
    let (intake, _db, _blob, _temp_dir) = setup().await;

    let files = vec![
        UploadFile {
            name: "good1.png".to_string(),
            bytes: ramp_png(false),
        },
        UploadFile {
            name: "bad.png".to_string(),
            bytes: b"garbage".to_vec(),
        },
        UploadFile {
            name: "good2.png".to_string(),
            bytes: ramp_png(true),
        },
    ];

    let outcomes = intake.ingest_batch(files).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].name, "good1.png");
    assert_eq!(outcomes[1].name, "good2.png");
}
