use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{ImageRecord, ImageStatus, StatusFilter};

/// Insert an image record, or refresh its dedup fields if the name exists.
///
/// The upsert touches only `duplicate` and `fingerprint`: re-ingesting a
/// known name never resets its moderation status and never creates a
/// second row.
pub async fn upsert_image(
    pool: &SqlitePool,
    name: &str,
    duplicate: bool,
    fingerprint: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO images (name, duplicate, fingerprint)
        VALUES (?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            duplicate = excluded.duplicate,
            fingerprint = excluded.fingerprint
        ",
    )
    .bind(name)
    .bind(duplicate)
    .bind(fingerprint)
    .execute(pool)
    .await
    .context("Failed to upsert image record")?;

    Ok(())
}

/// Get an image record by name.
pub async fn get_image(pool: &SqlitePool, name: &str) -> Result<Option<ImageRecord>> {
    sqlx::query_as("SELECT * FROM images WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch image record")
}

/// Set an image's moderation status. Returns false when no row matched.
pub async fn set_image_status(
    pool: &SqlitePool,
    name: &str,
    status: ImageStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE images SET status = ? WHERE name = ?")
        .bind(status.as_str())
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to update image status")?;

    Ok(result.rows_affected() > 0)
}

/// Remove an image record entirely.
pub async fn delete_image(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM images WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to delete image record")?;

    Ok(())
}

/// List image records newest-first with pagination.
pub async fn list_images(
    pool: &SqlitePool,
    filter: StatusFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ImageRecord>> {
    let rows = match filter {
        StatusFilter::All => {
            sqlx::query_as(
                r"
                SELECT * FROM images
                ORDER BY created_at DESC, rowid DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
        StatusFilter::Only(status) => {
            sqlx::query_as(
                r"
                SELECT * FROM images
                WHERE status = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(status.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
    };

    rows.context("Failed to list image records")
}

/// Count image records matching the filter, ignoring pagination.
pub async fn count_images(pool: &SqlitePool, filter: StatusFilter) -> Result<i64> {
    let count: (i64,) = match filter {
        StatusFilter::All => {
            sqlx::query_as("SELECT COUNT(*) FROM images")
                .fetch_one(pool)
                .await
        }
        StatusFilter::Only(status) => {
            sqlx::query_as("SELECT COUNT(*) FROM images WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to count image records")?;

    Ok(count.0)
}

/// Load every stored fingerprint.
///
/// This is the duplicate index's backing state: rows whose hashing failed
/// at ingestion carry NULL and are excluded.
pub async fn all_fingerprints(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT fingerprint FROM images WHERE fingerprint IS NOT NULL")
            .fetch_all(pool)
            .await
            .context("Failed to load stored fingerprints")?;

    Ok(rows.into_iter().map(|(f,)| f).collect())
}
