//! The single choke point every candidate image passes through.
//!
//! Whatever the source (direct upload, configured download, ad-hoc scrape),
//! each image is sanitized, fingerprinted, checked against the duplicate
//! index, uploaded to the blob store, and recorded in the metadata store.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::db::{self, Database};
use crate::dedup::{self, DuplicateIndex};
use crate::error::IntakeError;

/// Extensions accepted for ingestion (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Blob keys are namespaced under this prefix.
const BLOB_PREFIX: &str = "original";

/// Blob key for a sanitized image name.
#[must_use]
pub fn blob_key(name: &str) -> String {
    format!("{BLOB_PREFIX}/{name}")
}

/// Outcome of a successful single-image ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub name: String,
    pub url: String,
    pub duplicate: bool,
}

/// One file handed in by a direct-upload caller.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check a filename's extension against the supported set.
#[must_use]
pub fn supported_extension(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            let lower = e.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
}

/// Sanitize a filename to be URL-safe and filesystem-safe.
///
/// Spaces and URL-hostile characters become underscores, runs of
/// underscores collapse, the name is length-capped, and the extension is
/// preserved.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    // Split filename into name and extension (ext keeps the dot)
    let (name, ext) = filename
        .rfind('.')
        .map_or((filename, ""), |dot| filename.split_at(dot));

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '#' | '?' | '&' | '%' | '"' | '\'' | '<' | '>' | '|' | '*' | ':' | '\\' | '/' => '_',
            '(' | ')' | '[' | ']' | '-' | '_' | '.' => c,
            c if c.is_alphanumeric() => c,
            _ => '_',
        })
        .collect();

    // Collapse consecutive underscores and trim them from the edges
    let sanitized = sanitized
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    const MAX_NAME_LENGTH: usize = 200;
    let truncated = if sanitized.len() > MAX_NAME_LENGTH {
        &sanitized[..MAX_NAME_LENGTH]
    } else {
        &sanitized
    };

    format!("{truncated}{ext}")
}

/// Ingestion pipeline: hash, dedup-check, store, record.
#[derive(Clone)]
pub struct ImageIntake {
    db: Database,
    blob: Arc<dyn BlobStore>,
    index: Arc<dyn DuplicateIndex>,
}

impl ImageIntake {
    #[must_use]
    pub fn new(db: Database, blob: Arc<dyn BlobStore>, index: Arc<dyn DuplicateIndex>) -> Self {
        Self { db, blob, index }
    }

    /// Ingest one candidate image.
    ///
    /// Returns `Ok(None)` when the item is rejected (unsupported extension
    /// or undecodable bytes) so batch callers can continue with their
    /// remaining items. Nothing is written for a rejected item.
    ///
    /// The blob write happens before the metadata upsert so a record is
    /// never visible without its blob; the two writes are sequential, not
    /// transactional, and a crash in between leaves an orphaned blob.
    ///
    /// # Errors
    ///
    /// Returns an error on blob store or metadata store failure.
    pub async fn intake(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<Option<IngestOutcome>, IntakeError> {
        let name = sanitize_filename(original_name);

        if !supported_extension(&name) {
            warn!(name = %name, "Skipping file with unsupported extension");
            return Ok(None);
        }

        let fingerprint = match dedup::compute_fingerprint(bytes) {
            Ok(f) => f,
            Err(IntakeError::UnsupportedFormat) => {
                warn!(name = %name, "Skipping undecodable image");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // Duplicate status is decided once, against the index as it exists
        // right now. Later insertions do not retroactively re-mark this row.
        let duplicate = self.index.is_duplicate(&fingerprint).await?;

        let key = blob_key(&name);
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();

        self.blob
            .put(&key, bytes, &content_type)
            .await
            .with_context(|| format!("Failed to store blob for {name}"))?;

        db::upsert_image(self.db.pool(), &name, duplicate, Some(&fingerprint)).await?;

        debug!(name = %name, duplicate = duplicate, "Ingested image");

        Ok(Some(IngestOutcome {
            url: self.blob.public_url(&key),
            name,
            duplicate,
        }))
    }

    /// Ingest a caller-supplied batch of files.
    ///
    /// Best-effort contract: one bad item never aborts the batch, and the
    /// returned outcomes preserve the order of the successful items.
    pub async fn ingest_batch(&self, files: Vec<UploadFile>) -> Vec<IngestOutcome> {
        let mut outcomes = Vec::new();

        for file in files {
            match self.intake(&file.bytes, &file.name).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Failed to ingest uploaded file");
                }
            }
        }

        outcomes
    }
}
