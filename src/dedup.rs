//! Near-duplicate detection using perceptual hashing.
//!
//! Every ingested image gets a fixed-width fingerprint that is stable under
//! re-encoding and resizing; visually similar images land within a small
//! Hamming distance of each other. The duplicate check is a linear scan over
//! all stored fingerprints, which is fine at gallery scale; the
//! [`DuplicateIndex`] trait is the seam for swapping in an indexed
//! nearest-neighbor structure later without touching callers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use img_hash::{HashAlg, HasherConfig, ImageHash};
use tracing::debug;

use crate::db::{self, Database};
use crate::error::IntakeError;

/// Hasher configuration: 8x8 gradient hash, 64 bits.
const HASH_SIZE: u32 = 8;

/// Hamming distances strictly below this mark a candidate as a duplicate.
pub const DUPLICATE_DISTANCE_THRESHOLD: u32 = 5;

/// Compute a perceptual fingerprint for an image.
///
/// Returns a base64-encoded hash that can be compared with other
/// fingerprints via Hamming distance.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] if the bytes cannot be decoded
/// as an image. Callers treat this as "no fingerprint available", not as a
/// fatal ingestion error.
pub fn compute_fingerprint(data: &[u8]) -> Result<String, IntakeError> {
    // Use img_hash's re-exported image crate for compatibility
    let img = img_hash::image::load_from_memory(data).map_err(|e| {
        debug!(error = %e, "Image decode failed");
        IntakeError::UnsupportedFormat
    })?;

    let hasher = HasherConfig::new()
        .hash_size(HASH_SIZE, HASH_SIZE)
        .hash_alg(HashAlg::Gradient)
        .to_hasher();

    Ok(hasher.hash_image(&img).to_base64())
}

/// Compare two fingerprints and return the Hamming distance.
///
/// # Errors
///
/// Returns an error if either fingerprint cannot be parsed.
pub fn hash_distance(hash1: &str, hash2: &str) -> Result<u32> {
    let h1: ImageHash<Box<[u8]>> =
        ImageHash::from_base64(hash1).map_err(|e| anyhow!("Failed to parse first hash: {e:?}"))?;
    let h2: ImageHash<Box<[u8]>> =
        ImageHash::from_base64(hash2).map_err(|e| anyhow!("Failed to parse second hash: {e:?}"))?;
    Ok(h1.dist(&h2))
}

/// Check whether two fingerprints are close enough to count as duplicates.
///
/// Unparseable fingerprints never match.
#[must_use]
pub fn is_near_duplicate(candidate: &str, stored: &str) -> bool {
    match hash_distance(candidate, stored) {
        Ok(dist) => dist < DUPLICATE_DISTANCE_THRESHOLD,
        Err(e) => {
            debug!(error = %e, "Failed to compare fingerprints");
            false
        }
    }
}

/// Answers near-duplicate queries against the accumulated corpus.
#[async_trait]
pub trait DuplicateIndex: Send + Sync {
    /// Whether any previously seen fingerprint is within the duplicate
    /// threshold of the candidate. Pure existence check: the matched item
    /// is not reported.
    async fn is_duplicate(&self, candidate: &str) -> Result<bool>;
}

/// Linear scan over the fingerprints currently in the metadata store.
///
/// The index is a read-through view: the metadata store is the single
/// source of truth, and nothing is cached between queries.
#[derive(Debug, Clone)]
pub struct StoredFingerprintScan {
    db: Database,
}

impl StoredFingerprintScan {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DuplicateIndex for StoredFingerprintScan {
    async fn is_duplicate(&self, candidate: &str) -> Result<bool> {
        let stored = db::all_fingerprints(self.db.pool()).await?;
        Ok(stored.iter().any(|s| is_near_duplicate(candidate, s)))
    }
}
