//! Moderation lifecycle: listing, status actions, aggregate counts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::db::{
    self, Database, GalleryStats, ImageRecord, ImageStatus, ModerationAction, StatusFilter,
};
use crate::error::IntakeError;
use crate::intake::blob_key;

pub struct ModerationStore {
    db: Database,
    blob: Arc<dyn BlobStore>,
}

impl ModerationStore {
    #[must_use]
    pub fn new(db: Database, blob: Arc<dyn BlobStore>) -> Self {
        Self { db, blob }
    }

    /// List records newest-first, plus the total count for the filter
    /// (independent of pagination).
    ///
    /// # Errors
    ///
    /// Returns an error on metadata store failure.
    pub async fn list(
        &self,
        filter: StatusFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImageRecord>, i64), IntakeError> {
        let records = db::list_images(self.db.pool(), filter, limit, offset).await?;
        let total = db::count_images(self.db.pool(), filter).await?;
        Ok((records, total))
    }

    /// Apply a moderation action named by the caller.
    ///
    /// Unrecognized actions are rejected outright with no mutation.
    /// `delete` attempts blob removal first (an absent blob is fine) and
    /// then unconditionally removes the record.
    ///
    /// # Errors
    ///
    /// [`IntakeError::InvalidAction`] for unknown action names; metadata
    /// store failures otherwise.
    pub async fn apply_action(&self, name: &str, action: &str) -> Result<(), IntakeError> {
        let Some(action) = ModerationAction::from_str(action) else {
            return Err(IntakeError::InvalidAction(action.to_string()));
        };

        match action {
            ModerationAction::Approve => {
                let updated =
                    db::set_image_status(self.db.pool(), name, ImageStatus::Approved).await?;
                if !updated {
                    warn!(name = %name, "Approve requested for unknown image");
                }
            }
            ModerationAction::Delete => {
                // The record must go regardless of blob state, so a blob
                // failure is logged, not surfaced.
                if let Err(e) = self.blob.delete(&blob_key(name)).await {
                    warn!(name = %name, error = %e, "Blob removal failed; removing record anyway");
                }
                db::delete_image(self.db.pool(), name).await?;
                debug!(name = %name, "Deleted image");
            }
        }

        Ok(())
    }

    /// Aggregate counters for the gallery.
    ///
    /// # Errors
    ///
    /// Returns an error on metadata store failure.
    pub async fn stats(&self) -> Result<GalleryStats, IntakeError> {
        let approved =
            db::count_images(self.db.pool(), StatusFilter::Only(ImageStatus::Approved)).await?;
        let total = db::count_images(self.db.pool(), StatusFilter::All).await?;
        Ok(GalleryStats { approved, total })
    }

    /// Public URL for a stored image name.
    #[must_use]
    pub fn image_url(&self, name: &str) -> String {
        self.blob.public_url(&blob_key(name))
    }
}
