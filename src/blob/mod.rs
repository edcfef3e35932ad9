//! Blob storage for original image bytes.
//!
//! The core never talks to S3 directly: it goes through the [`BlobStore`]
//! trait so the web handlers, intake pipeline, and tests can share one
//! injected instance (or an in-memory fake).

pub mod memory;

pub use memory::MemoryBlobStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use crate::config::Config;

/// Content-addressed-by-name object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a path, overwriting any existing object.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Delete an object. An already-absent object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Deterministic public URL for an object.
    fn public_url(&self, path: &str) -> String;
}

/// S3-backed blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    endpoint: Option<String>,
}

impl S3BlobStore {
    /// Create a new S3 blob store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the bucket handle
    /// cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID not set")?;
        let secret_key =
            std::env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY not set")?;

        let credentials = Credentials::new(Some(&access_key), Some(&secret_key), None, None, None)
            .context("Failed to create S3 credentials")?;

        let region = if let Some(ref endpoint) = config.s3_endpoint {
            Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            }
        } else {
            config.s3_region.parse().unwrap_or(Region::UsEast1)
        };

        let bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .context("Failed to create S3 bucket")?;

        // Use path-style for custom endpoints (MinIO, R2, etc.)
        let bucket = if config.s3_endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            endpoint: config.s3_endpoint.clone(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        debug!(key = %path, content_type = %content_type, "Uploading bytes to S3");

        self.bucket
            .put_object_with_content_type(path, bytes, content_type)
            .await
            .context("Failed to upload bytes to S3")?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self.bucket.delete_object(path).await {
            Ok(_) => Ok(()),
            Err(s3::error::S3Error::HttpFailWithBody(404, _)) => {
                debug!(key = %path, "S3 object already absent on delete");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("S3 delete object failed: {e}")),
        }
    }

    fn public_url(&self, path: &str) -> String {
        // Custom endpoints use path-style addressing.
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket.name(),
                path
            ),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket.name(), path),
        }
    }
}
