//! Scraper-driven acquisition: configured downloads and ad-hoc crawls.
//!
//! Both paths funnel into [`ImageIntake`]; they differ only in how
//! candidate bytes are acquired. Per-item failures are logged and skipped,
//! never aborting sibling items.

pub mod extract;
pub mod sites;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::error::IntakeError;
use crate::fetch::Fetcher;
use crate::intake::{self, ImageIntake, IngestOutcome};

pub struct Scraper {
    intake: ImageIntake,
    fetcher: Arc<dyn Fetcher>,
    registry: sites::StrategyRegistry,
    work_dir: PathBuf,
    fetch_timeout: Duration,
}

impl Scraper {
    #[must_use]
    pub fn new(
        intake: ImageIntake,
        fetcher: Arc<dyn Fetcher>,
        work_dir: PathBuf,
        fetch_timeout: Duration,
    ) -> Self {
        Self::with_registry(
            intake,
            fetcher,
            sites::StrategyRegistry::with_defaults(),
            work_dir,
            fetch_timeout,
        )
    }

    /// Build with a custom strategy registry.
    #[must_use]
    pub fn with_registry(
        intake: ImageIntake,
        fetcher: Arc<dyn Fetcher>,
        registry: sites::StrategyRegistry,
        work_dir: PathBuf,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            intake,
            fetcher,
            registry,
            work_dir,
            fetch_timeout,
        }
    }

    /// Download a URL's media with the configured external tool and ingest
    /// every supported file it produced.
    ///
    /// The scratch directory is scoped to this one request: it is created
    /// fresh and removed on every exit path, success or failure.
    ///
    /// # Errors
    ///
    /// [`IntakeError::DownloadTool`] when the tool exits non-zero,
    /// [`IntakeError::NoImagesFound`] when the walk yields zero successful
    /// intakes.
    pub async fn ingest_from_configured_source(
        &self,
        url: &str,
    ) -> Result<Vec<IngestOutcome>, IntakeError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .with_context(|| {
                format!("Failed to create work directory: {}", self.work_dir.display())
            })?;

        // TempDir removes the scratch tree on drop, covering early returns
        // and panics alike.
        let scratch = tempfile::Builder::new()
            .prefix("scrape_")
            .tempdir_in(&self.work_dir)
            .context("Failed to create scratch directory")?;

        self.fetcher.run_download_tool(url, scratch.path()).await?;

        let files = collect_supported_files(scratch.path()).await?;
        debug!(url = %url, count = files.len(), "Download tool produced candidate files");

        let mut outcomes = Vec::new();
        for path in files {
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable download");
                    continue;
                }
            };

            let base_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match self.intake.intake(&bytes, &base_name).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to ingest downloaded file");
                }
            }
        }

        if outcomes.is_empty() {
            return Err(IntakeError::NoImagesFound);
        }
        Ok(outcomes)
    }

    /// Fetch an arbitrary page, extract its image references, and ingest
    /// each one.
    ///
    /// Site-specific strategies may expand the target into a set of detail
    /// pages first (two-level crawl); all pages go through the same
    /// extraction routine.
    ///
    /// # Errors
    ///
    /// [`IntakeError::NoImagesFound`] when zero images were successfully
    /// ingested; infrastructure errors if the target page itself cannot be
    /// fetched.
    pub async fn ingest_from_ad_hoc_source(
        &self,
        url: &str,
    ) -> Result<Vec<IngestOutcome>, IntakeError> {
        let page_url = Url::parse(url).context("Invalid scrape URL")?;

        let body = self
            .fetcher
            .http_get(url, self.fetch_timeout)
            .await
            .with_context(|| format!("Failed to fetch scrape target {url}"))?;
        let html = String::from_utf8_lossy(&body).into_owned();

        let strategy = self.registry.find(url);
        debug!(url = %url, site = strategy.site_id(), "Scraping page");

        let pages = strategy.image_pages(&page_url, &html)?;

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();

        for page in pages {
            // The target page was already fetched; detail pages need their
            // own request, and a failed one skips just that page.
            let page_html = if page == page_url {
                html.clone()
            } else {
                match self.fetcher.http_get(page.as_str(), self.fetch_timeout).await {
                    Ok(b) => String::from_utf8_lossy(&b).into_owned(),
                    Err(e) => {
                        warn!(url = %page, error = %e, "Skipping unfetchable detail page");
                        continue;
                    }
                }
            };

            let refs = match extract::image_refs(&page, &page_html) {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %page, error = %e, "Skipping unparseable page");
                    continue;
                }
            };

            for image_url in refs {
                if !seen.insert(image_url.to_string()) {
                    continue;
                }

                let bytes = match self
                    .fetcher
                    .http_get(image_url.as_str(), self.fetch_timeout)
                    .await
                {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(url = %image_url, error = %e, "Skipping unfetchable image");
                        continue;
                    }
                };

                let name = derive_name(&image_url);
                match self.intake.intake(&bytes, &name).await {
                    Ok(Some(outcome)) => outcomes.push(outcome),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(url = %image_url, error = %e, "Failed to ingest scraped image");
                    }
                }
            }
        }

        if outcomes.is_empty() {
            return Err(IntakeError::NoImagesFound);
        }
        Ok(outcomes)
    }
}

/// Recursively collect files with supported extensions.
async fn collect_supported_files(root: &Path) -> Result<Vec<PathBuf>> {
    // Async recursion is not allowed without boxing; use an explicit stack.
    let mut stack = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && intake::supported_extension(&path.to_string_lossy()) {
                files.push(path);
            }
        }
    }

    // Directory iteration order is platform-dependent; sort for a stable
    // intake order.
    files.sort();
    Ok(files)
}

/// Derive an ingestion name for a downloaded image URL.
///
/// Uses the final path segment when it carries a supported extension;
/// otherwise falls back to a digest-derived name so distinct URLs never
/// collide.
fn derive_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    if intake::supported_extension(segment) {
        return segment.to_string();
    }

    let ext = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let digest = Sha256::digest(url.as_str().as_bytes());
    format!("{}.{ext}", hex::encode(&digest[..8]))
}
