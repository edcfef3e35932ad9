//! Outbound network and subprocess collaborators.
//!
//! Scraping needs two capabilities from the outside world: plain HTTP GETs
//! with a short fixed timeout, and the external `gallery-dl`-style
//! downloader tool. Both sit behind the [`Fetcher`] trait so the scrape
//! paths can be driven by fakes in tests.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::IntakeError;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL's body. A single failed fetch is a skip, never retried.
    async fn http_get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;

    /// Run the configured external downloader against a destination
    /// directory. The tool's behavior is opaque: it downloads media from
    /// the URL into the directory.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::DownloadTool`] with the tool's stderr when it
    /// exits non-zero.
    async fn run_download_tool(&self, url: &str, dest_dir: &Path) -> Result<(), IntakeError>;
}

/// Production fetcher: reqwest for HTTP, a spawned subprocess for the
/// downloader tool.
pub struct CommandFetcher {
    client: reqwest::Client,
    tool_path: String,
    tool_config: Option<std::path::PathBuf>,
}

impl CommandFetcher {
    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gallery-intake/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            tool_path: config.gallery_dl_path.clone(),
            tool_config: config.gallery_dl_config.clone(),
        })
    }
}

#[async_trait]
impl Fetcher for CommandFetcher {
    async fn http_get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching URL");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("Non-success status fetching {url}"))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;

        Ok(bytes.to_vec())
    }

    async fn run_download_tool(&self, url: &str, dest_dir: &Path) -> Result<(), IntakeError> {
        let mut args = vec![
            url.to_string(),
            "--directory".to_string(),
            dest_dir.to_string_lossy().to_string(),
            // Use flat directory structure
            "--filename".to_string(),
            "{category}_{filename}.{extension}".to_string(),
            "--no-mtime".to_string(),
        ];

        if let Some(config_path) = &self.tool_config {
            args.push("--config".to_string());
            args.push(config_path.to_string_lossy().to_string());
        }

        debug!(url = %url, tool = %self.tool_path, "Running download tool");

        let output = Command::new(&self.tool_path)
            .args(&args)
            .current_dir(dest_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn download tool")?
            .wait_with_output()
            .await
            .context("Failed to wait for download tool")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(IntakeError::DownloadTool { stderr });
        }

        Ok(())
    }
}
