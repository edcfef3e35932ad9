use thiserror::Error;

/// Failures surfaced by the ingestion and moderation core.
///
/// Item-level failures (`UnsupportedFormat`) are handled inside batch loops
/// and never abort sibling items; the remaining variants are call-level and
/// surface to the request layer with a human-readable message.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The input bytes could not be decoded as a supported image.
    #[error("input could not be decoded as a supported image")]
    UnsupportedFormat,

    /// The external downloader tool exited non-zero.
    #[error("download tool failed: {stderr}")]
    DownloadTool { stderr: String },

    /// A scrape or configured download completed without ingesting anything.
    #[error("no images found")]
    NoImagesFound,

    /// An unrecognized moderation action was requested.
    #[error("invalid moderation action: {0:?}")]
    InvalidAction(String),

    /// Infrastructure failure (database, blob store, filesystem).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
