use serde::{Deserialize, Serialize};

/// One row per distinct image name in the gallery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub name: String,
    pub duplicate: bool,
    pub status: String,
    pub fingerprint: Option<String>,
    pub created_at: String,
}

/// Moderation status of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Approved,
    Deleted,
}

impl ImageStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Status filter for listing queries.
///
/// `All` is the sentinel that bypasses the status predicate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(ImageStatus),
}

impl StatusFilter {
    /// Parse a query-string filter value. Unknown values fall back to `All`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        ImageStatus::from_str(s).map_or(Self::All, Self::Only)
    }
}

/// A moderation action requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Delete,
}

impl ModerationAction {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Aggregate gallery counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GalleryStats {
    pub approved: i64,
    pub total: i64,
}
