//! Per-site scraping strategies.
//!
//! Ad-hoc scraping differs across sites only in how the set of
//! image-bearing pages is derived: most pages embed their images directly,
//! but some listing pages carry only low-resolution thumbnails and the full
//! images live behind per-image detail links. The registry maps URL
//! patterns to a strategy, defaulting to the generic single-page extractor.

use std::cmp::Reverse;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use url::Url;

use super::extract;

/// Strategy for deriving the image-bearing pages of a scrape target.
pub trait SiteStrategy: Send + Sync {
    /// Unique identifier for this strategy.
    fn site_id(&self) -> &'static str;

    /// URL patterns this strategy matches.
    fn url_patterns(&self) -> &[Regex];

    /// Check if this strategy applies to the given URL.
    fn can_handle(&self, url: &str) -> bool {
        self.url_patterns().iter().any(|p| p.is_match(url))
    }

    /// Priority for strategy selection (higher = preferred).
    fn priority(&self) -> i32 {
        0
    }

    /// Pages to extract image references from, given the already-fetched
    /// target page. The generic strategy returns the target itself; a
    /// two-level-crawl strategy returns the detail pages linked from it.
    ///
    /// # Errors
    ///
    /// Returns an error if link extraction fails.
    fn image_pages(&self, page_url: &Url, html: &str) -> Result<Vec<Url>>;
}

/// Fallback: the fetched page itself is the single image-bearing page.
pub struct GenericStrategy;

/// Shared generic instance for registry fallback.
pub static GENERIC: GenericStrategy = GenericStrategy;

static GENERIC_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r"^https?://").unwrap()]);

impl SiteStrategy for GenericStrategy {
    fn site_id(&self) -> &'static str {
        "generic"
    }

    fn url_patterns(&self) -> &[Regex] {
        &GENERIC_PATTERNS
    }

    fn image_pages(&self, page_url: &Url, _html: &str) -> Result<Vec<Url>> {
        Ok(vec![page_url.clone()])
    }
}

/// Wallhaven listing pages embed only thumbnails; the full-resolution
/// images sit on `/w/<id>` detail pages.
pub struct WallhavenStrategy;

static WALLHAVEN_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r"^https?://(www\.)?wallhaven\.cc/").unwrap()]);

static WALLHAVEN_DETAIL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/w/[a-z0-9]+$").unwrap());

impl SiteStrategy for WallhavenStrategy {
    fn site_id(&self) -> &'static str {
        "wallhaven"
    }

    fn url_patterns(&self) -> &[Regex] {
        &WALLHAVEN_PATTERNS
    }

    fn priority(&self) -> i32 {
        100
    }

    fn image_pages(&self, page_url: &Url, html: &str) -> Result<Vec<Url>> {
        extract::same_origin_links(page_url, html, &WALLHAVEN_DETAIL_PATH)
    }
}

/// Registry of site strategies.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn SiteStrategy>>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Create a registry with all built-in site strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WallhavenStrategy));
        registry
    }

    /// Register a strategy.
    pub fn register(&mut self, strategy: Box<dyn SiteStrategy>) {
        self.strategies.push(strategy);
        // Sort by priority (highest first)
        self.strategies.sort_by_key(|s| Reverse(s.priority()));
    }

    /// Find the site-specific strategy for a URL, falling back to the
    /// generic single-page extractor.
    #[must_use]
    pub fn find(&self, url: &str) -> &dyn SiteStrategy {
        self.strategies
            .iter()
            .find(|s| s.can_handle(url))
            .map_or(&GENERIC as &dyn SiteStrategy, AsRef::as_ref)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatch() {
        let registry = StrategyRegistry::with_defaults();

        assert_eq!(
            registry.find("https://wallhaven.cc/search?q=nature").site_id(),
            "wallhaven"
        );
        assert_eq!(
            registry.find("https://www.wallhaven.cc/latest").site_id(),
            "wallhaven"
        );
        assert_eq!(
            registry.find("https://example.com/gallery").site_id(),
            "generic"
        );
    }

    #[test]
    fn test_wallhaven_collects_detail_pages() {
        let page_url = Url::parse("https://wallhaven.cc/search?q=nature").unwrap();
        let html = r#"
            <html><body>
                <a href="/w/abc123"><img src="/thumbs/abc123.jpg"></a>
                <a href="/w/xyz789"><img src="/thumbs/xyz789.jpg"></a>
                <a href="/tag/55">nature</a>
            </body></html>
        "#;

        let pages = WallhavenStrategy.image_pages(&page_url, html).unwrap();
        let pages: Vec<String> = pages.into_iter().map(String::from).collect();
        assert_eq!(
            pages,
            vec![
                "https://wallhaven.cc/w/abc123".to_string(),
                "https://wallhaven.cc/w/xyz789".to_string(),
            ]
        );
    }

    #[test]
    fn test_generic_uses_page_itself() {
        let page_url = Url::parse("https://example.com/gallery").unwrap();
        let pages = GenericStrategy.image_pages(&page_url, "<html></html>").unwrap();
        assert_eq!(pages, vec![page_url]);
    }
}
