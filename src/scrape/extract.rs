//! Image-reference extraction from fetched HTML.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::intake::supported_extension;

/// Resolve a raw reference against the page it appeared on.
///
/// Handles absolute URLs, protocol-relative (`//host/img.png`) and
/// root-relative (`/img.png`) references. Non-HTTP schemes are dropped.
#[must_use]
pub fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let resolved = base.join(raw.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Collect every embedded image reference whose path ends in a supported
/// extension, resolved against the page URL. Order preserved, de-duplicated.
///
/// # Errors
///
/// Returns an error if the selector fails to parse.
pub fn image_refs(page_url: &Url, html: &str) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    let img_selector =
        Selector::parse("img[src]").map_err(|e| anyhow!("Failed to create selector: {e:?}"))?;

    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for element in document.select(&img_selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Some(resolved) = resolve_reference(page_url, src) else {
            continue;
        };
        if !supported_extension(resolved.path()) {
            continue;
        }
        if seen.insert(resolved.to_string()) {
            refs.push(resolved);
        }
    }

    Ok(refs)
}

/// Collect same-origin links whose path matches a pattern.
///
/// This feeds the two-level crawl strategies: listing pages link to detail
/// pages, and only the detail pages carry full-resolution images.
///
/// # Errors
///
/// Returns an error if the selector fails to parse.
pub fn same_origin_links(page_url: &Url, html: &str, path_pattern: &Regex) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    let link_selector =
        Selector::parse("a[href]").map_err(|e| anyhow!("Failed to create selector: {e:?}"))?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_reference(page_url, href) else {
            continue;
        };
        let same_origin = resolved.scheme() == page_url.scheme()
            && resolved.host_str() == page_url.host_str()
            && resolved.port_or_known_default() == page_url.port_or_known_default();
        if !same_origin || !path_pattern.is_match(resolved.path()) {
            continue;
        }
        if seen.insert(resolved.to_string()) {
            links.push(resolved);
        }
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/gallery/page1").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve_reference(&base(), "https://cdn.example.org/a.jpg").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/a.jpg");
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve_reference(&base(), "/images/a.jpg").unwrap();
        assert_eq!(url.as_str(), "https://example.com/images/a.jpg");
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let url = resolve_reference(&base(), "//cdn.example.org/a.jpg").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/a.jpg");
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert!(resolve_reference(&base(), "data:image/png;base64,AAAA").is_none());
        assert!(resolve_reference(&base(), "javascript:void(0)").is_none());
    }

    #[test]
    fn test_image_refs_filters_and_dedupes() {
        let html = r#"
            <html><body>
                <img src="/a.jpg">
                <img src="/a.jpg">
                <img src="//cdn.example.org/b.png">
                <img src="/thumb.gif">
                <img src="/page.html">
                <img alt="no src">
            </body></html>
        "#;

        let refs = image_refs(&base(), html).unwrap();
        let refs: Vec<String> = refs.into_iter().map(String::from).collect();
        assert_eq!(
            refs,
            vec![
                "https://example.com/a.jpg".to_string(),
                "https://cdn.example.org/b.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_same_origin_links() {
        let html = r#"
            <html><body>
                <a href="/w/abc123">one</a>
                <a href="https://example.com/w/def456">two</a>
                <a href="https://elsewhere.com/w/ghi789">off-site</a>
                <a href="/tag/nature">other path</a>
            </body></html>
        "#;

        let pattern = Regex::new(r"^/w/[a-z0-9]+$").unwrap();
        let links = same_origin_links(&base(), html, &pattern).unwrap();
        let links: Vec<String> = links.into_iter().map(String::from).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/w/abc123".to_string(),
                "https://example.com/w/def456".to_string(),
            ]
        );
    }
}
