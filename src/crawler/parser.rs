//! HTML link extraction
//!
//! This module turns a fetched discussion page into the list of outbound
//! URLs its comments reference.

use crate::url::normalize_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Anchors inside Hacker News comment bodies
pub const COMMENT_LINK_SELECTOR: &str = ".commtext a[href]";

/// Every anchor on the page
pub const ALL_LINKS_SELECTOR: &str = "a[href]";

/// Finite, single-pass sequence of extracted links
pub type Links = std::vec::IntoIter<Url>;

/// Extracts outbound links from HTML
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `href` of every element matching the selector, resolved against the
///   page URL
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Non-HTTP(S) URLs after resolution
/// - Links back to the page itself
///
/// Links are de-duplicated after normalization, keeping the first
/// occurrence's position.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    selector: String,
}

impl LinkExtractor {
    /// Creates an extractor for a CSS selector
    ///
    /// An invalid selector extracts nothing; configuration validation rejects
    /// such selectors before they get here.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// Extractor for links inside comment bodies
    pub fn comments() -> Self {
        Self::new(COMMENT_LINK_SELECTOR)
    }

    /// Extractor for every anchor on the page
    pub fn all_anchors() -> Self {
        Self::new(ALL_LINKS_SELECTOR)
    }

    /// Extracts the absolute outbound URLs referenced by `content`
    ///
    /// Pure function: no I/O. Bytes that are not valid UTF-8 are replaced
    /// rather than rejected. Empty input yields an empty sequence.
    ///
    /// # Example
    ///
    /// ```
    /// use url::Url;
    /// use ycrawler::crawler::LinkExtractor;
    ///
    /// let html = br#"<span class="commtext">see <a href="/docs">docs</a></span>"#;
    /// let base = Url::parse("https://example.com/item?id=1").unwrap();
    /// let links: Vec<Url> = LinkExtractor::comments().extract(html, &base).collect();
    /// assert_eq!(links[0].as_str(), "https://example.com/docs");
    /// ```
    pub fn extract(&self, content: &[u8], base_url: &Url) -> Links {
        if content.is_empty() {
            return Vec::new().into_iter();
        }

        let Ok(selector) = Selector::parse(&self.selector) else {
            tracing::warn!("Ignoring invalid link selector '{}'", self.selector);
            return Vec::new().into_iter();
        };

        let html = String::from_utf8_lossy(content);
        let document = Html::parse_document(&html);

        let own_url = normalize_link(base_url.clone());
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_link(href, base_url) else {
                continue;
            };

            let url = normalize_link(url);
            if url == own_url {
                continue;
            }
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }

        links.into_iter()
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::comments()
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://news.ycombinator.com/item?id=100").unwrap()
    }

    fn comments(body: &str) -> String {
        format!(
            r#"<html><body><table>
            <tr class="athing comtr"><td><div class="comment"><span class="commtext c00">{}</span></div></td></tr>
            </table></body></html>"#,
            body
        )
    }

    fn extract(html: &str) -> Vec<String> {
        LinkExtractor::comments()
            .extract(html.as_bytes(), &base_url())
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_empty_content() {
        let links: Vec<Url> = LinkExtractor::comments().extract(b"", &base_url()).collect();
        assert!(links.is_empty());
    }

    #[test]
    fn test_no_comments() {
        assert!(extract("<html><body><a href=\"https://x.test/\">nav</a></body></html>").is_empty());
    }

    #[test]
    fn test_extract_absolute_link() {
        let links = extract(&comments(r#"<a href="https://other.com/page">Link</a>"#));
        assert_eq!(links, vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_link() {
        let links = extract(&comments(r#"<a href="/item?id=200">parent</a>"#));
        assert_eq!(links, vec!["https://news.ycombinator.com/item?id=200"]);
    }

    #[test]
    fn test_ignores_links_outside_comments() {
        let html = format!(
            r#"<a href="https://nav.test/">nav</a>{}"#,
            comments(r#"<a href="https://inside.test/">x</a>"#)
        );
        assert_eq!(extract(&html), vec!["https://inside.test/"]);
    }

    #[test]
    fn test_all_anchors() {
        let html = format!(
            r#"<a href="https://nav.test/">nav</a>{}"#,
            comments(r#"<a href="https://inside.test/">x</a>"#)
        );
        let links: Vec<String> = LinkExtractor::all_anchors()
            .extract(html.as_bytes(), &base_url())
            .map(|u| u.to_string())
            .collect();
        assert_eq!(links, vec!["https://nav.test/", "https://inside.test/"]);
    }

    #[test]
    fn test_deduplicates_preserving_order() {
        let links = extract(&comments(
            r#"<a href="https://b.test/">1</a>
               <a href="https://a.test/">2</a>
               <a href="https://b.test/#frag">3</a>
               <a href="https://a.test/">4</a>"#,
        ));
        assert_eq!(links, vec!["https://b.test/", "https://a.test/"]);
    }

    #[test]
    fn test_skips_special_schemes() {
        let links = extract(&comments(
            r##"<a href="javascript:void(0)">js</a>
               <a href="MAILTO:someone@example.com">mail</a>
               <a href="tel:+1234567890">tel</a>
               <a href="data:text/html,hi">data</a>
               <a href="ftp://files.test/x">ftp</a>
               <a href="#reply">anchor</a>
               <a href="">empty</a>"##,
        ));
        assert!(links.is_empty(), "{:?}", links);
    }

    #[test]
    fn test_skips_link_to_own_page() {
        let links = extract(&comments(
            r#"<a href="https://news.ycombinator.com/item?id=100">self</a>
               <a href="https://other.test/">other</a>"#,
        ));
        assert_eq!(links, vec!["https://other.test/"]);
    }

    #[test]
    fn test_multiple_comments() {
        let html = r#"<html><body>
            <span class="commtext"><a href="https://one.test/">1</a></span>
            <div class="commtext"><p>text <a href="https://two.test/">2</a></p></div>
            <span class="commtext"><a href="https://three.test/" rel="nofollow">3</a></span>
        </body></html>"#;
        assert_eq!(extract(html).len(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut html = comments(r#"<a href="https://ok.test/">ok</a>"#).into_bytes();
        html.extend_from_slice(&[0xff, 0xfe, 0xfd]);

        let links: Vec<Url> = LinkExtractor::comments().extract(&html, &base_url()).collect();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_invalid_selector_extracts_nothing() {
        let links: Vec<Url> = LinkExtractor::new("a[[")
            .extract(comments(r#"<a href="https://x.test/">x</a>"#).as_bytes(), &base_url())
            .collect();
        assert!(links.is_empty());
    }
}
