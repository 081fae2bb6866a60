//! Link extraction from staged HTML artifacts

use crate::urls::{normalize_url, AllowList};
use scraper::{Html, Selector};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// Read a saved HTML artifact and return the admissible links it contains
///
/// An unreadable file yields no links. Links are returned in document
/// order and are not deduplicated.
pub async fn extract_links(path: &Path, source: &Url, allow: &AllowList) -> Vec<Url> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                file = %path.display(),
                error = %e,
                "could not read artifact for link extraction"
            );
            return Vec::new();
        }
    };
    let html = String::from_utf8_lossy(&bytes);
    let links = links_from_html(&html, source, allow);
    debug!(url = %source, count = links.len(), "extracted links");
    links
}

/// Collect `a[href]` targets, resolved against `source` and filtered
/// through the allow list
///
/// Parsing is best-effort: malformed markup produces whatever anchors the
/// parser recovers, possibly none.
pub fn links_from_html(html: &str, source: &Url, allow: &AllowList) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(source, href))
        .filter(|url| allow.allows(url))
        .collect()
}

/// Resolve an href to an absolute, fragment-free http(s) URL
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let joined = base.join(href).ok()?;
    normalize_url(joined.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/page").unwrap()
    }

    fn allow() -> AllowList {
        AllowList::parse(["example.com"]).unwrap()
    }

    #[test]
    fn test_resolves_relative_links() {
        let html = r#"<a href="/docs/other">Other</a><a href="sibling">Sib</a>"#;
        let links = links_from_html(html, &base(), &allow());
        let links: Vec<_> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/other",
                "https://example.com/docs/sibling"
            ]
        );
    }

    #[test]
    fn test_filters_disallowed_hosts() {
        let html = r#"<a href="https://example.com/b">B</a><a href="https://other.com/c">C</a>"#;
        let links = links_from_html(html, &base(), &allow());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/b");
    }

    #[test]
    fn test_skips_special_schemes_and_anchors() {
        let html = r##"
            <a href="#top">Top</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="">Empty</a>
        "##;
        assert!(links_from_html(html, &base(), &allow()).is_empty());
    }

    #[test]
    fn test_strips_fragments() {
        let html = r#"<a href="/docs/x#part-2">X</a>"#;
        let links = links_from_html(html, &base(), &allow());
        assert_eq!(links[0].as_str(), "https://example.com/docs/x");
    }

    #[test]
    fn test_keeps_duplicates() {
        let html = r#"<a href="/b">1</a><a href="/b">2</a>"#;
        assert_eq!(links_from_html(html, &base(), &allow()).len(), 2);
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let html = "<a href='/ok'>ok</a><<<div <a href=\"/broken";
        let links = links_from_html(html, &base(), &allow());
        assert!(links.iter().all(|u| u.host_str() == Some("example.com")));

        assert!(links_from_html("\u{0}\u{1}garbage", &base(), &allow()).is_empty());
    }

    #[tokio::test]
    async fn test_extract_links_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let links = extract_links(&dir.path().join("nope.html"), &base(), &allow()).await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_extract_links_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, r#"<html><body><a href="/b">B</a></body></html>"#).unwrap();
        let links = extract_links(&path, &base(), &allow()).await;
        assert_eq!(links.len(), 1);
    }
}
