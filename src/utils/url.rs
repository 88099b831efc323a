// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve an href against a base page and canonicalize it.
///
/// Returns `None` for hrefs that never name a page: empty, fragment-only,
/// `javascript:`, `mailto:`, `tel:` and non-HTTP schemes. The fragment is
/// dropped so `/news/1#top` and `/news/1` are the same item.
///
/// # Examples
/// ```
/// use sitewatch::utils::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/news/").unwrap();
/// assert_eq!(
///     canonicalize(&base, "item-1#comments").as_deref(),
///     Some("https://example.com/news/item-1")
/// );
/// assert_eq!(canonicalize(&base, "javascript:void(0)"), None);
/// ```
pub fn canonicalize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Compare two URLs ignoring a trailing slash.
pub fn same_page(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Whether `url` shares scheme, host and port with `origin`.
pub fn same_origin(origin: &Url, url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.origin() == origin.origin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/path/index.html").unwrap()
    }

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            canonicalize(&base(), "https://other.com/page").as_deref(),
            Some("https://other.com/page")
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(
            canonicalize(&base(), "/root.html").as_deref(),
            Some("https://example.com/root.html")
        );
    }

    #[test]
    fn test_resolve_relative_from_file() {
        assert_eq!(
            canonicalize(&base(), "other.html").as_deref(),
            Some("https://example.com/path/other.html")
        );
    }

    #[test]
    fn test_rejects_non_page_hrefs() {
        assert_eq!(canonicalize(&base(), ""), None);
        assert_eq!(canonicalize(&base(), "#"), None);
        assert_eq!(canonicalize(&base(), "#section"), None);
        assert_eq!(canonicalize(&base(), "JavaScript:void(0)"), None);
        assert_eq!(canonicalize(&base(), "mailto:a@b.c"), None);
        assert_eq!(canonicalize(&base(), "ftp://example.com/file"), None);
    }

    #[test]
    fn test_fragment_removed() {
        assert_eq!(
            canonicalize(&base(), "/news/1#top").as_deref(),
            Some("https://example.com/news/1")
        );
    }

    #[test]
    fn test_same_page_ignores_trailing_slash() {
        assert!(same_page("https://a.mn/unitel/", "https://a.mn/unitel"));
        assert!(!same_page("https://a.mn/unitel/1", "https://a.mn/unitel"));
    }

    #[test]
    fn test_same_origin() {
        let origin = Url::parse("https://example.com/start").unwrap();
        assert!(same_origin(&origin, "https://example.com/other"));
        assert!(!same_origin(&origin, "http://example.com/other"));
        assert!(!same_origin(&origin, "https://cdn.example.com/x"));
    }
}
