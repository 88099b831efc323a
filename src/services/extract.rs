// src/services/extract.rs

//! HTML extraction shared by the listing-based adapters.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Item, SUMMARY_MAX};
use crate::utils::collapse_whitespace;
use crate::utils::url::{canonicalize, same_origin, same_page};

/// Elements whose text never counts as page content.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "nav", "header", "footer"];

/// Anchor candidates when a site configures none.
pub const DEFAULT_LINK_SELECTORS: &[&str] = &[
    "article a[href]",
    ".card a[href]",
    ".news-item a[href]",
    ".news-list a[href]",
    "[class*=news] a[href]",
    "[class*=article] a[href]",
];

/// Detail-page content containers when a site configures none.
pub const DEFAULT_DETAIL_SELECTORS: &[&str] = &["article", ".content", "main", "body"];

/// Parse a CSS selector, keeping the source text in the error.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Parse the configured selectors, or the defaults when none are configured.
pub fn parse_selectors(configured: &[String], defaults: &[&str]) -> Result<Vec<Selector>> {
    if configured.is_empty() {
        defaults.iter().map(|s| parse_selector(s)).collect()
    } else {
        configured.iter().map(|s| parse_selector(s)).collect()
    }
}

/// Decides which resolved links may become items.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    include_patterns: Vec<String>,
    excluded: Vec<String>,
}

impl LinkFilter {
    pub fn new(include_patterns: &[String]) -> Self {
        Self {
            include_patterns: include_patterns.to_vec(),
            excluded: Vec::new(),
        }
    }

    /// Never accept this URL (compared ignoring a trailing slash).
    pub fn exclude(mut self, url: impl Into<String>) -> Self {
        self.excluded.push(url.into());
        self
    }

    pub fn accepts(&self, url: &str) -> bool {
        if self.excluded.iter().any(|ex| same_page(ex, url)) {
            return false;
        }
        self.include_patterns.is_empty()
            || self.include_patterns.iter().any(|p| url.contains(p.as_str()))
    }
}

/// Items found on a listing page.
///
/// Anchors matching `selectors` are tried first, in selector order. When
/// they yield nothing, every same-origin `a[href]` on the page is scanned
/// with the same filter and the link text (or URL) as title.
pub fn listing_items(
    document: &Html,
    base: &Url,
    selectors: &[Selector],
    filter: &LinkFilter,
) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for selector in selectors {
        for anchor in document.select(selector) {
            let Some(url) = accepted_url(anchor, base, filter, &mut seen) else {
                continue;
            };
            let mut item = Item::new(url, anchor_title(anchor)).with_summary(summary_near(anchor));
            if let Some(date) = date_near(anchor) {
                item = item.with_date(date);
            }
            items.push(item);
        }
    }

    if items.is_empty() {
        log::debug!("Primary selectors matched nothing on {}, scanning all links", base);
        for anchor in all_anchors(document) {
            let Some(url) = accepted_url(anchor, base, filter, &mut seen) else {
                continue;
            };
            if !same_origin(base, &url) {
                continue;
            }
            let text = element_text(anchor);
            let title = if text.is_empty() { url.clone() } else { text };
            items.push(Item::new(url, title));
        }
    }

    items
}

fn accepted_url(
    anchor: ElementRef<'_>,
    base: &Url,
    filter: &LinkFilter,
    seen: &mut HashSet<String>,
) -> Option<String> {
    let href = anchor.value().attr("href")?;
    let url = canonicalize(base, href)?;
    if !filter.accepts(&url) || !seen.insert(url.clone()) {
        return None;
    }
    Some(url)
}

/// Every anchor carrying an `href`, in document order.
pub fn all_anchors(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a" && el.value().attr("href").is_some())
}

/// First heading inside the anchor, else the anchor's own text.
pub fn anchor_title(anchor: ElementRef<'_>) -> String {
    anchor
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| is_heading(el.value().name()))
        .map(element_text)
        .unwrap_or_else(|| element_text(anchor))
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Date text near the anchor.
///
/// Looks in the anchor's parent for an element whose class mentions
/// date/time/publish, then for a `<time>` element (its `datetime`
/// attribute wins over its text).
pub fn date_near(anchor: ElementRef<'_>) -> Option<String> {
    let parent = parent_element(anchor)?;
    let descendants = || parent.descendants().skip(1).filter_map(ElementRef::wrap);

    let by_class = descendants().find(|el| {
        el.value().attr("class").is_some_and(|class| {
            let class = class.to_lowercase();
            ["date", "time", "publish"].iter().any(|k| class.contains(k))
        })
    });
    if let Some(el) = by_class {
        return Some(element_text(el)).filter(|t| !t.is_empty());
    }

    let time = descendants().find(|el| el.value().name() == "time")?;
    time.value()
        .attr("datetime")
        .map(str::to_string)
        .or_else(|| Some(element_text(time)))
        .filter(|t| !t.trim().is_empty())
}

/// Text of the first `<p>` in the anchor's parent, capped to summary length.
pub fn summary_near(anchor: ElementRef<'_>) -> String {
    parent_element(anchor)
        .and_then(|parent| {
            parent
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "p")
        })
        .map(element_text)
        .map(|text| crate::utils::truncate_graphemes(&text, SUMMARY_MAX))
        .unwrap_or_default()
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// All text below the element, whitespace-collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Visible text of the element, skipping scripts, styles and page chrome.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_visible(element, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_visible<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text),
            Node::Element(el) if !HIDDEN_TAGS.contains(&el.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_visible(child, parts);
                }
            }
            _ => {}
        }
    }
}

/// Visible text of the first container matched by `selectors`, tried in order.
pub fn detail_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(visible_text)
        .filter(|text| !text.is_empty())
}

/// Page title from `<title>`, else the first `<h1>`.
pub fn page_title(document: &Html) -> String {
    let elements = || document.root_element().descendants().filter_map(ElementRef::wrap);
    elements()
        .find(|el| el.value().name() == "title")
        .map(element_text)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            elements()
                .find(|el| el.value().name() == "h1")
                .map(element_text)
        })
        .unwrap_or_default()
}

/// Whether the element sits inside navigation, header/footer chrome or a script.
pub fn in_page_chrome(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| match node.value() {
        Node::Element(el) => HIDDEN_TAGS.contains(&el.name()),
        _ => false,
    })
}
