//! Positional link extraction from the chapter listing page.
//!
//! The listing renders each chapter as the n-th entry of a known list
//! container. For every position in the requested range the selector template
//! is instantiated with that position and looked up in the parsed document.

use std::ops::RangeInclusive;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use novel_dl_shared::{ChapterLink, NovelDlError, Result};

/// Placeholder replaced with the 1-based position in selector templates.
pub const POSITION_PLACEHOLDER: &str = "{n}";

/// A listing entry selector template such as `ul > li:nth-child({n}) > a`.
#[derive(Debug, Clone)]
pub struct ListingSelector {
    template: String,
}

impl ListingSelector {
    /// Validate `template` and wrap it.
    ///
    /// The template must contain `{n}` and must parse as a CSS selector once
    /// the placeholder is filled in.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(POSITION_PLACEHOLDER) {
            return Err(NovelDlError::config(format!(
                "listing selector has no {POSITION_PLACEHOLDER} placeholder: {template}"
            )));
        }
        let selector = Self { template };
        selector.for_position(1)?;
        Ok(selector)
    }

    /// Compile the selector for one position.
    pub fn for_position(&self, position: u32) -> Result<Selector> {
        let css = self
            .template
            .replace(POSITION_PLACEHOLDER, &position.to_string());
        Selector::parse(&css)
            .map_err(|e| NovelDlError::config(format!("invalid listing selector '{css}': {e:?}")))
    }
}

/// Extract chapter links for the listing positions in `positions`.
///
/// Positions stay absolute: the link found at the 7th entry has position 7
/// whatever the range starts at. Positions with no matching entry, or whose
/// `href` is empty, an anchor, or unresolvable against `base_url`, are
/// skipped. The result is strictly increasing in `position`; an empty range
/// yields no links.
pub fn extract_links(
    doc: &Html,
    base_url: &Url,
    positions: RangeInclusive<u32>,
    selector: &ListingSelector,
) -> Result<Vec<ChapterLink>> {
    let mut links = Vec::new();

    for position in positions {
        let sel = selector.for_position(position)?;

        let Some(href) = doc
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
        else {
            debug!(position, "no listing entry");
            continue;
        };

        match resolve_href(base_url, href) {
            Some(url) => links.push(ChapterLink::new(position, url)),
            None => debug!(position, href, "unusable chapter href, skipping"),
        }
    }

    Ok(links)
}

/// Parse raw listing HTML and extract its chapter links.
#[instrument(skip_all, fields(base_url = %base_url, first = *positions.start(), last = *positions.end()))]
pub fn links_from_html(
    html: &str,
    base_url: &Url,
    positions: RangeInclusive<u32>,
    selector: &ListingSelector,
) -> Result<Vec<ChapterLink>> {
    let doc = Html::parse_document(html);
    let links = extract_links(&doc, base_url, positions, selector)?;
    debug!(found = links.len(), "listing parsed");
    Ok(links)
}

fn resolve_href(base_url: &Url, href: &str) -> Option<Url> {
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let mut url = base_url.join(href).ok()?;
    url.set_fragment(None);
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}
