//! Title and body extraction for a single chapter page.

use scraper::{ElementRef, Html, Selector};

use novel_dl_shared::{NovelDlError, Result};

/// Title and raw body markup pulled from a chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    /// Chapter title (falls back to `chapter-<position>`).
    pub title: String,
    /// Inner HTML of the content container, not yet sanitized.
    pub raw_body: String,
}

/// Compiled title and body selectors, each tried in priority order.
#[derive(Debug)]
pub struct ChapterSelectors {
    title: Vec<Selector>,
    content: Vec<Selector>,
}

impl ChapterSelectors {
    /// Compile selector lists from config strings.
    pub fn compile(title: &[String], content: &[String]) -> Result<Self> {
        if content.is_empty() {
            return Err(NovelDlError::config("no content selectors configured"));
        }
        Ok(Self {
            title: compile_all(title)?,
            content: compile_all(content)?,
        })
    }
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|css| {
            Selector::parse(css)
                .map_err(|e| NovelDlError::config(format!("invalid selector '{css}': {e:?}")))
        })
        .collect()
}

/// Parse a chapter page and extract its title and body.
///
/// Fails with a parse error when no content selector matches.
pub fn parse_chapter(html: &str, selectors: &ChapterSelectors, position: u32) -> Result<ChapterContent> {
    let doc = Html::parse_document(html);

    let title = first_match(&doc, &selectors.title)
        .map(element_title)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("chapter-{position}"));

    let raw_body = first_match(&doc, &selectors.content)
        .map(|el| el.inner_html())
        .ok_or_else(|| NovelDlError::parse(format!("no chapter content found for #{position}")))?;

    Ok(ChapterContent { title, raw_body })
}

fn first_match<'a>(doc: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| doc.select(sel).next())
}

/// Prefer the `title` attribute, then the element's text.
fn element_title(el: ElementRef<'_>) -> String {
    el.value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or_else(|| el.text().collect::<String>().trim().to_string())
}

/// Drop a leading copy of the title from the chapter body.
///
/// Many sites repeat the title as the first line of the content.
pub fn strip_title_prefix(body: &str, title: &str) -> String {
    let title = title.trim();
    match body.strip_prefix(title) {
        Some(rest) if !title.is_empty() => rest.trim_start().to_string(),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> ChapterSelectors {
        ChapterSelectors::compile(
            &[
                "#content_wrapper > div.page-title > span".into(),
                ".toon-title".into(),
            ],
            &["#novel_content".into(), ".view-content".into()],
        )
        .unwrap()
    }

    #[test]
    fn extracts_title_and_body() {
        let html = r#"<html><body><div id="content_wrapper">
            <div class="page-title"><span> 제12화 </span></div>
            <div id="novel_content"><p>본문</p></div>
        </div></body></html>"#;
        let content = parse_chapter(html, &selectors(), 12).unwrap();
        assert_eq!(content.title, "제12화");
        assert_eq!(content.raw_body, "<p>본문</p>");
    }

    #[test]
    fn falls_back_through_selectors() {
        let html = r#"<h1 class="toon-title" title="Episode 3">Episode 3<br>extra</h1>
            <div class="view-content">text</div>"#;
        let content = parse_chapter(html, &selectors(), 3).unwrap();
        assert_eq!(content.title, "Episode 3");
        assert_eq!(content.raw_body, "text");
    }

    #[test]
    fn missing_title_uses_position() {
        let html = r#"<div id="novel_content">x</div>"#;
        let content = parse_chapter(html, &selectors(), 7).unwrap();
        assert_eq!(content.title, "chapter-7");
    }

    #[test]
    fn missing_body_is_parse_error() {
        let html = r#"<div class="toon-title">T</div><p>no container</p>"#;
        let err = parse_chapter(html, &selectors(), 1).unwrap_err();
        assert!(matches!(err, NovelDlError::Parse { .. }));
    }

    #[test]
    fn compile_rejects_bad_selector() {
        let err = ChapterSelectors::compile(&[], &["div[".into()]).unwrap_err();
        assert!(err.to_string().contains("invalid selector"));
    }

    #[test]
    fn strip_title_prefix_removes_repeat() {
        assert_eq!(strip_title_prefix("1화\n\n본문", "1화"), "본문");
        assert_eq!(strip_title_prefix("본문", "1화"), "본문");
        assert_eq!(strip_title_prefix("본문", ""), "본문");
    }
}
