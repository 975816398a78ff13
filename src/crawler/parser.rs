//! HTML metadata extraction
//!
//! Links are found by the regex classifier in `crate::link`; this module only
//! pulls the page title and meta description out of the document.

use scraper::{Html, Selector};

/// Title and description of a fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// Text of the first `<title>`, trimmed; empty when missing
    pub title: String,

    /// `content` of `<meta name="description">`; empty when missing
    pub description: String,
}

/// Parses a page and extracts its metadata
///
/// # Example
///
/// ```
/// use onion_crawler::crawler::parse_metadata;
///
/// let html = r#"<html><head><title>Test</title>
/// <meta name="description" content="A test page"></head></html>"#;
/// let metadata = parse_metadata(html);
/// assert_eq!(metadata.title, "Test");
/// assert_eq!(metadata.description, "A test page");
/// ```
pub fn parse_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    PageMetadata {
        title: extract_title(&document),
        description: extract_meta_description(&document),
    }
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_meta_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return String::new();
    };

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}
