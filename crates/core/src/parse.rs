//! HTML parsing and DOM querying.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! handler and strategy to select nodes with CSS selectors and read their
//! attributes and text.
//!
//! # Example
//!
//! ```rust
//! use glimpse_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs.len(), 1);
//! ```

use scraper::{Html, Selector};
use url::Url;

use crate::{GlimpseError, Result};

/// Represents a parsed HTML document.
///
/// A Document wraps an HTML page and provides methods for querying elements
/// using CSS selectors and reading page metadata.
///
/// # Example
///
/// ```rust
/// use glimpse_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html).unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses a full HTML document fetched from `url`.
    ///
    /// The URL is used to resolve relative links such as `<link rel="canonical">`.
    pub fn parse_with_url(html: &str, url: Url) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: Some(url) })
    }

    /// Resolves a possibly relative link against the base URL.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        match &self.base_url {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`GlimpseError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use glimpse_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html).unwrap();
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Trimmed text of the first element matching `selector` that has any text.
    ///
    /// Invalid selectors and missing elements both yield `None`.
    pub fn select_first_text(&self, selector: &str) -> Option<String> {
        self.select(selector)
            .ok()?
            .iter()
            .map(Element::text_trimmed)
            .find(|text| !text.is_empty())
    }

    /// Value of `attr` on the first element matching `selector` that has it.
    pub fn select_first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        self.select(selector)
            .ok()?
            .iter()
            .filter_map(|el| el.attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed content of the `<title>` element if present and non-empty.
    pub fn title(&self) -> Option<String> {
        self.select_first_text("title")
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use glimpse_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text content with whitespace runs collapsed and ends trimmed.
    pub fn text_trimmed(&self) -> String {
        self.element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`GlimpseError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Trimmed text of the first matching descendant with any text.
    pub fn select_first_text(&self, selector: &str) -> Option<String> {
        self.select(selector)
            .ok()?
            .iter()
            .map(Element::text_trimmed)
            .find(|text| !text.is_empty())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| GlimpseError::HtmlParseError(format!("Invalid selector: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>
                Test Page
            </title>
            <link rel="canonical" href="/canonical/path">
        </head>
        <body>
            <h1>Heading</h1>
            <p class="content">Paragraph 1</p>
            <p class="content">Paragraph   2</p>
            <a href="https://example.com">Link</a>
            <div class="result"><a class="title" href="/r1">  </a><a class="title" href="/r2">Second</a></div>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
        assert_eq!(elements[1].text_trimmed(), "Paragraph 2");
    }

    #[test]
    fn test_element_attributes() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("a[href^='https']").unwrap();

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("href"), Some("https://example.com"));
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(GlimpseError::HtmlParseError(_))));
        assert!(doc.select_first_text("[[invalid").is_none());
    }

    #[test]
    fn test_select_first_text_skips_empty() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.select_first_text(".result a.title"), Some("Second".to_string()));
    }

    #[test]
    fn test_nested_select() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = &doc.select(".result").unwrap()[0];
        let links = result.select("a.title").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(result.select_first_text("a"), Some("Second".to_string()));
    }

    #[test]
    fn test_resolve_against_base() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        let doc = Document::parse_with_url(SAMPLE_HTML, base).unwrap();
        let href = doc.select_first_attr("link[rel='canonical']", "href").unwrap();
        assert_eq!(doc.resolve(&href).unwrap().as_str(), "https://example.com/canonical/path");
    }
}
