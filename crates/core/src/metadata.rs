use crate::Document;
use crate::summary::{collapse_whitespace, looks_like_css};

/// Title/description metadata read from a page's head and first heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub heading: Option<String>,
    pub site_name: Option<String>,
    pub canonical_url: Option<String>,
}

impl PageMetadata {
    /// Best title candidate, falling back to the first heading.
    pub fn best_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.heading.as_deref())
    }
}

impl Document {
    /// Extract title with priority fallback:
    /// 1. Open Graph `og:title`
    /// 2. Twitter `twitter:title`
    /// 3. `<title>` element
    /// 4. JSON-LD `headline`
    ///
    /// Candidates that are empty or look like stylesheet debris are skipped.
    pub fn extract_title(&self) -> Option<String> {
        let candidates = [
            self.meta_content("og:title"),
            self.meta_content("twitter:title"),
            self.title(),
            self.json_ld_str("headline"),
        ];
        first_clean(candidates)
    }

    /// Extract description with priority fallback:
    /// 1. Open Graph `og:description`
    /// 2. Twitter `twitter:description`
    /// 3. Meta `description`
    /// 4. JSON-LD `description`
    pub fn extract_description(&self) -> Option<String> {
        let candidates = [
            self.meta_content("og:description"),
            self.meta_content("twitter:description"),
            self.meta_content("description"),
            self.json_ld_str("description"),
        ];
        first_clean(candidates)
    }

    /// First `<h1>` that is not stylesheet debris.
    pub fn extract_heading(&self) -> Option<String> {
        let headings = self.select("h1").ok()?;
        let candidates = headings.iter().map(|h| Some(h.text_trimmed()));
        first_clean(candidates)
    }

    /// Extract site name from `og:site_name`, then `application-name`.
    pub fn extract_site_name(&self) -> Option<String> {
        first_clean([self.meta_content("og:site_name"), self.meta_content("application-name")])
    }

    /// Canonical URL from `<link rel="canonical">` or `og:url`, resolved
    /// against the document's base URL.
    pub fn extract_canonical_url(&self) -> Option<String> {
        let href = self
            .select_first_attr("link[rel='canonical']", "href")
            .or_else(|| self.meta_content("og:url"))?;
        self.resolve(&href).map(|url| url.to_string())
    }

    /// Extract all page metadata at once.
    pub fn extract_page_metadata(&self) -> PageMetadata {
        PageMetadata {
            title: self.extract_title(),
            description: self.extract_description(),
            heading: self.extract_heading(),
            site_name: self.extract_site_name(),
            canonical_url: self.extract_canonical_url(),
        }
    }

    /// Get meta tag content by name or property attribute
    pub fn meta_content(&self, attr: &str) -> Option<String> {
        for key in ["name", "property", "itemprop"] {
            let selector = format!("meta[{}=\"{}\"]", key, attr);
            if let Some(content) = self.select_first_attr(&selector, "content") {
                return Some(content);
            }
        }

        None
    }

    /// String field from the first JSON-LD block that has it.
    fn json_ld_str(&self, field: &str) -> Option<String> {
        let elements = self.select("script[type=\"application/ld+json\"]").ok()?;
        elements.iter().find_map(|el| {
            let value = serde_json::from_str::<serde_json::Value>(el.text().trim()).ok()?;
            let value = match value {
                serde_json::Value::Array(items) => items.into_iter().find(|item| item.get(field).is_some())?,
                other => other,
            };
            value.get(field)?.as_str().map(str::to_string)
        })
    }
}

fn first_clean(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|candidate| collapse_whitespace(&candidate))
        .find(|candidate| !candidate.is_empty() && !looks_like_css(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title</title>
            <meta name="description" content="This is a test description of the page.">
            <meta property="og:title" content="OG Title">
            <meta property="og:description" content="OG Description">
            <meta property="og:site_name" content="Example Site">
            <link rel="canonical" href="/articles/1">
        </head>
        <body>
            <h1>Main Heading</h1>
        </body>
        </html>
    "#;

    const HTML_WITHOUT_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Simple Page</title>
        </head>
        <body>
            <h1>Heading</h1>
            <p>This is a paragraph with some text content.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_title_prefers_og() {
        let doc = Document::parse(HTML_WITH_META).unwrap();
        assert_eq!(doc.extract_title(), Some("OG Title".to_string()));
    }

    #[test]
    fn test_extract_title_fallback() {
        let doc = Document::parse(HTML_WITHOUT_META).unwrap();
        assert_eq!(doc.extract_title(), Some("Simple Page".to_string()));
    }

    #[test]
    fn test_extract_description_order() {
        let doc = Document::parse(HTML_WITH_META).unwrap();
        assert_eq!(doc.extract_description(), Some("OG Description".to_string()));

        let html = r#"<html><head><meta name="description" content="  Plain   description "></head></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.extract_description(), Some("Plain description".to_string()));
    }

    #[test]
    fn test_css_candidates_are_skipped() {
        let html = r#"
            <html><head>
                <title>.header{display:none;} .nav{color:red;}</title>
            </head><body>
                <h1>body{margin:0;padding:0}</h1>
                <h1>Actual Heading</h1>
            </body></html>
        "#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.extract_title(), None);
        assert_eq!(doc.extract_heading(), Some("Actual Heading".to_string()));

        let metadata = doc.extract_page_metadata();
        assert_eq!(metadata.best_title(), Some("Actual Heading"));
    }

    #[test]
    fn test_json_ld_fallback() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">
                [{"@type": "BreadcrumbList"}, {"@type": "NewsArticle", "headline": "From JSON-LD", "description": "LD description"}]
                </script>
            </head></html>
        "#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.extract_title(), Some("From JSON-LD".to_string()));
        assert_eq!(doc.extract_description(), Some("LD description".to_string()));
    }

    #[test]
    fn test_extract_site_name_and_canonical() {
        let base = url::Url::parse("https://example.com/x?utm=1").unwrap();
        let doc = Document::parse_with_url(HTML_WITH_META, base).unwrap();
        let metadata = doc.extract_page_metadata();

        assert_eq!(metadata.site_name, Some("Example Site".to_string()));
        assert_eq!(metadata.canonical_url, Some("https://example.com/articles/1".to_string()));
        assert_eq!(metadata.heading, Some("Main Heading".to_string()));
    }

    #[test]
    fn test_meta_content_by_name_or_property() {
        let html = r#"<html><head>
            <meta name="twitter:title" content="By name">
            <meta property="og:type" content="article">
        </head></html>"#;
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.meta_content("twitter:title"), Some("By name".to_string()));
        assert_eq!(doc.meta_content("og:type"), Some("article".to_string()));
        assert_eq!(doc.meta_content("og:image"), None);
    }
}
