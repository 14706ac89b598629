//! Media-type allow-list consulted before any response body is read.

/// Prefixes of media types worth reading. Everything else (images, video,
/// archives, PDFs, octet streams) is rejected without touching the body.
const ALLOWED_PREFIXES: &[&str] = &[
    "text/html",
    "text/plain",
    "text/xml",
    "application/xml",
    "application/xhtml",
    "application/rss",
    "application/atom",
    "application/rdf",
    "application/json",
    "application/ld+json",
    "application/activity+json",
    "application/feed+json",
    "application/manifest+json",
];

/// Whether a declared `Content-Type` value names text or structured data.
///
/// Parameters such as `charset` are ignored and matching is
/// case-insensitive. Vendor JSON types (`application/vnd.*+json`) are
/// allowed as well.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

    if ALLOWED_PREFIXES.iter().any(|prefix| media_type.starts_with(prefix)) {
        return true;
    }

    media_type.starts_with("application/vnd.") && media_type.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text/html")]
    #[case("text/html; charset=utf-8")]
    #[case("TEXT/HTML; Charset=UTF-8")]
    #[case("text/plain")]
    #[case("text/xml")]
    #[case("application/xml")]
    #[case("application/xhtml+xml")]
    #[case("application/rss+xml")]
    #[case("application/atom+xml")]
    #[case("application/rdf+xml")]
    #[case("application/json")]
    #[case("application/ld+json")]
    #[case("application/activity+json; profile=\"x\"")]
    #[case("application/vnd.api+json")]
    fn test_allowed(#[case] content_type: &str) {
        assert!(is_allowed_content_type(content_type));
    }

    #[rstest]
    #[case("image/png")]
    #[case("image/jpeg")]
    #[case("video/mp4")]
    #[case("application/pdf")]
    #[case("application/octet-stream")]
    #[case("application/zip")]
    #[case("application/vnd.ms-excel")]
    #[case("")]
    fn test_disallowed(#[case] content_type: &str) {
        assert!(!is_allowed_content_type(content_type));
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert!(is_allowed_content_type("text/html; charset=utf-8"));
            assert!(!is_allowed_content_type("image/png"));
        }
    }
}
