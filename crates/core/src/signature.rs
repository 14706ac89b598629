//! Content-signature dispatch for domains without a registered handler.
//!
//! A short pre-fetch of the raw body is scanned for literal markers that
//! identify a publishing platform (a custom-domain Substack, a Ghost blog).
//! The first marker found picks the handler.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::handlers::{Context, Handler, MetaTagHandler};
use crate::outcome::Outcome;

/// Ordered marker → handler list.
#[derive(Clone, Default)]
pub struct SignatureTable {
    entries: Vec<(String, Arc<dyn Handler>)>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in markers.
    pub fn standard() -> Self {
        let substack: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("substack", 300));
        let ghost: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("ghost", 300));

        Self::new()
            .with("substackcdn.com", substack)
            .with(r#"<meta name="generator" content="Ghost"#, ghost)
    }

    /// Appends a marker; earlier markers win.
    pub fn with(mut self, marker: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.entries.push((marker.into(), handler));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handler for the first marker contained in `body`.
    pub fn match_body(&self, body: &str) -> Option<&Arc<dyn Handler>> {
        self.first_match(|marker| body.contains(marker))
    }

    /// Empty markers never match.
    fn first_match(&self, contains: impl Fn(&str) -> bool) -> Option<&Arc<dyn Handler>> {
        self.entries
            .iter()
            .find(|(marker, _)| !marker.is_empty() && contains(marker))
            .map(|(_, handler)| handler)
    }

    /// Pre-fetches the page and delegates to the matching handler.
    ///
    /// Fetch failures and pages without a marker are `NotApplicable`.
    pub async fn sniff(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        if self.entries.is_empty() {
            return Outcome::NotApplicable;
        }

        let request = cx.request(url.clone()).timeout(cx.config().signature_timeout);
        let page = match cx.retriever().fetch_bytes(&request).await {
            Ok(page) => page,
            Err(err) => {
                debug!(url = %url, error = %err, "signature pre-fetch failed");
                return Outcome::NotApplicable;
            }
        };

        match self.first_match(|marker| page.contains(marker)) {
            Some(handler) => {
                debug!(url = %url, handler = handler.name(), "signature matched");
                handler.handle(cx, url).await
            }
            None => Outcome::NotApplicable,
        }
    }
}

impl fmt::Debug for SignatureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(marker, h)| (marker, h.name()))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{Summarizer, SummarizerConfig};
    use httpmock::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_match_body_order() {
        let table = SignatureTable::standard();
        assert_eq!(table.len(), 2);

        let substack = r#"<link rel="preconnect" href="https://substackcdn.com">"#;
        assert_eq!(table.match_body(substack).map(|h| h.name()), Some("substack"));

        let ghost = r#"<meta name="generator" content="Ghost 5.8">"#;
        assert_eq!(table.match_body(ghost).map(|h| h.name()), Some("ghost"));

        assert!(table.match_body("<html>plain</html>").is_none());
    }

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl Handler for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn handle(&self, _cx: &Context<'_>, _url: &Url) -> Outcome {
            Outcome::Summary(crate::Summary::new(self.0))
        }
    }

    fn named_table() -> SignatureTable {
        SignatureTable::new()
            .with("", Arc::new(Named("empty")))
            .with("substackcdn.com", Arc::new(Named("substack")))
            .with("Ghost", Arc::new(Named("ghost")))
    }

    #[test]
    fn test_empty_marker_never_matches() {
        let table = named_table();
        assert!(table.match_body("<html>anything</html>").is_none());
        assert_eq!(table.match_body("Ghost on substackcdn.com").map(|h| h.name()), Some("substack"));
    }

    #[tokio::test]
    async fn test_sniff_follows_marker_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/both");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><head>
                    <meta name="generator" content="Ghost 5.8">
                    <script src="https://substackcdn.com/bundle.js"></script>
                </head></html>"#,
            );
        });

        let summarizer = Summarizer::new(SummarizerConfig::default()).unwrap();
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse(&server.url("/both")).unwrap();
        let outcome = named_table().sniff(&cx, &url).await;

        assert_eq!(outcome.into_summary().unwrap().first_line(), "substack");
    }

    #[tokio::test]
    async fn test_sniff_delegates_on_marker() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/p/hello");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><head>
                    <link rel="preconnect" href="https://substackcdn.com">
                    <meta property="og:title" content="Hello from a custom domain">
                </head></html>"#,
            );
        });

        let summarizer = Summarizer::new(SummarizerConfig::default()).unwrap();
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse(&server.url("/p/hello")).unwrap();
        let outcome = SignatureTable::standard().sniff(&cx, &url).await;

        assert_eq!(outcome.into_summary().unwrap().first_line(), "Hello from a custom domain");
    }

    #[tokio::test]
    async fn test_sniff_without_marker_or_in_time() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/plain");
            then.status(200).header("content-type", "text/html").body("<html><title>Plain page here</title></html>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .header("content-type", "text/html")
                .body("substackcdn.com")
                .delay(Duration::from_millis(400));
        });

        let config = SummarizerConfig::builder().signature_timeout(Duration::from_millis(50)).build();
        let summarizer = Summarizer::new(config).unwrap();
        let cx = Context::new(&summarizer, 0);
        let table = SignatureTable::standard();

        let plain = Url::parse(&server.url("/plain")).unwrap();
        assert_eq!(table.sniff(&cx, &plain).await, Outcome::NotApplicable);

        let slow = Url::parse(&server.url("/slow")).unwrap();
        assert_eq!(table.sniff(&cx, &slow).await, Outcome::NotApplicable);
    }
}
