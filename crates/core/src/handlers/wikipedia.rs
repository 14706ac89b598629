use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Context, Handler, endpoint, segments};
use crate::outcome::{Outcome, Rejection};
use crate::summary::Assembler;

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

/// `*.wikipedia.org/wiki/{title}` links, through the REST page summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikipediaHandler;

impl WikipediaHandler {
    fn api_url(cx: &Context<'_>, url: &Url, title: &str) -> crate::Result<Url> {
        let path = format!("/api/rest_v1/page/summary/{}", title);
        match &cx.config().endpoints.wikipedia {
            Some(base) => endpoint(base, &path),
            None => endpoint(&format!("{}://{}", url.scheme(), url.host_str().unwrap_or("en.wikipedia.org")), &path),
        }
    }
}

#[async_trait]
impl Handler for WikipediaHandler {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let title = match segments(url).as_slice() {
            ["wiki", title] if !title.contains(':') => title.to_string(),
            _ => return Outcome::NotApplicable,
        };

        let api = match Self::api_url(cx, url, &title) {
            Ok(api) => api,
            Err(err) => return Outcome::Rejected(Rejection::from(&err)),
        };
        let request = cx.request(api).impersonate(false);

        match cx.retriever().fetch_json::<PageSummary>(&request).await {
            Ok(page) => Assembler::default().accept(&page.title, &page.extract),
            Err(err) => {
                debug!(url = %url, error = %err, "page summary unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{Endpoints, Summarizer, SummarizerConfig};
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_page_summary() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/rest_v1/page/summary/Ferris_wheel");
            then.status(200).header("content-type", "application/json; charset=utf-8").body(
                r#"{"type":"standard","title":"Ferris wheel","extract":"A Ferris wheel is an amusement ride consisting of a rotating upright wheel."}"#,
            );
        });

        let endpoints = Endpoints { wikipedia: Some(server.base_url()), ..Endpoints::default() };
        let summarizer = Summarizer::new(SummarizerConfig::builder().endpoints(endpoints).build()).unwrap();
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://en.wikipedia.org/wiki/Ferris_wheel").unwrap();
        let summary = WikipediaHandler.handle(&cx, &url).await.into_summary().unwrap();

        assert_eq!(
            summary.first_line(),
            "\u{2}A Ferris wheel is an amusement ride consisting of a rotating upright wheel.\u{2} • Ferris wheel"
        );
    }

    #[tokio::test]
    async fn test_special_pages_are_not_applicable() {
        let summarizer = Summarizer::new(SummarizerConfig::default()).unwrap();
        let cx = Context::new(&summarizer, 0);

        for path in ["https://en.wikipedia.org/wiki/Special:Random", "https://en.wikipedia.org/w/index.php"] {
            let url = Url::parse(path).unwrap();
            assert_eq!(WikipediaHandler.handle(&cx, &url).await, Outcome::NotApplicable);
        }
    }

    #[test]
    fn test_default_api_follows_language_host() {
        let summarizer = Summarizer::new(SummarizerConfig::default()).unwrap();
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://de.wikipedia.org/wiki/Riesenrad").unwrap();

        let api = WikipediaHandler::api_url(&cx, &url, "Riesenrad").unwrap();
        assert_eq!(api.as_str(), "https://de.wikipedia.org/api/rest_v1/page/summary/Riesenrad");
    }
}
