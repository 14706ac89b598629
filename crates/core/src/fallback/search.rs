//! Search-engine scraping.
//!
//! The target is looked up with a site-scoped query and the first organic
//! result on the same root domain supplies the title and snippet.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::Strategy;
use crate::GlimpseError;
use crate::canonical::root_domain;
use crate::handlers::Context;
use crate::outcome::{Outcome, Rejection};
use crate::parse::Document;
use crate::summarize::Endpoints;
use crate::summary::{Assembler, echoes_url};

const MAX_DESCRIPTION: usize = 250;

/// Hosts whose search results are indexed under another domain.
const SITE_ALIASES: &[(&str, &str)] = &[("youtu.be", "youtube.com"), ("x.com", "twitter.com"), ("redd.it", "reddit.com")];

/// A public search engine with an HTML results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    DuckDuckGo,
    Bing,
    Mojeek,
}

struct Selectors {
    result: &'static str,
    link: &'static str,
    snippet: &'static str,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::DuckDuckGo => "duckduckgo",
            Engine::Bing => "bing",
            Engine::Mojeek => "mojeek",
        }
    }

    fn selectors(&self) -> Selectors {
        match self {
            Engine::DuckDuckGo => Selectors { result: ".result", link: "a.result__a", snippet: ".result__snippet" },
            Engine::Bing => Selectors { result: "li.b_algo", link: "h2 a", snippet: ".b_caption p" },
            Engine::Mojeek => Selectors { result: "ul.results-standard li", link: "a.title", snippet: "p.s" },
        }
    }

    fn base<'e>(&self, endpoints: &'e Endpoints) -> &'e str {
        match self {
            Engine::DuckDuckGo => &endpoints.duckduckgo,
            Engine::Bing => &endpoints.bing,
            Engine::Mojeek => &endpoints.mojeek,
        }
    }

    /// Results page URL for `query`.
    pub fn search_url(&self, endpoints: &Endpoints, query: &str) -> crate::Result<Url> {
        let base = self.base(endpoints);
        let mut url = Url::parse(base).map_err(|e| GlimpseError::ConfigError(format!("invalid {} endpoint {}: {}", self.name(), base, e)))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }
}

/// Builds the site-scoped query for a URL.
///
/// Slug-like last segments become plain search words; anything else is
/// searched verbatim.
///
/// ```rust
/// use glimpse_core::fallback::build_query;
/// use url::Url;
///
/// let url = Url::parse("https://www.example.com/blog/the-long_story").unwrap();
/// assert_eq!(build_query(&url).unwrap(), "site:example.com the long story");
/// ```
pub fn build_query(url: &Url) -> Option<String> {
    let site = site_for(url)?;

    let slug = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .filter(|segment| segment.contains('-') || segment.contains('_'));

    let query = match slug {
        Some(slug) => {
            let words: Vec<&str> = slug.split(['-', '_']).filter(|w| !w.is_empty()).collect();
            format!("site:{} {}", site, words.join(" "))
        }
        None => {
            let bare = url.as_str().trim_start_matches("https://").trim_start_matches("http://").trim_end_matches('/');
            format!("site:{} \"{}\"", site, bare)
        }
    };

    Some(query)
}

/// Root domain used for the `site:` operator.
fn site_for(url: &Url) -> Option<String> {
    let root = root_domain(url)?;
    let aliased = SITE_ALIASES.iter().find(|(from, _)| *from == root).map(|(_, to)| to.to_string());
    Some(aliased.unwrap_or(root))
}

/// Destination of a result link, unwrapping redirector links.
fn result_target(doc: &Document, href: &str) -> Option<Url> {
    let resolved = doc.resolve(href)?;
    let wrapped = resolved.query_pairs().find(|(key, _)| key == "uddg").map(|(_, value)| value.into_owned());

    match wrapped {
        Some(target) => Url::parse(&target).ok(),
        None => Some(resolved),
    }
}

/// Scrapes one engine's results page.
#[derive(Debug, Clone, Copy)]
pub struct SearchScrape {
    engine: Engine,
}

impl SearchScrape {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// First usable result on one of `roots`, skipping results whose title
    /// only repeats the link.
    fn first_match(&self, doc: &Document, roots: &[String], url: &Url) -> Option<Candidate> {
        let selectors = self.engine.selectors();
        let mut echoed = false;

        for result in doc.select(selectors.result).ok()? {
            let Some(link) = result.select(selectors.link).ok().and_then(|links| links.into_iter().next()) else {
                continue;
            };
            let Some(target) = link.attr("href").and_then(|href| result_target(doc, href)) else {
                continue;
            };

            let on_site = root_domain(&target).is_some_and(|root| roots.contains(&root));
            if !on_site {
                continue;
            }

            let title = link.text_trimmed();
            if echoes_url(&title, url) {
                echoed = true;
                continue;
            }

            let snippet = result.select_first_text(selectors.snippet).unwrap_or_default();
            return Some(Candidate::Found { title, snippet });
        }

        echoed.then_some(Candidate::EchoesOnly)
    }
}

/// What a results page offers for the target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Found { title: String, snippet: String },
    /// Every on-site result just repeated the link.
    EchoesOnly,
}

#[async_trait]
impl Strategy for SearchScrape {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn attempt(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let (Some(query), Some(root)) = (build_query(url), root_domain(url)) else {
            return Outcome::NotApplicable;
        };

        let mut roots = vec![root];
        if let Some(site) = site_for(url).filter(|site| !roots.contains(site)) {
            roots.push(site);
        }

        let result: crate::Result<Candidate> = async {
            let search_url = self.engine.search_url(&cx.config().endpoints, &query)?;
            let request = cx.request(search_url).timeout(cx.config().node_timeout);
            cx.retriever().select_with(&request, |doc| self.first_match(doc, &roots, url)).await
        }
        .await;

        match result {
            Ok(Candidate::Found { title, snippet }) => Assembler::new(MAX_DESCRIPTION).accept(&title, &snippet),
            Ok(Candidate::EchoesOnly) => Outcome::Rejected(Rejection::RejectedTitle),
            Err(err) => {
                debug!(url = %url, engine = self.engine.name(), error = %err, "search scrape failed");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{Summarizer, SummarizerConfig};
    use httpmock::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.example.com/blog/the-long_story", "site:example.com the long story")]
    #[case("https://example.com/story/", "site:example.com \"example.com/story\"")]
    #[case("https://youtu.be/dQw4w9WgXcQ", "site:youtube.com \"youtu.be/dQw4w9WgXcQ\"")]
    #[case("https://x.com/someone/status/123", "site:twitter.com \"x.com/someone/status/123\"")]
    #[case("https://news.bbc.co.uk/sport/some-match-report", "site:bbc.co.uk some match report")]
    fn test_build_query(#[case] url: &str, #[case] expected: &str) {
        let url = Url::parse(url).unwrap();
        assert_eq!(build_query(&url).unwrap(), expected);
    }

    #[test]
    fn test_search_url() {
        let endpoints = Endpoints::default();
        let url = Engine::Bing.search_url(&endpoints, "site:example.com story").unwrap();
        assert_eq!(url.as_str(), "https://www.bing.com/search?q=site%3Aexample.com+story");
    }

    #[test]
    fn test_result_target_unwraps_redirector() {
        let doc = Document::parse_with_url("<html></html>", Url::parse("https://html.duckduckgo.com/html/").unwrap()).unwrap();
        let target = result_target(&doc, "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fstory&rut=abc").unwrap();
        assert_eq!(target.as_str(), "https://example.com/story");

        let direct = result_target(&doc, "https://example.com/other").unwrap();
        assert_eq!(direct.as_str(), "https://example.com/other");
    }

    fn summarizer_for(server: &MockServer) -> Summarizer {
        let config = SummarizerConfig::builder()
            .endpoints(Endpoints {
                duckduckgo: server.url("/html/"),
                bing: server.url("/search"),
                mojeek: server.url("/mojeek"),
                ..Endpoints::default()
            })
            .retries(1)
            .build();
        Summarizer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_skips_results_on_other_domains() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/html/").query_param("q", "site:example.com the long story");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body>
                <div class="result">
                    <a class="result__a" href="https://spam.example.org/copy">Scraped copy of the story</a>
                    <a class="result__snippet">Not the page you want.</a>
                </div>
                <div class="result">
                    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fblog%2Fthe-long_story&amp;rut=1">The Long Story</a>
                    <a class="result__snippet">How a short idea grew into something much longer.</a>
                </div>
                </body></html>"#,
            );
        });

        let summarizer = summarizer_for(&server);
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://example.com/blog/the-long_story").unwrap();

        let summary = SearchScrape::new(Engine::DuckDuckGo).attempt(&cx, &url).await.into_summary().unwrap();
        mock.assert();
        assert!(summary.first_line().contains("The Long Story"));
        assert!(summary.first_line().contains("How a short idea grew"));
        assert!(!summary.first_line().contains("Scraped copy"));
    }

    #[tokio::test]
    async fn test_title_echoing_url_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body><ol><li class="b_algo">
                    <h2><a href="https://example.com/story">example.com/story</a></h2>
                    <div class="b_caption"><p>No description is available for this page.</p></div>
                </li></ol></body></html>"#,
            );
        });

        let summarizer = summarizer_for(&server);
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://example.com/story").unwrap();

        assert_eq!(
            SearchScrape::new(Engine::Bing).attempt(&cx, &url).await,
            Outcome::Rejected(Rejection::RejectedTitle)
        );
    }

    #[tokio::test]
    async fn test_echoing_result_is_skipped_for_a_later_one() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).header("content-type", "text/html").body(
                r#"<html><body><ol>
                <li class="b_algo">
                    <h2><a href="https://example.com/story">example.com/story</a></h2>
                    <div class="b_caption"><p>No description is available for this page.</p></div>
                </li>
                <li class="b_algo">
                    <h2><a href="https://www.example.com/story">Harbor bridge opens next spring</a></h2>
                    <div class="b_caption"><p>After a decade of delays the crossing is finally done.</p></div>
                </li>
                </ol></body></html>"#,
            );
        });

        let summarizer = summarizer_for(&server);
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://example.com/story").unwrap();

        let summary = SearchScrape::new(Engine::Bing).attempt(&cx, &url).await.into_summary().unwrap();
        assert_eq!(
            summary.first_line(),
            "\u{2}After a decade of delays the crossing is finally done.\u{2} • Harbor bridge opens next spring"
        );
    }

    #[tokio::test]
    async fn test_no_matching_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/mojeek");
            then.status(200)
                .header("content-type", "text/html")
                .body(r#"<ul class="results-standard"><li><a class="title" href="https://elsewhere.net/">Elsewhere</a></li></ul>"#);
        });

        let summarizer = summarizer_for(&server);
        let cx = Context::new(&summarizer, 0);
        let url = Url::parse("https://example.com/story").unwrap();

        assert_eq!(
            SearchScrape::new(Engine::Mojeek).attempt(&cx, &url).await,
            Outcome::Rejected(Rejection::TimedOut)
        );
    }
}
