//! Per-platform extraction handlers and the domain dispatch table.
//!
//! A [`Handler`] turns a URL into an [`Outcome`]. Handlers share no state
//! with each other; the few that need a session (Bluesky) carry their own.
//! The [`DomainTable`] maps a root domain to a handler and is built once when
//! the [`Summarizer`] is constructed. Lookups never mutate it.

pub mod bluesky;
pub mod github;
pub mod markets;
pub mod metatag;
pub mod shortcut;
pub mod tiktok;
pub mod wikipedia;
pub mod youtube;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::canonical::root_domain;
use crate::fetch::{RetrievalRequest, Retriever};
use crate::outcome::Outcome;
use crate::summarize::{Summarizer, SummarizerConfig};
use crate::{GlimpseError, Result};

pub use bluesky::{BlueskyClient, BlueskyHandler};
pub use github::GithubHandler;
pub use markets::{ManifoldHandler, PolymarketHandler, highlight_outcomes};
pub use metatag::MetaTagHandler;
pub use shortcut::ShortcutHandler;
pub use tiktok::TiktokHandler;
pub use wikipedia::WikipediaHandler;
pub use youtube::YoutubeHandler;

/// Something that knows how to summarize URLs of one platform.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &str;

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome;
}

/// Per-invocation view of the pipeline handed to handlers and strategies.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub summarizer: &'a Summarizer,
    /// Shortcut recursion depth; 0 for a top-level call.
    pub depth: usize,
}

impl<'a> Context<'a> {
    pub fn new(summarizer: &'a Summarizer, depth: usize) -> Self {
        Self { summarizer, depth }
    }

    pub fn config(&self) -> &'a SummarizerConfig {
        self.summarizer.config()
    }

    pub fn retriever(&self) -> &'a Retriever {
        self.summarizer.retriever()
    }

    /// A GET request carrying the configured timeout and retry policy.
    pub fn request(&self, url: Url) -> RetrievalRequest {
        self.config().request(url)
    }
}

/// Root domain → handler.
#[derive(Clone, Default)]
pub struct DomainTable {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl DomainTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registrations.
    pub fn standard(bluesky: Arc<BlueskyClient>) -> Self {
        let substack: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("substack", 300));
        let medium: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("medium", 300));
        let twitter: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("twitter", 280));
        let instagram: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("instagram", 200));
        let reddit: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("reddit", 250));
        let imdb: Arc<dyn Handler> = Arc::new(MetaTagHandler::new("imdb", 250));
        let youtube: Arc<dyn Handler> = Arc::new(YoutubeHandler);

        Self::new()
            .with("substack.com", substack)
            .with("medium.com", medium)
            .with("twitter.com", Arc::clone(&twitter))
            .with("x.com", Arc::clone(&twitter))
            .with("fxtwitter.com", twitter)
            .with("instagram.com", Arc::clone(&instagram))
            .with("ddinstagram.com", instagram)
            .with("reddit.com", reddit)
            .with("imdb.com", imdb)
            .with("youtube.com", Arc::clone(&youtube))
            .with("youtu.be", youtube)
            .with("tiktok.com", Arc::new(TiktokHandler))
            .with("bsky.app", Arc::new(BlueskyHandler::new(bluesky)))
            .with("manifold.markets", Arc::new(ManifoldHandler))
            .with("polymarket.com", Arc::new(PolymarketHandler))
            .with("github.com", Arc::new(GithubHandler))
            .with("wikipedia.org", Arc::new(WikipediaHandler))
    }

    /// Registers `handler` for a root domain, replacing any previous entry.
    pub fn with(mut self, domain: &str, handler: Arc<dyn Handler>) -> Self {
        self.insert(domain, handler);
        self
    }

    pub fn insert(&mut self, domain: &str, handler: Arc<dyn Handler>) {
        self.handlers.insert(domain.trim_start_matches("www.").to_lowercase(), handler);
    }

    /// Handler registered for a root domain.
    pub fn get(&self, root: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(root)
    }

    /// Handler registered for the URL's root domain.
    pub fn lookup(&self, url: &Url) -> Option<&Arc<dyn Handler>> {
        root_domain(url).and_then(|root| self.handlers.get(&root))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for DomainTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.handlers.iter().map(|(domain, h)| (domain.as_str(), h.name())).collect();
        entries.sort_unstable();
        f.debug_map().entries(entries).finish()
    }
}

/// First capture group of `anchor` in `text`.
pub(crate) fn capture_blob<'t>(anchor: &Regex, text: &'t str) -> Option<&'t str> {
    anchor.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Appends `path` to a configured base endpoint.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| GlimpseError::InvalidUrl(format!("{joined}: {e}")))
}

/// Non-empty path segments of a URL.
pub(crate) fn segments(url: &Url) -> Vec<&str> {
    url.path_segments().map(|s| s.filter(|seg| !seg.is_empty()).collect()).unwrap_or_default()
}
