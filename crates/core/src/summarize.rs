//! The summarization pipeline.
//!
//! A [`Summarizer`] owns the retriever, the dispatch tables and the injected
//! collaborators. Each call to [`Summarizer::summarize`] walks the same path:
//!
//! 1. the URL is parsed and its root domain resolved;
//! 2. shortcut-service links go to the shortcut handler, registered domains to
//!    their handler;
//! 3. unregistered domains are sniffed for a content signature;
//! 4. anything still without a summary runs through the fallback chain;
//! 5. an accepted summary gets the source credibility line appended.
//!
//! # Example
//!
//! ```rust,no_run
//! use glimpse_core::{Summarizer, SummarizerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let summarizer = Summarizer::new(SummarizerConfig::default())?;
//! if let Some(summary) = summarizer.summarize("https://example.com/article").await? {
//!     println!("{}", summary);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::canonical::root_domain;
use crate::fallback::FallbackChain;
use crate::fetch::{DEFAULT_RETRIES, DEFAULT_RETRY_BASE, DEFAULT_RETRY_JITTER, DEFAULT_TIMEOUT, RetrievalRequest, Retriever};
use crate::handlers::bluesky::DEFAULT_SESSION_TTL_MINUTES;
use crate::handlers::shortcut::MAX_SHORTCUT_DEPTH;
use crate::handlers::{BlueskyClient, Context, DomainTable, Handler, ShortcutHandler};
use crate::lookup::{NoShortcuts, NoSourceLookup, ShortcutResolver, SourceLookup};
use crate::outcome::Outcome;
use crate::signature::SignatureTable;
use crate::summary::Summary;
use crate::{GlimpseError, Result};

pub use crate::fallback::ProxyConfig;
pub use crate::handlers::bluesky::BlueskyCredentials;

/// Deadline of the signature pre-fetch.
pub const DEFAULT_SIGNATURE_TIMEOUT: Duration = Duration::from_millis(500);

/// Deadline of a search-results page.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_millis(3000);

/// User agent sent on non-impersonated requests.
pub const DEFAULT_USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; glimpse/", env!("CARGO_PKG_VERSION"), ")");

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Base URLs of the external services the pipeline talks to.
///
/// Every field can be pointed at a local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub github: String,
    pub manifold: String,
    /// Polymarket's gamma API.
    pub polymarket: String,
    /// REST host for Wikipedia summaries. `None` uses the linked wiki's own host.
    pub wikipedia: Option<String>,
    pub duckduckgo: String,
    pub bing: String,
    pub mojeek: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github: "https://api.github.com".to_string(),
            manifold: "https://api.manifold.markets".to_string(),
            polymarket: "https://gamma-api.polymarket.com".to_string(),
            wikipedia: None,
            duckduckgo: "https://html.duckduckgo.com/html/".to_string(),
            bing: "https://www.bing.com/search".to_string(),
            mojeek: "https://www.mojeek.com/search".to_string(),
        }
    }
}

/// Configuration for the [`Summarizer`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use glimpse_core::SummarizerConfig;
///
/// let config = SummarizerConfig::builder()
///     .timeout(Duration::from_millis(2000))
///     .retries(3)
///     .shortcut_domain("go.example.net")
///     .build();
/// assert_eq!(config.retries, 3);
/// ```
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Per-attempt fetch deadline (default: 1500ms).
    pub timeout: Duration,

    /// Attempts for selector-scoped retrieval (default: 5).
    pub retries: usize,

    /// Fixed delay before a retry (default: 100ms).
    pub retry_base: Duration,

    /// Upper bound of the random extra delay (default: 150ms).
    pub retry_jitter: Duration,

    /// Deadline of the signature pre-fetch (default: 500ms).
    pub signature_timeout: Duration,

    /// Deadline of a search-results page (default: 3000ms).
    pub node_timeout: Duration,

    /// User agent for requests that do not impersonate a browser.
    pub user_agent: String,

    /// Host of the bot's own shortcut service, if any.
    pub shortcut_domain: Option<String>,

    /// Bluesky login; without it the Bluesky handler and platform search stand aside.
    pub bluesky: Option<BlueskyCredentials>,

    /// How long a Bluesky session is reused before logging in again (default: 90 minutes).
    pub bluesky_session_ttl: chrono::Duration,

    /// Render proxy; without it the proxy strategy stands aside.
    pub proxy: Option<ProxyConfig>,

    pub endpoints: Endpoints,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_base: DEFAULT_RETRY_BASE,
            retry_jitter: DEFAULT_RETRY_JITTER,
            signature_timeout: DEFAULT_SIGNATURE_TIMEOUT,
            node_timeout: DEFAULT_NODE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            shortcut_domain: None,
            bluesky: None,
            bluesky_session_ttl: chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            proxy: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl SummarizerConfig {
    /// Creates a new builder for SummarizerConfig.
    pub fn builder() -> SummarizerConfigBuilder {
        SummarizerConfigBuilder::new()
    }

    /// A GET request carrying the configured timeout and retry policy.
    pub fn request(&self, url: Url) -> RetrievalRequest {
        RetrievalRequest::get(url)
            .timeout(self.timeout)
            .retries(self.retries)
            .retry_delay(self.retry_base, self.retry_jitter)
    }

    /// Whether `url` points at the shortcut service.
    pub fn is_shortcut(&self, url: &Url) -> bool {
        let (Some(domain), Some(host)) = (&self.shortcut_domain, url.host_str()) else {
            return false;
        };
        let domain = domain.trim_start_matches("www.");
        host.trim_start_matches("www.").eq_ignore_ascii_case(domain)
    }
}

/// Builder for SummarizerConfig.
pub struct SummarizerConfigBuilder {
    config: SummarizerConfig,
}

impl SummarizerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: SummarizerConfig::default() }
    }

    /// Sets the per-attempt fetch deadline.
    pub fn timeout(mut self, value: Duration) -> Self {
        self.config.timeout = value;
        self
    }

    /// Sets the number of attempts for selector-scoped retrieval.
    pub fn retries(mut self, value: usize) -> Self {
        self.config.retries = value;
        self
    }

    /// Sets the retry delay window to `[base, base + jitter)`.
    pub fn retry_delay(mut self, base: Duration, jitter: Duration) -> Self {
        self.config.retry_base = base;
        self.config.retry_jitter = jitter;
        self
    }

    pub fn signature_timeout(mut self, value: Duration) -> Self {
        self.config.signature_timeout = value;
        self
    }

    pub fn node_timeout(mut self, value: Duration) -> Self {
        self.config.node_timeout = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.user_agent = value.into();
        self
    }

    pub fn shortcut_domain(mut self, value: impl Into<String>) -> Self {
        self.config.shortcut_domain = Some(value.into().to_lowercase());
        self
    }

    pub fn bluesky(mut self, value: BlueskyCredentials) -> Self {
        self.config.bluesky = Some(value);
        self
    }

    pub fn bluesky_session_ttl(mut self, value: chrono::Duration) -> Self {
        self.config.bluesky_session_ttl = value;
        self
    }

    pub fn proxy(mut self, value: ProxyConfig) -> Self {
        self.config.proxy = Some(value);
        self
    }

    pub fn endpoints(mut self, value: Endpoints) -> Self {
        self.config.endpoints = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> SummarizerConfig {
        self.config
    }
}

impl Default for SummarizerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns URLs into summaries.
///
/// Cheap to share behind an `Arc`; every call is independent apart from the
/// Bluesky session, which is refreshed at most once at a time.
pub struct Summarizer {
    config: SummarizerConfig,
    retriever: Retriever,
    bluesky: Arc<BlueskyClient>,
    domains: DomainTable,
    signatures: SignatureTable,
    chain: FallbackChain,
    sources: Arc<dyn SourceLookup>,
    shortcuts: Arc<dyn ShortcutResolver>,
}

impl Summarizer {
    /// A summarizer with the built-in tables and no collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`GlimpseError::Http`] if the HTTP client cannot be built.
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: SummarizerConfig) -> SummarizerBuilder {
        SummarizerBuilder::new(config)
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The Bluesky client shared by the handler and platform search.
    pub fn bluesky(&self) -> &Arc<BlueskyClient> {
        &self.bluesky
    }

    pub fn domains(&self) -> &DomainTable {
        &self.domains
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn shortcuts(&self) -> &dyn ShortcutResolver {
        self.shortcuts.as_ref()
    }

    /// Summarizes one URL.
    ///
    /// # Errors
    ///
    /// Returns [`GlimpseError::InvalidUrl`] when `url` is not an absolute
    /// http(s) URL. Every other failure ends up as `Ok(None)`.
    pub async fn summarize(&self, url: &str) -> Result<Option<Summary>> {
        self.summarize_at_depth(url, 0).await
    }

    /// [`summarize`](Self::summarize) at a given shortcut depth.
    pub fn summarize_at_depth<'a>(
        &'a self, url: &'a str, depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Summary>>> + Send + 'a>> {
        Box::pin(async move {
            let url = parse_target(url)?;
            let cx = Context::new(self, depth);

            match self.dispatch(&cx, &url).await {
                Some(summary) => Ok(Some(self.with_credibility(&url, summary).await)),
                None => {
                    debug!(url = %url, depth, "no summary");
                    Ok(None)
                }
            }
        })
    }

    fn handler_for(&self, url: &Url) -> Option<&dyn Handler> {
        if self.config.is_shortcut(url) {
            return Some(&ShortcutHandler);
        }
        self.domains.lookup(url).map(|handler| handler.as_ref())
    }

    async fn dispatch(&self, cx: &Context<'_>, url: &Url) -> Option<Summary> {
        // The outer call already walks the chain for this shortcut URL.
        if cx.depth >= MAX_SHORTCUT_DEPTH && self.config.is_shortcut(url) {
            debug!(url = %url, depth = cx.depth, "nested shortcut not followed");
            return None;
        }

        let outcome = match self.handler_for(url) {
            Some(handler) => {
                debug!(url = %url, handler = handler.name(), "dispatching to handler");
                handler.handle(cx, url).await
            }
            None => self.signatures.sniff(cx, url).await,
        };

        match outcome {
            Outcome::Summary(summary) => return Some(summary),
            outcome => debug!(url = %url, outcome = %outcome.label(), "falling back"),
        }

        self.chain.run(cx, url).await
    }

    async fn with_credibility(&self, url: &Url, mut summary: Summary) -> Summary {
        let Some(root) = root_domain(url) else {
            return summary;
        };

        match self.sources.find_source(&root).await {
            Ok(Some(line)) if !line.trim().is_empty() => summary.push_line(line),
            Ok(_) => {}
            Err(err) => warn!(domain = %root, error = %err, "source lookup failed"),
        }

        summary
    }
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("config", &self.config)
            .field("domains", &self.domains)
            .field("signatures", &self.signatures)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Summarizer`], used to swap tables and inject collaborators.
pub struct SummarizerBuilder {
    config: SummarizerConfig,
    domains: Option<DomainTable>,
    signatures: Option<SignatureTable>,
    chain: Option<FallbackChain>,
    sources: Arc<dyn SourceLookup>,
    shortcuts: Arc<dyn ShortcutResolver>,
}

impl SummarizerBuilder {
    pub fn new(config: SummarizerConfig) -> Self {
        Self {
            config,
            domains: None,
            signatures: None,
            chain: None,
            sources: Arc::new(NoSourceLookup),
            shortcuts: Arc::new(NoShortcuts),
        }
    }

    /// Credibility lookup for the trailing source line.
    pub fn sources(mut self, sources: Arc<dyn SourceLookup>) -> Self {
        self.sources = sources;
        self
    }

    pub fn shortcuts(mut self, shortcuts: Arc<dyn ShortcutResolver>) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    /// Replaces the built-in domain table.
    pub fn domains(mut self, domains: DomainTable) -> Self {
        self.domains = Some(domains);
        self
    }

    /// Replaces the built-in signature table.
    pub fn signatures(mut self, signatures: SignatureTable) -> Self {
        self.signatures = Some(signatures);
        self
    }

    /// Replaces the built-in fallback chain.
    pub fn chain(mut self, chain: FallbackChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn build(self) -> Result<Summarizer> {
        let retriever = Retriever::new(self.config.user_agent.as_str())?;
        let bluesky = Arc::new(BlueskyClient::from_config(&self.config));

        let domains = self.domains.unwrap_or_else(|| DomainTable::standard(Arc::clone(&bluesky)));
        let signatures = self.signatures.unwrap_or_else(SignatureTable::standard);
        let chain = self.chain.unwrap_or_else(|| FallbackChain::standard(Arc::clone(&bluesky)));

        Ok(Summarizer {
            config: self.config,
            retriever,
            bluesky,
            domains,
            signatures,
            chain,
            sources: self.sources,
            shortcuts: self.shortcuts,
        })
    }
}

fn parse_target(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| GlimpseError::InvalidUrl(format!("{}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(GlimpseError::InvalidUrl(format!("{}: not an http(s) URL", url)));
    }

    Ok(parsed)
}

/// Pulls every http(s) URL out of a chat line.
///
/// ```rust
/// use glimpse_core::find_urls;
///
/// let urls = find_urls("see (https://example.com/a), and https://example.org/b.");
/// assert_eq!(urls, vec!["https://example.com/a", "https://example.org/b"]);
/// ```
pub fn find_urls(text: &str) -> Vec<&str> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches([')', '.', ',', '>']))
        .filter(|url| url.len() > "https://".len())
        .collect()
}
