//! Generic strategies tried in order when no specialized handler succeeds.
//!
//! The chain is strictly sequential: a strategy starts only after the one
//! before it has produced its outcome, and the first accepted summary ends
//! the run.

pub mod direct;
pub mod platform;
pub mod proxy;
pub mod search;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::handlers::{BlueskyClient, Context};
use crate::outcome::Outcome;
use crate::summary::Summary;

pub use direct::DirectFetch;
pub use platform::PlatformSearch;
pub use proxy::{ProxyConfig, ProxyRender};
pub use search::{Engine, SearchScrape, build_query};

/// One platform-agnostic way of summarizing a URL.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(&self, cx: &Context<'_>, url: &Url) -> Outcome;
}

/// Ordered list of strategies.
#[derive(Clone, Default)]
pub struct FallbackChain {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl FallbackChain {
    /// An empty chain that never produces a summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform search, direct, impersonated, proxy, then the three search engines.
    pub fn standard(bluesky: Arc<BlueskyClient>) -> Self {
        Self::new()
            .with(Arc::new(PlatformSearch::new(bluesky)))
            .with(Arc::new(DirectFetch::plain()))
            .with(Arc::new(DirectFetch::impersonated()))
            .with(Arc::new(ProxyRender))
            .with(Arc::new(SearchScrape::new(Engine::DuckDuckGo)))
            .with(Arc::new(SearchScrape::new(Engine::Bing)))
            .with(Arc::new(SearchScrape::new(Engine::Mojeek)))
    }

    /// Appends a strategy to the end of the chain.
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Runs strategies in order until one yields a summary.
    pub async fn run(&self, cx: &Context<'_>, url: &Url) -> Option<Summary> {
        for strategy in &self.strategies {
            match strategy.attempt(cx, url).await {
                Outcome::Summary(summary) => {
                    debug!(url = %url, strategy = strategy.name(), "strategy accepted");
                    return Some(summary);
                }
                outcome => debug!(url = %url, strategy = strategy.name(), outcome = %outcome.label(), "strategy declined"),
            }
        }

        None
    }
}

impl fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
