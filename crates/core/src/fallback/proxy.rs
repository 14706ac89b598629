use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::Strategy;
use crate::GlimpseError;
use crate::canonical::canonicalize;
use crate::handlers::Context;
use crate::handlers::metatag::summarize_metadata;
use crate::metadata::PageMetadata;
use crate::outcome::{Outcome, Rejection};
use crate::summary::DEFAULT_MAX_DESCRIPTION;

/// Default deadline for a rendered page.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(8);

/// A render-and-return-HTML service for pages that need JavaScript.
///
/// Requests look like `{endpoint}?api_key={key}&url={target}&render_js=true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ProxyConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), api_key: api_key.into(), timeout: DEFAULT_RENDER_TIMEOUT }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_url(&self, target: &Url) -> crate::Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| GlimpseError::ConfigError(format!("invalid proxy endpoint {}: {}", self.endpoint, e)))?;
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("url", canonicalize(target).as_str())
            .append_pair("render_js", "true");
        Ok(url)
    }
}

/// Asks the configured render service for the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyRender;

#[async_trait]
impl Strategy for ProxyRender {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn attempt(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let Some(proxy) = &cx.config().proxy else {
            return Outcome::NotApplicable;
        };

        let result: crate::Result<PageMetadata> = async {
            let request = cx.request(proxy.request_url(url)?).impersonate(false).timeout(proxy.timeout);
            let page = cx.retriever().fetch_document(&request).await?;
            page.with_document(|doc| doc.extract_page_metadata())
        }
        .await;

        match result {
            Ok(metadata) => summarize_metadata(&metadata, DEFAULT_MAX_DESCRIPTION),
            Err(err) => Outcome::Rejected(Rejection::from(&err)),
        }
    }
}
