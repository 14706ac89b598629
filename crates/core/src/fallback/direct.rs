use async_trait::async_trait;
use url::Url;

use super::Strategy;
use crate::handlers::Context;
use crate::handlers::metatag::summarize_metadata;
use crate::outcome::{Outcome, Rejection};
use crate::summary::DEFAULT_MAX_DESCRIPTION;

/// Fetches the page itself and reads its title, meta tags and first heading.
#[derive(Debug, Clone, Copy)]
pub struct DirectFetch {
    impersonate: bool,
    max_description: usize,
}

impl DirectFetch {
    /// Plain request with the configured user agent.
    pub fn plain() -> Self {
        Self { impersonate: false, max_description: DEFAULT_MAX_DESCRIPTION }
    }

    /// Request dressed up with a browser header profile.
    pub fn impersonated() -> Self {
        Self { impersonate: true, ..Self::plain() }
    }
}

#[async_trait]
impl Strategy for DirectFetch {
    fn name(&self) -> &str {
        if self.impersonate { "impersonated" } else { "direct" }
    }

    async fn attempt(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let request = cx.request(url.clone()).impersonate(self.impersonate);
        let metadata = match cx.retriever().fetch_document(&request).await {
            Ok(page) => page.with_document(|doc| doc.extract_page_metadata()),
            Err(err) => Err(err),
        };

        match metadata {
            Ok(metadata) => summarize_metadata(&metadata, self.max_description),
            Err(err) => Outcome::Rejected(Rejection::from(&err)),
        }
    }
}
