use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{Context, Handler};
use crate::metadata::PageMetadata;
use crate::outcome::{Outcome, Rejection};
use crate::summary::Assembler;

/// Reads a page's title and description meta tags.
#[derive(Debug, Clone)]
pub struct MetaTagHandler {
    name: &'static str,
    max_description: usize,
}

impl MetaTagHandler {
    pub fn new(name: &'static str, max_description: usize) -> Self {
        Self { name, max_description }
    }

    pub fn max_description(&self) -> usize {
        self.max_description
    }
}

#[async_trait]
impl Handler for MetaTagHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let request = cx.request(url.clone());
        let result = cx
            .retriever()
            .select_with(&request, |doc| {
                let metadata = doc.extract_page_metadata();
                (metadata.title.is_some() || metadata.description.is_some()).then_some(metadata)
            })
            .await;

        match result {
            Ok(metadata) => summarize_metadata(&metadata, self.max_description),
            Err(err) => {
                debug!(handler = self.name, url = %url, error = %err, "meta tags unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

/// Runs page metadata through the assembler.
pub fn summarize_metadata(metadata: &PageMetadata, max_description: usize) -> Outcome {
    let title = metadata.best_title().unwrap_or_default();
    let description = metadata.description.as_deref().unwrap_or_default();
    Assembler::new(max_description).accept(title, description)
}
