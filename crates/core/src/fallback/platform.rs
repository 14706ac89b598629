use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::Strategy;
use crate::handlers::bluesky::{BlueskyClient, PostView};
use crate::handlers::Context;
use crate::outcome::{Outcome, Rejection};
use crate::summary::Assembler;

const MAX_DESCRIPTION: usize = 280;

/// Looks for a Bluesky post whose link card points at the URL.
///
/// Posts carry the card title and description their author's client
/// fetched, which often survives where the page itself blocks us.
#[derive(Debug, Clone)]
pub struct PlatformSearch {
    client: Arc<BlueskyClient>,
}

impl PlatformSearch {
    pub fn new(client: Arc<BlueskyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for PlatformSearch {
    fn name(&self) -> &str {
        "platform-search"
    }

    async fn attempt(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        if !self.client.is_configured() {
            return Outcome::NotApplicable;
        }

        let posts = match self.client.search_posts(cx, url.as_str()).await {
            Ok(posts) => posts,
            Err(err) => {
                debug!(url = %url, error = %err, "post search failed");
                return Outcome::Rejected(Rejection::from(&err));
            }
        };

        match posts.iter().find_map(|post| matching_card(post, url)) {
            Some((title, description)) => Assembler::new(MAX_DESCRIPTION).accept(title, description),
            None => Outcome::Rejected(Rejection::NoContent),
        }
    }
}

/// Card title and description when the post's link card is `url` itself.
///
/// A post whose text merely mentions the URL may carry a card for some other
/// page, so the text is never enough on its own.
fn matching_card<'p>(post: &'p PostView, url: &Url) -> Option<(&'p str, &'p str)> {
    let card = post.external()?;
    let wanted = url.as_str().trim_end_matches('/');

    (card.uri.trim_end_matches('/') == wanted).then_some((card.title.as_str(), card.description.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(json: &str) -> PostView {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_matching_card() {
        let url = Url::parse("https://example.com/story/").unwrap();

        let by_card = post(
            r#"{"uri":"at://a/app.bsky.feed.post/1","author":{"handle":"a"},"record":{"text":"wow",
            "embed":{"external":{"uri":"https://example.com/story","title":"Story","description":"Desc"}}}}"#,
        );
        assert_eq!(matching_card(&by_card, &url), Some(("Story", "Desc")));

        let mentioned_only = post(
            r#"{"uri":"at://a/app.bsky.feed.post/2","author":{"handle":"a"},"record":{"text":"read https://example.com/story now",
            "embed":{"external":{"uri":"https://t.co/xyz","title":"Shortened","description":""}}}}"#,
        );
        assert_eq!(matching_card(&mentioned_only, &url), None);

        let unrelated = post(
            r#"{"uri":"at://a/app.bsky.feed.post/3","author":{"handle":"a"},"record":{"text":"other",
            "embed":{"external":{"uri":"https://other.example/","title":"Other","description":""}}}}"#,
        );
        assert_eq!(matching_card(&unrelated, &url), None);

        let no_card = post(r#"{"uri":"at://a/app.bsky.feed.post/4","author":{"handle":"a"},"record":{"text":"https://example.com/story"}}"#);
        assert_eq!(matching_card(&no_card, &url), None);
    }

    #[test]
    fn test_longer_url_with_same_prefix_is_not_a_match() {
        let url = Url::parse("https://example.com/story").unwrap();
        let sibling = post(
            r#"{"uri":"at://a/app.bsky.feed.post/5","author":{"handle":"a"},"record":{"text":"see https://example.com/story-two",
            "embed":{"external":{"uri":"https://example.com/story-two","title":"A different story entirely","description":"x"}}}}"#,
        );
        assert_eq!(matching_card(&sibling, &url), None);
    }
}
