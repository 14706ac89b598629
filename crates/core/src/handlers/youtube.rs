use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Context, Handler, capture_blob};
use crate::humanize::{format_count, format_duration};
use crate::outcome::{Outcome, Rejection};
use crate::summary::{Summary, bold, collapse_whitespace, join_facets};

static PLAYER_RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s|</script>)").unwrap()
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: Option<String>,
    author: Option<String>,
    view_count: Option<String>,
    length_seconds: Option<String>,
    #[serde(default)]
    is_live_content: bool,
}

/// Reads the player response blob embedded in watch pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct YoutubeHandler;

#[async_trait]
impl Handler for YoutubeHandler {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let request = cx.request(url.clone());
        match cx.retriever().fetch_bytes(&request).await {
            Ok(page) => summarize_player_response(&page.text()),
            Err(err) => {
                debug!(url = %url, error = %err, "watch page unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

/// Builds the video line from a watch page body.
pub fn summarize_player_response(body: &str) -> Outcome {
    let Some(blob) = capture_blob(&PLAYER_RESPONSE, body) else {
        return Outcome::Rejected(Rejection::NoContent);
    };

    let response: PlayerResponse = match serde_json::from_str(blob) {
        Ok(response) => response,
        Err(_) => return Outcome::Rejected(Rejection::Parse),
    };

    let Some(details) = response.video_details else {
        return Outcome::Rejected(Rejection::Parse);
    };
    let title = details.title.as_deref().map(collapse_whitespace).unwrap_or_default();
    if title.is_empty() {
        return Outcome::Rejected(Rejection::Parse);
    }

    let views = details
        .view_count
        .and_then(|v| v.parse::<u64>().ok())
        .map(|v| format!("{} views", format_count(v)));
    let length = details
        .length_seconds
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .map(format_duration);
    let length = if details.is_live_content && length.is_none() { Some("LIVE".to_string()) } else { length };

    let line = join_facets([
        bold(&title),
        details.author.unwrap_or_default(),
        views.unwrap_or_default(),
        length.unwrap_or_default(),
    ]);
    Outcome::Summary(Summary::new(line))
}
