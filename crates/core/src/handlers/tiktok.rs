use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Context, Handler, capture_blob};
use crate::humanize::{format_count, format_duration};
use crate::outcome::{Outcome, Rejection};
use crate::summary::{Summary, bold, collapse_whitespace, join_facets, truncate};

static REHYDRATION_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script[^>]*id="__UNIVERSAL_DATA_FOR_REHYDRATION__"[^>]*>(.+?)</script>"#).unwrap()
});

const ITEM_POINTER: &str = "/__DEFAULT_SCOPE__/webapp.video-detail/itemInfo/itemStruct";

const MAX_CAPTION: usize = 200;

#[derive(Debug, Deserialize)]
struct ItemStruct {
    desc: Option<String>,
    author: Option<Author>,
    stats: Option<Stats>,
    video: Option<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Author {
    nickname: Option<String>,
    unique_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    play_count: Option<u64>,
    digg_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Video {
    duration: Option<u64>,
}

/// Reads the rehydration blob embedded in video pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiktokHandler;

#[async_trait]
impl Handler for TiktokHandler {
    fn name(&self) -> &str {
        "tiktok"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let request = cx.request(url.clone());
        match cx.retriever().fetch_bytes(&request).await {
            Ok(page) => summarize_rehydration_data(&page.text()),
            Err(err) => {
                debug!(url = %url, error = %err, "video page unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

/// Builds the video line from a video page body.
pub fn summarize_rehydration_data(body: &str) -> Outcome {
    let Some(blob) = capture_blob(&REHYDRATION_DATA, body) else {
        return Outcome::Rejected(Rejection::NoContent);
    };

    let item = serde_json::from_str::<serde_json::Value>(blob)
        .ok()
        .and_then(|value| value.pointer(ITEM_POINTER).cloned())
        .and_then(|item| serde_json::from_value::<ItemStruct>(item).ok());
    let Some(item) = item else {
        return Outcome::Rejected(Rejection::Parse);
    };
    let Some(caption) = item.desc.as_deref().map(collapse_whitespace) else {
        return Outcome::Rejected(Rejection::Parse);
    };

    let author = item
        .author
        .map(|a| match (a.nickname, a.unique_id) {
            (Some(name), Some(id)) => format!("{} (@{})", name, id),
            (Some(name), None) => name,
            (None, Some(id)) => format!("@{}", id),
            (None, None) => String::new(),
        })
        .unwrap_or_default();
    let (views, likes) = item.stats.map(|s| (s.play_count, s.digg_count)).unwrap_or_default();
    let duration = item.video.and_then(|v| v.duration).filter(|d| *d > 0);

    let caption = if caption.is_empty() { String::new() } else { bold(&truncate(&caption, MAX_CAPTION)) };
    let line = join_facets([
        caption,
        author,
        views.map(|v| format!("{} views", format_count(v))).unwrap_or_default(),
        likes.map(|v| format!("{} likes", format_count(v))).unwrap_or_default(),
        duration.map(format_duration).unwrap_or_default(),
    ]);

    if line.is_empty() { Outcome::Rejected(Rejection::NoContent) } else { Outcome::Summary(Summary::new(line)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_PAGE: &str = r#"<html><head>
        <script id="__UNIVERSAL_DATA_FOR_REHYDRATION__" type="application/json">{"__DEFAULT_SCOPE__":{"webapp.video-detail":{"itemInfo":{"itemStruct":{"id":"1","desc":"cat vs cucumber #cats","author":{"nickname":"Cat Person","uniqueId":"catperson"},"stats":{"playCount":2500000,"diggCount":312000},"video":{"duration":31}}}}}}</script>
    </head></html>"#;

    #[test]
    fn test_video_line() {
        let summary = summarize_rehydration_data(VIDEO_PAGE).into_summary().unwrap();
        assert_eq!(
            summary.first_line(),
            "\u{2}cat vs cucumber #cats\u{2} • Cat Person (@catperson) • 2.5M views • 312K likes • 0:31"
        );
    }

    #[test]
    fn test_missing_anchor() {
        assert_eq!(summarize_rehydration_data("<html></html>"), Outcome::Rejected(Rejection::NoContent));
    }

    #[test]
    fn test_missing_item_struct() {
        let body = r#"<script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">{"__DEFAULT_SCOPE__":{"webapp.app-context":{}}}</script>"#;
        assert_eq!(summarize_rehydration_data(body), Outcome::Rejected(Rejection::Parse));
    }

    #[test]
    fn test_malformed_blob() {
        let body = r#"<script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">{not json</script>"#;
        assert_eq!(summarize_rehydration_data(body), Outcome::Rejected(Rejection::Parse));
    }
}
