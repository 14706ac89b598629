use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{Context, Handler, segments};
use crate::outcome::{Outcome, Rejection};

/// Deepest shortcut nesting followed; a shortcut reached from another
/// shortcut is not resolved again.
pub const MAX_SHORTCUT_DEPTH: usize = 1;

/// Links into the bot's own shortcut service.
///
/// The key is looked up through the summarizer's [`ShortcutResolver`] and the
/// original URL is run through the whole pipeline once more. The resolved
/// URL is appended as a second line.
///
/// [`ShortcutResolver`]: crate::lookup::ShortcutResolver
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutHandler;

#[async_trait]
impl Handler for ShortcutHandler {
    fn name(&self) -> &str {
        "shortcut"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        if cx.depth >= MAX_SHORTCUT_DEPTH {
            debug!(url = %url, depth = cx.depth, "nested shortcut not followed");
            return Outcome::Rejected(Rejection::NoContent);
        }

        let Some(key) = segments(url).first().map(|key| key.to_string()) else {
            return Outcome::Rejected(Rejection::NoContent);
        };

        let target = match cx.summarizer.shortcuts().resolve(&key).await {
            Ok(Some(target)) => target,
            Ok(None) => return Outcome::Rejected(Rejection::NoContent),
            Err(err) => {
                debug!(key = %key, error = %err, "shortcut lookup failed");
                return Outcome::Rejected(Rejection::from(&err));
            }
        };

        debug!(key = %key, target = %target, "following shortcut");
        match cx.summarizer.summarize_at_depth(&target, cx.depth + 1).await {
            Ok(Some(summary)) => Outcome::Summary(summary.with_line(target)),
            Ok(None) => Outcome::Rejected(Rejection::NoContent),
            Err(err) => Outcome::Rejected(Rejection::from(&err)),
        }
    }
}
