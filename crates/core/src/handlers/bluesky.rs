//! Bluesky posts through the authenticated XRPC API.
//!
//! The session (access token plus the cookie jar of the client that logged
//! in) lives in a [`SessionCell`] owned by [`BlueskyClient`], which is shared
//! by the post handler and the platform-search fallback strategy.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{Context, Handler, endpoint, segments};
use crate::fetch::RetrievalRequest;
use crate::humanize::{format_count, relative_time};
use crate::outcome::{Outcome, Rejection};
use crate::session::{Expiring, SessionCell};
use crate::summarize::SummarizerConfig;
use crate::summary::{Summary, bold, collapse_whitespace, join_facets, truncate};
use crate::{GlimpseError, Result};

/// Default PDS used for logins and API calls.
pub const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Minutes a login is trusted before logging in again.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 90;

const MAX_POST_TEXT: usize = 280;

const TID_ALPHABET: &[u8] = b"234567abcdefghijklmnopqrstuvwxyz";

/// Account used to call the API.
#[derive(Clone, PartialEq, Eq)]
pub struct BlueskyCredentials {
    pub service: String,
    pub identifier: String,
    pub password: String,
}

impl BlueskyCredentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self { service: DEFAULT_SERVICE.to_string(), identifier: identifier.into(), password: password.into() }
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }
}

impl fmt::Debug for BlueskyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskyCredentials")
            .field("service", &self.service)
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A logged-in session.
#[derive(Clone)]
pub struct BlueskySession {
    client: Client,
    access_jwt: String,
    pub did: String,
    pub handle: String,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for BlueskySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskySession")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Expiring for BlueskySession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
    handle: String,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    thread: ThreadView,
}

#[derive(Debug, Deserialize)]
struct ThreadView {
    post: Option<PostView>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<PostView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub author: ProfileView,
    pub record: PostRecord,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub reply_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub handle: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: Option<String>,
    pub embed: Option<RecordEmbed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEmbed {
    pub external: Option<ExternalLink>,
}

/// Link card attached to a post.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalLink {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl PostView {
    /// Record key, the last segment of the post's AT URI.
    pub fn rkey(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or_default()
    }

    pub fn external(&self) -> Option<&ExternalLink> {
        self.record.embed.as_ref().and_then(|e| e.external.as_ref())
    }

    /// When the post was made, from its TID or else its record.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        tid_timestamp(self.rkey()).or_else(|| {
            let raw = self.record.created_at.as_deref()?;
            DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
        })
    }
}

/// Authenticated API access shared across pipeline invocations.
#[derive(Debug)]
pub struct BlueskyClient {
    credentials: Option<BlueskyCredentials>,
    ttl: chrono::Duration,
    session: SessionCell<BlueskySession>,
}

impl BlueskyClient {
    pub fn new(credentials: Option<BlueskyCredentials>) -> Self {
        Self { credentials, ttl: chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES), session: SessionCell::new() }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(config.bluesky.clone()).with_ttl(config.bluesky_session_ttl)
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Number of logins performed so far.
    pub fn login_count(&self) -> usize {
        self.session.refresh_count()
    }

    /// Fetches a post by author and record key.
    pub async fn post_thread(&self, cx: &Context<'_>, actor: &str, rkey: &str) -> Result<Option<PostView>> {
        let mut url = self.xrpc("app.bsky.feed.getPostThread")?;
        url.query_pairs_mut()
            .append_pair("uri", &format!("at://{}/app.bsky.feed.post/{}", actor, rkey))
            .append_pair("depth", "0");

        let response: ThreadResponse = self.get(cx, url).await?;
        Ok(response.thread.post)
    }

    /// Full-text post search.
    pub async fn search_posts(&self, cx: &Context<'_>, query: &str) -> Result<Vec<PostView>> {
        let mut url = self.xrpc("app.bsky.feed.searchPosts")?;
        url.query_pairs_mut().append_pair("q", query).append_pair("limit", "10");

        let response: SearchResponse = self.get(cx, url).await?;
        Ok(response.posts)
    }

    fn credentials(&self) -> Result<&BlueskyCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| GlimpseError::ConfigError("no Bluesky credentials configured".to_string()))
    }

    fn xrpc(&self, method: &str) -> Result<Url> {
        endpoint(&self.credentials()?.service, &format!("/xrpc/{}", method))
    }

    async fn get<T: DeserializeOwned>(&self, cx: &Context<'_>, url: Url) -> Result<T> {
        let session = self.session.get_or_refresh(|| self.login(cx)).await?;
        let request = RetrievalRequest::get(url)
            .timeout(cx.config().timeout)
            .impersonate(false)
            .header("Authorization", format!("Bearer {}", session.access_jwt));

        match cx.retriever().fetch_json_with(&session.client, &request).await {
            Err(GlimpseError::HttpStatus { status: 401, .. }) => {
                self.session.invalidate_if(|current| current.access_jwt == session.access_jwt).await;
                Err(GlimpseError::Auth("session rejected".to_string()))
            }
            other => other,
        }
    }

    async fn login(&self, cx: &Context<'_>) -> Result<BlueskySession> {
        let credentials = self.credentials()?;
        let url = self.xrpc("com.atproto.server.createSession")?;
        let body = CreateSessionRequest { identifier: &credentials.identifier, password: &credentials.password };
        let request = RetrievalRequest::post_json(url, &body)?.timeout(cx.config().timeout);

        let jar = Arc::new(Jar::default());
        let client = Client::builder().cookie_provider(Arc::clone(&jar)).build()?;

        let response: CreateSessionResponse = match cx.retriever().fetch_json_with(&client, &request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(identifier = %credentials.identifier, error = %err, "bluesky login failed");
                return Err(match err {
                    GlimpseError::HttpStatus { status: 400 | 401, .. } => {
                        GlimpseError::Auth("invalid identifier or password".to_string())
                    }
                    other => other,
                });
            }
        };

        debug!(handle = %response.handle, "bluesky session created");
        Ok(BlueskySession {
            client,
            access_jwt: response.access_jwt,
            did: response.did,
            handle: response.handle,
            expires_at: Utc::now() + self.ttl,
        })
    }
}

/// `bsky.app/profile/{actor}/post/{rkey}` links.
#[derive(Debug, Clone)]
pub struct BlueskyHandler {
    client: Arc<BlueskyClient>,
}

impl BlueskyHandler {
    pub fn new(client: Arc<BlueskyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Handler for BlueskyHandler {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn handle(&self, cx: &Context<'_>, url: &Url) -> Outcome {
        let (actor, rkey) = match segments(url).as_slice() {
            ["profile", actor, "post", rkey, ..] => (actor.to_string(), rkey.to_string()),
            _ => return Outcome::NotApplicable,
        };
        if !self.client.is_configured() {
            return Outcome::NotApplicable;
        }

        match self.client.post_thread(cx, &actor, &rkey).await {
            Ok(Some(post)) => Outcome::Summary(Summary::new(post_line(&post, Utc::now()))),
            Ok(None) => Outcome::Rejected(Rejection::NoContent),
            Err(err) => {
                debug!(url = %url, error = %err, "post unavailable");
                Outcome::Rejected(Rejection::from(&err))
            }
        }
    }
}

/// `<bold text> • name (@handle) • age • N likes`.
pub fn post_line(post: &PostView, now: DateTime<Utc>) -> String {
    let text = collapse_whitespace(&post.record.text);
    let text = if text.is_empty() { String::new() } else { bold(&truncate(&text, MAX_POST_TEXT)) };

    let author = match post.author.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("{} (@{})", name, post.author.handle),
        _ => format!("@{}", post.author.handle),
    };
    let age = post.created().map(|t| relative_time(t, now)).unwrap_or_default();
    let likes = format!("{} likes", format_count(post.like_count));

    join_facets([text, author, age, likes])
}

/// Creation time encoded in a timestamp identifier (TID) record key.
///
/// A TID is 13 base32-sortable characters holding a 64-bit integer whose
/// top bit is zero, followed by 53 bits of microseconds since the epoch and
/// 10 bits of clock id.
pub fn tid_timestamp(rkey: &str) -> Option<DateTime<Utc>> {
    let bytes = rkey.as_bytes();
    if bytes.len() != 13 || !TID_ALPHABET[..16].contains(&bytes[0]) {
        return None;
    }

    let value = bytes.iter().try_fold(0u64, |acc, b| {
        let digit = TID_ALPHABET.iter().position(|c| c == b)?;
        Some((acc << 5) | digit as u64)
    })?;

    DateTime::from_timestamp_micros((value >> 10) as i64)
}
