//! Timed, retryable retrieval of remote documents.
//!
//! Every fetch goes through the same steps: the URL is canonicalized, a
//! request is built (optionally with a browser header profile), the network
//! call is raced against a deadline, and the declared content type is checked
//! against an allow-list before the body is read.
//!
//! When the deadline wins, the in-flight request future is dropped, which
//! aborts the transfer instead of letting it finish in the background.

pub mod gate;
pub mod impersonate;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::canonical::canonicalize;
use crate::parse::Document;
use crate::{GlimpseError, Result};

pub use gate::is_allowed_content_type;
pub use impersonate::{HeaderProfile, random_profile};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default number of attempts for selector-scoped retrieval.
pub const DEFAULT_RETRIES: usize = 5;

/// Fixed part of the delay before a retry.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(100);

/// Upper bound of the random part of the delay before a retry.
pub const DEFAULT_RETRY_JITTER: Duration = Duration::from_millis(150);

/// Raw bodies are only scanned for markers; anything past this is dropped.
pub const MAX_RAW_BODY: usize = 4 * 1024 * 1024;

/// A single retrieval, described up front.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use glimpse_core::RetrievalRequest;
/// use url::Url;
///
/// let request = RetrievalRequest::get(Url::parse("https://example.com").unwrap())
///     .timeout(Duration::from_millis(500))
///     .retries(3)
///     .impersonate(false);
/// assert_eq!(request.retries, 3);
/// ```
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
    /// Attempts made by selector-scoped retrieval (default: 5).
    pub retries: usize,
    /// Fixed delay before each retry (default: 100ms).
    pub retry_base: Duration,
    /// Random extra delay bound before each retry (default: 150ms).
    pub retry_jitter: Duration,
    /// Per-attempt deadline (default: 1500ms).
    pub timeout: Duration,
    /// Attach a random browser header profile (default: true).
    pub impersonate: bool,
    /// Headers applied last, overriding the profile.
    pub headers: Vec<(String, String)>,
}

impl RetrievalRequest {
    /// A GET request with default retry, timeout and impersonation settings.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
            retries: DEFAULT_RETRIES,
            retry_base: DEFAULT_RETRY_BASE,
            retry_jitter: DEFAULT_RETRY_JITTER,
            timeout: DEFAULT_TIMEOUT,
            impersonate: true,
            headers: Vec::new(),
        }
    }

    /// A POST request carrying a JSON body.
    pub fn post_json(url: Url, body: &impl serde::Serialize) -> Result<Self> {
        let body = serde_json::to_string(body)?;
        Ok(Self { method: Method::POST, body: Some(body), ..Self::get(url) }
            .impersonate(false)
            .header("Content-Type", "application/json"))
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the retry delay window to `[base, base + jitter)`.
    pub fn retry_delay(mut self, base: Duration, jitter: Duration) -> Self {
        self.retry_base = base;
        self.retry_jitter = jitter;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn impersonate(mut self, impersonate: bool) -> Self {
        self.impersonate = impersonate;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { attempts: self.retries, base: self.retry_base, jitter: self.retry_jitter }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub base: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: DEFAULT_RETRIES, base: DEFAULT_RETRY_BASE, jitter: DEFAULT_RETRY_JITTER }
    }
}

impl RetryPolicy {
    /// A delay in `[base, base + jitter)`.
    pub fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..jitter_ms) };
        self.base + Duration::from_millis(extra)
    }
}

/// Runs `op` until it succeeds, fails terminally, or the attempts run out.
///
/// Attempts after the first are preceded by [`RetryPolicy::delay`]. A
/// [terminal](GlimpseError::is_terminal) error ends the loop at once; after
/// the last failed attempt the loop reports [`GlimpseError::MaxAttempts`].
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.delay()).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_terminal() => return Err(err),
            Err(err) => trace!(attempt, error = %err, "attempt failed"),
        }
    }

    Err(GlimpseError::MaxAttempts { attempts })
}

/// A response body in one of two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Decoded markup, ready to be parsed into a [`Document`].
    Markup(String),
    /// Raw bytes for cheap substring checks.
    Raw(Vec<u8>),
}

/// A fetched page.
///
/// The parsed tree is built on demand through [`RetrievedDocument::with_document`]
/// so it never has to be held across an `.await`.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    /// Final URL after redirects.
    pub url: Url,
    pub body: Body,
}

impl RetrievedDocument {
    /// Parses the markup and hands the tree to `f`.
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        match &self.body {
            Body::Markup(html) => {
                let doc = Document::parse_with_url(html, self.url.clone())?;
                Ok(f(&doc))
            }
            Body::Raw(_) => Err(GlimpseError::HtmlParseError("raw body has no document tree".to_string())),
        }
    }

    /// Body as text, lossily decoded for raw bodies.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        match &self.body {
            Body::Markup(html) => std::borrow::Cow::Borrowed(html.as_str()),
            Body::Raw(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Whether the body contains a literal marker.
    pub fn contains(&self, marker: &str) -> bool {
        let needle = marker.as_bytes();
        let haystack = match &self.body {
            Body::Markup(html) => html.as_bytes(),
            Body::Raw(bytes) => bytes.as_slice(),
        };
        !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Markup,
    Raw,
}

/// HTTP client wrapper implementing the retrieval contract.
#[derive(Debug, Clone)]
pub struct Retriever {
    client: Client,
    user_agent: String,
}

impl Retriever {
    /// Creates a retriever with its own connection pool.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, user_agent: user_agent.into() })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client, user_agent: impl Into<String>) -> Self {
        Self { client, user_agent: user_agent.into() }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetches a page as markup.
    pub async fn fetch_document(&self, request: &RetrievalRequest) -> Result<RetrievedDocument> {
        self.execute(&self.client, request, Mode::Markup).await
    }

    /// Fetches a page as raw bytes (capped at [`MAX_RAW_BODY`]).
    pub async fn fetch_bytes(&self, request: &RetrievalRequest) -> Result<RetrievedDocument> {
        self.execute(&self.client, request, Mode::Raw).await
    }

    /// Fetches and decodes a JSON API response.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &RetrievalRequest) -> Result<T> {
        self.fetch_json_with(&self.client, request).await
    }

    /// Fetches and decodes a JSON API response through another client
    /// (one carrying a session cookie jar, for instance).
    pub async fn fetch_json_with<T: DeserializeOwned>(&self, client: &Client, request: &RetrievalRequest) -> Result<T> {
        let page = self.execute(client, request, Mode::Markup).await?;
        Ok(serde_json::from_str(&page.text())?)
    }

    /// Selector-scoped retrieval.
    ///
    /// Fetches the page and runs `extract` on its tree, retrying with the
    /// request's [`RetryPolicy`] when the fetch fails or `extract` finds
    /// nothing. A disallowed content type ends the loop immediately.
    pub async fn select_with<T, F>(&self, request: &RetrievalRequest, extract: F) -> Result<T>
    where
        T: Send,
        F: Fn(&Document) -> Option<T> + Send + Sync,
    {
        let extract = &extract;
        retry(&request.retry_policy(), |attempt| async move {
            trace!(url = %request.url, attempt, "selector attempt");
            let page = self.fetch_document(request).await?;
            page.with_document(extract)?.ok_or(GlimpseError::NoMatch)
        })
        .await
    }

    async fn execute(&self, client: &Client, request: &RetrievalRequest, mode: Mode) -> Result<RetrievedDocument> {
        let url = canonicalize(&request.url);
        let timeout_ms = request.timeout.as_millis() as u64;

        match tokio::time::timeout(request.timeout, self.send(client, request, url, mode)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(url = %request.url, timeout_ms, "fetch timed out");
                Err(GlimpseError::Timeout { timeout_ms })
            }
        }
    }

    /// Profile (or plain user agent) first, then the request's own headers,
    /// each replacing any value already set under the same name.
    fn headers_for(&self, request: &RetrievalRequest) -> Result<HeaderMap> {
        let mut headers = if request.impersonate {
            random_profile().headers()
        } else {
            let mut headers = HeaderMap::new();
            let agent = HeaderValue::from_str(&self.user_agent)
                .map_err(|e| GlimpseError::ConfigError(format!("invalid user agent: {e}")))?;
            headers.insert(USER_AGENT, agent);
            headers
        };

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| GlimpseError::ConfigError(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| GlimpseError::ConfigError(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    async fn send(&self, client: &Client, request: &RetrievalRequest, url: Url, mode: Mode) -> Result<RetrievedDocument> {
        let mut builder = client.request(request.method.clone(), url.clone()).headers(self.headers_for(request)?);

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let response = gate_response(response)?;
        let final_url = response.url().clone();

        let body = match mode {
            Mode::Markup => Body::Markup(response.text().await?),
            Mode::Raw => Body::Raw(read_capped(response, MAX_RAW_BODY).await?),
        };

        Ok(RetrievedDocument { url: final_url, body })
    }
}

/// Rejects unsuccessful statuses and disallowed media types without
/// touching the body. A missing `Content-Type` is let through.
fn gate_response(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(GlimpseError::HttpStatus { status: status.as_u16(), url: response.url().to_string() });
    }

    if let Some(value) = response.headers().get(CONTENT_TYPE) {
        let content_type = value.to_str().unwrap_or_default();
        if !is_allowed_content_type(content_type) {
            return Err(GlimpseError::DisallowedContentType(content_type.to_string()));
        }
    }

    Ok(response)
}

async fn read_capped(mut response: Response, cap: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = cap.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() >= cap {
            break;
        }
    }
    Ok(bytes)
}
