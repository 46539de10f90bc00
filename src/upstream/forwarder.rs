//! Forwarding range lookups to the upstream API.
//!
//! # Responsibilities
//! - Build the canonical upstream URL from (prefix, mode)
//! - Carry the caller's headers minus hop-by-hop and framing headers
//! - Issue exactly one upstream GET per call; no retries
//!
//! # Design Decisions
//! - `Forwarder` is a trait so the pipeline can be driven by a cache
//!   decorator or a test double
//! - Upstream statuses are data, not errors; only transport failures are
//! - Timeouts map to 504, every other transport failure to 502

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::range::validator::ADD_PADDING;
use crate::range::{HashPrefix, QueryMode};

/// Headers that describe a single hop and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the canonical upstream URL. This string is also the cache key and
/// depends on nothing but the prefix and the mode.
pub fn canonical_url(base: &Url, prefix: &HashPrefix, mode: QueryMode) -> String {
    let base = base.as_str().trim_end_matches('/');
    let mut url = format!("{}/range/{}", base, prefix);
    if mode.is_ntlm() {
        url.push_str("?mode=ntlm");
    }
    url
}

/// True for headers that only make sense on one connection.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Headers from the inbound request that are safe to send upstream.
///
/// `Accept-Encoding` is dropped so the upstream body arrives uncompressed
/// and padding can be appended to it. `Add-Padding` is answered here, so the
/// upstream never pads a body that may be cached for unpadded callers.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || name == header::ACCEPT_ENCODING
            || name == ADD_PADDING
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// A request for one range bucket.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Canonical upstream URL.
    pub url: String,
    pub headers: HeaderMap,
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// True when the body is plain bytes we can append to.
    pub fn is_identity_encoded(&self) -> bool {
        match self.headers.get(header::CONTENT_ENCODING) {
            None => true,
            Some(v) => v
                .to_str()
                .map(|s| s.trim().eq_ignore_ascii_case("identity"))
                .unwrap_or(false),
        }
    }
}

/// Upstream transport failures.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Timeout => "timeout",
            ForwardError::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for ForwardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ForwardError::Timeout
        } else {
            ForwardError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let body = match self {
            ForwardError::Timeout => "Upstream request timed out",
            ForwardError::Transport(_) => "Upstream request failed",
        };
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status();
        response
    }
}

/// Something that can answer a range lookup.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ForwardError>;
}

/// Forwarder backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Build a forwarder with connect and whole-request deadlines.
    pub fn new(connect_timeout: Duration, request_timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ForwardError> {
        let response = self
            .client
            .get(&request.url)
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            url = %request.url,
            status = %status,
            bytes = body.len(),
            "Upstream responded"
        );

        Ok(UpstreamResponse { status, headers, body })
    }
}
