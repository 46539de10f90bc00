//! The per-request range pipeline.
//!
//! # Data Flow
//! ```text
//! IncomingRequest
//!     → validate (preflight / reject / forward)
//!     → join(forwarder.forward(canonical URL), padding on blocking pool)
//!     → response::assemble
//! ```
//!
//! # Design Decisions
//! - Pure request handler: immutable request in, response out, no globals
//! - Forward and padding run concurrently; latency is the slower of the two
//! - Upstream failures are fatal for the request, padding failures are not
//! - Dropping the future drops the in-flight upstream request

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::response::{IntoResponse, Response};
use url::Url;

use crate::config::ProxyConfig;
use crate::http::response;
use crate::observability::metrics;
use crate::padding::{PaddingGenerator, PaddingSource};
use crate::range::{validator, IncomingRequest, QueryMode, ValidationPolicy, Verdict};
use crate::upstream::forwarder::forwardable_headers;
use crate::upstream::{canonical_url, CachingForwarder, Forwarder, HttpForwarder, ResponseCache, UpstreamRequest};

/// Errors building a pipeline from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid upstream base URL: {0}")]
    Upstream(#[from] url::ParseError),
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Validation, forwarding and padding wired together for one configuration.
pub struct Pipeline {
    policy: ValidationPolicy,
    upstream_base: Url,
    padding: Arc<dyn PaddingSource>,
    forwarder: Arc<dyn Forwarder>,
}

impl Pipeline {
    pub fn new(
        policy: ValidationPolicy,
        upstream_base: Url,
        padding: Arc<dyn PaddingSource>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            policy,
            upstream_base,
            padding,
            forwarder,
        }
    }

    /// Build from configuration. When a cache is given and enabled, the
    /// upstream forwarder is wrapped by it.
    pub fn from_config(config: &ProxyConfig, cache: Option<Arc<ResponseCache>>) -> Result<Self, BuildError> {
        let upstream_base = Url::parse(&config.upstream.base_url)?;
        let http: Arc<dyn Forwarder> = Arc::new(HttpForwarder::new(
            Duration::from_secs(config.upstream.connect_timeout_secs),
            Duration::from_secs(config.upstream.request_timeout_secs),
            &config.upstream.user_agent,
        )?);

        let forwarder: Arc<dyn Forwarder> = match cache {
            Some(cache) if cache.policy().enabled => Arc::new(CachingForwarder::new(http, cache)),
            _ => http,
        };

        Ok(Self::new(
            config.validation_policy(),
            upstream_base,
            Arc::new(PaddingGenerator::new(config.padding)),
            forwarder,
        ))
    }

    /// Handle one request end to end.
    pub async fn handle(&self, request: IncomingRequest) -> Response {
        let start = Instant::now();

        let query = match validator::validate(&request, &self.policy) {
            Verdict::Preflight => {
                metrics::record_request("preflight", 200, start);
                return response::preflight();
            }
            Verdict::Reject(rejection) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.uri.path(),
                    reason = rejection.reason(),
                    "Request rejected"
                );
                metrics::record_request("rejected", rejection.status().as_u16(), start);
                return rejection.into_response();
            }
            Verdict::Forward(query) => query,
        };

        let upstream_request = UpstreamRequest {
            url: canonical_url(&self.upstream_base, &query.prefix, query.mode),
            headers: forwardable_headers(&request.headers),
        };

        let (fetched, padding) = tokio::join!(
            self.forwarder.forward(upstream_request),
            self.padding_for(request.add_padding(), query.mode)
        );

        match fetched {
            Ok(upstream) => {
                let outcome = if response::will_pad(&upstream, &padding) { "padded" } else { "forwarded" };
                metrics::record_request(outcome, upstream.status.as_u16(), start);
                response::assemble(upstream, &padding)
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Upstream request failed");
                metrics::record_upstream_error(e.kind());
                metrics::record_request("upstream_error", e.status().as_u16(), start);
                e.into_response()
            }
        }
    }

    /// Generate padding on the blocking pool. A failed task yields no padding.
    async fn padding_for(&self, add_padding: Option<&str>, mode: QueryMode) -> String {
        if !self.padding.is_requested(add_padding) {
            return String::new();
        }

        let source = self.padding.clone();
        match tokio::task::spawn_blocking(move || source.block(mode)).await {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!(error = %e, "Padding generation failed, responding unpadded");
                String::new()
            }
        }
    }
}
