//! Shared response cache keyed by canonical upstream URL.
//!
//! # Responsibilities
//! - Store successful upstream responses for reuse across callers
//! - Decide per status range whether a response may be stored and for how long
//! - Bound memory by entry count and purge expired entries
//!
//! # Design Decisions
//! - The key is the canonical URL only, never the padding header, so padded
//!   and unpadded callers share entries
//! - 300-599 responses are never stored (treated as immediately stale)
//! - A full cache skips the insert rather than evicting live entries
//! - `Set-Cookie` is per caller and never stored

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, StatusCode};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::metrics;
use crate::upstream::forwarder::{ForwardError, Forwarder, UpstreamRequest, UpstreamResponse};

/// Cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Enable the shared response cache.
    pub enabled: bool,
    /// Maximum number of cached buckets.
    pub max_entries: usize,
    /// TTL used when the upstream sends no `max-age`.
    pub default_ttl_secs: u64,
    /// Upper bound on any TTL.
    pub max_ttl_secs: u64,
    /// Interval between sweeps for expired entries.
    pub purge_interval_secs: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            default_ttl_secs: 2_678_400,
            max_ttl_secs: 2_678_400,
            purge_interval_secs: 60,
        }
    }
}

impl CachePolicy {
    /// How long a response may be kept, or `None` if it must not be stored.
    pub fn ttl_for(&self, status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        if !status.is_success() {
            return None;
        }

        let mut max_age = None;
        for value in headers.get_all(header::CACHE_CONTROL) {
            let Ok(value) = value.to_str() else { continue };
            for directive in value.split(',') {
                let directive = directive.trim().to_ascii_lowercase();
                match directive.as_str() {
                    "no-store" | "no-cache" | "private" => return None,
                    _ => {}
                }
                if let Some(secs) = directive.strip_prefix("max-age=") {
                    // A max-age we cannot read means we cannot tell how long it is fresh.
                    max_age = Some(secs.trim_matches('"').parse::<u64>().ok()?);
                }
            }
        }

        let secs = max_age.unwrap_or(self.default_ttl_secs).min(self.max_ttl_secs);
        if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: UpstreamResponse,
    expires_at: Instant,
}

/// A thread-safe response cache.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    policy: CachePolicy,
}

impl ResponseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Fetch a live entry. Expired entries are removed on the way.
    pub fn get(&self, key: &str) -> Option<UpstreamResponse> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        None
    }

    /// Store a response if the policy allows it. Returns whether it was stored.
    pub fn store(&self, key: &str, response: &UpstreamResponse) -> bool {
        let Some(ttl) = self.policy.ttl_for(response.status, &response.headers) else {
            return false;
        };

        if self.entries.len() >= self.policy.max_entries && !self.entries.contains_key(key) {
            self.purge_expired();
            if self.entries.len() >= self.policy.max_entries {
                tracing::debug!(key = %key, "Response cache full, skipping insert");
                return false;
            }
        }

        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "TTL out of range, skipping insert");
            return false;
        };

        let mut stored = response.clone();
        stored.headers.remove(header::SET_COOKIE);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                response: stored,
                expires_at,
            },
        );
        metrics::record_cache_size(self.entries.len());
        true
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            metrics::record_cache_size(self.entries.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Forwarder decorator that consults the shared cache first.
pub struct CachingForwarder {
    inner: Arc<dyn Forwarder>,
    cache: Arc<ResponseCache>,
}

impl CachingForwarder {
    pub fn new(inner: Arc<dyn Forwarder>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Forwarder for CachingForwarder {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ForwardError> {
        if let Some(hit) = self.cache.get(&request.url) {
            tracing::debug!(key = %request.url, "Cache hit");
            metrics::record_cache_event("hit");
            return Ok(hit);
        }

        metrics::record_cache_event("miss");
        let key = request.url.clone();
        let response = self.inner.forward(request).await?;

        if self.cache.store(&key, &response) {
            tracing::debug!(key = %key, status = %response.status, "Cached upstream response");
            metrics::record_cache_event("store");
        }
        Ok(response)
    }
}
