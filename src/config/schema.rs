//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::padding::PaddingPolicy;
use crate::range::{UnknownPathPolicy, ValidationPolicy};
use crate::upstream::CachePolicy;

/// Well-known range lookup host.
pub const DEFAULT_UPSTREAM: &str = "https://api.pwnedpasswords.com";

/// Root configuration for the range proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, scheme detection).
    pub listener: ListenerConfig,

    /// Upstream range API settings.
    pub upstream: UpstreamConfig,

    /// Request validation settings.
    pub validation: ValidationConfig,

    /// Response padding settings.
    pub padding: PaddingPolicy,

    /// Shared response cache settings.
    pub cache: CachePolicy,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Validation policy derived from the listener and validation sections.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            unknown_path: self.validation.unknown_path,
            trust_forwarded_proto: self.listener.trust_forwarded_proto,
            assume_https: self.listener.assume_https,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Trust `X-Forwarded-Proto` from the TLS-terminating edge.
    pub trust_forwarded_proto: bool,

    /// Treat requests without scheme information as HTTPS.
    pub assume_https: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_forwarded_proto: true,
            assume_https: false,
        }
    }
}

/// Upstream range API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; `/range/{PREFIX}` is appended.
    pub base_url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole upstream request timeout in seconds.
    pub request_timeout_secs: u64,

    /// User-Agent sent when the caller supplies none.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            user_agent: concat!("range-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Response for paths outside `/range/`.
    pub unknown_path: UnknownPathPolicy,
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for in-flight requests, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            drain_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
