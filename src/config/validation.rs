//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream URL and value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Longest TTL the cache accepts (ten years).
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound on `min_lines + line_span`.
pub const MAX_PADDING_LINES: u64 = 100_000;

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::new("upstream.base_url", "scheme must be http or https"));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.base_url", "missing host"));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::new("upstream.base_url", "must not carry a query or fragment"));
            }
        }
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.connect_timeout_secs", "must be greater than 0"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let padding = &config.padding;
    if padding.enabled && padding.min_lines == 0 && padding.line_span == 0 {
        errors.push(ValidationError::new("padding", "min_lines and line_span cannot both be 0"));
    }
    if u64::from(padding.min_lines) + u64::from(padding.line_span) > MAX_PADDING_LINES {
        errors.push(ValidationError::new(
            "padding",
            format!("min_lines + line_span must not exceed {}", MAX_PADDING_LINES),
        ));
    }

    let cache = &config.cache;
    if cache.enabled {
        if cache.max_entries == 0 {
            errors.push(ValidationError::new("cache.max_entries", "must be greater than 0"));
        }
        if cache.default_ttl_secs > cache.max_ttl_secs {
            errors.push(ValidationError::new("cache.default_ttl_secs", "must not exceed cache.max_ttl_secs"));
        }
        if cache.max_ttl_secs > MAX_CACHE_TTL_SECS {
            errors.push(ValidationError::new(
                "cache.max_ttl_secs",
                format!("must not exceed {} (ten years)", MAX_CACHE_TTL_SECS),
            ));
        }
        if cache.purge_interval_secs == 0 {
            errors.push(ValidationError::new("cache.purge_interval_secs", "must be greater than 0"));
        }
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
