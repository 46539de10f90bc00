//! Request validation.
//!
//! # Responsibilities
//! - Answer CORS preflight without further checks
//! - Enforce HTTPS, the `/range/` path family and GET-only access
//! - Extract and normalize the hash prefix and query mode
//!
//! # Design Decisions
//! - Checks run in a fixed order; the first failure wins
//! - Validation is a pure function: IncomingRequest → Verdict
//! - Error bodies are fixed strings that existing clients match on

use axum::{
    body::Body,
    http::{header, uri::Uri, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::range::prefix::{HashPrefix, PrefixError, QueryMode};

/// Path family served by the proxy.
pub const RANGE_PATH: &str = "/range/";

/// Forwarded protocol header set by the TLS-terminating edge.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Opt-in header for response padding.
pub const ADD_PADDING: &str = "add-padding";

/// What to answer for a path outside `/range/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPathPolicy {
    /// 400 "Invalid API query".
    #[default]
    BadRequest,
    /// 404 "Not Found".
    NotFound,
}

/// Validation settings derived from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationPolicy {
    pub unknown_path: UnknownPathPolicy,
    /// Honour `X-Forwarded-Proto` when the request URI carries no scheme.
    pub trust_forwarded_proto: bool,
    /// Scheme to assume when nothing else says otherwise.
    pub assume_https: bool,
}

/// Read-only view of an inbound request.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl IncomingRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self { method, uri, headers }
    }

    /// Resolve the scheme the client used to reach us.
    pub fn scheme(&self, policy: &ValidationPolicy) -> String {
        if let Some(scheme) = self.uri.scheme_str() {
            return scheme.to_ascii_lowercase();
        }

        if policy.trust_forwarded_proto {
            let forwarded = self
                .headers
                .get(X_FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_ascii_lowercase())
                .filter(|v| !v.is_empty());
            if let Some(proto) = forwarded {
                return proto;
            }
        }

        if policy.assume_https {
            "https".to_string()
        } else {
            "http".to_string()
        }
    }

    /// The `Add-Padding` header, if present and readable.
    pub fn add_padding(&self) -> Option<&str> {
        self.headers
            .get(ADD_PADDING)
            .and_then(|v| v.to_str().ok())
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    pub prefix: HashPrefix,
    pub mode: QueryMode,
}

/// Outcome of validating a request.
#[derive(Debug)]
pub enum Verdict {
    /// CORS preflight: answer immediately.
    Preflight,
    /// Forward to upstream.
    Forward(RangeQuery),
    /// Terminal client error.
    Reject(Rejection),
}

/// Client input errors, each mapped to a fixed status and body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Request must be HTTPS")]
    NotHttps,
    #[error("Invalid API query")]
    InvalidQuery,
    #[error("Not Found")]
    NotFound,
    #[error("Only GET requests can be used to query ranges, but this request used the {0} verb")]
    MethodNotAllowed(Method),
    #[error("The hash prefix was not in a valid format")]
    InvalidFormat,
    #[error("The hash prefix was not valid hexadecimal")]
    NotHex,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::NotFound => StatusCode::NOT_FOUND,
            Rejection::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::NotHttps => "not_https",
            Rejection::InvalidQuery | Rejection::NotFound => "unknown_path",
            Rejection::MethodNotAllowed(_) => "method",
            Rejection::InvalidFormat => "prefix_format",
            Rejection::NotHex => "prefix_hex",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.to_string()));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain;charset=UTF-8"),
        );
        response
    }
}

impl From<PrefixError> for Rejection {
    fn from(err: PrefixError) -> Self {
        match err {
            PrefixError::Length => Rejection::InvalidFormat,
            PrefixError::NotHex => Rejection::NotHex,
        }
    }
}

/// Validate an inbound request.
pub fn validate(request: &IncomingRequest, policy: &ValidationPolicy) -> Verdict {
    match check(request, policy) {
        Ok(Some(query)) => Verdict::Forward(query),
        Ok(None) => Verdict::Preflight,
        Err(rejection) => Verdict::Reject(rejection),
    }
}

fn check(request: &IncomingRequest, policy: &ValidationPolicy) -> Result<Option<RangeQuery>, Rejection> {
    // 1. Preflight
    if request.method == Method::OPTIONS {
        return Ok(None);
    }

    // 2. Transport
    if !request.scheme(policy).starts_with("https") {
        return Err(Rejection::NotHttps);
    }

    // 3. Path family
    let path = request.uri.path();
    let Some(candidate) = path.strip_prefix(RANGE_PATH) else {
        return Err(match policy.unknown_path {
            UnknownPathPolicy::BadRequest => Rejection::InvalidQuery,
            UnknownPathPolicy::NotFound => Rejection::NotFound,
        });
    };

    // 4. Verb
    if request.method != Method::GET {
        return Err(Rejection::MethodNotAllowed(request.method.clone()));
    }

    // 5 & 6. Prefix length, then anchored hex
    let prefix = HashPrefix::parse(candidate)?;
    let mode = QueryMode::from_query(request.uri.query());

    Ok(Some(RangeQuery { prefix, mode }))
}
