//! Response assembly.
//!
//! # Responsibilities
//! - Answer CORS preflight
//! - Pass non-200 and unpadded upstream responses through unchanged
//! - Append padding to 200 responses and mark them long-lived public
//!
//! # Design Decisions
//! - Hop-by-hop and framing headers are stripped; the server re-frames the body
//! - Compressed bodies are never padded

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};

use crate::upstream::forwarder::{is_hop_by_hop, UpstreamResponse};

/// Cache-Control for padded responses (31 days).
pub const PADDED_CACHE_CONTROL: &str = "public, max-age=2678400";

/// Preflight cache lifetime in seconds (20 days).
pub const PREFLIGHT_MAX_AGE: &str = "1728000";

/// Set the CORS preflight headers.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Add-Padding"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
}

/// Empty 200 answer to an OPTIONS request.
pub fn preflight() -> Response {
    let mut response = Response::new(Body::empty());
    apply_cors(response.headers_mut());
    response
}

/// Whether `padding` will be appended to `upstream`.
pub fn will_pad(upstream: &UpstreamResponse, padding: &str) -> bool {
    upstream.status == StatusCode::OK && !padding.is_empty() && upstream.is_identity_encoded()
}

/// Build the client response from the upstream response and padding block.
pub fn assemble(upstream: UpstreamResponse, padding: &str) -> Response {
    if !will_pad(&upstream, padding) {
        return passthrough(upstream);
    }

    let mut body = Vec::with_capacity(upstream.body.len() + padding.len());
    body.extend_from_slice(&upstream.body);
    body.extend_from_slice(padding.as_bytes());

    let mut response = build(upstream.status, &upstream.headers, Body::from(body));
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(PADDED_CACHE_CONTROL));
    response
}

/// The upstream response as received.
pub fn passthrough(upstream: UpstreamResponse) -> Response {
    build(upstream.status, &upstream.headers, Body::from(upstream.body))
}

fn build(status: StatusCode, upstream_headers: &HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in upstream_headers {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    response
}
