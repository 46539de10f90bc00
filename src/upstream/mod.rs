//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RangeQuery (prefix, mode)
//!     → forwarder.rs (canonical URL, filtered headers)
//!     → cache.rs (CachingForwarder: hit → return, miss → fetch → store 2xx)
//!     → forwarder.rs (HttpForwarder: one GET, no retries)
//!     → UpstreamResponse (status, headers, buffered body)
//! ```

pub mod cache;
pub mod forwarder;

pub use cache::{CachePolicy, CachingForwarder, ResponseCache};
pub use forwarder::{
    canonical_url, ForwardError, Forwarder, HttpForwarder, UpstreamRequest, UpstreamResponse,
};
