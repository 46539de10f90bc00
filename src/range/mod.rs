//! Range request validation subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → validator.rs (method, scheme, path, prefix checks in fixed order)
//!     → prefix.rs (HashPrefix parse + uppercase, QueryMode from ?mode=)
//!     → Verdict::Forward(RangeQuery) handed to the pipeline
//! ```
//!
//! # Design Decisions
//! - Every check runs before any network call
//! - Each failure short-circuits with a fixed plain-text body
//! - The hex check is anchored: the whole candidate must be hex

pub mod prefix;
pub mod validator;

pub use prefix::{HashPrefix, QueryMode};
pub use validator::{IncomingRequest, RangeQuery, Rejection, UnknownPathPolicy, ValidationPolicy, Verdict};
