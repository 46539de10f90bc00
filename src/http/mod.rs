//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, request ID)
//!     → pipeline.rs (validate → forward + pad concurrently)
//!     → response.rs (CORS, passthrough or padded assembly)
//!     → Send to client
//! ```

pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{BuildError, Pipeline};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
