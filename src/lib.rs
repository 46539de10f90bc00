//! Privacy-preserving range lookup proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod padding;
pub mod range;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::{HttpServer, Pipeline};
pub use lifecycle::{Shutdown, ShutdownSignal};
