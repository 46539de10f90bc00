//! Response padding subsystem.
//!
//! Padding appends fabricated `SUFFIX:0` lines to a successful range
//! response so that the response size no longer reveals how many genuine
//! suffixes the bucket holds.
//!
//! # Design Decisions
//! - The line count is drawn from the OS CSPRNG; a predictable count would
//!   itself leak the true size
//! - Line content comes from a fast non-cryptographic generator, since
//!   clients discard `:0` entries and never inspect them
//! - Generation is CPU-local and runs beside the upstream fetch

pub mod generator;

pub use generator::{wants_padding, PaddingGenerator, PaddingPolicy, PaddingSource};
