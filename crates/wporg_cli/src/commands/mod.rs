//! CLI command implementations.

pub mod discover;
pub mod endpoints;
pub mod sync;
