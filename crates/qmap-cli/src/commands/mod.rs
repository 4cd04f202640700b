//! CLI command implementations.

pub mod common;
pub mod coupling;
pub mod map;
pub mod unroll;
pub mod version;
