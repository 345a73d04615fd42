//! CLI command implementations.

pub mod common;
pub mod compress;
pub mod config;
pub mod decompress;
pub mod info;
