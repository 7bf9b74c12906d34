//! Shared test utilities for tapedeck
//!
//! - Temporary data directories laid out like `~/.tapedeck`
//! - Engines wired to real storage and preferences

pub mod store_fixtures;
