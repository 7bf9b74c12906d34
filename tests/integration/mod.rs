//! Integration tests for tapedeck
//!
//! These tests drive the engine, the archive codec and the remote gateway
//! against a real filesystem, plus the `tapedeck` binary end to end.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod recording_flow;
pub mod snapshot_transfer;
