//! End-to-end tests for the update pipeline.
//!
//! The release feed and asset downloads are served by a local mock server;
//! handoff tests start the real `launcher-swap` binary where the platform
//! allows it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod harness;

mod swap_binary;

pub use harness::{FeedServer, StalledHost, TestMonitor};
