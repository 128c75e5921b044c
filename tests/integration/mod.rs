//! Integration test suite for manifest-render
//!
//! End-to-end tests that render real directory trees and drive the binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **render_flow**: ordering, multi-document files, extension policy, errors
//! - **pipeline_behavior**: filters, transformers and provenance annotations
//! - **cache_behavior**: single flight, isolation, expiry, shared caches
//! - **config_file**: TOML configuration loading
//! - **cli**: the `manifest-render` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cache_behavior;
mod cli;
mod pipeline_behavior;
mod render_flow;
