//! # ferry-test
//!
//! Integration tests for Ferry.
//!
//! This crate contains:
//! - Fixtures: engines pre-loaded with the tables the tests write to
//! - Workload generators producing reproducible row streams
//! - End-to-end tests under `tests/`, driving the sink and then the source
//!   against the in-memory engine

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and fixtures.
pub mod utils;

/// Workload generators.
pub mod workload;
