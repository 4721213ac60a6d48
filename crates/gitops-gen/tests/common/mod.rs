//! Shared helpers for gitops-gen integration tests.
//!
//! - builders for options and explicit resources
//! - executors and fixtures for driving the sync code against a real
//!   temp directory

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
