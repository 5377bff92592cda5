//! Execution Engine Module
//!
//! Resolves an approved organize result into move operations and runs them
//! through the filesystem collaborator, tolerating per-file failures.

pub mod executor;

pub use executor::*;
