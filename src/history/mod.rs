//! History module for recording executed moves with the organize service.
//!
//! This module provides:
//! - `action_log`: detached, best-effort history calls and their counters

mod action_log;

pub use action_log::*;
