//! Auto-organize workflow
//!
//! - `extraction`: windowed content previews
//! - `analysis`: the clustering request
//! - `rules`: rule suggestions after a finished run
//! - `session`: per-run state
//! - `orchestrator`: the state machine tying it together

pub mod analysis;
pub mod extraction;
pub mod orchestrator;
pub mod rules;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::*;
pub use extraction::*;
pub use orchestrator::*;
pub use rules::*;
pub use session::*;
