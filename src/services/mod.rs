//! Local collaborators of the organize engine

pub mod filesystem;

pub use filesystem::*;
