//! Pipeline module - the episode pipeline and its selector stages.

mod orchestrator;
pub mod selector;

pub use orchestrator::*;
