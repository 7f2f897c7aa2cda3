//! Artifact persistence.

mod writer;

pub use writer::*;
