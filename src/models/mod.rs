//! Core data models for podnk.
//!
//! - `config`: the explicit configuration struct, built once at startup
//! - `episode`: stages and the text artifacts they produce
//! - `error`: the error taxonomy every layer returns

mod config;
mod episode;
mod error;

pub use config::*;
pub use episode::*;
pub use error::*;
