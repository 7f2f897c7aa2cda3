//! Generation client module.

mod audit;
mod generation;
mod llm_client;

pub use audit::*;
pub use generation::*;
pub use llm_client::*;
