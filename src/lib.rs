//! podnk - Multi-stage LLM generation of podcast episodes.
//!
//! ## Architecture
//!
//! One topic runs through a fixed chain of generation stages. Each stage is
//! a single call to a text-generation service; two of them fan out into
//! candidates and two select among those candidates.
//!
//! ## Pipeline
//!
//! Topic → Concept → Outlines (n) → Best outline → Script drafts (n)
//!   → Script review → Cover art + Theme song → Episode
//!
//! Every intermediate result is written as a plain text file under
//! `<output_dir>/<topic>/`.
//!
//! ## Seams
//!
//! - [`GenerationClient`]: the only way the pipeline reaches a model
//! - [`AuditedClient`]: wraps any client and appends each exchange to a JSONL log
//! - [`Config`]: loaded once, passed explicitly

pub mod artifact;
pub mod client;
pub mod models;
pub mod pipeline;
pub mod prompt;

// Re-exports for convenience
pub use artifact::{ArtifactValue, ArtifactWriter};
pub use client::{AuditedClient, ExchangeLog, GenerationClient, LlmClient};
pub use models::{Config, Episode, PodError, Result, RunStats, Stage};
pub use pipeline::EpisodePipeline;
pub use prompt::{PromptRenderer, PromptSpec};
