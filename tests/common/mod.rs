//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use podnk::models::GenerationError;
use podnk::{Config, GenerationClient, PromptSpec, Stage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic client: every completion is `"<stage> #<i>"`.
///
/// Records every prompt it receives and can be told to fail one stage.
#[derive(Default)]
pub struct StubClient {
    fail_on: Option<Stage>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<PromptSpec>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with an API error when `stage` is requested.
    pub fn failing_on(stage: Stage) -> Self {
        Self {
            fail_on: Some(stage),
            ..Self::default()
        }
    }

    /// Sleep before answering, so concurrent stages overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<PromptSpec> {
        self.prompts.lock().unwrap().clone()
    }

    /// Stages requested, in call order.
    pub fn stages(&self) -> Vec<Stage> {
        self.prompts().iter().map(|p| p.stage).collect()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn calls_by_stage(&self) -> HashMap<Stage, usize> {
        let mut counts = HashMap::new();
        for stage in self.stages() {
            *counts.entry(stage).or_insert(0) += 1;
        }
        counts
    }

    /// The single prompt sent for `stage`.
    pub fn prompt_for(&self, stage: Stage) -> PromptSpec {
        self.prompts()
            .into_iter()
            .find(|p| p.stage == stage)
            .unwrap_or_else(|| panic!("no prompt recorded for {stage}"))
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    async fn generate(&self, spec: &PromptSpec) -> Result<Vec<String>, GenerationError> {
        self.prompts.lock().unwrap().push(spec.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on == Some(spec.stage) {
            return Err(GenerationError::Api {
                status: 500,
                message: format!("injected failure at {}", spec.stage),
            });
        }

        Ok((0..spec.params.n)
            .map(|i| format!("{} #{i}", spec.stage))
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub const CONFIG_TOML: &str = r#"
model_name = "gpt-4o"
topics = ["resilience"]
selected_topic_index = 0
n_of_outlines = 2
n_of_script_drafts = 2
concept_sys_prompt = "You are a concept generator."
outline_sys_prompt = "You are an outliner."
eval_outline_sys_prompt = "You are an outline judge."
script_sys_prompt = "You are a script writer."
eval_script_sys_prompt = "You are a script editor."
desc_sys_prompt = "You write descriptions."
art_sys_prompt = "You write image prompts."
song_sys_prompt = "You write music prompts."
episode_sys_prompt = "You compile episodes."
"#;

/// Test config writing under `output_dir`.
pub fn test_config(output_dir: &Path) -> Config {
    let mut config: Config = toml::from_str(CONFIG_TOML).unwrap();
    config.output_dir = output_dir.to_path_buf();
    config
}

/// Sorted file names in `dir` matching `*.txt`.
pub fn txt_files(dir: &Path) -> Vec<String> {
    let pattern = dir.join("*.txt");
    let mut names: Vec<String> = glob::glob(&pattern.to_string_lossy())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
