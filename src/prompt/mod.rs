//! Prompt template rendering.
//!
//! A stage's prompt is built by ordinary code into a [`PromptSpec`] and handed
//! to a [`GenerationClient`](crate::client::GenerationClient) explicitly.
//! System prompts come from the config and are never rendered, so whatever
//! formatting the role description carries reaches the model untouched.

pub mod templates;

use crate::models::{Config, ConfigError, Stage};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::Uuid;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Number of completions requested
    pub n: usize,
    /// Completion length cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A fully assembled request for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Stage this prompt belongs to
    pub stage: Stage,
    /// System instruction (verbatim from config)
    pub system: String,
    /// Rendered user instruction
    pub user: String,
    /// Sampling parameters
    pub params: GenerationParams,
    /// Fingerprint of the prompt definition (stage, system, template)
    pub version: Uuid,
}

impl PromptSpec {
    /// Request `n` completions instead of one.
    pub fn with_n(mut self, n: usize) -> Self {
        self.params.n = n;
        self
    }
}

/// Named values available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> TemplateVars<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`.
    pub fn with(mut self, name: &'a str, value: &'a str) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).copied()
    }
}

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex")
});

/// Substitute `{name}` placeholders in `template`.
///
/// `{{` and `}}` produce literal braces. Substituted values are not
/// re-scanned, so braces inside model output pass through.
pub fn render_template(
    stage: Stage,
    template: &str,
    vars: &TemplateVars<'_>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);

        match caps.get(1) {
            Some(name) => {
                let value =
                    vars.get(name.as_str())
                        .ok_or_else(|| ConfigError::MissingTemplateVariable {
                            stage,
                            variable: name.as_str().to_string(),
                        })?;
                out.push_str(value);
            }
            // Escaped brace: keep one of the pair
            None => out.push_str(&whole.as_str()[..1]),
        }

        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Deterministic fingerprint of a prompt definition.
pub fn prompt_version(stage: Stage, system: &str, template: &str) -> Uuid {
    let mut key = String::with_capacity(system.len() + template.len() + 16);
    key.push_str(stage.as_str());
    key.push('\0');
    key.push_str(system);
    key.push('\0');
    key.push_str(template);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// Builds [`PromptSpec`]s from the configuration.
pub struct PromptRenderer<'a> {
    config: &'a Config,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// User template for a stage: config override, else built-in.
    pub fn template(&self, stage: Stage) -> &'a str {
        self.config
            .user_templates
            .get(stage)
            .map(String::as_str)
            .unwrap_or_else(|| templates::builtin(stage))
    }

    /// Assemble the prompt for `stage` with a single completion requested.
    pub fn render(&self, stage: Stage, vars: &TemplateVars<'_>) -> Result<PromptSpec, ConfigError> {
        let template = self.template(stage);
        let system = self.config.prompts.for_stage(stage);
        let user = render_template(stage, template, vars)?;

        Ok(PromptSpec {
            stage,
            system: system.to_string(),
            user,
            params: GenerationParams {
                model: self.config.model_name.clone(),
                temperature: self.config.temperature(stage),
                n: 1,
                max_tokens: self.config.max_tokens,
            },
            version: prompt_version(stage, system, template),
        })
    }

    /// Render `stage` with its single input bound to `input`.
    pub fn render_input(&self, stage: Stage, input: &str) -> Result<PromptSpec, ConfigError> {
        let vars = TemplateVars::new().with(templates::input_variable(stage), input);
        self.render(stage, &vars)
    }

    /// Render every stage with placeholder input to surface template errors
    /// before any request is sent.
    pub fn validate_templates(&self) -> Result<(), ConfigError> {
        for stage in Stage::ALL {
            self.render_input(stage, "")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_config;

    #[test]
    fn test_render_substitutes_and_escapes() {
        let vars = TemplateVars::new().with("topic", "resilience");
        let out = render_template(Stage::Concept, "Theme: {topic} {{literal}} }}", &vars).unwrap();
        assert_eq!(out, "Theme: resilience {literal} }");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let vars = TemplateVars::new().with("concept", "Title: {topic}");
        let out = render_template(Stage::Outline, "Given {concept}.", &vars).unwrap();
        assert_eq!(out, "Given Title: {topic}.");
    }

    #[test]
    fn test_render_leaves_non_identifier_braces() {
        let vars = TemplateVars::new();
        let out = render_template(Stage::Concept, "json: { \"a\": 1 } {1}", &vars).unwrap();
        assert_eq!(out, "json: { \"a\": 1 } {1}");
    }

    #[test]
    fn test_missing_variable_is_config_error() {
        let vars = TemplateVars::new().with("topic", "x");
        let err = render_template(Stage::Outline, "Given {concept}", &vars).unwrap_err();
        match err {
            ConfigError::MissingTemplateVariable { stage, variable } => {
                assert_eq!(stage, Stage::Outline);
                assert_eq!(variable, "concept");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_renderer_keeps_system_prompt_verbatim() {
        let mut config = sample_config();
        config.prompts.concept_sys_prompt = "Role: {topic} stays {{as is}}\n  - bullet".into();
        let renderer = PromptRenderer::new(&config);

        let spec = renderer.render_input(Stage::Concept, "resilience").unwrap();
        assert_eq!(spec.system, "Role: {topic} stays {{as is}}\n  - bullet");
        assert!(spec.user.contains("based on the theme: resilience."));
        assert_eq!(spec.params.model, "gpt-4o");
        assert_eq!(spec.params.n, 1);
        assert_eq!(spec.params.temperature, 1.0);
    }

    #[test]
    fn test_renderer_uses_override_template() {
        let mut config = sample_config();
        config.user_templates.concept = Some("Pitch {topic}!".into());
        let renderer = PromptRenderer::new(&config);

        let spec = renderer.render_input(Stage::Concept, "grit").unwrap();
        assert_eq!(spec.user, "Pitch grit!");
    }

    #[test]
    fn test_validate_templates_catches_bad_override() {
        let mut config = sample_config();
        assert!(PromptRenderer::new(&config).validate_templates().is_ok());

        config.user_templates.episode = Some("Compile {script_drafts}".into());
        let err = PromptRenderer::new(&config).validate_templates().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingTemplateVariable { stage: Stage::Episode, .. }
        ));
    }

    #[test]
    fn test_version_is_deterministic() {
        let config = sample_config();
        let renderer = PromptRenderer::new(&config);

        let a = renderer.render_input(Stage::Script, "outline one").unwrap();
        let b = renderer.render_input(Stage::Script, "outline two").unwrap();
        assert_eq!(a.version, b.version, "input does not change the definition");

        let c = renderer.render_input(Stage::Outline, "outline one").unwrap();
        assert_ne!(a.version, c.version);

        assert_eq!(
            prompt_version(Stage::Concept, "sys", "tpl"),
            prompt_version(Stage::Concept, "sys", "tpl")
        );
        assert_ne!(
            prompt_version(Stage::Concept, "sys", "tpl"),
            prompt_version(Stage::Concept, "sys2", "tpl")
        );
    }

    #[test]
    fn test_with_n_and_selector_temperature() {
        let config = sample_config();
        let renderer = PromptRenderer::new(&config);

        let spec = renderer.render_input(Stage::Outline, "c").unwrap().with_n(4);
        assert_eq!(spec.params.n, 4);

        let eval = renderer.render_input(Stage::EvalOutline, "a\nOUTLINE: \nb").unwrap();
        assert_eq!(eval.params.temperature, 0.3);
        assert!(eval.user.contains("a\nOUTLINE: \nb"));
    }
}
