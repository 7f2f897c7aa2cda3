//! Configuration models for podnk.
//!
//! The config file is read once at startup into a [`Config`] that is passed
//! explicitly to the pipeline. Top-level keys stay flat so the original
//! `config.json` layout parses unchanged; optional sections add endpoint,
//! audit and per-stage overrides.

use super::Stage;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Top-level configuration for podnk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model identifier sent with every request
    pub model_name: String,

    /// Candidate topics
    pub topics: Vec<String>,

    /// Index into `topics` selecting the active topic
    pub selected_topic_index: usize,

    /// Outline candidates generated before selection
    pub n_of_outlines: usize,

    /// Script candidates generated before selection
    pub n_of_script_drafts: usize,

    /// One system prompt per stage
    #[serde(flatten)]
    pub prompts: SystemPrompts,

    /// Root directory; each run writes to `<output_dir>/<topic>`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Generate cover-art and theme-song prompts concurrently
    #[serde(default = "default_true")]
    pub parallel_copy: bool,

    /// Also generate listing copy from the compiled episode
    #[serde(default)]
    pub describe_episode: bool,

    /// Completion length cap (service default when unset)
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Per-stage temperature overrides
    #[serde(default)]
    pub temperatures: StageOverrides<f64>,

    /// Per-stage user prompt template overrides
    #[serde(default)]
    pub user_templates: StageOverrides<String>,

    /// Generation service endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Exchange log settings
    #[serde(default)]
    pub audit: AuditConfig,
}

/// System prompt ("role description") for each stage.
///
/// Passed to the model verbatim; never template-rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompts {
    pub concept_sys_prompt: String,
    pub outline_sys_prompt: String,
    pub eval_outline_sys_prompt: String,
    pub script_sys_prompt: String,
    pub eval_script_sys_prompt: String,
    pub desc_sys_prompt: String,
    pub art_sys_prompt: String,
    pub song_sys_prompt: String,
    pub episode_sys_prompt: String,
}

impl SystemPrompts {
    /// System prompt for a stage.
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::Concept => &self.concept_sys_prompt,
            Stage::Outline => &self.outline_sys_prompt,
            Stage::EvalOutline => &self.eval_outline_sys_prompt,
            Stage::Script => &self.script_sys_prompt,
            Stage::EvalScript => &self.eval_script_sys_prompt,
            Stage::Description => &self.desc_sys_prompt,
            Stage::CoverArt => &self.art_sys_prompt,
            Stage::ThemeSong => &self.song_sys_prompt,
            Stage::Episode => &self.episode_sys_prompt,
        }
    }
}

/// Optional per-stage values, keyed by stage name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageOverrides<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_outline: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_script: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_song: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<T>,
}

impl<T> StageOverrides<T> {
    /// Override for a stage, if configured.
    pub fn get(&self, stage: Stage) -> Option<&T> {
        match stage {
            Stage::Concept => self.concept.as_ref(),
            Stage::Outline => self.outline.as_ref(),
            Stage::EvalOutline => self.eval_outline.as_ref(),
            Stage::Script => self.script.as_ref(),
            Stage::EvalScript => self.eval_script.as_ref(),
            Stage::Description => self.description.as_ref(),
            Stage::CoverArt => self.cover_art.as_ref(),
            Stage::ThemeSong => self.theme_song.as_ref(),
            Stage::Episode => self.episode.as_ref(),
        }
    }
}

/// OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// API key (can also be set via the `api_key_env` variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL for the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (no timeout when unset)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Custom headers to include in requests
    /// Values can contain ${ENV_VAR} for environment variable expansion
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: None,
            headers: HashMap::new(),
        }
    }
}

/// Exchange log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record every model exchange
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding `exchanges.jsonl`
    #[serde(default = "default_audit_dir")]
    pub dir: PathBuf,
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("logdir")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_audit_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML or JSON file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML or JSON) → Result
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                path: path.to_owned(),
                source: e,
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_owned(),
                source: e,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topics.is_empty() {
            return Err(ConfigError::Invalid("topics must not be empty".into()));
        }
        if let Some(idx) = self.topics.iter().position(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("topics[{idx}] is blank")));
        }
        if self.selected_topic_index >= self.topics.len() {
            return Err(ConfigError::Invalid(format!(
                "selected_topic_index {} out of range for {} topic(s)",
                self.selected_topic_index,
                self.topics.len()
            )));
        }
        if self.n_of_outlines == 0 {
            return Err(ConfigError::Invalid("n_of_outlines must be at least 1".into()));
        }
        if self.n_of_script_drafts == 0 {
            return Err(ConfigError::Invalid(
                "n_of_script_drafts must be at least 1".into(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::Invalid("model_name must not be empty".into()));
        }
        Ok(())
    }

    /// The topic chosen by `selected_topic_index`.
    pub fn selected_topic(&self) -> Result<&str, ConfigError> {
        self.topics
            .get(self.selected_topic_index)
            .map(String::as_str)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "selected_topic_index {} out of range for {} topic(s)",
                    self.selected_topic_index,
                    self.topics.len()
                ))
            })
    }

    /// Effective temperature for a stage.
    pub fn temperature(&self, stage: Stage) -> f64 {
        self.temperatures
            .get(stage)
            .copied()
            .unwrap_or_else(|| stage.default_temperature())
    }

    /// Directory artifacts for `topic` are written to.
    ///
    /// Path separators in the topic become `-`, and `.`, `..` or a blank
    /// topic become dashes, so a topic is always one directory level below
    /// `output_dir`.
    pub fn episode_dir(&self, topic: &str) -> PathBuf {
        let name: String = topic
            .trim()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '-' } else { c })
            .collect();

        // Never the output root or its parent
        let name = match name.as_str() {
            "" | "." | ".." => "-".repeat(name.len().max(1)),
            _ => name,
        };
        self.output_dir.join(name)
    }

    /// Resolve API key from config or environment.
    ///
    /// B_i(api key available) → Result
    ///
    /// An explicit key that still holds an unexpanded `${VAR}` after
    /// expansion, or any blank key, counts as missing.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        // First check explicit api_key in config
        if let Some(key) = &self.endpoint.api_key {
            let expanded = expand_env_vars(key);
            if let Some(cap) = ENV_VAR_RE.captures(&expanded) {
                return Err(ConfigError::MissingApiKey {
                    env_var: cap[1].to_string(),
                });
            }
            if expanded.trim().is_empty() {
                return Err(ConfigError::MissingApiKey {
                    env_var: self.endpoint.api_key_env.clone(),
                });
            }
            return Ok(expanded);
        }

        // Then check environment variable
        std::env::var(&self.endpoint.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                env_var: self.endpoint.api_key_env.clone(),
            })
    }
}

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in ENV_VAR_RE.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Expand environment variables in all headers.
pub fn expand_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| (k.clone(), expand_env_vars(v)))
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing API key: set {env_var} env var or endpoint.api_key in config")]
    MissingApiKey { env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Template for stage '{stage}' references unknown variable '{{{variable}}}'")]
    MissingTemplateVariable { stage: Stage, variable: String },
}

#[cfg(test)]
pub(crate) const MINIMAL_TOML: &str = r#"
model_name = "gpt-4o"
topics = ["resilience", "attention"]
selected_topic_index = 1
n_of_outlines = 3
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

/// Parsed [`MINIMAL_TOML`] for unit tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn sample_config() -> Config {
    toml::from_str(MINIMAL_TOML).expect("sample config parses")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;


    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", MINIMAL_TOML);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.model_name, "gpt-4o");
        assert_eq!(config.selected_topic().unwrap(), "attention");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert!(config.parallel_copy);
        assert!(!config.describe_episode);
        assert!(config.audit.enabled);
        assert_eq!(config.endpoint.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.endpoint.timeout_secs, None);
        assert_eq!(config.temperature(Stage::EvalScript), 0.2);
    }

    #[test]
    fn test_load_json_original_layout() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "model_name": "gpt-4o-mini",
            "topics": ["resilience"],
            "selected_topic_index": 0,
            "n_of_outlines": 2,
            "n_of_script_drafts": 2,
            "concept_sys_prompt": "c",
            "outline_sys_prompt": "o",
            "eval_outline_sys_prompt": "eo",
            "script_sys_prompt": "s",
            "eval_script_sys_prompt": "es",
            "desc_sys_prompt": "d",
            "art_sys_prompt": "a",
            "song_sys_prompt": "so",
            "episode_sys_prompt": "e"
        }"#;
        let path = write(&dir, "config.json", json);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.selected_topic().unwrap(), "resilience");
        assert_eq!(config.prompts.for_stage(Stage::EvalOutline), "eo");
        assert_eq!(config.prompts.for_stage(Stage::ThemeSong), "so");
    }

    #[test]
    fn test_missing_key_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let broken = MINIMAL_TOML.replace("episode_sys_prompt = \"You compile episodes.\"", "");
        let path = write(&dir, "config.toml", &broken);

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let dir = TempDir::new().unwrap();

        let out_of_range = MINIMAL_TOML.replace("selected_topic_index = 1", "selected_topic_index = 2");
        let path = write(&dir, "a.toml", &out_of_range);
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));

        let zero = MINIMAL_TOML.replace("n_of_outlines = 3", "n_of_outlines = 0");
        let path = write(&dir, "b.toml", &zero);
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));

        let no_topics = MINIMAL_TOML.replace(
            "topics = [\"resilience\", \"attention\"]",
            "topics = []",
        );
        let path = write(&dir, "c.toml", &no_topics);
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_overrides_and_sections() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            r#"{MINIMAL_TOML}
output_dir = "episodes"
describe_episode = true
parallel_copy = false

[temperatures]
eval_outline = 0.1

[user_templates]
concept = "Pitch {{topic}}"

[endpoint]
base_url = "http://localhost:11434/v1"
timeout_secs = 30

[audit]
enabled = false
"#
        );
        let path = write(&dir, "config.toml", &content);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.temperature(Stage::EvalOutline), 0.1);
        assert_eq!(config.temperature(Stage::Outline), 1.0);
        assert_eq!(
            config.user_templates.get(Stage::Concept).map(String::as_str),
            Some("Pitch {topic}")
        );
        assert_eq!(config.user_templates.get(Stage::Episode), None);
        assert_eq!(config.endpoint.base_url, "http://localhost:11434/v1");
        assert_eq!(config.endpoint.timeout_secs, Some(30));
        assert!(!config.audit.enabled);
        assert!(config.describe_episode);
        assert!(!config.parallel_copy);
        assert_eq!(config.episode_dir("grit"), PathBuf::from("episodes/grit"));
    }

    #[test]
    fn test_unknown_override_stage_rejected() {
        let dir = TempDir::new().unwrap();
        let content = format!("{MINIMAL_TOML}\n[temperatures]\nintro = 0.4\n");
        let path = write(&dir, "config.toml", &content);
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_episode_dir_flattens_separators() {
        let config = sample_config();
        assert_eq!(
            config.episode_dir(" focus/flow "),
            PathBuf::from("output/focus-flow")
        );
        assert_eq!(config.episode_dir(".."), PathBuf::from("output/--"));
        assert_eq!(config.episode_dir(" . "), PathBuf::from("output/-"));
        assert_eq!(config.episode_dir("   "), PathBuf::from("output/-"));
        assert_eq!(config.episode_dir("../x"), PathBuf::from("output/..-x"));
        assert_eq!(config.episode_dir("..."), PathBuf::from("output/..."));
    }

    #[test]
    fn test_validation_rejects_blank_topic() {
        let mut config = sample_config();
        config.topics = vec!["resilience".into(), "  ".into()];
        config.selected_topic_index = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("topics[1]")));
    }

    #[test]
    fn test_resolve_api_key_explicit_with_expansion() {
        let mut config = sample_config();
        // SAFETY: test-local variable name, no other thread reads it
        unsafe { std::env::set_var("PODNK_TEST_KEY_EXPANSION", "sk-expanded") };
        config.endpoint.api_key = Some("${PODNK_TEST_KEY_EXPANSION}".into());
        assert_eq!(config.resolve_api_key().unwrap(), "sk-expanded");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let mut config = sample_config();
        config.endpoint.api_key_env = "PODNK_TEST_KEY_DEFINITELY_UNSET".into();
        let err = config.resolve_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
        assert!(err.to_string().contains("PODNK_TEST_KEY_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_resolve_api_key_unexpanded_placeholder_is_missing() {
        let mut config = sample_config();
        config.endpoint.api_key = Some("${PODNK_TEST_KEY_PLACEHOLDER_UNSET}".into());
        let err = config.resolve_api_key().unwrap_err();
        match err {
            ConfigError::MissingApiKey { env_var } => {
                assert_eq!(env_var, "PODNK_TEST_KEY_PLACEHOLDER_UNSET")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_api_key_blank_is_missing() {
        let mut config = sample_config();
        config.endpoint.api_key = Some("   ".into());
        assert!(matches!(
            config.resolve_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));

        let mut config = sample_config();
        // SAFETY: test-local variable name, no other thread reads it
        unsafe { std::env::set_var("PODNK_TEST_KEY_BLANK_ENV", "") };
        config.endpoint.api_key_env = "PODNK_TEST_KEY_BLANK_ENV".into();
        assert!(matches!(
            config.resolve_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown() {
        assert_eq!(
            expand_env_vars("Bearer ${PODNK_TEST_NOT_SET_ANYWHERE}"),
            "Bearer ${PODNK_TEST_NOT_SET_ANYWHERE}"
        );
    }
}
