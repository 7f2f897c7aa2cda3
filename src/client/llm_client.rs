//! LLM client for OpenAI-compatible chat completion endpoints.
//!
//! One request per call, `n` completions per request. No retry loop: a failed
//! request surfaces as a [`GenerationError`] and the pipeline stops.
//!
//! - K_i: every endpoint speaks the chat completions schema
//! - B_i: the endpoint answers (might fail, no timeout unless configured)
//! - B_i: the body is valid JSON with non-empty choices (might fail)

use crate::client::{GenerationClient, TokenUsage};
use crate::models::{Config, ConfigError, GenerationError, Result, expand_headers};
use crate::prompt::PromptSpec;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    index: Option<usize>,
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// API error response (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Parsed completions plus reported usage.
#[derive(Debug)]
struct ParsedCompletion {
    contents: Vec<String>,
    usage: ChatUsage,
}

/// Parse a successful chat completion body.
///
/// Choices are returned in `index` order. A body without choices, or with a
/// choice lacking text, is an empty response.
fn parse_completion(stage: &str, body: &str) -> std::result::Result<ParsedCompletion, GenerationError> {
    let mut response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {e}")))?;

    if response.choices.is_empty() {
        return Err(GenerationError::EmptyResponse(stage.to_string()));
    }

    response.choices.sort_by_key(|c| c.index.unwrap_or(usize::MAX));

    let contents = response
        .choices
        .into_iter()
        .map(|c| {
            c.message
                .content
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| GenerationError::EmptyResponse(stage.to_string()))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ParsedCompletion {
        contents,
        usage: response.usage.unwrap_or_default(),
    })
}

/// Map a non-success HTTP status and body to an error.
fn status_error(status: u16, body: &str, model: &str) -> GenerationError {
    match status {
        401 | 403 => GenerationError::AuthenticationFailed,
        404 => GenerationError::ModelNotFound(model.to_string()),
        _ => {
            let message = serde_json::from_str::<ApiErrorResponse>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.to_string());
            GenerationError::Api { status, message }
        }
    }
}

/// Client for any OpenAI-compatible endpoint (OpenAI, OpenRouter, vLLM,
/// Ollama, llama.cpp).
pub struct LlmClient {
    client: reqwest::Client,
    /// Name of this endpoint (for logging)
    name: String,
    /// Base URL for the API
    base_url: String,
    /// Prebuilt request headers
    headers: HeaderMap,
    /// Request timeout, if any
    timeout: Option<Duration>,
    // Usage tracking
    total_prompt_tokens: AtomicU64,
    total_completion_tokens: AtomicU64,
}

impl LlmClient {
    /// Create a new LLM client.
    ///
    /// # Arguments
    /// - `name`: Endpoint name for logging
    /// - `api_key`: Optional API key (None for local endpoints)
    /// - `base_url`: Base URL for the API
    /// - `custom_headers`: Additional headers to include in requests
    /// - `timeout_secs`: Request timeout; `None` waits indefinitely
    pub fn new(
        name: impl Into<String>,
        api_key: Option<&str>,
        base_url: impl Into<String>,
        custom_headers: &HashMap<String, String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let timeout = timeout_secs.map(Duration::from_secs);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(GenerationError::Network)?;

        let mut headers = HeaderMap::new();
        if let Some(api_key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                ConfigError::Invalid("API key contains characters not allowed in a header".into())
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (key, value) in custom_headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|_| ConfigError::Invalid(format!("Invalid header name '{key}'")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::Invalid(format!("Invalid value for header '{key}'")))?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            timeout,
            total_prompt_tokens: AtomicU64::new(0),
            total_completion_tokens: AtomicU64::new(0),
        })
    }

    /// Create a client from the `[endpoint]` section, resolving the API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let headers = expand_headers(&config.endpoint.headers);
        let name = reqwest::Url::parse(&config.endpoint.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "endpoint".to_string());

        Self::new(
            name,
            Some(&api_key),
            config.endpoint.base_url.clone(),
            &headers,
            config.endpoint.timeout_secs,
        )
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_usage(&self, usage: &ChatUsage) {
        self.total_prompt_tokens
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.total_completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }
}

#[async_trait]
impl GenerationClient for LlmClient {
    /// B_i(API available) → Result
    /// B_i(valid response) → Result
    async fn generate(&self, spec: &PromptSpec) -> std::result::Result<Vec<String>, GenerationError> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: &spec.params.model,
            messages: vec![Message::system(&spec.system), Message::user(&spec.user)],
            temperature: spec.params.temperature,
            n: spec.params.n,
            max_tokens: spec.params.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            endpoint = %self.name,
            stage = %spec.stage,
            model = %spec.params.model,
            n = spec.params.n,
            temperature = spec.params.temperature,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| match self.timeout {
                Some(timeout) if e.is_timeout() => GenerationError::Timeout(timeout),
                _ => GenerationError::Network(e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(GenerationError::Network)?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body, &spec.params.model));
        }

        let parsed = parse_completion(spec.stage.as_str(), &body)?;
        self.record_usage(&parsed.usage);

        debug!(
            endpoint = %self.name,
            stage = %spec.stage,
            completions = parsed.contents.len(),
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );

        Ok(parsed.contents)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.total_prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.total_completion_tokens.load(Ordering::Relaxed),
        }
    }
}
