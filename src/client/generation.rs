//! The generation client seam.
//!
//! The pipeline only ever talks to `dyn GenerationClient`; the HTTP client,
//! the audit wrapper and test stubs all sit behind it.

use crate::models::GenerationError;
use crate::prompt::PromptSpec;
use async_trait::async_trait;

/// Token usage reported by a client, cumulative since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Sends one prompt to a text-generation service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Issue the request and return completions in service order.
    ///
    /// No retry: a failed call is returned to the caller as-is.
    async fn generate(&self, spec: &PromptSpec) -> Result<Vec<String>, GenerationError>;

    /// Name for logging (e.g. endpoint host or "stub").
    fn name(&self) -> &str;

    /// Cumulative token usage, when the service reports it.
    fn usage(&self) -> TokenUsage {
        TokenUsage::default()
    }

    /// Issue the request and return its single completion.
    async fn generate_one(&self, spec: &PromptSpec) -> Result<String, GenerationError> {
        let mut completions = self.generate(spec).await?;
        if completions.len() != 1 {
            return Err(GenerationError::CandidateCount {
                stage: spec.stage.to_string(),
                expected: 1,
                actual: completions.len(),
            });
        }
        Ok(completions.remove(0))
    }

    /// Issue the request and return exactly `spec.params.n` completions.
    async fn generate_many(&self, spec: &PromptSpec) -> Result<Vec<String>, GenerationError> {
        let completions = self.generate(spec).await?;
        if completions.len() != spec.params.n {
            return Err(GenerationError::CandidateCount {
                stage: spec.stage.to_string(),
                expected: spec.params.n,
                actual: completions.len(),
            });
        }
        Ok(completions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stage, sample_config};
    use crate::prompt::PromptRenderer;

    /// Returns a fixed number of completions regardless of `n`.
    struct FixedCount(usize);

    #[async_trait]
    impl GenerationClient for FixedCount {
        async fn generate(&self, _spec: &PromptSpec) -> Result<Vec<String>, GenerationError> {
            Ok((0..self.0).map(|i| format!("completion {i}")).collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn outline_spec(n: usize) -> PromptSpec {
        let config = sample_config();
        PromptRenderer::new(&config)
            .render_input(Stage::Outline, "concept")
            .unwrap()
            .with_n(n)
    }

    #[tokio::test]
    async fn test_generate_many_returns_exactly_n() {
        for n in 1..=4 {
            let client = FixedCount(n);
            let out = client.generate_many(&outline_spec(n)).await.unwrap();
            assert_eq!(out.len(), n);
        }
    }

    #[tokio::test]
    async fn test_generate_many_rejects_short_response() {
        let client = FixedCount(2);
        let err = client.generate_many(&outline_spec(3)).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::CandidateCount { expected: 3, actual: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_generate_one() {
        let out = FixedCount(1).generate_one(&outline_spec(1)).await.unwrap();
        assert_eq!(out, "completion 0");

        let err = FixedCount(0).generate_one(&outline_spec(1)).await.unwrap_err();
        assert!(matches!(err, GenerationError::CandidateCount { actual: 0, .. }));
    }
}
