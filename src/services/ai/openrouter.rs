/// OpenRouter provider (fallback chain)
///
/// Walks an ordered list of candidate models. Rate limits (429) and server
/// errors (5xx) move on to the next candidate; anything else is returned
/// immediately. When every candidate fails, the last retryable error is returned.
use std::time::Duration;

use serde_json::Value;

use super::{openai_compat::CompletionClient, AiError, AiProvider};

/// Candidate models, tried in this order
pub const FALLBACK_MODELS: [&str; 5] = [
    "meta-llama/llama-3.3-70b-instruct:free",
    "google/gemini-2.0-flash-exp:free",
    "deepseek/deepseek-chat-v3-0324:free",
    "mistralai/mistral-small-3.1-24b-instruct:free",
    "qwen/qwen-2.5-72b-instruct:free",
];

#[derive(Clone)]
pub struct OpenRouterProvider {
    client: CompletionClient,
    models: Vec<String>,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, AiError> {
        let client = CompletionClient::new("openrouter", api_key, base_url, timeout)?
            .with_header("HTTP-Referer", "https://cinepath.app")
            .with_header("X-Title", "CinePath");

        Ok(Self {
            client,
            models: FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// Replaces the candidate list
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[async_trait::async_trait]
impl AiProvider for OpenRouterProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError> {
        let mut last_error = None;

        for (attempt, model) in self.models.iter().enumerate() {
            match self
                .client
                .complete_json(model, system_prompt, user_prompt)
                .await
            {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(model = %model, attempt, "Fallback model succeeded");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        model = %model,
                        attempt,
                        error = %e,
                        "Model unavailable, trying next candidate"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!(model = %model, error = %e, "Non-retryable model error");
                    return Err(e);
                }
            }
        }

        tracing::error!(candidates = self.models.len(), "All candidate models failed");
        Err(last_error.unwrap_or(AiError::NoCandidates))
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates_in_declared_order() {
        let provider =
            OpenRouterProvider::new("key".to_string(), "http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.models().len(), 5);
        assert_eq!(provider.models()[0], FALLBACK_MODELS[0]);
        assert_eq!(provider.models()[4], FALLBACK_MODELS[4]);
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let provider =
            OpenRouterProvider::new("key".to_string(), "http://127.0.0.1:1", Duration::from_secs(1))
                .unwrap()
                .with_models(vec![]);
        let err = provider.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, AiError::NoCandidates));
    }
}
