/// LLM provider abstraction
///
/// Every backend answers one question: given a system prompt and a user prompt,
/// produce a JSON value. Which backend serves a request is a configuration switch
/// (`AI_PROVIDER`) evaluated per request, and each backend needs its own credential.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::Config, models::ChatMessage};

pub mod cerebras;
pub mod error;
pub mod gemini;
pub mod json;
pub mod openai_compat;
pub mod openrouter;

pub use cerebras::CerebrasProvider;
pub use error::AiError;
pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

/// Backend selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Single primary model
    #[default]
    Gemini,
    /// Ordered list of models with fallback on rate limits and server errors
    OpenRouter,
    /// Single fast-inference model
    Cerebras,
}

/// A backend that turns a prompt pair into structured JSON
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends one request and parses the model output as JSON
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// A backend that continues a conversation with a plain-text reply
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConversationModel: Send + Sync {
    async fn reply(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<String, AiError>;
}

/// Credentials and endpoints for every LLM backend
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub kind: ProviderKind,
    pub gemini_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub cerebras_api_key: Option<String>,
    pub gemini_api_url: String,
    pub openrouter_api_url: String,
    pub cerebras_api_url: String,
    pub timeout: Duration,
}

impl AiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            kind: config.ai_provider,
            gemini_api_key: Config::credential(&config.gemini_api_key),
            openrouter_api_key: Config::credential(&config.openrouter_api_key),
            cerebras_api_key: Config::credential(&config.cerebras_api_key),
            gemini_api_url: config.gemini_api_url.clone(),
            openrouter_api_url: config.openrouter_api_url.clone(),
            cerebras_api_url: config.cerebras_api_url.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

fn require(value: &Option<String>, variable: &'static str) -> Result<String, AiError> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or(AiError::MissingCredential { variable })
}

/// Builds the configured recommendation backend
///
/// Fails with `AiError::MissingCredential` before any network call when the
/// selected backend has no key.
pub fn build_provider(settings: &AiSettings) -> Result<Box<dyn AiProvider>, AiError> {
    let provider: Box<dyn AiProvider> = match settings.kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::new(
            require(&settings.gemini_api_key, "GEMINI_API_KEY")?,
            settings.gemini_api_url.clone(),
            settings.timeout,
        )?),
        ProviderKind::OpenRouter => Box::new(OpenRouterProvider::new(
            require(&settings.openrouter_api_key, "OPENROUTER_API_KEY")?,
            &settings.openrouter_api_url,
            settings.timeout,
        )?),
        ProviderKind::Cerebras => Box::new(CerebrasProvider::new(
            require(&settings.cerebras_api_key, "CEREBRAS_API_KEY")?,
            &settings.cerebras_api_url,
            settings.timeout,
        )?),
    };

    tracing::debug!(provider = provider.name(), "AI provider selected");
    Ok(provider)
}

/// Builds the conversational model used by chat, which is always Gemini
pub fn build_conversation_model(settings: &AiSettings) -> Result<Box<dyn ConversationModel>, AiError> {
    Ok(Box::new(GeminiProvider::new(
        require(&settings.gemini_api_key, "GEMINI_API_KEY")?,
        settings.gemini_api_url.clone(),
        settings.timeout,
    )?))
}
