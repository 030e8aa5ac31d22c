/// Failures from an LLM backend
#[derive(thiserror::Error, Debug)]
pub enum AiError {
    #[error("Missing credential: {variable} is not set")]
    MissingCredential { variable: &'static str },

    #[error("Model {model} returned status {status}: {message}")]
    Http {
        status: u16,
        model: String,
        message: String,
    },

    #[error("AI provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI provider returned no content")]
    EmptyResponse,

    #[error("AI provider returned malformed JSON: {0}")]
    MalformedJson(String),

    #[error("AI provider returned an unexpected response format")]
    UnexpectedFormat,

    #[error("No candidate models configured")]
    NoCandidates,
}

impl AiError {
    /// Rate limits and server errors may succeed on another model
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}
