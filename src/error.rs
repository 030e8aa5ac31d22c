use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::services::ai::AiError;
use crate::services::metadata::MetadataError;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Missing configuration: set {0}")]
    MissingCredential(String),

    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    #[error("Provider rejected credentials: {0}")]
    ProviderAuth(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Maps an LLM failure to the response the client sees.
    ///
    /// `context` prefixes the generic failure message, e.g. "Failed to generate recommendations".
    pub fn from_ai(err: AiError, context: &str) -> Self {
        match err {
            AiError::MissingCredential { variable } => AppError::MissingCredential(variable.to_string()),
            AiError::Http { status: 429, ref message, .. } => AppError::ProviderQuota(format!(
                "{}: the AI provider quota is exhausted, try again later or switch AI_PROVIDER ({})",
                context, message
            )),
            AiError::Http { status: 401 | 403, ref message, .. } => AppError::ProviderAuth(format!(
                "{}: the AI provider rejected the API key ({})",
                context, message
            )),
            other => AppError::Internal(format!("{}: {}", context, other)),
        }
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Http(e) => AppError::HttpClient(e),
            MetadataError::NotFound => AppError::NotFound("Title not found".to_string()),
            other => AppError::ExternalApi(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra = Map::new();
        let mut retry_after = None;

        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(ref fields) => {
                let fields: Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.field.to_string(), Value::String(f.message.clone())))
                    .collect();
                extra.insert("fields".to_string(), Value::Object(fields));
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::RateLimited { retry_after_secs } => {
                retry_after = Some(retry_after_secs);
                extra.insert("retryAfter".to_string(), json!(retry_after_secs));
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            AppError::MissingCredential(ref variable) => {
                tracing::error!(variable = %variable, "Required credential is not configured");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ProviderQuota(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::ProviderAuth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message));
        body.extend(extra);

        let mut response = (status, Json(Value::Object(body))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
