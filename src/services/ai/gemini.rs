/// Gemini provider (primary model)
///
/// Serves recommendation requests with JSON output mode and the chat endpoint
/// with plain-text output. One request per call, no retry.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json, AiError, AiProvider, ConversationModel};
use crate::models::{ChatMessage, ChatRole};

pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
const TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn text_content<'a>(role: Option<&'static str>, text: &'a str) -> Content<'a> {
    Content {
        role,
        parts: vec![Part { text }],
    }
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, AiError> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key,
            api_url,
            model: GEMINI_MODEL.to_string(),
        })
    }

    async fn generate_content(&self, request: &GenerateContentRequest<'_>) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = "gemini",
                model = %self.model,
                status = status.as_u16(),
                "Gemini request failed"
            );
            return Err(AiError::Http {
                status: status.as_u16(),
                model: self.model.clone(),
                message: json::error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or(AiError::EmptyResponse)
    }
}

#[async_trait::async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError> {
        let request = GenerateContentRequest {
            system_instruction: text_content(None, system_prompt),
            contents: vec![text_content(Some("user"), user_prompt)],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: Some("application/json"),
            },
        };

        let text = self.generate_content(&request).await?;
        tracing::info!(provider = "gemini", model = %self.model, "Generated response");
        json::parse_json_payload(&text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[async_trait::async_trait]
impl ConversationModel for GeminiProvider {
    async fn reply(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<String, AiError> {
        let contents = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                text_content(Some(role), &m.content)
            })
            .collect();

        let request = GenerateContentRequest {
            system_instruction: text_content(None, system_prompt),
            contents,
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: None,
            },
        };

        let text = self.generate_content(&request).await?;
        tracing::info!(provider = "gemini", model = %self.model, turns = messages.len(), "Chat reply generated");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_uses_json_mode() {
        let request = GenerateContentRequest {
            system_instruction: text_content(None, "sys"),
            contents: vec![text_content(Some("user"), "hello")],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: Some("application/json"),
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}], "role": "model"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(response.text(), None);
    }
}
