/// Client for OpenAI-compatible `/v1/chat/completions` endpoints
///
/// OpenRouter and Cerebras both speak this dialect; they differ only in base URL,
/// model ids, and a few optional headers.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json, AiError};

const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct CompletionClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
    extra_headers: Vec<(&'static str, String)>,
    provider: &'static str,
}

impl CompletionClient {
    pub fn new(
        provider: &'static str,
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            extra_headers: Vec::new(),
            provider,
        })
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    /// Sends one JSON-mode completion request for `model`
    pub async fn complete_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Value, AiError> {
        let request = ChatCompletionRequest {
            model,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: system_prompt,
                },
                CompletionMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request);
        for (name, value) in &self.extra_headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Http {
                status: status.as_u16(),
                model: model.to_string(),
                message: json::error_message(&body),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiError::EmptyResponse)?;

        tracing::info!(provider = self.provider, model = %model, "Generated response");
        json::parse_json_payload(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client =
            CompletionClient::new("test", "key".to_string(), "https://example.com/api/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint, "https://example.com/api/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: [
                CompletionMessage {
                    role: "system",
                    content: "s",
                },
                CompletionMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["response_format"]["type"], "json_object");
    }
}
