/// Cerebras provider (fast inference, single model, no retry)
use std::time::Duration;

use serde_json::Value;

use super::{openai_compat::CompletionClient, AiError, AiProvider};

pub const CEREBRAS_MODEL: &str = "llama-3.3-70b";

#[derive(Clone)]
pub struct CerebrasProvider {
    client: CompletionClient,
}

impl CerebrasProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, AiError> {
        Ok(Self {
            client: CompletionClient::new("cerebras", api_key, base_url, timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl AiProvider for CerebrasProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value, AiError> {
        self.client
            .complete_json(CEREBRAS_MODEL, system_prompt, user_prompt)
            .await
    }

    fn name(&self) -> &'static str {
        "cerebras"
    }
}
