//! Assistant that talks to an LLM provider directly. The backend server uses
//! it to answer `/chat`.

use async_trait::async_trait;

use super::trait_def::{Assistant, AssistantError};
use super::types::ChatRequest;
use crate::provider::LlmClient;

#[derive(Debug, Clone)]
pub struct LlmAssistant {
    client: LlmClient,
}

impl LlmAssistant {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Assistant for LlmAssistant {
    fn name(&self) -> &str {
        "llm"
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, AssistantError> {
        let completion = self
            .client
            .chat(&request.history, &request.current_plan)
            .await?;
        Ok(completion.reply)
    }
}
