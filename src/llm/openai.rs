//! OpenAI-compatible chat completions client.
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` contract (OpenRouter, vLLM, llama.cpp server, ...).

use crate::llm::client::{GenerationRequest, LLMClient, LlmError};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn build_request_body(model: &str, request: &GenerationRequest) -> Value {
        json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.category.system_prompt() },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(body: &Value) -> std::result::Result<String, LlmError> {
        let choice = body["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .ok_or_else(|| LlmError::other("No choices in completion response"))?;

        Ok(choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        let body = Self::build_request_body(model, request);
        debug!(model, category = %request.category, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::classify(format!("Request to OpenAI API failed: {}", e)))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::other(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(LlmError::from_http(status.as_u16(), &body_text));
        }

        let json: Value = serde_json::from_str(&body_text)
            .map_err(|e| LlmError::other(format!("Invalid JSON in response: {}", e)))?;

        Self::parse_response(&json)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::TaskCategory;

    #[test]
    fn test_request_body_separates_system_prompt() {
        let req = GenerationRequest::new("Find gaps", TaskCategory::Whitespace);
        let body = OpenAIClient::build_request_body("gpt-4o-mini", &req);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Find gaps");
    }

    #[test]
    fn test_parse_response() {
        let body = json!({ "choices": [{ "message": { "content": "{}" } }] });
        assert_eq!(OpenAIClient::parse_response(&body).unwrap(), "{}");
        assert!(OpenAIClient::parse_response(&json!({ "choices": [] })).is_err());
    }
}
