//! Gemini REST client (`models/{model}:generateContent`).

use crate::llm::client::{GenerationRequest, LLMClient, LlmError};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    fn build_request_body(request: &GenerationRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.full_prompt() }]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            }
        })
    }

    /// Concatenate the text parts of the first candidate. A response with no
    /// text parts yields an empty string.
    fn parse_response(body: &Value) -> std::result::Result<String, LlmError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::other("Missing 'candidates' array in response"))?;

        let Some(candidate) = candidates.first() else {
            return Err(LlmError::other("Empty 'candidates' array in response"));
        };

        let text = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        let body = Self::build_request_body(request);
        debug!(model, category = %request.category, "Sending Gemini request");

        let response = self
            .client
            .post(self.endpoint_url(model))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::classify(format!("Request to Gemini API failed: {}", e)))?;

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
        "gemini"
    }
}
