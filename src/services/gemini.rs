//! Thin HTTP client for the Gemini `generateContent` endpoint.
//!
//! One call per generation: the rendered instruction prompt plus the inline
//! image go out, a JSON social kit comes back. HTTP failures are classified
//! into `GenerationError` so a bad key never reads like a network problem.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{AppError, AppResult, GenerationError};
use crate::model::{GenerationConfig, InlineImage, SocialKitResult};
use crate::prompt::builder::PromptBuilder;
use crate::services::ContentGenerator;

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    prompt_builder: PromptBuilder,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Gemini client: {}", e)))?;
        Ok(GeminiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            prompt_builder: PromptBuilder::new(),
        })
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, image: &InlineImage, config: &GenerationConfig) -> AppResult<Value> {
        let instructions = self.prompt_builder.render(config)?;
        Ok(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type, "data": image.data } },
                    { "text": instructions }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        }))
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        image: &InlineImage,
        config: &GenerationConfig,
    ) -> AppResult<SocialKitResult> {
        let url = self.endpoint();
        let body = self.request_body(image, config)?;
        tracing::info!(model = %self.model, tone = %config.tone, "Requesting social kit from Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::error!("Gemini request failed. Status: {}, Body: {}", status, error_body);
            return Err(classify_failure(status, &error_body).into());
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(format!("response is not JSON: {}", e)))?;
        let result = extract_social_kit(&payload)?;
        tracing::debug!("Gemini returned social kit: {}", result.0);
        Ok(result)
    }
}

/// Map a non-2xx Gemini response onto the generation error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
        || body.contains("API key not valid")
    {
        GenerationError::InvalidCredential(detail)
    } else if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        GenerationError::QuotaExceeded(detail)
    } else if status.is_server_error() {
        GenerationError::Transport(format!("Gemini returned {}: {}", status, detail))
    } else {
        GenerationError::Rejected { status: status.as_u16(), body: detail }
    }
}

/// Pull the JSON object out of the first candidate's text parts.
pub fn extract_social_kit(payload: &Value) -> Result<SocialKitResult, GenerationError> {
    if let Some(reason) = payload.pointer("/promptFeedback/blockReason").and_then(|r| r.as_str()) {
        return Err(GenerationError::MalformedResponse(format!("prompt blocked: {}", reason)));
    }
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| GenerationError::MalformedResponse("no candidates in response".to_string()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    let text = strip_code_fence(text.trim());
    if text.is_empty() {
        return Err(GenerationError::MalformedResponse("empty response text".to_string()));
    }
    let kit: Value = serde_json::from_str(text)
        .map_err(|e| GenerationError::MalformedResponse(format!("response text is not JSON: {}", e)))?;
    if !kit.is_object() {
        return Err(GenerationError::MalformedResponse("expected a JSON object".to_string()));
    }
    Ok(SocialKitResult(kit))
}

// Models occasionally wrap JSON mode output in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else { return text };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
