use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;

/// API key value that switches the client to canned offline responses.
pub const DEMO_KEY: &str = "DEMO_KEY";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Malformed response: {0}")] Shape(String),
    #[error("Other: {0}")] Other(String),
}

/// One templated call: a prompt name, the rendered text, and the JSON shape the
/// answer must come back in.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub name: &'static str,
    pub text: String,
    pub output_schema: Value,
}

/// A black-box request/response text generator returning structured JSON.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: &PromptRequest) -> Result<Value, GeminiError>;
}

fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[{} chars total]", &s[..idx], s.chars().count()),
        None => s.to_string(),
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.gemini_api_key.clone(), config.gemini_api_base.clone(), config.gemini_model.clone())
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    async fn perform_api_call(&self, request: &PromptRequest) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        info!("🔗 Making request to: {}", url);

        let payload = json!({
            "contents": [{
                "parts": [{"text": request.text}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.output_schema,
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "candidateCount": 1
            }
        });

        // The key travels only in a header; error texts may reach API clients.
        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        if !status.is_success() {
            error!("❌ Gemini API error response ({}): {}", status, preview(&response_text, 500));
            return Err(GeminiError::Http(format!("status={}", status)));
        }

        info!("📥 Raw Gemini API response: {}", preview(&response_text, 1000));

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Shape(format!("parse error: {}", e)))?;

        first_text(&parsed).ok_or_else(|| GeminiError::Shape("no text content in response".into()))
    }

    fn demo_output(request: &PromptRequest) -> Result<Value, GeminiError> {
        info!("Using demo mode - returning canned output for '{}'", request.name);
        match request.name {
            crate::flows::SUGGESTIONS_PROMPT => Ok(json!({
                "suggestions": [
                    "Demo suggestion: a long weekend exploring a walkable old town with local food markets.",
                    "Demo suggestion: a coastal road trip with flexible stops and short hikes.",
                    "Demo suggestion: a city break built around museums and neighbourhood cafés."
                ]
            })),
            crate::flows::SUMMARY_PROMPT => Ok(json!({
                "summary": "Demo summary: configure GEMINI_API_KEY to generate a real summary of this trip."
            })),
            other => Err(GeminiError::Other(format!("no demo output for prompt '{}'", other))),
        }
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: &PromptRequest) -> Result<Value, GeminiError> {
        if self.is_demo() {
            return Self::demo_output(request);
        }

        info!("🎯 Running prompt '{}': {}", request.name, preview(&request.text, 120));
        let text = self.perform_api_call(request).await?;
        let value: Value = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| GeminiError::Shape(format!("model output is not JSON: {}: {}", e, preview(&text, 200))))?;
        info!("✅ Prompt '{}' answered", request.name);
        Ok(value)
    }
}

// Models occasionally wrap JSON mode output in a markdown fence anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(Value),
}

fn first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p {
            Part::Text { text } => Some(text.trim().to_string()),
            Part::Other(_) => None,
        })
}
