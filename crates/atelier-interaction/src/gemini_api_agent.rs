//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! This agent calls the Gemini `generateContent` endpoint directly.
//! The API key comes from the process environment; model and base URL
//! come from `AtelierConfig`.

use async_trait::async_trait;
use atelier_core::config::{self, AtelierConfig};
use atelier_core::generation::{GenerationClient, GenerationError};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Agent implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiApiAgent {
    /// Builds an agent from configuration and the process environment.
    ///
    /// A missing API key does not fail here; every call made by the agent
    /// fails with [`GenerationError::Misconfiguration`] instead.
    pub fn from_env(config: &AtelierConfig) -> Self {
        let api_key = config::api_key_from(|key| std::env::var(key).ok());
        if api_key.is_none() {
            tracing::warn!(
                "No Gemini API key found in {:?}; generation calls will fail",
                config::API_KEY_ENV_VARS
            );
        }
        Self::with_key(config, api_key)
    }

    /// Builds an agent from configuration and an explicit key.
    pub fn with_key(config: &AtelierConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_request(
        prompt: &str,
        system_instructions: Option<&str>,
        generation_config: Option<GenerationConfig>,
    ) -> GenerateContentRequest {
        let contents = vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }];

        let system_instruction = system_instructions
            .filter(|text| !text.trim().is_empty())
            .map(|text| Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::misconfiguration(format!(
                "Gemini API key is not set (expected one of {:?})",
                config::API_KEY_ENV_VARS
            ))
        })?;

        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
        );

        tracing::debug!(model = %self.model, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                // reqwest errors can embed the URL, which carries the key
                GenerationError::transport(format!(
                    "Gemini API request failed: {}",
                    err.without_url()
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::EmptyResponse(format!(
                "Failed to parse Gemini response: {}",
                err.without_url()
            ))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl GenerationClient for GeminiApiAgent {
    async fn generate_text(
        &self,
        prompt: &str,
        system_instructions: &str,
    ) -> Result<String, GenerationError> {
        let request = Self::build_request(prompt, Some(system_instructions), None);
        self.send_request(&request).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, GenerationError> {
        let request = Self::build_request(
            prompt,
            None,
            Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
        );
        let text = self.send_request(&request).await?;
        Ok(parse_structured_text(&text))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse(
            "Gemini API returned no text in the response candidates".into(),
        ));
    }
    Ok(text)
}

/// Parses structured output, degrading to an empty object on malformed JSON.
fn parse_structured_text(text: &str) -> Value {
    let trimmed = strip_code_fence(text.trim());
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            tracing::warn!(
                kind = json_kind(&other),
                "Structured response was not a JSON object; using empty object"
            );
            Value::Object(Map::new())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Structured response was not valid JSON; using empty object");
            Value::Object(Map::new())
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop an optional language tag on the opening fence
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> GenerationError {
    let (status_text, message) = match serde_json::from_str::<ErrorWrapper>(&body) {
        Ok(wrapper) => (
            wrapper.error.status.filter(|s| !s.is_empty()),
            wrapper.error.message.unwrap_or_else(|| body.clone()),
        ),
        Err(_) => (None, body.clone()),
    };

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    GenerationError::Api {
        status_code: Some(status.as_u16()),
        status: status_text,
        message,
        is_retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // HTTP-date values are not supported
    None
}
