//! OpenAI-compatible chat completions client with `json_schema` output.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{RawCompletion, StructuredExtractor};
use crate::error::ClientError;
use crate::models::config::LlmConfig;
use crate::schema::{to_json_schema, Schema};

const SYSTEM_PROMPT: &str = "You extract structured data from the text of an invoice. \
Fill every field from the document text. Use null for optional fields that do not appear. \
Write dates as YYYY-MM-DD and amounts as plain numbers without currency symbols.";

/// Extraction client for the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiExtractor {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiExtractor {
    /// Create a client for `model` with the given API key.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(120);
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            temperature: 0.0,
            timeout,
        })
    }

    /// Create a client from configuration, falling back to `OPENAI_API_KEY`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ClientError> {
        let api_key = match &config.api_key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => std::env::var("OPENAI_API_KEY")
                .map_err(|_| ClientError::Config("OPENAI_API_KEY not set".into()))?,
        };

        Ok(Self::new(api_key, config.model.clone())?
            .with_base_url(config.base_url.clone())
            .with_temperature(config.temperature)
            .with_timeout(config.request_timeout())?)
    }

    /// Set a custom base URL (for compatible providers, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ClientError> {
        self.http_client = build_http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Model identifier used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Base URL used for requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the request body for `text`.
    pub fn build_request(&self, schema: &Schema, text: &str) -> StructuredRequest {
        StructuredRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(text)],
            temperature: Some(self.temperature),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema.name.to_string(),
                    strict: true,
                    schema: to_json_schema(schema),
                },
            },
        }
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Config(e.to_string()))
}

/// Read the first choice out of a chat completions response body.
fn parse_response(body: &str, requested_model: &str) -> Result<RawCompletion, ClientError> {
    let response: ChatResponseRaw =
        serde_json::from_str(body).map_err(|e| ClientError::Parse(e.to_string()))?;

    if let Some(usage) = &response.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Extraction token usage"
        );
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ClientError::EmptyResponse)?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(ClientError::Refused(refusal));
    }

    if choice.finish_reason.as_deref() == Some("length") {
        warn!("Model output was truncated at the token limit");
    }

    let text = choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(ClientError::EmptyResponse)?;

    Ok(RawCompletion {
        text,
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
    })
}

#[async_trait]
impl StructuredExtractor for OpenAiExtractor {
    async fn complete(&self, schema: &Schema, text: &str) -> Result<RawCompletion, ClientError> {
        let start = Instant::now();
        let request = self.build_request(schema, text);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "Extraction request failed");
                if e.is_timeout() {
                    ClientError::Timeout(self.timeout)
                } else {
                    ClientError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.timeout)
            } else {
                ClientError::Network(e.to_string())
            }
        })?;

        if !status.is_success() {
            debug!(status = %status, "Extraction API error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion = parse_response(&body, &self.model)?;

        debug!(
            model = %completion.model,
            duration_ms = start.elapsed().as_millis(),
            response_len = completion.text.len(),
            "Structured extraction completed"
        );

        Ok(completion)
    }
}

/// Chat completions request with a strict JSON schema response format.
#[derive(Debug, Serialize)]
pub struct StructuredRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

/// A chat message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
