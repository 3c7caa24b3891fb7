// promptgate/src/openai.rs
//! OpenAI-compatible client implementing the core collaborator traits.
//!
//! One `reqwest` client serves both `ChatCompletion`
//! (`POST {base}/chat/completions`) and `EmbeddingGenerator`
//! (`POST {base}/embeddings`). Non-success statuses surface as service
//! errors carrying the response body. No retries here: retry policy belongs
//! to the hosted service client stack, not this layer.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use promptgate_core::{ChatCompletion, ChatRequest, CoreError, EmbeddingGenerator};

use crate::settings::Settings;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout: Duration,
}

impl From<&Settings> for OpenAiConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            api_base: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            chat_model: settings.deployment.clone(),
            embedding_model: settings.embedding_deployment.clone(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| CoreError::Service(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, CoreError> {
        let body = ChatCompletionBody {
            model: self.config.chat_model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        };

        debug!(
            "Requesting chat completion from model '{}'",
            self.config.chat_model
        );

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CoreError::Service(format!("chat request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(CoreError::Service(format!(
                "completion service returned {status}: {text}"
            )));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Service(format!("chat response invalid: {err}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CoreError::Service("chat response missing content".to_string()))
    }
}

#[async_trait]
impl EmbeddingGenerator for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
        });

        let response = self
            .client
            .post(self.url("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CoreError::Embedding(format!("embedding request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(CoreError::Embedding(format!(
                "embedding service returned {status}: {text}"
            )));
        }

        let response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Embedding(format!("embedding response invalid: {err}")))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| CoreError::Embedding("embedding response missing data".to_string()))
    }
}
