//! The provider seam: anything that can stream chat completions.
//!
//! Production traffic goes through [`HttpProvider`]; tests drive the client
//! with scripted in-memory providers.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, future};
use serde_json::Value;

use super::config::LlmConfig;
use super::stream::StreamChunk;
use super::LlmError;
use crate::message::Message;
use crate::tools::ToolDefinition;

/// A fully assembled streaming chat request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Extra top-level body fields (provider-specific thinking switches).
    pub extra: Value,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LlmError>;
}

/// Streams completions from an OpenAI-compatible HTTP endpoint via SSE.
pub struct HttpProvider {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    timeout: Duration,
}

impl HttpProvider {
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            timeout: config.timeout,
        }
    }

    fn body(request: &ChatRequest) -> Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = temperature.into();
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(ToolDefinition::to_openai).collect());
            body["tool_choice"] = "auto".into();
        }
        if let Value::Object(extra) = &request.extra {
            for (key, value) in extra {
                body[key.as_str()] = value.clone();
            }
        }
        body
    }
}

#[async_trait]
impl ChatProvider for HttpProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LlmError> {
        let api_key = std::env::var(&self.api_key_env).map_err(|_| LlmError::MissingApiKey {
            env: self.api_key_env.clone(),
        })?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&Self::body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| match event {
                Ok(event) if event.data.trim() == "[DONE]" => None,
                Ok(event) => Some(
                    serde_json::from_str::<StreamChunk>(&event.data)
                        .map_err(|err| LlmError::Stream(format!("{err}: {}", event.data))),
                ),
                Err(err) => Some(Err(LlmError::Stream(err.to_string()))),
            })
            .take_while(|item| future::ready(item.is_some()))
            .filter_map(future::ready);

        Ok(Box::pin(stream))
    }
}
