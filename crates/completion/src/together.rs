//! Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! Together AI is the default backend. One non-streaming request per call;
//! no retries, and no timeout unless the config sets one.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::CompletionConfig;
use crate::error::{make_snippet, CompletionError, ConfigError, Result};
use crate::CompletionProvider;

#[derive(Debug, Clone)]
pub struct TogetherClient {
    client: reqwest::Client,
    model: String,
    url_chat: String,
}

impl TogetherClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        config.validate()?;

        let api_key = config
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("TOGETHER_API_KEY"))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
                ConfigError::InvalidFormat {
                    var: "TOGETHER_API_KEY",
                    reason: "must be a valid header value",
                }
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let url_chat = format!(
            "{}/v1/chat/completions",
            config.endpoint.trim().trim_end_matches('/')
        );

        info!(
            model = %config.model,
            endpoint = %config.endpoint,
            timeout_secs = ?config.timeout_secs,
            "together completion client initialized"
        );

        Ok(Self {
            client,
            model: config.model.clone(),
            url_chat,
        })
    }
}

impl CompletionProvider for TogetherClient {
    fn provider_name(&self) -> &'static str {
        "together"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let started = Instant::now();
        let body = ChatCompletionRequest::new(&self.model, system, user);

        debug!(model = %self.model, prompt_len = user.len(), "POST {}", self.url_chat);

        let response = self.client.post(&self.url_chat).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                url = %self.url_chat,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "chat completion returned non-success status"
            );

            return Err(CompletionError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet,
            });
        }

        let out: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to decode chat completion response");
            CompletionError::Decode(format!(
                "{e}; expected `choices[0].message.content`"
            ))
        })?;

        let content = extract_content(out)?;

        info!(
            model = %self.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );

        Ok(content)
    }
}

fn extract_content(out: ChatCompletionResponse) -> Result<String> {
    out.choices
        .into_iter()
        .next()
        .ok_or(CompletionError::EmptyChoices)?
        .message
        .content
        .ok_or_else(|| CompletionError::Decode("first choice has no message content".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, system: &'a str, user: &'a str) -> Self {
        Self {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}
