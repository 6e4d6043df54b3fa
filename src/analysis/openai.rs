//! OpenAI chat-completions client with forced tool calls.
//!
//! Works with any OpenAI-compatible `/chat/completions` endpoint that
//! supports `tools` and a named `tool_choice`.

use super::{StructuredLlm, ToolSpec};
use crate::error::LlmError;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Instant;
use tracing::{debug, instrument, warn};

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl OpenAiClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn request_body(&self, prompt: &str, tool: &ToolSpec) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "tools": [{
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }],
            "tool_choice": { "type": "function", "function": { "name": tool.name } },
        })
    }
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        429 => LlmError::RateLimited {
            message: error_message(body).unwrap_or_else(|| truncate_for_log(body, 200)),
        },
        code => LlmError::Api {
            status: code,
            body: error_message(body).unwrap_or_else(|| truncate_for_log(body, 200)),
        },
    }
}

/// `error.message` from an OpenAI error envelope.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Arguments of the call to `tool_name` in the first choice.
fn tool_arguments(body: &str, tool_name: &str) -> Result<String, LlmError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| LlmError::ResponseParse {
        message: format!("chat response: {e}"),
        truncated: false,
    })?;
    let choice = response.choices.into_iter().next().ok_or_else(|| LlmError::ResponseParse {
        message: "response has no choices".to_string(),
        truncated: false,
    })?;
    if choice.finish_reason.as_deref() == Some("length") {
        warn!("Model stopped at its token limit; tool arguments may be cut off");
    }
    choice
        .message
        .tool_calls
        .into_iter()
        .find(|call| call.function.name == tool_name)
        .map(|call| call.function.arguments)
        .ok_or_else(|| LlmError::ResponseParse {
            message: format!("no call to {tool_name} in response"),
            truncated: false,
        })
}

impl StructuredLlm for OpenAiClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model, tool = tool.name))]
    async fn call_tool(&self, prompt: &str, tool: &ToolSpec) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, tool))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion returned");

        if !status.is_success() {
            return Err(map_http_error(status, &body));
        }
        tool_arguments(&body, tool.name)
    }
}
