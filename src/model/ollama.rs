//! Ollama-backed model invoker
//!
//! Talks to a local Ollama server over its JSON chat endpoint. This is the
//! only place in the crate that knows a wire format; the engine sees just
//! the `ModelInvoker` trait.

use crate::model::{ChatRole, InvokeError, InvokerConfig, Message, ModelInvoker, ModelOptions};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Model invoker that calls a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaInvoker {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    /// Ollama keep_alive value sent with every request. "0" unloads the
    /// model right after the call, freeing VRAM between pipeline steps.
    keep_alive: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OllamaInvoker {
    pub fn new(config: InvokerConfig) -> Result<Self, InvokeError> {
        let base_url = config
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InvokeError::Unavailable(format!("http client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout_secs,
            keep_alive: None,
        })
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn role_str(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }

    /// Render one message into the Ollama wire shape, inlining attachments
    /// as base64. Unreadable attachments are skipped with a warning rather
    /// than failing the whole invocation.
    fn wire_message(msg: &Message) -> serde_json::Value {
        let mut value = json!({
            "role": Self::role_str(msg.role),
            "content": msg.content,
        });

        if !msg.images.is_empty() {
            let mut encoded = Vec::new();
            for path in &msg.images {
                match std::fs::read(path) {
                    Ok(bytes) => {
                        encoded.push(base64::engine::general_purpose::STANDARD.encode(bytes));
                    }
                    Err(e) => {
                        warn!("Skipping unreadable attachment {}: {}", path.display(), e);
                    }
                }
            }
            if !encoded.is_empty() {
                value["images"] = json!(encoded);
            }
        }

        value
    }
}

#[async_trait]
impl ModelInvoker for OllamaInvoker {
    async fn invoke(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        messages: &[Message],
        options: &ModelOptions,
        _allow_tools: bool,
    ) -> Result<String, InvokeError> {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system_prompt {
            wire_messages.push(json!({"role": "system", "content": system}));
        }
        wire_messages.extend(messages.iter().map(Self::wire_message));

        let mut body = json!({
            "model": model_id,
            "messages": wire_messages,
            "stream": false,
        });
        if !options.is_empty() {
            body["options"] = serde_json::Value::Object(options.clone());
        }
        if let Some(keep_alive) = &self.keep_alive {
            body["keep_alive"] = json!(keep_alive);
        }

        debug!("Invoking {} with {} messages", model_id, wire_messages.len());

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::Timeout(self.timeout_secs)
                } else {
                    InvokeError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InvokeError::Unavailable(format!("{}: {}", status, detail)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InvokeError::MalformedResponse(e.to_string()))?;

        parsed
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| InvokeError::MalformedResponse("missing message content".to_string()))
    }
}
