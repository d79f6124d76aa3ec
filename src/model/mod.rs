//! Model invocation - the single opaque call the engine depends on

pub mod config;
pub mod ollama;
pub mod response;

use async_trait::async_trait;
pub use config::InvokerConfig;
pub use ollama::OllamaInvoker;
pub use response::InvokeError;

use serde::{Deserialize, Serialize};

/// Opaque per-step options forwarded to the model server unmodified
/// (temperature, sampling parameters, etc.)
pub type ModelOptions = serde_json::Map<String, serde_json::Value>;

/// Role of a message in a model conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in the ordered message history handed to a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,

    pub content: String,

    /// Paths of image attachments, resolved by the invoker
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<std::path::PathBuf>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<std::path::PathBuf>) -> Self {
        self.images = images;
        self
    }
}

/// Trait for model invocation - allows for different backends
///
/// The engine treats this as a black box with latency and failure modes.
/// `allow_tools` tells a tool-capable backend that this step has cleared
/// the safety gate; backends without tool support may ignore it.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        messages: &[Message],
        options: &ModelOptions,
        allow_tools: bool,
    ) -> Result<String, InvokeError>;
}
