//! Invoker configuration

/// Configuration for the Ollama invoker
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Base URL of the local Ollama server
    ///
    /// If not provided, defaults to "http://localhost:11434".
    pub endpoint: Option<String>,

    /// Timeout for a single invocation in seconds
    pub timeout_secs: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 300,
        }
    }
}

impl InvokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
