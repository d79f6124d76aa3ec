//! Mock invoker for deterministic, fast engine tests

use async_trait::async_trait;
use chorus::model::{InvokeError, Message, ModelInvoker, ModelOptions};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded model invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub message_count: usize,
    pub contents: Vec<String>,
    pub allow_tools: bool,
}

/// Mock invoker with scripted per-model responses
///
/// Responses queue up per model id and are consumed in order; a model with
/// no script left answers with a generated placeholder. Delays simulate
/// slow models so parallel ordering tests can skew completion times.
pub struct MockInvoker {
    responses: Mutex<HashMap<String, VecDeque<Result<String, InvokeError>>>>,
    delays: HashMap<String, Duration>,
    records: Mutex<Vec<Invocation>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response for `model_id`
    pub fn respond(self, model_id: &str, output: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_default()
            .push_back(Ok(output.to_string()));
        self
    }

    /// Queue a failure for `model_id`
    pub fn fail(self, model_id: &str, error: InvokeError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_default()
            .push_back(Err(error));
        self
    }

    /// Delay every invocation of `model_id`
    pub fn with_delay(mut self, model_id: &str, millis: u64) -> Self {
        self.delays
            .insert(model_id.to_string(), Duration::from_millis(millis));
        self
    }

    /// Total invocations seen so far
    pub fn call_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Full invocation trace in arrival order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    async fn invoke(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        messages: &[Message],
        _options: &ModelOptions,
        allow_tools: bool,
    ) -> Result<String, InvokeError> {
        self.records.lock().unwrap().push(Invocation {
            model_id: model_id.to_string(),
            system_prompt: system_prompt.map(String::from),
            message_count: messages.len(),
            contents: messages.iter().map(|m| m.content.clone()).collect(),
            allow_tools,
        });

        if let Some(delay) = self.delays.get(model_id) {
            tokio::time::sleep(*delay).await;
        }

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(model_id)
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(result) => result,
            None => Ok(format!("{model_id} says ok")),
        }
    }
}
