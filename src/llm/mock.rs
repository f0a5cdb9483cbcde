//! Scripted LLM client for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{LlmClient, LlmError};

/// A recorded call to the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub model: String,
    /// System prompt for completions, `None` for web searches
    pub system: Option<String>,
    pub prompt: String,
}

/// Returns queued responses in order and records every call
#[derive(Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue an error
    pub fn with_error(self, err: LlmError) -> Self {
        self.push(Err(err));
        self
    }

    /// Calls made so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, response: Result<String, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    fn next(&self, call: MockCall) -> Result<String, LlmError> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("no scripted response left".to_string())))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn web_search(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        self.next(MockCall {
            model: model.to_string(),
            system: None,
            prompt: prompt.to_string(),
        })
    }

    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        self.next(MockCall {
            model: model.to_string(),
            system: Some(system.to_string()),
            prompt: user.to_string(),
        })
    }

    async fn complete_json(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        self.next(MockCall {
            model: model.to_string(),
            system: Some(system.to_string()),
            prompt: user.to_string(),
        })
    }
}
