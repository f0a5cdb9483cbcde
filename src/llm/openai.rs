//! OpenAI API client implementation
//!
//! Web search goes through the Responses API with the `web_search` tool;
//! other completions go through Chat Completions, optionally constrained to a
//! `json_object` format.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;

use super::client::{LlmClient, LlmError};

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured variable
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| LlmError::MissingApiKey {
            env_var: config.api_key_env.clone(),
        })?;

        Self::with_api_key(
            api_key,
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Send a request and return the parsed JSON body
    async fn send_request(&self, path: &str, body: Value) -> Result<Value, LlmError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

fn web_search_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "tools": [{"type": "web_search"}],
        "input": [{"role": "user", "content": prompt}]
    })
}

fn chat_body(model: &str, system: &str, user: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user}
        ]
    })
}

fn json_completion_body(model: &str, system: &str, user: &str) -> Value {
    let mut body = chat_body(model, system, user);
    body["response_format"] = json!({"type": "json_object"});
    body
}

/// Concatenate the `output_text` parts of every message in a Responses payload
fn output_text(response: &Value) -> Option<String> {
    let parts: Vec<&str> = response["output"]
        .as_array()?
        .iter()
        .filter(|item| item["type"] == "message")
        .filter_map(|item| item["content"].as_array())
        .flatten()
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part["text"].as_str())
        .collect();

    if parts.is_empty() { None } else { Some(parts.join("")) }
}

fn chat_content(response: &Value) -> Option<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn web_search(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let response = self.send_request("responses", web_search_body(model, prompt)).await?;
        output_text(&response).ok_or_else(|| LlmError::InvalidResponse("no output text in response".to_string()))
    }

    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let response = self.send_request("chat/completions", chat_body(model, system, user)).await?;
        chat_content(&response).ok_or_else(|| LlmError::InvalidResponse("no message content in response".to_string()))
    }

    async fn complete_json(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError> {
        let response = self
            .send_request("chat/completions", json_completion_body(model, system, user))
            .await?;
        chat_content(&response).ok_or_else(|| LlmError::InvalidResponse("no message content in response".to_string()))
    }
}
