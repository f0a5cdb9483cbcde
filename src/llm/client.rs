//! Core LLM client trait and error type

use async_trait::async_trait;

/// Model backend used by tools
///
/// Each call is independent; no conversation state is kept.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Answer a prompt with web search enabled, returning the output text
    async fn web_search(&self, model: &str, prompt: &str) -> Result<String, LlmError>;

    /// Single free-text completion
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError>;

    /// Single completion constrained to a JSON object, returning the raw text
    async fn complete_json(&self, model: &str, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::ApiError { status: 429, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = LlmError::ApiError {
            status: 500,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error 500: overloaded");
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_rate_limit() {
        let err = LlmError::ApiError {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_missing_api_key_display() {
        let err = LlmError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing API key: environment variable OPENAI_API_KEY not set"
        );
    }
}
