//! Error types for Thursday
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

/// All error types that can occur in Thursday
#[derive(Debug, Error)]
pub enum ThursdayError {
    /// A tool manifest could not be turned into a registered tool
    #[error("Failed to load tool from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// Two tools declared the same name
    #[error("Duplicate tool '{name}' (first from {first}, again from {second})")]
    DuplicateTool { name: String, first: String, second: String },

    /// The plugin directory itself is unusable
    #[error("Tools directory {}: {reason}", path.display())]
    ToolsDirectory { path: PathBuf, reason: String },

    /// Arguments did not match a tool's parameter schema
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A tool ran and failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Tool name not present in the registry
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Missing or invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Spotify Web API error
    #[error("Spotify error: {0}")]
    Spotify(String),

    /// Mailbox (IMAP) error
    #[error("Mail error: {0}")]
    Mail(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML manifest parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for Thursday operations
pub type Result<T> = std::result::Result<T, ThursdayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error() {
        let err = ThursdayError::Load {
            path: PathBuf::from("tools/broken.toml"),
            reason: "unknown kind 'nope'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load tool from tools/broken.toml: unknown kind 'nope'"
        );
    }

    #[test]
    fn test_duplicate_tool_error() {
        let err = ThursdayError::DuplicateTool {
            name: "dup".to_string(),
            first: "a.toml".to_string(),
            second: "b.toml".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate tool 'dup' (first from a.toml, again from b.toml)");
    }

    #[test]
    fn test_validation_error() {
        let err = ThursdayError::Validation("missing required parameter 'question'".to_string());
        assert_eq!(err.to_string(), "Validation failed: missing required parameter 'question'");
    }

    #[test]
    fn test_not_found_error() {
        let err = ThursdayError::NotFound("weather".to_string());
        assert_eq!(err.to_string(), "Tool not found: weather");
    }

    #[test]
    fn test_mail_error() {
        let err = ThursdayError::Mail("login failed".to_string());
        assert_eq!(err.to_string(), "Mail error: login failed");
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: ThursdayError = LlmError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        }
        .into();
        assert!(matches!(err, ThursdayError::Llm(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ThursdayError = io_err.into();
        assert!(matches!(err, ThursdayError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ThursdayError = json_err.into();
        assert!(matches!(err, ThursdayError::Json(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Table>("kind = ").unwrap_err();
        let err: ThursdayError = toml_err.into();
        assert!(matches!(err, ThursdayError::Toml(_)));
    }
}
