//! Invocation outcome returned by every dispatch

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ThursdayError;

/// Why a dispatch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No tool registered under the requested name
    NotFound,
    /// Arguments did not match the tool's parameters
    Validation,
    /// The tool (or the service behind it) failed
    Execution,
}

impl FailureKind {
    /// Classify an error raised while executing a tool
    ///
    /// `NotFound` is reserved for registry misses, so a tool that reports
    /// something missing still counts as an execution failure.
    pub fn of(err: &ThursdayError) -> Self {
        match err {
            ThursdayError::Validation(_) => Self::Validation,
            _ => Self::Execution,
        }
    }
}

/// Result of a single dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { payload: Value },
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn success(payload: impl Into<Value>) -> Self {
        Self::Success {
            payload: payload.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, if this outcome is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failure { kind, .. } => Some(*kind),
            Self::Success { .. } => None,
        }
    }

    /// Payload, if this outcome is a success
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}

impl From<ThursdayError> for Outcome {
    fn from(err: ThursdayError) -> Self {
        let kind = FailureKind::of(&err);
        Self::failure(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_accessors() {
        let outcome = Outcome::success(json!("hi"));
        assert!(outcome.is_success());
        assert_eq!(outcome.payload(), Some(&json!("hi")));
        assert!(outcome.failure_kind().is_none());
    }

    #[test]
    fn test_failure_accessors() {
        let outcome = Outcome::failure(FailureKind::NotFound, "no such tool");
        assert!(!outcome.is_success());
        assert!(outcome.payload().is_none());
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
    }

    #[test]
    fn test_from_error_classification() {
        let outcome: Outcome = ThursdayError::Validation("bad".into()).into();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Validation));

        let outcome: Outcome = ThursdayError::Spotify("401".into()).into();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Execution));

        let outcome: Outcome = ThursdayError::NotFound("track 'xyz'".into()).into();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Execution));
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(Outcome::failure(FailureKind::Execution, "boom")).unwrap();
        assert_eq!(json, json!({"status": "failure", "kind": "execution", "message": "boom"}));

        let json = serde_json::to_value(Outcome::success(json!({"answer": "42"}))).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["payload"]["answer"], "42");
    }
}
