//! Tool descriptors and parameter schemas
//!
//! A descriptor is what a tool declares about itself: its name, a description
//! for the model, the group it belongs to, and an ordered list of parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ThursdayError};

use super::Arguments;

/// Group a tool belongs to unless it says otherwise
pub const DEFAULT_GROUP: &str = "general";

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// JSON schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Check whether a JSON value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// A single declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        }
    }
}

/// What a tool declares about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique across a registry (e.g., "check_fact_wikipedia")
    pub name: String,
    /// Human-readable description for the model
    pub description: String,
    /// Group used to select tool subsets
    #[serde(default = "default_group")]
    pub group: String,
    /// Ordered parameter list
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Per-call timeout; the dispatcher default applies when unset
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

impl ToolDescriptor {
    /// Create a new descriptor in the default group with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            group: default_group(),
            parameters: Vec::new(),
            timeout_ms: None,
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// Set group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Reject descriptors that cannot be registered or validated against
    pub fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ThursdayError::Config("tool name must not be empty".to_string()));
        }
        for (i, param) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(ThursdayError::Config(format!(
                    "tool '{}' declares parameter '{}' twice",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }

    /// Validate caller-supplied arguments against the declared parameters
    pub fn validate(&self, args: &Arguments) -> Result<()> {
        for param in &self.parameters {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ThursdayError::Validation(format!(
                        "missing required parameter '{}' for tool '{}'",
                        param.name, self.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.param_type.matches(value) => {
                    return Err(ThursdayError::Validation(format!(
                        "parameter '{}' of tool '{}' must be of type {}, got {}",
                        param.name,
                        self.name,
                        param.param_type.as_str(),
                        json_type_name(value)
                    )));
                }
                Some(_) => {}
            }
        }

        if let Some(unknown) = args.keys().find(|key| self.param(key).is_none()) {
            return Err(ThursdayError::Validation(format!(
                "unknown parameter '{}' for tool '{}'",
                unknown, self.name
            )));
        }

        Ok(())
    }

    /// Render as an LLM function-calling schema
    pub fn to_function_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "function",
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            }
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
