//! Tool System - tool interface, registry, manifest loading, and dispatch
//!
//! Tools are registered once at startup (from a directory of manifests or
//! from the builtin factory table) and invoked by name through the dispatcher.

mod definition;
mod dispatcher;
mod loader;
mod outcome;
mod registry;

pub use definition::{DEFAULT_GROUP, ParamType, ParameterSpec, ToolDescriptor};
pub use dispatcher::{DEFAULT_TIMEOUT_MS, Dispatcher, dispatch};
pub use loader::{LoadFailure, LoadReport, ToolEnv, ToolFactories, ToolFactory, ToolLoader};
pub use outcome::{FailureKind, Outcome};
pub use registry::{RegisteredTool, Registry};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Arguments passed to a tool, keyed by parameter name
pub type Arguments = Map<String, Value>;

/// A capability the assistant can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declared metadata; called once at load time
    fn describe(&self) -> ToolDescriptor;

    /// Execute with arguments already checked against `describe()`
    async fn execute(&self, args: Arguments) -> Result<Value>;
}

/// Fetch a string argument
pub fn str_arg<'a>(args: &'a Arguments, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// Fetch a required string argument, failing with a validation error
pub fn required_str<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    str_arg(args, name)
        .ok_or_else(|| crate::error::ThursdayError::Validation(format!("{} is required", name)))
}
