//! Dispatch tool calls by name
//!
//! Every call returns an `Outcome`; nothing a tool does (error, panic, or
//! hang) escapes to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::error::ThursdayError;

use super::Arguments;
use super::outcome::{FailureKind, Outcome};
use super::registry::Registry;

/// Timeout applied when neither the tool nor the caller sets one
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Routes resolved tool calls to registered tools
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    default_timeout_ms: u64,
}

impl Dispatcher {
    /// Create a dispatcher over a registry
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the timeout used for tools that don't declare one
    pub fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch a call with arguments given as any JSON value
    ///
    /// `null` means no arguments; anything other than an object is rejected.
    pub async fn dispatch_value(&self, name: &str, args: Value) -> Outcome {
        match args {
            Value::Object(map) => self.dispatch(name, map).await,
            Value::Null => self.dispatch(name, Map::new()).await,
            other => Outcome::failure(
                FailureKind::Validation,
                format!("arguments for '{}' must be a JSON object, got {}", name, other),
            ),
        }
    }

    /// Dispatch a call
    pub async fn dispatch(&self, name: &str, args: Arguments) -> Outcome {
        run(&self.registry, name, args, self.default_timeout_ms).await
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.contains(name)
    }
}

/// Dispatch a call against a registry using the default timeout
pub async fn dispatch(registry: &Registry, name: &str, args: Arguments) -> Outcome {
    run(registry, name, args, DEFAULT_TIMEOUT_MS).await
}

async fn run(registry: &Registry, name: &str, args: Arguments, default_timeout_ms: u64) -> Outcome {
    let Some(entry) = registry.get(name) else {
        warn!("Dispatch to unknown tool '{}'", name);
        return Outcome::failure(FailureKind::NotFound, format!("Unknown tool: {}", name));
    };

    if let Err(e) = entry.descriptor.validate(&args) {
        warn!("Rejected call to '{}': {}", name, e);
        return e.into();
    }

    let timeout_ms = entry.descriptor.timeout_ms.unwrap_or(default_timeout_ms);
    info!("Dispatching tool '{}' (timeout {}ms)", name, timeout_ms);
    debug!("Arguments for '{}': {:?}", name, args);

    let call = AssertUnwindSafe(entry.tool.execute(args)).catch_unwind();

    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(Ok(Ok(payload))) => {
            debug!("Tool '{}' succeeded", name);
            Outcome::success(payload)
        }
        Ok(Ok(Err(e))) => {
            warn!("Tool '{}' failed: {}", name, e);
            Outcome::failure(FailureKind::of(&e), e.to_string())
        }
        Ok(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            warn!("Tool '{}' panicked: {}", name, message);
            ThursdayError::Execution(format!("tool '{}' panicked: {}", name, message)).into()
        }
        Err(_) => {
            warn!("Tool '{}' timed out after {}ms", name, timeout_ms);
            ThursdayError::Execution(format!("tool '{}' timed out after {}ms", name, timeout_ms)).into()
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
