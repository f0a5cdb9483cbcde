//! Tool registry
//!
//! Maps tool names to instances. Built once at startup and read-only after
//! that; share it behind an `Arc` between the dispatcher and the front-end.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, ThursdayError};

use super::Tool;
use super::definition::ToolDescriptor;

/// A tool together with the descriptor captured when it was registered
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub tool: Arc<dyn Tool>,
    /// Manifest the tool was loaded from, if any
    pub source: Option<PathBuf>,
}

impl RegisteredTool {
    pub fn new(descriptor: ToolDescriptor, tool: Arc<dyn Tool>, source: Option<PathBuf>) -> Self {
        Self {
            descriptor,
            tool,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Where the tool came from, for log and error messages
    pub fn origin(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<builtin>".to_string(),
        }
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("descriptor", &self.descriptor)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Mapping from tool name to registered tool
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from instances, describing each one
    ///
    /// Fails on the first name that appears twice.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            let descriptor = tool.describe();
            descriptor.check()?;
            registry.insert(RegisteredTool::new(descriptor, tool, None))?;
        }
        Ok(registry)
    }

    /// Add an entry; a second entry with the same name is an error
    pub(crate) fn insert(&mut self, entry: RegisteredTool) -> Result<()> {
        if let Some(existing) = self.tools.get(entry.name()) {
            return Err(ThursdayError::DuplicateTool {
                name: entry.name().to_string(),
                first: existing.origin(),
                second: entry.origin(),
            });
        }
        self.tools.insert(entry.name().to_string(), entry);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// All registered tools in name order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }

    /// Descriptors in name order
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().map(|t| &t.descriptor).collect()
    }

    /// Function-calling schemas for every tool, ready to hand to a model
    pub fn function_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| t.descriptor.to_function_schema())
            .collect()
    }

    /// Distinct groups present in the registry
    pub fn groups(&self) -> BTreeSet<&str> {
        self.tools.values().map(|t| t.descriptor.group.as_str()).collect()
    }

    /// Subset sharing the instances of tools whose group is listed
    pub fn with_groups<S: AsRef<str>>(&self, groups: &[S]) -> Registry {
        let tools = self
            .tools
            .iter()
            .filter(|(_, t)| groups.iter().any(|g| g.as_ref() == t.descriptor.group))
            .map(|(name, t)| (name.clone(), t.clone()))
            .collect();
        Registry { tools }
    }

    /// Get number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
