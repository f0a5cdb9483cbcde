//! Thursday - tool registry and dispatcher for a conversational assistant
//!
//! Tools are discovered from a directory of manifests (or taken from the
//! builtin table), described to the language model as function schemas, and
//! invoked by name through a dispatcher that always reports an `Outcome`.

pub mod builtin;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{Result, ThursdayError};
