//! LLM Client Layer - the model backend tools call into
//!
//! This module provides:
//! - LlmClient trait for API abstraction
//! - OpenAiClient implementation
//! - MockLlmClient for tests
//! - Helpers for parsing model output

pub mod client;
pub mod mock;
pub mod openai;
pub mod response;

pub use client::{LlmClient, LlmError};
pub use mock::{MockCall, MockLlmClient};
pub use openai::OpenAiClient;
pub use response::{parse_model_json, strip_code_fences};
