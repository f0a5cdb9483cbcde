//! CLI module for thursday - command-line front-end over the tool registry.
//!
//! Lists and describes the loaded tools, prints their function schemas, and
//! dispatches a single call.

pub mod commands;

pub use commands::Cli;
