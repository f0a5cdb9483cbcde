//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - list: list loaded tools
//! - describe: show one tool's parameters
//! - schema: print function-calling schemas as JSON
//! - call: dispatch a tool call

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Thursday - tool registry and dispatcher for an LLM assistant
#[derive(Parser, Debug)]
#[command(name = "thursday")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory of tool manifests (overrides config)
    #[arg(short, long, global = true)]
    pub tools_dir: Option<PathBuf>,

    /// Only expose tools in this group (repeatable)
    #[arg(short, long = "group", global = true)]
    pub groups: Vec<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List loaded tools
    List,

    /// Show a tool's description and parameters
    Describe {
        /// Tool name
        name: String,
    },

    /// Print function-calling schemas for every tool
    Schema,

    /// Invoke a tool
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        // No args falls back to listing tools
        let cli = Cli::try_parse_from(["thursday"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.tools_dir.is_none());
        assert!(cli.groups.is_empty());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["thursday", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["thursday", "-c", "/path/to/thursday.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/thursday.yml")));
    }

    #[test]
    fn test_tools_dir_and_groups() {
        let cli = Cli::try_parse_from([
            "thursday", "list", "--tools-dir", "/opt/tools", "-g", "general", "--group", "music",
        ])
        .unwrap();
        assert_eq!(cli.tools_dir, Some(PathBuf::from("/opt/tools")));
        assert_eq!(cli.groups, vec!["general".to_string(), "music".to_string()]);
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_describe_command() {
        let cli = Cli::try_parse_from(["thursday", "describe", "check_fact_wikipedia"]).unwrap();
        match cli.command {
            Some(Commands::Describe { name }) => assert_eq!(name, "check_fact_wikipedia"),
            _ => panic!("Expected describe command"),
        }
    }

    #[test]
    fn test_schema_command() {
        let cli = Cli::try_parse_from(["thursday", "schema"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Schema)));
    }

    #[test]
    fn test_call_command_default_args() {
        let cli = Cli::try_parse_from(["thursday", "call", "echo"]).unwrap();
        match cli.command {
            Some(Commands::Call { name, args }) => {
                assert_eq!(name, "echo");
                assert_eq!(args, "{}");
            }
            _ => panic!("Expected call command"),
        }
    }

    #[test]
    fn test_call_command_with_args() {
        let cli = Cli::try_parse_from(["thursday", "call", "check_fact_wikipedia", "-a", r#"{"question": "?"}"#])
            .unwrap();
        match cli.command {
            Some(Commands::Call { args, .. }) => assert_eq!(args, r#"{"question": "?"}"#),
            _ => panic!("Expected call command"),
        }
    }

    #[test]
    fn test_call_requires_name() {
        assert!(Cli::try_parse_from(["thursday", "call"]).is_err());
    }

    #[test]
    fn test_help_works() {
        // Verify help doesn't panic
        Cli::command().debug_assert();
    }
}
