use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::{LevelFilter, info, warn};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use thursday::config::Config;
use thursday::tools::{Dispatcher, Outcome, ToolEnv, ToolLoader};

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thursday")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("thursday.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // Without RUST_LOG the filter stays open and the max level is narrowed
    // later from the config file
    let rust_log = std::env::var("RUST_LOG").ok();
    let mut builder = env_logger::Builder::from_default_env();
    if rust_log.is_none() {
        builder.filter_level(LevelFilter::Trace);
    }
    builder.target(env_logger::Target::Pipe(target)).init();
    if rust_log.is_none() {
        log::set_max_level(DEFAULT_LOG_LEVEL);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Level to apply from the config file; `None` when RUST_LOG takes precedence
fn configured_level(rust_log: Option<&str>, level: Option<&str>) -> Option<LevelFilter> {
    if rust_log.is_some() {
        return None;
    }
    match level {
        None => Some(DEFAULT_LOG_LEVEL),
        Some(level) => match level.parse::<LevelFilter>() {
            Ok(filter) => Some(filter),
            Err(_) => {
                warn!("Unknown log_level '{}', using {}", level, DEFAULT_LOG_LEVEL);
                Some(DEFAULT_LOG_LEVEL)
            }
        },
    }
}

fn apply_log_level(level: Option<&str>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    if let Some(filter) = configured_level(rust_log.as_deref(), level) {
        log::set_max_level(filter);
        info!("Log level set to {}", filter);
    }
}

fn build_dispatcher(cli: &Cli, config: &Config) -> Result<Dispatcher> {
    let loader = ToolLoader::new(ToolEnv::from_config(config));

    let report = match cli.tools_dir.as_ref().or(config.tools.directory.as_ref()) {
        Some(dir) => loader
            .load_report(dir)
            .context(format!("Failed to load tools from {}", dir.display()))?,
        None => loader.load_builtins().context("Failed to load builtin tools")?,
    };

    for failure in &report.skipped {
        warn!("Skipped tool: {}", failure);
        if cli.is_verbose() {
            println!("{} {}", "Skipped:".yellow(), failure);
        }
    }

    let groups = if cli.groups.is_empty() { &config.tools.groups } else { &cli.groups };
    let registry = if groups.is_empty() {
        report.registry
    } else {
        report.registry.with_groups(groups.as_slice())
    };
    info!("Serving {} tool(s)", registry.len());

    Ok(Dispatcher::new(Arc::new(registry)).with_default_timeout(config.tools.timeout_ms))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<bool> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let dispatcher = build_dispatcher(cli, config)?;

    match &cli.command {
        None | Some(Commands::List) => handle_list_command(&dispatcher),
        Some(Commands::Describe { name }) => handle_describe_command(&dispatcher, name),
        Some(Commands::Schema) => handle_schema_command(&dispatcher),
        Some(Commands::Call { name, args }) => handle_call_command(&dispatcher, name, args).await,
    }
}

fn handle_list_command(dispatcher: &Dispatcher) -> Result<bool> {
    let registry = dispatcher.registry();
    if registry.is_empty() {
        println!("{}", "No tools loaded".yellow());
        return Ok(true);
    }

    for entry in registry.iter() {
        println!(
            "{} {} {}",
            entry.name().green().bold(),
            format!("[{}]", entry.descriptor.group).cyan(),
            entry.origin().dimmed()
        );
        println!("    {}", entry.descriptor.description);
    }
    Ok(true)
}

fn handle_describe_command(dispatcher: &Dispatcher, name: &str) -> Result<bool> {
    let entry = dispatcher
        .registry()
        .get(name)
        .ok_or_else(|| eyre!("Unknown tool: {}", name))?;
    let descriptor = &entry.descriptor;

    println!("{} {}", "Tool:".green(), descriptor.name.bold());
    println!("{} {}", "Group:".green(), descriptor.group);
    println!("{} {}", "Source:".green(), entry.origin());
    if let Some(timeout_ms) = descriptor.timeout_ms {
        println!("{} {}ms", "Timeout:".green(), timeout_ms);
    }
    println!("\n{}\n", descriptor.description);

    if descriptor.parameters.is_empty() {
        println!("{}", "No parameters".dimmed());
    }
    for param in &descriptor.parameters {
        let marker = if param.required { "required".red() } else { "optional".dimmed() };
        println!("  {} ({}, {})", param.name.bold(), param.param_type.as_str(), marker);
        println!("      {}", param.description);
    }
    Ok(true)
}

fn handle_schema_command(dispatcher: &Dispatcher) -> Result<bool> {
    let schemas = dispatcher.registry().function_schemas();
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(true)
}

async fn handle_call_command(dispatcher: &Dispatcher, name: &str, args: &str) -> Result<bool> {
    let args: Value = serde_json::from_str(args).context("Arguments must be valid JSON")?;
    info!("Calling tool '{}'", name);

    let outcome = dispatcher.dispatch_value(name, args).await;
    match &outcome {
        Outcome::Success { payload } => {
            match payload.get("answer").and_then(Value::as_str) {
                Some(answer) => println!("{}", answer),
                None => println!("{}", serde_json::to_string_pretty(payload)?),
            }
            Ok(true)
        }
        Outcome::Failure { kind, message } => {
            eprintln!("{} [{:?}] {}", "Failed:".red().bold(), kind, message);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in a .env file
    let _ = dotenvy::dotenv();

    // Setup logging first so config fallback warnings are recorded
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(config.log_level.as_deref());

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let succeeded = run_application(&cli, &config).await.context("Application failed")?;
    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_from_config() {
        assert_eq!(configured_level(None, Some("debug")), Some(LevelFilter::Debug));
        assert_eq!(configured_level(None, Some("WARN")), Some(LevelFilter::Warn));
        assert_eq!(configured_level(None, None), Some(LevelFilter::Info));
    }

    #[test]
    fn test_configured_level_invalid_falls_back() {
        assert_eq!(configured_level(None, Some("chatty")), Some(LevelFilter::Info));
    }

    #[test]
    fn test_configured_level_rust_log_wins() {
        assert_eq!(configured_level(Some("thursday=trace"), Some("error")), None);
    }
}
