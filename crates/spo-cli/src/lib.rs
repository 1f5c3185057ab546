//! SPO CLI - iterative prompt optimization from the terminal
//!
//! Subcommands:
//! - `optimize`: run the optimization loop for a template
//! - `test-prompt`: run one prompt against a few questions
//! - `template`: list, show and scaffold YAML templates

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;

use commands::{optimize, template, test_prompt};
pub use error::{CliError, CliResult};

/// SPO CLI application
#[derive(Parser)]
#[command(name = "spo")]
#[command(about = "SPO - Self-supervised prompt optimization", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML or YAML)
    #[arg(short, long, env = "SPO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "SPO_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SPO_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Optimize the prompt of a template
    Optimize(optimize::OptimizeArgs),

    /// Run a prompt against questions once
    TestPrompt(test_prompt::TestPromptArgs),

    /// Manage templates
    Template {
        #[command(subcommand)]
        command: template::TemplateCommands,
    },
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    match cli.command {
        Commands::Optimize(args) => optimize::run(cli.config.as_deref(), args).await,
        Commands::TestPrompt(args) => test_prompt::run(cli.config.as_deref(), args).await,
        Commands::Template { command } => template::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_original_optimize_flags() {
        let cli = Cli::try_parse_from([
            "spo",
            "optimize",
            "--opt-model",
            "gpt-4o",
            "--opt-temp",
            "0.9",
            "--eval-model",
            "gpt-4o-mini",
            "--exec-temp",
            "0",
            "--workspace",
            "runs",
            "--initial-round",
            "1",
            "--max-rounds",
            "5",
            "--template",
            "Poem.yaml",
            "--name",
            "Poem",
            "--mode",
            "reasoning_model",
        ])
        .unwrap();

        match cli.command {
            Commands::Optimize(args) => {
                assert_eq!(args.opt_model.as_deref(), Some("gpt-4o"));
                assert_eq!(args.max_rounds, Some(5));
                assert!(!args.dry_run);
            }
            _ => panic!("expected optimize"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["spo", "template", "list", "--config", "spo.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("spo.toml")));
    }
}
