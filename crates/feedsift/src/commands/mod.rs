//! Command implementations for the feedsift CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod completions;
pub mod config;
pub mod console;
pub mod filter;
pub mod schema;
pub mod serve;

use std::io;

use feedsift::config::{Config, ConfigError};
use feedsift::PipelineError;
use feedsift_expr::{CompileError, ConfigurationError};
use feedsift_feed::FetchError;

use crate::cli::Cli;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Feed could not be fetched or parsed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Expression did not compile.
    #[error("invalid expression: {0}")]
    Compile(#[from] CompileError),

    /// Filtering or rendering failed.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// The expression environment could not be built.
    #[error("environment error: {0}")]
    Environment(#[from] ConfigurationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bad command-line usage.
    #[error("{0}")]
    Usage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
    /// Loaded configuration file.
    pub config: Config,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments and configuration.
    ///
    /// `--no-color` and the `NO_COLOR` environment variable both override
    /// `output.color` in the config file.
    pub fn from_cli(cli: &Cli, config: Config) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        let use_colors = !cli.no_color && !no_color_env && config.output.color.unwrap_or(true);
        Self {
            json_output: cli.json,
            use_colors,
            quiet: cli.quiet,
            verbose: cli.verbose,
            config,
        }
    }
}
