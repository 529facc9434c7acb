//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the feedsift binary.

use clap::{Parser, Subcommand, ValueEnum};
use feedsift_feed::OutputFormat;

/// feedsift - Filter RSS, Atom and JSON feeds with typed expressions
#[derive(Parser, Debug)]
#[command(name = "feedsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug information)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Feed URL or local file path to filter
    #[arg(short, long)]
    pub feed: Option<String>,

    /// Filter expression (prompted for when omitted)
    #[arg(short, long)]
    pub expr: Option<String>,

    /// Write the filtered feed in this format instead of a summary
    #[arg(long)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP filtering proxy
    Serve {
        /// Port to listen on (default: from config, else 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Refine expressions interactively against one feed
    Console {
        /// Feed URL or local file path
        #[arg(short, long)]
        feed: String,
    },

    /// Show the variables, fields and functions expressions can use
    Schema,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_one_shot_filter_args() {
        let cli = Cli::parse_from([
            "feedsift",
            "--feed",
            "https://example.com/feed.xml",
            "--expr",
            "item.Title != \"\"",
            "--format",
            "rss",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.feed.as_deref(), Some("https://example.com/feed.xml"));
        assert_eq!(cli.expr.as_deref(), Some("item.Title != \"\""));
        assert_eq!(cli.format, Some(OutputFormat::Rss));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let result = Cli::try_parse_from(["feedsift", "--feed", "f.xml", "--format", "yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["feedsift", "--json", "--no-color", "-v", "schema"]);
        assert!(cli.json);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Schema)));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["feedsift", "-q", "-v", "schema"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_port() {
        let cli = Cli::parse_from(["feedsift", "serve", "--port", "9090"]);
        if let Some(Commands::Serve { port }) = cli.command {
            assert_eq!(port, Some(9090));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_console_requires_feed() {
        assert!(Cli::try_parse_from(["feedsift", "console"]).is_err());
        let cli = Cli::parse_from(["feedsift", "console", "--feed", "feed.xml"]);
        if let Some(Commands::Console { feed }) = cli.command {
            assert_eq!(feed, "feed.xml");
        } else {
            panic!("Expected Console command");
        }
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::parse_from(["feedsift", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: Some(ConfigCommands::Show)
            })
        ));
    }

    #[test]
    fn test_completions_shell() {
        let cli = Cli::parse_from(["feedsift", "completions", "zsh"]);
        if let Some(Commands::Completions { shell }) = cli.command {
            assert!(matches!(shell, Shell::Zsh));
        } else {
            panic!("Expected Completions command");
        }
    }
}
