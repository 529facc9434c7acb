use clap::{CommandFactory, Parser};
use std::process::ExitCode;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, ConfigCommands};
use commands::filter::FilterOptions;
use commands::{CommandContext, CommandError};
use feedsift::config::load_config;
use feedsift::PipelineError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    feedsift::logging::init(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                    }
                });
                match serde_json::to_string_pretty(&error_json) {
                    Ok(json) => eprintln!("{json}"),
                    Err(_) => eprintln!("Error: {e}"),
                }
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

async fn run(cli: &Cli) -> commands::Result<()> {
    let config = load_config()?;
    let ctx = CommandContext::from_cli(cli, config);

    match &cli.command {
        Some(Commands::Serve { port }) => commands::serve::execute(&ctx, *port).await,
        Some(Commands::Console { feed }) => commands::console::execute(&ctx, feed).await,
        Some(Commands::Schema) => commands::schema::execute(&ctx),
        Some(Commands::Config { command }) => match command {
            Some(ConfigCommands::Show) | None => commands::config::execute_show(&ctx),
            Some(ConfigCommands::Path) => commands::config::execute_path(&ctx),
        },
        Some(Commands::Completions { shell }) => {
            commands::completions::execute(shell).map_err(CommandError::Io)
        }
        None => match &cli.feed {
            Some(feed) => {
                let opts = FilterOptions {
                    feed: feed.clone(),
                    expression: cli.expr.clone(),
                    format: cli.format,
                };
                commands::filter::execute(&ctx, &opts).await
            }
            None => {
                if !ctx.quiet {
                    Cli::command().print_help()?;
                }
                Ok(())
            }
        },
    }
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Fetch(_) | CommandError::Pipeline(PipelineError::Fetch(_)) => "FETCH_ERROR",
        CommandError::Compile(_) | CommandError::Pipeline(PipelineError::Compile(_)) => {
            "COMPILE_ERROR"
        }
        CommandError::Pipeline(PipelineError::Evaluation(_)) => "EVALUATION_ERROR",
        CommandError::Pipeline(PipelineError::Encoding(_)) => "ENCODING_ERROR",
        CommandError::Environment(_) => "ENVIRONMENT_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Usage(_) => "USAGE_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Fetch(_) | CommandError::Pipeline(PipelineError::Fetch(_)) => {
            ExitCode::from(3)
        }
        CommandError::Compile(_)
        | CommandError::Usage(_)
        | CommandError::Json(_)
        | CommandError::Pipeline(_) => ExitCode::from(1),
        CommandError::Io(_) => ExitCode::from(3),
        CommandError::Environment(_) | CommandError::Config(_) => ExitCode::from(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsift_expr::CompileError;
    use feedsift_feed::FetchError;

    #[test]
    fn test_error_codes() {
        let fetch = CommandError::Fetch(FetchError::UnsupportedLocation {
            location: "ftp://x".to_string(),
        });
        let compile = CommandError::Compile(CompileError::EmptyExpression);
        let usage = CommandError::Usage("no".to_string());

        assert_eq!(error_code(&fetch), "FETCH_ERROR");
        assert_eq!(error_code(&compile), "COMPILE_ERROR");
        assert_eq!(error_code(&usage), "USAGE_ERROR");
    }
}
