//! One-shot filter command.
//!
//! Fetches a feed from a URL or local path, evaluates one expression against
//! every item, and prints either a per-item summary or the filtered feed.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use chrono::Utc;
use dialoguer::Input;
use feedsift::pipeline::{Outcome, Pipeline, PipelineError};
use feedsift_expr::Environment;
use feedsift_feed::{adapt_all, render, LocalOrHttpSource, OutputFormat, RawEntry};
use owo_colors::OwoColorize;
use tracing::debug;

use super::{CommandContext, CommandError, Result};
use crate::output;

/// Options for the one-shot filter.
#[derive(Debug)]
pub struct FilterOptions {
    pub feed: String,
    pub expression: Option<String>,
    pub format: Option<OutputFormat>,
}

/// Builds a pipeline that reads local files or HTTP within the configured timeout.
pub fn local_pipeline(ctx: &CommandContext, env: Arc<Environment>) -> Pipeline {
    let timeout = ctx.config.fetch.timeout();
    Pipeline::new(env, Arc::new(LocalOrHttpSource::new(timeout))).with_deadline(timeout)
}

/// Executes the one-shot filter.
pub async fn execute(ctx: &CommandContext, opts: &FilterOptions) -> Result<()> {
    let env = Arc::new(Environment::new()?);
    run(ctx, &local_pipeline(ctx, env), opts).await
}

/// Runs the one-shot filter through `pipeline`, whose error handler decides
/// what happens to items that fail to evaluate.
async fn run(ctx: &CommandContext, pipeline: &Pipeline, opts: &FilterOptions) -> Result<()> {
    let feed = pipeline.fetch(&opts.feed).await?;
    debug!(entries = feed.entries.len(), "fetched feed");

    let expression = match &opts.expression {
        Some(expression) => expression.clone(),
        None => {
            let expression = prompt_expression(pipeline)?;
            if !ctx.quiet && !ctx.json_output {
                if ctx.use_colors {
                    println!("{}\n", expression.yellow());
                } else {
                    println!("{}\n", expression);
                }
            }
            expression
        }
    };
    let program = pipeline.compile(Some(&expression))?;

    let now = Utc::now();
    let items = adapt_all(&feed.entries);
    let outcomes = pipeline
        .outcomes(&program, &items, now)
        .map_err(PipelineError::Evaluation)?;

    if let Some(format) = opts.format {
        let included: Vec<RawEntry> = feed
            .entries
            .iter()
            .zip(&outcomes)
            .filter(|(_, (_, outcome))| *outcome == Outcome::Included)
            .map(|(entry, _)| entry.clone())
            .collect();
        let body = render(&feed.meta, &included, format, now)
            .map_err(|e| CommandError::Pipeline(e.into()))?;
        println!("{}", body);
    } else if ctx.json_output {
        println!("{}", output::format_filter_json(&outcomes)?);
    } else if !ctx.quiet {
        print!("{}", output::format_filter_lines(&outcomes, ctx.use_colors));
    }

    Ok(())
}

/// Prompts for an expression, re-asking until it is non-empty and compiles.
fn prompt_expression(pipeline: &Pipeline) -> Result<String> {
    if !io::stdin().is_terminal() {
        return Err(CommandError::Usage(
            "no expression given. Pass --expr or run interactively.".to_string(),
        ));
    }

    let expression: String = Input::new()
        .with_prompt("Filter expression (e.g. item.Title.contains('Go'))")
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if input.trim().is_empty() {
                return Err("expression cannot be empty".to_string());
            }
            pipeline
                .environment()
                .compile(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(|e| CommandError::Io(io::Error::other(e.to_string())))?;

    Ok(expression.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsift::config::Config;
    use feedsift::pipeline::AbortOnError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Langs</title><link>https://langs.example.com</link>
<description>d</description>
<item><title>Go is great</title><link>https://langs.example.com/go</link></item>
<item><title>Rust is safe</title><link>https://langs.example.com/rust</link></item>
</channel></rss>"#;

    fn ctx() -> CommandContext {
        CommandContext {
            json_output: false,
            use_colors: false,
            quiet: true,
            verbose: false,
            config: Config::default(),
        }
    }

    fn feed_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FEED.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_filter_local_file() {
        let file = feed_file();
        let opts = FilterOptions {
            feed: file.path().display().to_string(),
            expression: Some(r#"item.Title.contains("Rust")"#.to_string()),
            format: None,
        };

        execute(&ctx(), &opts).await.unwrap();
    }

    #[tokio::test]
    async fn test_filter_invalid_expression() {
        let file = feed_file();
        let opts = FilterOptions {
            feed: file.path().display().to_string(),
            expression: Some("item.Title +".to_string()),
            format: None,
        };

        let err = execute(&ctx(), &opts).await.unwrap_err();
        assert!(matches!(err, CommandError::Compile(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_filter_abort_handler_fails_command() {
        let file = feed_file();
        let ctx = ctx();
        let env = Arc::new(Environment::new().unwrap());
        let pipeline = local_pipeline(&ctx, env).with_error_handler(Arc::new(AbortOnError));
        let opts = FilterOptions {
            feed: file.path().display().to_string(),
            expression: Some(r#"item.Author == "Rob""#.to_string()),
            format: None,
        };

        let err = run(&ctx, &pipeline, &opts).await.unwrap_err();
        assert!(
            matches!(err, CommandError::Pipeline(PipelineError::Evaluation(_))),
            "{:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_filter_default_handler_excludes_faults() {
        let file = feed_file();
        let opts = FilterOptions {
            feed: file.path().display().to_string(),
            expression: Some(r#"item.Author == "Rob""#.to_string()),
            format: None,
        };

        execute(&ctx(), &opts).await.unwrap();
    }

    #[tokio::test]
    async fn test_filter_missing_file() {
        let opts = FilterOptions {
            feed: "/nonexistent/feedsift/feed.xml".to_string(),
            expression: Some("true".to_string()),
            format: None,
        };

        let err = execute(&ctx(), &opts).await.unwrap_err();
        assert!(matches!(err, CommandError::Fetch(_)), "{:?}", err);
    }
}
