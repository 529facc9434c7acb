//! Interactive console command.
//!
//! Fetches one feed, then reads expressions and `:` commands until `:quit`
//! or end of input. On exit, prints every expression that compiled along
//! with its match count.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use chrono::Utc;
use dialoguer::Input;
use feedsift::{Command, Session, View};
use feedsift_expr::Environment;
use feedsift_feed::adapt_all;

use super::filter::local_pipeline;
use super::{CommandContext, CommandError, Result};
use crate::output;

const HELP: &str =
    "Type an expression to evaluate it. Commands: :detail, :schema, :select N, :history, :quit";

/// Executes the console command.
pub async fn execute(ctx: &CommandContext, feed_location: &str) -> Result<()> {
    if !io::stdin().is_terminal() {
        return Err(CommandError::Usage(
            "the console needs an interactive terminal".to_string(),
        ));
    }

    let env = Arc::new(Environment::new()?);
    let pipeline = local_pipeline(ctx, Arc::clone(&env));
    let feed = pipeline.fetch(feed_location).await?;
    let items = adapt_all(&feed.entries);
    let feed_link = feed.meta.link.clone();

    let mut session = Session::with_error_handler(env, items, pipeline.error_handler());
    println!("Loaded {} items from {}", session.items().len(), feed_location);
    println!("{}\n", HELP);
    print!("{}", output::format_history(&session, ctx.use_colors));

    loop {
        let line: String = Input::new()
            .with_prompt("expr")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| CommandError::Io(io::Error::other(e.to_string())))?;

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Nothing => continue,
            Command::Submit(expression) => {
                let entry = session.submit(&expression);
                print!("{}", output::format_summary(entry, ctx.use_colors));
            }
            Command::Select(index) => {
                if !session.select(index) {
                    eprintln!("no history entry {}", index);
                    continue;
                }
                render_view(&session, feed_link.as_deref(), ctx.use_colors);
            }
            Command::ToggleDetail => {
                session.toggle_detail();
                render_view(&session, feed_link.as_deref(), ctx.use_colors);
            }
            Command::ToggleSchema => {
                session.toggle_schema();
                render_view(&session, feed_link.as_deref(), ctx.use_colors);
            }
            Command::History => {
                print!("{}", output::format_history(&session, ctx.use_colors));
            }
        }
    }

    print!("{}", output::format_exit_history(&session));
    Ok(())
}

fn render_view(session: &Session, feed_link: Option<&str>, use_colors: bool) {
    let Some(entry) = session.selected() else {
        return;
    };
    match session.view() {
        View::Summary => print!("{}", output::format_summary(entry, use_colors)),
        View::Detail => {
            let outcomes = session.detail(Utc::now());
            print!(
                "{}",
                output::format_detail(entry, outcomes.as_deref(), feed_link, use_colors)
            );
        }
        View::Schema => print!(
            "{}",
            output::format_schema_table(session.environment(), use_colors)
        ),
    }
}
