//! Interactive session output formatting.

use feedsift::{HistoryEntry, Outcome, Session};
use feedsift_expr::Item;
use owo_colors::OwoColorize;

use super::helpers::{dim, error_text, format_timestamp, format_title, header, truncate_str};

/// Width at which expressions are cut in the history listing.
const EXPRESSION_WIDTH: usize = 60;

/// Formats the history list, marking the selected entry.
pub fn format_history(session: &Session, use_colors: bool) -> String {
    let mut output = String::new();
    output.push_str(&header("Expressions", use_colors));
    output.push('\n');

    for (index, entry) in session.history().iter().enumerate() {
        let marker = if index == session.selected_index() {
            ">"
        } else {
            " "
        };
        output.push_str(&format!(
            "{} {:>3}  {:<width$}  {}\n",
            marker,
            index,
            truncate_str(&entry.expression, EXPRESSION_WIDTH),
            format_status(entry, use_colors),
            width = EXPRESSION_WIDTH
        ));
    }

    output
}

/// Formats one entry's status, red for compile failures.
pub fn format_status(entry: &HistoryEntry, use_colors: bool) -> String {
    if entry.compiled() {
        dim(&format!("[{}]", entry.summary), use_colors)
    } else {
        error_text(&format!("[{}]", entry.summary), use_colors)
    }
}

/// Formats the summary line for the selected entry.
pub fn format_summary(entry: &HistoryEntry, use_colors: bool) -> String {
    match &entry.compile_error {
        Some(error) => format!(
            "{}\n{}\n",
            error_text("Compilation error:", use_colors),
            error
        ),
        None => format!("{}  {}\n", entry.expression, format_status(entry, use_colors)),
    }
}

/// Formats the detail view: the matching items, with evaluation errors
/// reported inline in item order.
pub fn format_detail(
    entry: &HistoryEntry,
    outcomes: Option<&[(&Item, Outcome)]>,
    feed_link: Option<&str>,
    use_colors: bool,
) -> String {
    let Some(outcomes) = outcomes else {
        return format_summary(entry, use_colors);
    };

    let matches = outcomes
        .iter()
        .filter(|(_, outcome)| *outcome == Outcome::Included)
        .count();

    let mut output = String::new();
    output.push_str(&header(
        &format!("Matches: {}  |  URL: {}", matches, feed_link.unwrap_or("")),
        use_colors,
    ));
    output.push_str("\n\n");

    for (item, outcome) in outcomes {
        match outcome {
            Outcome::Included => {
                let title = format_title(item.title());
                if use_colors {
                    output.push_str(&title.bold().to_string());
                } else {
                    output.push_str(&title);
                }
                output.push('\n');
                if let Some(author) = item.author() {
                    output.push_str(&format!("By {}\n", author));
                }
                if let Some(published) = item.published() {
                    output.push_str(&dim(&format_timestamp(published), use_colors));
                    output.push('\n');
                }
                output.push_str(item.url());
                output.push('\n');
                if let Some(tags) = item.tags() {
                    output.push_str(&format!("Tags: {}\n", tags.join(", ")));
                }
                output.push_str(&dim("---", use_colors));
                output.push('\n');
            }
            Outcome::Excluded => {}
            Outcome::Failed(error) => {
                output.push_str(&error_text(
                    &format!(
                        "Evaluation error on item '{}': {}",
                        format_title(item.title()),
                        error.fault
                    ),
                    use_colors,
                ));
                output.push('\n');
            }
        }
    }

    output
}

/// Formats the compiled history entries for printing on exit.
pub fn format_exit_history(session: &Session) -> String {
    session
        .history()
        .iter()
        .filter(|entry| entry.compiled())
        .map(|entry| format!("{}\n\t[{}]\n", entry.expression, entry.summary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use feedsift_expr::Environment;
    use std::sync::Arc;

    fn session() -> Session {
        let items = vec![
            Item::builder("https://example.com/go")
                .title("Go is great")
                .tags(["go"])
                .build(),
            Item::builder("https://example.com/rust")
                .title("Rust is safe")
                .author("Ferris")
                .tags(["rust", "systems"])
                .build(),
        ];
        Session::new(Arc::new(Environment::new().unwrap()), items)
    }

    #[test]
    fn test_history_marks_selection() {
        let mut session = session();
        session.submit("false");
        let output = format_history(&session, false);

        assert!(output.contains("    0  true"));
        assert!(output.contains(">   1  false"));
        assert!(output.contains("[0 matches]"));
    }

    #[test]
    fn test_detail_lists_matching_items() {
        let mut session = session();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        session.submit_at(r#"item.Author == "Ferris""#, now);
        let outcomes = session.detail(now);
        let entry = session.selected().unwrap();

        let output = format_detail(
            entry,
            outcomes.as_deref(),
            Some("https://example.com"),
            false,
        );

        assert!(output.starts_with("Matches: 1  |  URL: https://example.com"));
        assert!(output.contains("Rust is safe\nBy Ferris\nhttps://example.com/rust\nTags: rust, systems\n"));
        assert!(output.contains("Evaluation error on item 'Go is great': no such key: Author"));
    }

    #[test]
    fn test_detail_of_compile_error() {
        let mut session = session();
        session.submit("item.Nope");
        let entry = session.selected().unwrap();

        let output = format_detail(entry, None, None, false);

        assert!(output.starts_with("Compilation error:"));
    }

    #[test]
    fn test_exit_history_skips_failed_compiles() {
        let mut session = session();
        session.submit("(");
        session.submit(r#"item.Title.contains("Rust")"#);

        let output = format_exit_history(&session);

        assert_eq!(
            output,
            "true\n\t[2 matches]\nitem.Title.contains(\"Rust\")\n\t[1 matches]\n"
        );
    }
}
