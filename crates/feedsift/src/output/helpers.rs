//! Common helper functions for output formatting.

use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize;

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Formats a timestamp in local time for display.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Formats an item title, substituting a placeholder when it is missing.
pub fn format_title(title: Option<&str>) -> String {
    match title {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => "(untitled)".to_string(),
    }
}

/// Formats a section header.
pub fn header(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.green().bold().to_string()
    } else {
        text.to_string()
    }
}

/// Dims text when colors are enabled.
pub fn dim(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Colors error text red when colors are enabled.
pub fn error_text(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.red().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a longer title", 8), "a lon...");
        assert_eq!(truncate_str("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_format_title() {
        assert_eq!(format_title(Some("Rust")), "Rust");
        assert_eq!(format_title(Some("  ")), "(untitled)");
        assert_eq!(format_title(None), "(untitled)");
    }

    #[test]
    fn test_plain_styles_without_colors() {
        assert_eq!(header("Schema", false), "Schema");
        assert_eq!(dim("x", false), "x");
        assert_eq!(error_text("bad", false), "bad");
    }
}
