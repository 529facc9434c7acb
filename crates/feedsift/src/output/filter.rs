//! One-shot filter output formatting.

use feedsift::Outcome;
use feedsift_expr::Item;
use serde::Serialize;

use super::helpers::{dim, format_title};

/// JSON output structure for the one-shot filter.
#[derive(Serialize)]
pub struct FilterOutput<'a> {
    pub total: usize,
    pub included: Vec<FilterItemOutput<'a>>,
    pub excluded: Vec<FilterItemOutput<'a>>,
    pub errors: Vec<FilterErrorOutput>,
}

/// JSON output structure for one item.
#[derive(Serialize)]
pub struct FilterItemOutput<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

/// JSON output structure for an evaluation fault.
#[derive(Serialize)]
pub struct FilterErrorOutput {
    pub item: String,
    pub message: String,
}

/// Formats filter outcomes as JSON.
pub fn format_filter_json(outcomes: &[(&Item, Outcome)]) -> Result<String, serde_json::Error> {
    let mut output = FilterOutput {
        total: outcomes.len(),
        included: Vec::new(),
        excluded: Vec::new(),
        errors: Vec::new(),
    };

    for (item, outcome) in outcomes {
        let entry = FilterItemOutput {
            url: item.url(),
            title: item.title(),
        };
        match outcome {
            Outcome::Included => output.included.push(entry),
            Outcome::Excluded => output.excluded.push(entry),
            Outcome::Failed(error) => {
                output.excluded.push(entry);
                output.errors.push(FilterErrorOutput {
                    item: error.item.clone(),
                    message: error.fault.to_string(),
                });
            }
        }
    }

    serde_json::to_string_pretty(&output)
}

/// Formats filter outcomes as one line per item followed by a count.
///
/// Items that failed to evaluate are left out of the listing; they are
/// reported through logging instead.
pub fn format_filter_lines(outcomes: &[(&Item, Outcome)], use_colors: bool) -> String {
    let mut output = String::new();
    let mut included = 0;

    for (item, outcome) in outcomes {
        let title = format_title(item.title());
        match outcome {
            Outcome::Included => {
                included += 1;
                output.push_str(&format!("Included {}\n", title));
            }
            Outcome::Excluded => {
                output.push_str(&dim(&format!("Excluded {}", title), use_colors));
                output.push('\n');
            }
            Outcome::Failed(_) => {}
        }
    }

    output.push_str(&format!(
        "\nFiltered {} → {} items\n",
        outcomes.len(),
        included
    ));
    output
}
