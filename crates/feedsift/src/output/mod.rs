//! Output formatting utilities for the feedsift CLI.
//!
//! - [`filter`] - One-shot filter results (lines or JSON)
//! - [`schema`] - Declared variables, fields and functions
//! - [`session`] - Interactive session views
//! - [`helpers`] - Common formatting utilities

mod filter;
pub mod helpers;
mod schema;
mod session;

pub use filter::{format_filter_json, format_filter_lines};
pub use schema::{format_schema_json, format_schema_table};
pub use session::{format_detail, format_exit_history, format_history, format_summary};
