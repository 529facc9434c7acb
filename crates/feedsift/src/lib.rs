//! feedsift: filter syndication feeds with typed expressions.
//!
//! This crate wires the expression engine ([`feedsift_expr`]) and the feed
//! collaborators ([`feedsift_feed`]) into:
//!
//! - [`pipeline`]: fetch, adapt, compile, partition and render one feed
//! - [`server`]: the HTTP filtering proxy
//! - [`session`]: interactive expression refinement over a fixed item set
//! - [`config`] and [`logging`]: ambient setup for the binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use feedsift::pipeline::{FilterRequest, Pipeline};
//! use feedsift_expr::Environment;
//! use feedsift_feed::{HttpFeedSource, OutputFormat};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Arc::new(Environment::new()?);
//! let pipeline = Pipeline::new(env, Arc::new(HttpFeedSource::default()));
//!
//! let request = FilterRequest::new("https://example.com/feed.xml")
//!     .expression(r#"item.Title.contains("Rust")"#)
//!     .format(OutputFormat::Rss);
//! let response = pipeline.run(&request).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod session;

pub use pipeline::{
    FilterRequest, FilterResponse, FilterResult, Outcome, Pipeline, PipelineError,
};
pub use server::{router, serve, ServerError};
pub use session::{Command, HistoryEntry, Session, View};
