//! Feed collaborators for feedsift.
//!
//! This crate sits on both sides of the filter:
//!
//! - [`FeedSource`] fetches and parses a feed (RSS, Atom or JSON Feed) into a
//!   dialect-neutral [`RawFeed`].
//! - [`to_item`] adapts each [`RawEntry`] into the canonical
//!   [`feedsift_expr::Item`] that expressions are evaluated against.
//! - [`render`] re-serializes the surviving entries as JSON Feed, RSS or Atom.
//!
//! # Example
//!
//! ```
//! use feedsift_feed::{adapt_all, parse_feed};
//!
//! let xml = br#"<?xml version="1.0"?>
//! <rss version="2.0"><channel>
//!   <title>Example</title>
//!   <link>https://example.com</link>
//!   <description>An example feed</description>
//!   <item><title>Learning Go</title><link>https://example.com/go</link></item>
//! </channel></rss>"#;
//!
//! let feed = parse_feed(xml, "example.xml").unwrap();
//! let items = adapt_all(&feed.entries);
//! assert_eq!(items[0].title(), Some("Learning Go"));
//! ```

mod adapter;
mod error;
mod model;
mod parse;
mod render;
mod source;

pub use adapter::{adapt_all, to_item};
pub use error::{EncodingError, FetchError};
pub use model::{FeedMeta, RawEntry, RawFeed, RawPerson};
pub use parse::parse_feed;
pub use render::{render, OutputFormat};
pub use source::{
    fetch_within, is_http_location, FeedSource, FileFeedSource, HttpFeedSource, LocalOrHttpSource,
    DEFAULT_TIMEOUT,
};
