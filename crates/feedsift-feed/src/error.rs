//! Error types for fetching and rendering feeds.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::render::OutputFormat;

/// Errors that can occur while fetching or parsing a feed.
///
/// A fetch failure is terminal for the request that triggered it; nothing
/// retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch did not complete before its deadline.
    #[error("timed out after {}s fetching '{location}'", .timeout.as_secs_f64())]
    Timeout { location: String, timeout: Duration },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("network error fetching '{location}': {message}")]
    Network { location: String, message: String },

    /// The server answered with a non-success status.
    #[error("'{location}' returned HTTP {status}")]
    Status { location: String, status: u16 },

    /// A local feed file could not be read.
    #[error("failed to read '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    /// The body was fetched but is not a feed.
    #[error("failed to parse feed from '{location}': {message}")]
    Parse { location: String, message: String },

    /// The location is not something this source can fetch.
    #[error("unsupported feed location '{location}': expected an http(s) URL")]
    UnsupportedLocation { location: String },
}

impl FetchError {
    /// The URL or path the failed fetch was for.
    pub fn location(&self) -> &str {
        match self {
            FetchError::Timeout { location, .. }
            | FetchError::Network { location, .. }
            | FetchError::Status { location, .. }
            | FetchError::Io { location, .. }
            | FetchError::Parse { location, .. }
            | FetchError::UnsupportedLocation { location } => location,
        }
    }

    /// Returns true if the failure happened before any feed body arrived.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout { .. } | FetchError::Network { .. } | FetchError::Io { .. }
        )
    }

    /// Returns the appropriate CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        3
    }
}

/// Output serialization failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to encode {format} output: {message}")]
pub struct EncodingError {
    pub format: OutputFormat,
    pub message: String,
}

impl EncodingError {
    pub(crate) fn new(format: OutputFormat, error: impl fmt::Display) -> Self {
        Self {
            format,
            message: error.to_string(),
        }
    }
}
