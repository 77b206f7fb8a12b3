//! Error types for pathisync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the `.env` file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `.env` line that is neither a comment nor `KEY=VALUE`.
    #[error("malformed line {line} in {path}: expected KEY=VALUE")]
    Malformed { path: PathBuf, line: usize },

    /// No bearer token was supplied.
    #[error("no server token configured; set PATHIFY_TOKEN in your .env file")]
    MissingToken,

    /// No server URL was supplied.
    #[error("no server URL configured; set FLOW_SERVER_URL in your .env file")]
    MissingServerUrl,

    /// The server URL is not a well-formed absolute http(s) URL.
    #[error("FLOW_SERVER_URL '{url}' is not a valid absolute URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
