//! Error types for pathisync-sync.

use std::path::PathBuf;

use thiserror::Error;

use pathisync_core::{ConfigError, EntityKind};

/// All fatal errors that can arise from a reconciliation run.
///
/// Per-entity push/delete rejections are not errors; they are reported as
/// [`crate::Outcome::Failed`] and the run continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local JSON file could not be parsed or serialized.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The remote listing was not a 200 JSON array.
    #[error(
        "the server request for {path} failed ({reason}); ensure you have an updated token in your .env file"
    )]
    RemoteFetch { path: String, reason: String },

    /// More than one local file claims the same logical key.
    #[error("duplicate filenames found for '{key}':\n{}", format_paths(.paths))]
    DuplicateName { key: String, paths: Vec<PathBuf> },

    /// A resource file lives outside any collection directory.
    #[error(
        "{path} is not inside a collection; ensure all resource files are in a collection folder with an associated _collection.json file"
    )]
    MissingCollectionOwner { path: PathBuf },

    /// A changed path does not belong to any topic directory.
    #[error("{path} is not inside a flows, sharedConfigs, triggers or resources folder")]
    OutsideTopic { path: PathBuf },

    /// A remote member carried content that is not valid base64.
    #[error("resource {key} has invalid base64 content: {source}")]
    InvalidContent {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A member accessor path that would resolve outside its collection.
    #[error("resource accessor path '{path}' must stay inside its collection folder")]
    UnsafeAccessorPath { path: String },

    /// The flat reconciler was asked to handle a nested kind.
    #[error("{0} entities cannot be reconciled as flat files")]
    UnsupportedKind(EntityKind),

    /// The interactive prompt failed (closed terminal, interrupted input).
    #[error("prompt failed: {0}")]
    Prompt(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Json`].
pub(crate) fn json_err(path: impl Into<PathBuf>, source: serde_json::Error) -> SyncError {
    SyncError::Json {
        path: path.into(),
        source,
    }
}
