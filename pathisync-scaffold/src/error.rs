//! Error types for pathisync-scaffold.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while initialising a project.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Initialising never reuses an existing directory.
    #[error("the folder {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("'{0}' is not a valid project name")]
    InvalidName(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ScaffoldError {
    ScaffoldError::Io {
        path: path.into(),
        source,
    }
}
