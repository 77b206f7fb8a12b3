use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the filesystem-watch driver.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("nothing to watch under {root}: no topic directory exists (run `pathisync init` first)")]
    NothingToWatch { root: PathBuf },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("watch task failed: {0}")]
    Task(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatchError {
    WatchError::Io {
        path: path.into(),
        source,
    }
}
