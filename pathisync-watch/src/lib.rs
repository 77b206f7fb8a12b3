//! Filesystem-watch driver.
//!
//! Public API surface:
//! - [`runtime`]: notify watcher loop and the [`BatchHandler`] hand-off
//! - [`debounce`]: the accumulate-then-flush [`Debouncer`]
//! - [`paths`]: watched directories and path classification
//! - [`error`]: [`WatchError`]

pub mod debounce;
pub mod error;
pub mod paths;
pub mod runtime;

pub use debounce::Debouncer;
pub use error::WatchError;
pub use runtime::{run, start_blocking, BatchHandler};
