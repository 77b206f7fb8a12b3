//! Pathisync core library: entity kinds, automation flags, configuration.
//!
//! Public API surface:
//! - [`kind`]: the closed set of synchronizable entity kinds
//! - [`types`]: [`SyncFlags`] and the [`Action`] vocabulary
//! - [`config`]: `.env` / environment loading and base-URL validation
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod kind;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use kind::{EntityKind, COLLECTION_DESCRIPTOR, TMP_SUFFIX};
pub use types::{Action, SyncFlags};
