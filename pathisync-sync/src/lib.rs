//! Pathisync reconciliation engine.
//!
//! Public API surface:
//! - [`transport`] / [`remote`]: authenticated HTTP and the [`Remote`] seam
//! - [`store`]: local files under the topic directories
//! - [`diff`]: structural equality after stripping volatile fields
//! - [`policy`]: pure resolution policy
//! - [`flat`] / [`collection`]: the two reconcilers
//! - [`pipeline`]: full runs, single changed paths and watch batches
//! - `testing` (feature `testing`): in-memory remote and scripted operator

pub mod collection;
pub mod diff;
pub mod error;
pub mod flat;
pub mod model;
pub mod outcome;
pub mod pipeline;
pub mod policy;
pub mod prompt;
pub mod remote;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use error::SyncError;
pub use outcome::{EntityOutcome, Outcome, ReconcileReport};
pub use prompt::Interaction;
pub use remote::{HttpRemote, Remote};
pub use session::Session;
pub use transport::Transport;
