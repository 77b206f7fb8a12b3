//! Resolution policy: a pure function from a classified difference and the
//! automation flags to either an action or the set of choices to offer.
//!
//! Nothing here performs I/O; [`crate::prompt::settle`] turns an
//! [`Resolution::Ask`] into an action through the interaction seam.

use pathisync_core::{Action, SyncFlags};

/// Which sides hold the entity, and whether the two agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Both { equivalent: bool },
    RemoteOnly,
    LocalOnly,
}

/// Outcome of consulting the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Both sides agree.
    NoAction,
    /// The case is not considered at all in this mode.
    Suppressed,
    /// Automation picked the action.
    Auto(Action),
    /// A human must pick one of these, in this order.
    Ask(Vec<Action>),
}

/// Decide how to resolve one entity.
///
/// Deletes are only ever offered, never auto-selected.
pub fn resolve(presence: Presence, flags: SyncFlags) -> Resolution {
    match presence {
        Presence::Both { equivalent: true } => Resolution::NoAction,
        Presence::Both { equivalent: false } => {
            if flags.force_local {
                Resolution::Auto(Action::OverwriteLocal)
            } else if flags.watch {
                Resolution::Auto(Action::PushLocalToRemote)
            } else {
                Resolution::Ask(vec![
                    Action::Nothing,
                    Action::OverwriteLocal,
                    Action::PushLocalToRemote,
                ])
            }
        }
        Presence::RemoteOnly => {
            if flags.force_local || flags.watch {
                Resolution::Auto(Action::CreateLocal)
            } else {
                Resolution::Ask(with_delete(
                    vec![Action::Nothing, Action::CreateLocal],
                    Action::DeleteRemote,
                    flags,
                ))
            }
        }
        Presence::LocalOnly => {
            if flags.watch {
                Resolution::Suppressed
            } else if flags.force_local {
                Resolution::Auto(Action::Nothing)
            } else {
                Resolution::Ask(with_delete(
                    vec![Action::Nothing, Action::PushLocalToRemote],
                    Action::DeleteLocal,
                    flags,
                ))
            }
        }
    }
}

/// A member listed in the local descriptor whose file is missing.
pub fn resolve_content_orphan(flags: SyncFlags) -> Resolution {
    if flags.force_local {
        Resolution::Auto(Action::SaveRemoteContent)
    } else if flags.watch {
        Resolution::Suppressed
    } else {
        Resolution::Ask(with_delete(
            vec![Action::DropListing, Action::SaveRemoteContent],
            Action::DeleteRemote,
            flags,
        ))
    }
}

fn with_delete(mut choices: Vec<Action>, delete: Action, flags: SyncFlags) -> Vec<Action> {
    if flags.allow_delete {
        choices.push(delete);
    }
    choices
}
