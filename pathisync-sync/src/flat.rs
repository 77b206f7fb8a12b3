//! Reconciler for kinds stored as one `<key>.json` file per entity.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use pathisync_core::{Action, EntityKind};

use crate::diff;
use crate::error::SyncError;
use crate::outcome::{Outcome, ReconcileReport};
use crate::policy::{self, Presence, Resolution};
use crate::prompt;
use crate::session::Session;
use crate::store;

/// Reconcile every `kind` entity, or only the one stored at `target` when a
/// watch event names a file.
///
/// Local files are indexed before the remote is contacted, so duplicate names
/// abort the run without any network traffic.
pub fn reconcile_flat(
    session: &mut Session<'_>,
    kind: EntityKind,
    target: Option<&Path>,
) -> Result<ReconcileReport, SyncError> {
    if !kind.is_flat() {
        return Err(SyncError::UnsupportedKind(kind));
    }
    let topic = session.topic_root(kind);
    let mut local = store::index_by_stem(&store::list_files(&topic)?)?;
    let target_key = target.and_then(target_key);

    let mut remote = session.remote.fetch_all(kind.url_path())?;
    if let Some(key) = &target_key {
        remote.retain(|entity| kind.key_of(entity).as_deref() == Some(key.as_str()));
        local.retain(|stem, _| stem == key);
    }

    let mut report = ReconcileReport::new(kind);
    for mut entity in remote {
        let Some(key) = kind.key_of(&entity) else {
            warn!("skipping remote {kind} without a key");
            continue;
        };
        kind.strip_volatile(&mut entity);
        let outcome = match local.remove(&key) {
            Some(path) => reconcile_both(session, kind, &key, entity, &path)?,
            None => reconcile_remote_only(session, kind, &key, entity, &topic)?,
        };
        if let Some(outcome) = outcome {
            report.record(key, outcome);
        }
    }

    for (key, path) in local {
        if let Some(outcome) = reconcile_local_only(session, kind, &key, &path)? {
            report.record(key, outcome);
        }
    }
    Ok(report)
}

fn target_key(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
}

fn reconcile_both(
    session: &mut Session<'_>,
    kind: EntityKind,
    key: &str,
    remote: Value,
    path: &Path,
) -> Result<Option<Outcome>, SyncError> {
    let local = store::read_json(path)?;
    let equivalent = diff::is_equivalent(kind, &remote, &local);
    if equivalent {
        debug!("{kind} {key} unchanged");
        return Ok(Some(Outcome::Unchanged));
    }
    let resolution = policy::resolve(Presence::Both { equivalent }, session.flags);

    session.notice(&format!(
        "There is a difference with the {kind} {key}\nlocated at {}",
        path.display()
    ));
    if matches!(resolution, Resolution::Ask(_)) {
        let local_view = diff::normalized(kind, &local);
        session.notice(&diff::unified_diff(&remote, &local_view, key));
    }

    let Some(action) = prompt::settle(session.ui, resolution, kind.label())? else {
        return Ok(None);
    };
    match action {
        Action::OverwriteLocal => {
            store::write_json(&remote, path)?;
            Ok(Some(Outcome::Applied(action)))
        }
        Action::PushLocalToRemote => Ok(Some(push(session, kind, key, &local)?)),
        other => Ok(Some(Outcome::chosen(other))),
    }
}

fn reconcile_remote_only(
    session: &mut Session<'_>,
    kind: EntityKind,
    key: &str,
    remote: Value,
    topic: &Path,
) -> Result<Option<Outcome>, SyncError> {
    session.notice(&format!("The {kind} {key} does not exist locally"));
    let resolution = policy::resolve(Presence::RemoteOnly, session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, kind.label())? else {
        return Ok(None);
    };
    match action {
        Action::CreateLocal => {
            let folder = prompt::choose_folder(session.ui, topic, false, session.flags)?;
            store::write_json(&remote, &folder.join(format!("{key}.json")))?;
            Ok(Some(Outcome::Applied(action)))
        }
        Action::DeleteRemote => {
            let status = session
                .remote
                .delete(&format!("{}/{key}", kind.url_path()))?;
            Ok(Some(report_write(kind, key, action, status)))
        }
        other => Ok(Some(Outcome::chosen(other))),
    }
}

fn reconcile_local_only(
    session: &mut Session<'_>,
    kind: EntityKind,
    key: &str,
    path: &Path,
) -> Result<Option<Outcome>, SyncError> {
    let resolution = policy::resolve(Presence::LocalOnly, session.flags);
    if resolution == Resolution::Suppressed {
        return Ok(None);
    }
    session.notice(&format!(
        "The remote prod doesn't have the {kind} {key}\nlocated at {}",
        path.display()
    ));
    let Some(action) = prompt::settle(session.ui, resolution, kind.label())? else {
        return Ok(None);
    };
    match action {
        Action::PushLocalToRemote => {
            let local = store::read_json(path)?;
            Ok(Some(push(session, kind, key, &local)?))
        }
        Action::DeleteLocal => {
            store::remove_file(path)?;
            info!("deleted {}", path.display());
            Ok(Some(Outcome::Applied(action)))
        }
        other => Ok(Some(Outcome::chosen(other))),
    }
}

fn push(
    session: &mut Session<'_>,
    kind: EntityKind,
    key: &str,
    local: &Value,
) -> Result<Outcome, SyncError> {
    let status = session.remote.push(kind.url_path(), local)?;
    Ok(report_write(kind, key, Action::PushLocalToRemote, status))
}

fn report_write(kind: EntityKind, key: &str, action: Action, status: u16) -> Outcome {
    let outcome = Outcome::from_status(action, status);
    if outcome.is_failure() {
        warn!("{action} of {kind} {key} rejected with HTTP {status}");
    } else {
        info!("{action} of {kind} {key} succeeded");
    }
    outcome
}
