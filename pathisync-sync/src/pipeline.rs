//! Entry points: full runs, one kind, one changed path, or a watch batch.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use pathisync_core::EntityKind;

use crate::collection::reconcile_collections;
use crate::error::SyncError;
use crate::flat::reconcile_flat;
use crate::outcome::ReconcileReport;
use crate::session::Session;

/// Reconcile `kinds` in order, stopping at the first fatal error.
pub fn run(
    session: &mut Session<'_>,
    kinds: &[EntityKind],
) -> Result<Vec<ReconcileReport>, SyncError> {
    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        reports.push(sync_kind(session, *kind, None)?);
    }
    Ok(reports)
}

/// Reconcile one kind, optionally restricted to the entity stored at `target`.
pub fn sync_kind(
    session: &mut Session<'_>,
    kind: EntityKind,
    target: Option<&Path>,
) -> Result<ReconcileReport, SyncError> {
    info!("syncing {}", kind.topic_dir());
    if kind.is_flat() {
        reconcile_flat(session, kind, target)
    } else {
        reconcile_collections(session, target)
    }
}

/// Reconcile the entity a changed file belongs to.
///
/// Relative paths are taken relative to the session root.
pub fn sync_path(session: &mut Session<'_>, path: &Path) -> Result<ReconcileReport, SyncError> {
    let path = absolute_under(session.root, path);
    let kind = EntityKind::from_path(session.root, &path)
        .filter(|_| path.starts_with(session.root))
        .ok_or_else(|| SyncError::OutsideTopic { path: path.clone() })?;
    sync_kind(session, kind, Some(&path))
}

/// Reconcile each changed path of a watch batch in order.
///
/// Every path is attempted; a fatal error for one does not stop the rest.
pub fn sync_batch(
    session: &mut Session<'_>,
    paths: &[PathBuf],
) -> Vec<(PathBuf, Result<ReconcileReport, SyncError>)> {
    paths
        .iter()
        .map(|path| {
            let result = sync_path(session, path);
            if let Err(err) = &result {
                warn!(path = %path.display(), error = %err, "sync of changed path failed");
            }
            (path.clone(), result)
        })
        .collect()
}

fn absolute_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRemote, ScriptedInteraction};
    use pathisync_core::SyncFlags;
    use tempfile::TempDir;

    #[test]
    fn path_outside_topics_is_rejected_before_fetching() {
        let tmp = TempDir::new().expect("root");
        let remote = MemoryRemote::new();
        let mut ui = ScriptedInteraction::new([]);
        let mut session = Session::new(tmp.path(), &remote, &mut ui, SyncFlags::default());

        let err = sync_path(&mut session, Path::new("notes/todo.json")).unwrap_err();
        assert!(matches!(err, SyncError::OutsideTopic { .. }));
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn batch_keeps_going_after_a_failed_path() {
        let tmp = TempDir::new().expect("root");
        let remote = MemoryRemote::new();
        let mut ui = ScriptedInteraction::new([]);
        let flags = SyncFlags::default().for_watch();
        let mut session = Session::new(tmp.path(), &remote, &mut ui, flags);

        let paths = vec![
            PathBuf::from("notes/todo.json"),
            PathBuf::from("flows/checkout.json"),
        ];
        let results = sync_batch(&mut session, &paths);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].1, Err(SyncError::OutsideTopic { .. })));
        let report = results[1].1.as_ref().expect("flow path reconciles");
        assert_eq!(report.kind, EntityKind::Flow);
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn full_run_visits_each_kind_once() {
        let tmp = TempDir::new().expect("root");
        let remote = MemoryRemote::new();
        let mut ui = ScriptedInteraction::new([]);
        let mut session = Session::new(tmp.path(), &remote, &mut ui, SyncFlags::default());

        let reports = run(&mut session, EntityKind::all()).unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.entities.is_empty()));
        assert_eq!(remote.calls().len(), 4);
    }
}
