//! Reconciler for resource collections.
//!
//! A collection is reconciled in three tiers:
//!
//! 1. the descriptor itself (collection fields and member order),
//! 2. every remote member, paired with its local listing and file,
//! 3. local listings the remote does not know.
//!
//! Each member decision is a [`MemberDecision`] folded into an
//! [`Accumulator`] holding the next local descriptor and the next remote
//! collection. The descriptor is only written when a decision changed it, and
//! the collection is only pushed when the result differs from what the server
//! already has.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use pathisync_core::{Action, EntityKind, COLLECTION_DESCRIPTOR};

use crate::diff;
use crate::error::{json_err, SyncError};
use crate::model::{self, encode_bytes, CollectionDoc, MemberResource};
use crate::outcome::{Outcome, ReconcileReport};
use crate::policy::{self, Presence, Resolution};
use crate::prompt;
use crate::session::Session;
use crate::store::{self, FileMatcher};

const KIND: EntityKind = EntityKind::Collection;
const MEMBER_SUBJECT: &str = "resource";

/// What part of a collection a run may act on.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Full,
    /// A watch event on `_collection.json`.
    Descriptor,
    /// A watch event on one member file.
    Member(PathBuf),
}

impl Scope {
    fn for_target(target: Option<&Path>) -> Self {
        match target {
            None => Scope::Full,
            Some(path) if store::is_collection_descriptor(path) => Scope::Descriptor,
            Some(path) => Scope::Member(path.to_path_buf()),
        }
    }

    fn covers(&self, file: Option<&Path>) -> bool {
        match self {
            Scope::Full => true,
            Scope::Descriptor => false,
            Scope::Member(target) => file == Some(target.as_path()),
        }
    }
}

/// Reconcile every collection, or only the one owning `target`.
pub fn reconcile_collections(
    session: &mut Session<'_>,
    target: Option<&Path>,
) -> Result<ReconcileReport, SyncError> {
    let topic = session.topic_root(KIND);
    let files = store::list_files(&topic)?;
    let mut descriptors = store::index_collections(&files)?;
    let focus = target
        .map(|path| store::find_collection_owner(path, &topic).map(|(id, _)| id))
        .transpose()?;
    let scope = Scope::for_target(target);

    let listing = session.remote.fetch_all(KIND.url_path())?;
    let mut report = ReconcileReport::new(KIND);
    for entity in listing {
        let mut remote =
            CollectionDoc::from_value(entity).map_err(|e| json_err(KIND.url_path(), e))?;
        if focus.as_ref().is_some_and(|id| *id != remote.collection_id) {
            continue;
        }
        remote.strip_metadata();
        // Nothing of a collection is written if any member would land outside it.
        for member in &remote.resources {
            store::check_accessor_path(&member.resource_accessor_path)?;
        }
        match descriptors.remove(&remote.collection_id) {
            Some(path) => {
                let reconciler = CollectionRun {
                    files: &files,
                    descriptor_path: &path,
                    scope: &scope,
                };
                reconciler.run(session, &mut report, remote)?;
            }
            None => reconcile_remote_only(session, &mut report, remote, &topic)?,
        }
    }

    if let Some(id) = &focus {
        descriptors.retain(|key, _| key == id);
    }
    for (id, path) in descriptors {
        reconcile_local_only(session, &mut report, &files, &id, &path)?;
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Per-member decisions
// ---------------------------------------------------------------------------

/// Where one member ends up after its decision.
#[derive(Debug, Clone, Default, PartialEq)]
struct MemberDecision {
    local: Option<MemberResource>,
    remote: Option<MemberResource>,
    local_changed: bool,
    remote_changed: bool,
    outcome: Option<Outcome>,
}

impl MemberDecision {
    /// Keep both sides as they are.
    fn carry(local: Option<&MemberResource>, remote: Option<&MemberResource>) -> Self {
        Self {
            local: local.map(MemberResource::without_bytes),
            remote: remote.cloned(),
            ..Self::default()
        }
    }

    fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

/// The next local descriptor membership and the next remote membership.
#[derive(Debug, Default)]
struct Accumulator {
    local: Vec<MemberResource>,
    remote: Vec<MemberResource>,
    local_changed: bool,
    remote_changed: bool,
    outcomes: Vec<(String, Outcome)>,
}

impl Accumulator {
    fn fold(&mut self, key: String, decision: MemberDecision) {
        self.local.extend(decision.local);
        self.remote.extend(decision.remote);
        self.local_changed |= decision.local_changed;
        self.remote_changed |= decision.remote_changed;
        if let Some(outcome) = decision.outcome {
            self.outcomes.push((key, outcome));
        }
    }
}

/// Stable reorder of `members` following the id order of `order`; members
/// `order` does not list keep their relative order at the end.
fn arrange(members: &mut [MemberResource], order: &[MemberResource]) {
    let position = |member: &MemberResource| {
        order
            .iter()
            .position(|o| o.resource_id == member.resource_id)
            .unwrap_or(order.len())
    };
    members.sort_by_key(|m| position(m));
}

fn is_remote_write(action: Action) -> bool {
    matches!(action, Action::PushLocalToRemote | Action::DeleteRemote)
}

// ---------------------------------------------------------------------------
// Collections present on both sides
// ---------------------------------------------------------------------------

struct CollectionRun<'r> {
    files: &'r [PathBuf],
    descriptor_path: &'r Path,
    scope: &'r Scope,
}

impl CollectionRun<'_> {
    fn dir(&self) -> PathBuf {
        self.descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn find_member_file(&self, accessor: &str) -> Result<Option<PathBuf>, SyncError> {
        let dir = self.dir();
        store::find_in(
            self.files,
            FileMatcher::Relative {
                base: &dir,
                path: accessor,
            },
        )
    }

    fn run(
        &self,
        session: &mut Session<'_>,
        report: &mut ReconcileReport,
        remote: CollectionDoc,
    ) -> Result<(), SyncError> {
        let local = CollectionDoc::read(self.descriptor_path)?;
        let id = remote.collection_id.clone();
        let dir = self.dir();
        let mut acc = Accumulator::default();

        let shell_choice = if *self.scope == Scope::Descriptor || *self.scope == Scope::Full {
            self.descriptor_tier(session, &remote, &local, &mut acc)?
        } else {
            None
        };

        for remote_member in &remote.resources {
            let local_member = local
                .resources
                .iter()
                .find(|m| m.resource_id == remote_member.resource_id);
            let accessor = local_member.unwrap_or(remote_member);
            let file = self.find_member_file(&accessor.resource_accessor_path)?;
            let key = model::member_key(&id, accessor);
            let in_scope = self.scope.covers(file.as_deref());

            let decision = match (local_member, file) {
                (local_member, Some(file))
                    if in_scope && (local_member.is_some() || *self.scope == Scope::Full) =>
                {
                    decide_present(session, &dir, &id, remote_member, local_member, &file)?
                }
                (Some(local_member), None) if *self.scope == Scope::Full => {
                    decide_content_orphan(session, &dir, &id, remote_member, local_member)?
                }
                (None, None) if *self.scope == Scope::Full => {
                    decide_remote_only(session, &dir, &id, remote_member)?
                }
                (Some(local_member), _) if *self.scope == Scope::Descriptor => {
                    decide_entry_only(session, remote_member, local_member)?
                }
                (local_member, _) => MemberDecision::carry(local_member, Some(remote_member)),
            };
            acc.fold(key, decision);
        }

        for local_member in local
            .resources
            .iter()
            .filter(|m| !remote.resources.iter().any(|r| r.resource_id == m.resource_id))
        {
            let file = self.find_member_file(&local_member.resource_accessor_path)?;
            let key = model::member_key(&id, local_member);
            let decision = if self.scope.covers(file.as_deref()) {
                decide_local_only(session, &id, local_member, file.as_deref())?
            } else {
                MemberDecision::carry(Some(local_member), None)
            };
            acc.fold(key, decision);
        }

        self.finish(session, report, &remote, &local, shell_choice, acc)
    }

    /// Compare collection fields and member order; returns the chosen action.
    fn descriptor_tier(
        &self,
        session: &mut Session<'_>,
        remote: &CollectionDoc,
        local: &CollectionDoc,
        acc: &mut Accumulator,
    ) -> Result<Option<Action>, SyncError> {
        let id = &remote.collection_id;
        if diff::descriptor_equivalent(remote, local) {
            debug!("descriptor of collection {id} unchanged");
            acc.outcomes.push((id.clone(), Outcome::Unchanged));
            return Ok(None);
        }

        session.notice(&format!(
            "There is a difference in {COLLECTION_DESCRIPTOR}\nfor the collection {id}"
        ));
        let resolution = policy::resolve(Presence::Both { equivalent: false }, session.flags);
        if matches!(resolution, Resolution::Ask(_)) {
            let as_value = |doc: &CollectionDoc| {
                doc.to_value()
                    .map(|v| diff::normalized(KIND, &v))
                    .map_err(|e| json_err(self.descriptor_path, e))
            };
            let text = diff::unified_diff(&as_value(remote)?, &as_value(local)?, COLLECTION_DESCRIPTOR);
            session.notice(&text);
        }
        let choice = prompt::settle(session.ui, resolution, COLLECTION_DESCRIPTOR)?;
        if let Some(action) = choice {
            acc.outcomes.push((id.clone(), Outcome::chosen(action)));
        }
        Ok(choice)
    }

    fn finish(
        &self,
        session: &mut Session<'_>,
        report: &mut ReconcileReport,
        remote: &CollectionDoc,
        local: &CollectionDoc,
        shell_choice: Option<Action>,
        mut acc: Accumulator,
    ) -> Result<(), SyncError> {
        let overwrite = shell_choice == Some(Action::OverwriteLocal);
        let push = shell_choice == Some(Action::PushLocalToRemote);

        let mut final_local = if overwrite { remote.shell() } else { local.shell() };
        final_local.resources = std::mem::take(&mut acc.local);
        arrange(
            &mut final_local.resources,
            if overwrite { &remote.resources } else { &local.resources },
        );

        let mut final_remote = if push { local.shell() } else { remote.shell() };
        final_remote.strip_metadata();
        final_remote.resources = std::mem::take(&mut acc.remote);
        arrange(
            &mut final_remote.resources,
            if push { &local.resources } else { &remote.resources },
        );

        if acc.local_changed || overwrite {
            store::write_json(&final_local, self.descriptor_path)?;
        }

        let mut push_status = None;
        if (acc.remote_changed || push) && final_remote != *remote {
            let body = final_remote
                .to_value()
                .map_err(|e| json_err(self.descriptor_path, e))?;
            let status = session.remote.push(KIND.url_path(), &body)?;
            if status == crate::remote::STATUS_OK {
                info!("pushed changes to remote for collection {}", remote.collection_id);
            } else {
                warn!(
                    "pushing collection {} rejected with HTTP {status}",
                    remote.collection_id
                );
            }
            push_status = Some(status);
        }

        for (key, outcome) in acc.outcomes {
            let outcome = match (outcome, push_status) {
                (Outcome::Applied(action), Some(status)) if is_remote_write(action) => {
                    Outcome::from_status(action, status)
                }
                (outcome, _) => outcome,
            };
            report.record(key, outcome);
        }
        Ok(())
    }
}

/// A member listed remotely whose local file exists.
fn decide_present(
    session: &mut Session<'_>,
    dir: &Path,
    id: &str,
    remote: &MemberResource,
    local: Option<&MemberResource>,
    file: &Path,
) -> Result<MemberDecision, SyncError> {
    let bytes = store::read_bytes(file)?;
    let entry_equivalent = local.is_some_and(|l| diff::member_entry_equivalent(remote, l));
    let content_equivalent = diff::content_equivalent(remote, &bytes)?;
    let local_entry = local.cloned().unwrap_or_else(|| remote.without_bytes());

    if entry_equivalent && content_equivalent {
        return Ok(MemberDecision::carry(Some(&local_entry), Some(remote))
            .with_outcome(Outcome::Unchanged));
    }

    session.notice(&format!(
        "There is a difference in the collection {id}\nwith the resource {}",
        local_entry.resource_accessor_path
    ));
    let resolution = policy::resolve(Presence::Both { equivalent: false }, session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, MEMBER_SUBJECT)? else {
        return Ok(MemberDecision::carry(local, Some(remote)));
    };
    let decision = match action {
        Action::OverwriteLocal => {
            let target = remote.local_path(dir)?;
            let moved = target.as_path() != file;
            if !content_equivalent || moved {
                store::write_bytes(&target, &remote.decoded_bytes()?)?;
            }
            if moved {
                store::remove_file(file)?;
            }
            MemberDecision {
                local: Some(remote.without_bytes()),
                remote: Some(remote.clone()),
                local_changed: !entry_equivalent,
                ..MemberDecision::default()
            }
        }
        Action::PushLocalToRemote => MemberDecision {
            local: Some(local_entry.without_bytes()),
            remote: Some(local_entry.with_bytes(encode_bytes(&bytes))),
            local_changed: local.is_none(),
            remote_changed: true,
            outcome: None,
        },
        _ => MemberDecision::carry(local, Some(remote)),
    };
    Ok(decision.with_outcome(Outcome::chosen(action)))
}

/// A member listed on both sides whose local file is missing.
fn decide_content_orphan(
    session: &mut Session<'_>,
    dir: &Path,
    id: &str,
    remote: &MemberResource,
    local: &MemberResource,
) -> Result<MemberDecision, SyncError> {
    session.notice(&format!(
        "The collection {id} has the resource {}\nbut there is no local file saved to {}",
        remote.resource_id, local.resource_accessor_path
    ));
    let resolution = policy::resolve_content_orphan(session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, MEMBER_SUBJECT)? else {
        return Ok(MemberDecision::carry(Some(local), Some(remote)));
    };
    let decision = match action {
        Action::DropListing => MemberDecision {
            remote: Some(remote.clone()),
            local_changed: true,
            ..MemberDecision::default()
        },
        Action::SaveRemoteContent => {
            store::write_bytes(&remote.local_path(dir)?, &remote.decoded_bytes()?)?;
            MemberDecision {
                local: Some(remote.without_bytes()),
                remote: Some(remote.clone()),
                local_changed: !diff::member_entry_equivalent(remote, local),
                ..MemberDecision::default()
            }
        }
        Action::DeleteRemote => MemberDecision {
            local_changed: true,
            remote_changed: true,
            ..MemberDecision::default()
        },
        _ => MemberDecision::carry(Some(local), Some(remote)),
    };
    Ok(decision.with_outcome(Outcome::chosen(action)))
}

/// A remote member neither listed nor stored locally.
fn decide_remote_only(
    session: &mut Session<'_>,
    dir: &Path,
    id: &str,
    remote: &MemberResource,
) -> Result<MemberDecision, SyncError> {
    session.notice(&format!(
        "The collection {id}\nhas a resource {} that does not exist locally",
        remote.resource_accessor_path
    ));
    let resolution = policy::resolve(Presence::RemoteOnly, session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, MEMBER_SUBJECT)? else {
        return Ok(MemberDecision::carry(None, Some(remote)));
    };
    let decision = match action {
        Action::CreateLocal => {
            store::write_bytes(&remote.local_path(dir)?, &remote.decoded_bytes()?)?;
            MemberDecision {
                local: Some(remote.without_bytes()),
                remote: Some(remote.clone()),
                local_changed: true,
                ..MemberDecision::default()
            }
        }
        Action::DeleteRemote => MemberDecision {
            remote_changed: true,
            ..MemberDecision::default()
        },
        _ => MemberDecision::carry(None, Some(remote)),
    };
    Ok(decision.with_outcome(Outcome::chosen(action)))
}

/// Watch run on the descriptor: only listing fields are considered, and the
/// remote content is kept. A content edit arrives as its own event.
fn decide_entry_only(
    session: &mut Session<'_>,
    remote: &MemberResource,
    local: &MemberResource,
) -> Result<MemberDecision, SyncError> {
    if diff::member_entry_equivalent(remote, local) {
        return Ok(MemberDecision::carry(Some(local), Some(remote)));
    }
    session.notice(&format!(
        "Resource data in {COLLECTION_DESCRIPTOR} changed for {}",
        local.resource_accessor_path
    ));
    let resolution = policy::resolve(Presence::Both { equivalent: false }, session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, MEMBER_SUBJECT)? else {
        return Ok(MemberDecision::carry(Some(local), Some(remote)));
    };
    let decision = match action {
        Action::PushLocalToRemote => MemberDecision {
            local: Some(local.without_bytes()),
            remote: Some(local.with_bytes(remote.resource_bytes.clone())),
            remote_changed: true,
            ..MemberDecision::default()
        },
        Action::OverwriteLocal => MemberDecision {
            local: Some(remote.without_bytes()),
            remote: Some(remote.clone()),
            local_changed: true,
            ..MemberDecision::default()
        },
        _ => MemberDecision::carry(Some(local), Some(remote)),
    };
    Ok(decision.with_outcome(Outcome::chosen(action)))
}

/// A member listed locally that the remote collection lacks.
fn decide_local_only(
    session: &mut Session<'_>,
    id: &str,
    local: &MemberResource,
    file: Option<&Path>,
) -> Result<MemberDecision, SyncError> {
    let resolution = policy::resolve(Presence::LocalOnly, session.flags);
    if resolution == Resolution::Suppressed {
        return Ok(MemberDecision::carry(Some(local), None));
    }
    session.notice(&format!(
        "The remote prod collection {id}\ndoesn't have the resource {}",
        local.resource_accessor_path
    ));
    let Some(action) = prompt::settle(session.ui, resolution, MEMBER_SUBJECT)? else {
        return Ok(MemberDecision::carry(Some(local), None));
    };
    let decision = match action {
        Action::PushLocalToRemote => {
            let remote = match file {
                Some(file) => local.with_bytes(encode_bytes(&store::read_bytes(file)?)),
                None => local.without_bytes(),
            };
            MemberDecision {
                local: Some(local.without_bytes()),
                remote: Some(remote),
                remote_changed: true,
                ..MemberDecision::default()
            }
        }
        Action::DeleteLocal => {
            if let Some(file) = file {
                if session.ui.confirm("Do you also want to delete the local file?")? {
                    store::remove_file(file)?;
                    info!("deleted {}", file.display());
                }
            }
            MemberDecision {
                local_changed: true,
                ..MemberDecision::default()
            }
        }
        _ => MemberDecision::carry(Some(local), None),
    };
    Ok(decision.with_outcome(Outcome::chosen(action)))
}

// ---------------------------------------------------------------------------
// Collections present on one side only
// ---------------------------------------------------------------------------

fn reconcile_remote_only(
    session: &mut Session<'_>,
    report: &mut ReconcileReport,
    remote: CollectionDoc,
    topic: &Path,
) -> Result<(), SyncError> {
    let id = remote.collection_id.clone();
    session.notice(&format!("The collection {id} does not exist locally"));
    let resolution = policy::resolve(Presence::RemoteOnly, session.flags);
    let Some(action) = prompt::settle(session.ui, resolution, KIND.label())? else {
        return Ok(());
    };
    let outcome = match action {
        Action::CreateLocal => {
            let folder = prompt::choose_folder(session.ui, topic, true, session.flags)?;
            let dir = folder.join(&id);
            store::ensure_dir(&dir)?;
            let mut descriptor = remote.shell();
            for member in &remote.resources {
                store::write_bytes(&member.local_path(&dir)?, &member.decoded_bytes()?)?;
                descriptor.resources.push(member.without_bytes());
            }
            store::write_json(&descriptor, &dir.join(COLLECTION_DESCRIPTOR))?;
            Outcome::Applied(action)
        }
        Action::DeleteRemote => {
            let status = session
                .remote
                .delete(&format!("{}/{id}", KIND.url_path()))?;
            logged_write(&id, action, status)
        }
        other => Outcome::chosen(other),
    };
    report.record(id, outcome);
    Ok(())
}

fn reconcile_local_only(
    session: &mut Session<'_>,
    report: &mut ReconcileReport,
    files: &[PathBuf],
    id: &str,
    descriptor_path: &Path,
) -> Result<(), SyncError> {
    let resolution = policy::resolve(Presence::LocalOnly, session.flags);
    if resolution == Resolution::Suppressed {
        return Ok(());
    }
    session.notice(&format!("The remote prod doesn't have the collection {id}"));
    let Some(action) = prompt::settle(session.ui, resolution, KIND.label())? else {
        return Ok(());
    };
    let dir = descriptor_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let outcome = match action {
        Action::PushLocalToRemote => {
            let mut local = CollectionDoc::read(descriptor_path)?;
            local.strip_metadata();
            let contents = member_contents(files, &dir, &local)?;
            for member in &mut local.resources {
                if let Some(encoded) = contents.get(&member.resource_id) {
                    member.resource_bytes = encoded.clone();
                }
            }
            let body = local.to_value().map_err(|e| json_err(descriptor_path, e))?;
            let status = session.remote.push(KIND.url_path(), &body)?;
            logged_write(id, action, status)
        }
        Action::DeleteLocal => {
            store::remove_dir_all(&dir)?;
            info!("deleted directory {}", dir.display());
            Outcome::Applied(action)
        }
        other => Outcome::chosen(other),
    };
    report.record(id, outcome);
    Ok(())
}

/// Base64 content of every member whose file exists, by resource id.
fn member_contents(
    files: &[PathBuf],
    dir: &Path,
    doc: &CollectionDoc,
) -> Result<BTreeMap<String, String>, SyncError> {
    let mut contents = BTreeMap::new();
    for member in &doc.resources {
        let matcher = FileMatcher::Relative {
            base: dir,
            path: &member.resource_accessor_path,
        };
        if let Some(file) = store::find_in(files, matcher)? {
            contents.insert(
                member.resource_id.clone(),
                encode_bytes(&store::read_bytes(&file)?),
            );
        }
    }
    Ok(contents)
}

fn logged_write(id: &str, action: Action, status: u16) -> Outcome {
    let outcome = Outcome::from_status(action, status);
    if outcome.is_failure() {
        warn!("{action} of collection {id} rejected with HTTP {status}");
    } else {
        info!("{action} of collection {id} succeeded");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(id: &str) -> MemberResource {
        serde_json::from_value(json!({
            "resourceId": id,
            "resourceAccessorPath": format!("/{id}"),
            "resourceBytes": "aGk="
        }))
        .unwrap()
    }

    #[test]
    fn fold_collects_both_sides_and_flags() {
        let mut acc = Accumulator::default();
        acc.fold("c/a".into(), MemberDecision::carry(Some(&member("a")), Some(&member("a"))));
        acc.fold(
            "c/b".into(),
            MemberDecision {
                remote_changed: true,
                ..MemberDecision::default()
            }
            .with_outcome(Outcome::Applied(Action::DeleteRemote)),
        );
        assert_eq!(acc.local.len(), 1);
        assert_eq!(acc.local[0].resource_bytes, "");
        assert_eq!(acc.remote.len(), 1);
        assert!(acc.remote_changed);
        assert!(!acc.local_changed);
        assert_eq!(acc.outcomes.len(), 1);
    }

    #[test]
    fn arrange_follows_reference_order() {
        let mut members = vec![member("a"), member("b"), member("new"), member("c")];
        arrange(&mut members, &[member("c"), member("a"), member("b")]);
        let ids: Vec<&str> = members.iter().map(|m| m.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "new"]);
    }

    #[test]
    fn scope_from_target() {
        assert_eq!(Scope::for_target(None), Scope::Full);
        assert_eq!(
            Scope::for_target(Some(Path::new("resources/c/_collection.json"))),
            Scope::Descriptor
        );
        let member = Path::new("resources/c/index.html");
        let scope = Scope::for_target(Some(member));
        assert!(scope.covers(Some(member)));
        assert!(!scope.covers(Some(Path::new("resources/c/other.html"))));
        assert!(!Scope::Descriptor.covers(Some(member)));
    }
}
