//! Per-entity results of a reconciliation run.

use std::fmt;

use serde::Serialize;

use pathisync_core::{Action, EntityKind};

/// What happened to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Both sides already agreed.
    Unchanged,
    /// A difference was found and left alone.
    Skipped,
    Applied(Action),
    /// The server rejected a push or delete.
    Failed { action: Action, status: u16 },
}

impl Outcome {
    /// Outcome of a remote write that answered with `status`.
    pub fn from_status(action: Action, status: u16) -> Self {
        if status == crate::remote::STATUS_OK {
            Outcome::Applied(action)
        } else {
            Outcome::Failed { action, status }
        }
    }

    /// Outcome of a settled action; `Nothing` is a skip.
    pub fn chosen(action: Action) -> Self {
        match action {
            Action::Nothing => Outcome::Skipped,
            other => Outcome::Applied(other),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unchanged => f.write_str("unchanged"),
            Outcome::Skipped => f.write_str("skipped"),
            Outcome::Applied(action) => write!(f, "{action}"),
            Outcome::Failed { action, status } => write!(f, "{action} failed (HTTP {status})"),
        }
    }
}

/// One reported entity. Collection members use `<collectionId>/<path>` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    pub key: String,
    pub outcome: Outcome,
}

/// Everything one reconciler did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kind: EntityKind,
    pub entities: Vec<EntityOutcome>,
}

impl ReconcileReport {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
        }
    }

    pub fn record(&mut self, key: impl Into<String>, outcome: Outcome) {
        self.entities.push(EntityOutcome {
            key: key.into(),
            outcome,
        });
    }

    pub fn outcome_of(&self, key: &str) -> Option<Outcome> {
        self.entities
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.outcome)
    }

    /// Entities where something was done or attempted.
    pub fn changes(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.entities
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Applied(_) | Outcome::Failed { .. }))
    }

    pub fn failures(&self) -> usize {
        self.entities.iter().filter(|e| e.outcome.is_failure()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_other_than_ok_is_a_failure() {
        assert_eq!(
            Outcome::from_status(Action::PushLocalToRemote, 200),
            Outcome::Applied(Action::PushLocalToRemote)
        );
        let failed = Outcome::from_status(Action::DeleteRemote, 401);
        assert!(failed.is_failure());
        assert_eq!(failed.to_string(), "delete-remote failed (HTTP 401)");
    }

    #[test]
    fn changes_exclude_skips() {
        let mut report = ReconcileReport::new(EntityKind::Flow);
        report.record("a", Outcome::Unchanged);
        report.record("b", Outcome::chosen(Action::Nothing));
        report.record("c", Outcome::Applied(Action::CreateLocal));
        let keys: Vec<&str> = report.changes().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c"]);
        assert_eq!(report.outcome_of("b"), Some(Outcome::Skipped));
    }
}
