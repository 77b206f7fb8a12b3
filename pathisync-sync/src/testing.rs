//! In-memory collaborators for exercising reconcilers without a server or a
//! terminal.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;

use pathisync_core::EntityKind;

use crate::error::SyncError;
use crate::prompt::Interaction;
use crate::remote::{Remote, STATUS_OK};

/// One call observed by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Fetch(String),
    Push { path: String, body: Value },
    Delete(String),
}

/// A [`Remote`] backed by per-path listings.
///
/// Accepted pushes upsert into the listing by entity key and accepted deletes
/// remove from it, so a second run sees the effect of the first.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    listings: RefCell<BTreeMap<String, Vec<Value>>>,
    calls: RefCell<Vec<RemoteCall>>,
    write_status: Cell<Option<u16>>,
    fetch_failure: RefCell<Option<String>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the listing served for `kind`.
    pub fn with(self, kind: EntityKind, entities: Vec<Value>) -> Self {
        self.listings
            .borrow_mut()
            .insert(kind.url_path().to_string(), entities);
        self
    }

    /// Answer every push and delete with `status`.
    pub fn reject_writes(&self, status: u16) {
        self.write_status.set(Some(status));
    }

    /// Make every listing fail as an expired credential would.
    pub fn fail_fetches(&self, reason: &str) {
        *self.fetch_failure.borrow_mut() = Some(reason.to_string());
    }

    pub fn listing(&self, kind: EntityKind) -> Vec<Value> {
        self.listings
            .borrow()
            .get(kind.url_path())
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.borrow().clone()
    }

    /// Calls other than listings.
    pub fn writes(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, RemoteCall::Fetch(_)))
            .collect()
    }

    fn status(&self) -> u16 {
        self.write_status.get().unwrap_or(STATUS_OK)
    }
}

fn kind_for(path: &str) -> Option<EntityKind> {
    EntityKind::all()
        .iter()
        .copied()
        .find(|kind| path == kind.url_path() || path.starts_with(&format!("{}/", kind.url_path())))
}

impl Remote for MemoryRemote {
    fn fetch_all(&self, path: &str) -> Result<Vec<Value>, SyncError> {
        self.calls
            .borrow_mut()
            .push(RemoteCall::Fetch(path.to_string()));
        if let Some(reason) = self.fetch_failure.borrow().clone() {
            return Err(SyncError::RemoteFetch {
                path: path.to_string(),
                reason,
            });
        }
        Ok(self.listings.borrow().get(path).cloned().unwrap_or_default())
    }

    fn push(&self, path: &str, body: &Value) -> Result<u16, SyncError> {
        self.calls.borrow_mut().push(RemoteCall::Push {
            path: path.to_string(),
            body: body.clone(),
        });
        let status = self.status();
        if status == STATUS_OK {
            if let Some(kind) = kind_for(path) {
                let key = kind.key_of(body);
                let mut listings = self.listings.borrow_mut();
                let entities = listings.entry(path.to_string()).or_default();
                match entities.iter_mut().find(|e| key.is_some() && kind.key_of(e) == key) {
                    Some(existing) => *existing = body.clone(),
                    None => entities.push(body.clone()),
                }
            }
        }
        Ok(status)
    }

    fn delete(&self, path: &str) -> Result<u16, SyncError> {
        self.calls
            .borrow_mut()
            .push(RemoteCall::Delete(path.to_string()));
        let status = self.status();
        if status == STATUS_OK {
            if let Some((base, key)) = path.rsplit_once('/') {
                if let Some(kind) = kind_for(base) {
                    if let Some(entities) = self.listings.borrow_mut().get_mut(base) {
                        entities.retain(|e| kind.key_of(e).as_deref() != Some(key));
                    }
                }
            }
        }
        Ok(status)
    }
}

/// A scripted answer for [`ScriptedInteraction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Pick the option whose label equals this text.
    Choose(String),
    Input(String),
    Confirm(bool),
}

impl Answer {
    pub fn choose(label: impl Into<String>) -> Self {
        Answer::Choose(label.into())
    }

    pub fn input(text: impl Into<String>) -> Self {
        Answer::Input(text.into())
    }
}

/// An [`Interaction`] that answers from a queue and records what it saw.
///
/// Running out of answers, or an answer that does not fit the question, is a
/// [`SyncError::Prompt`].
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    answers: VecDeque<Answer>,
    notices: Vec<String>,
    prompts: Vec<(String, Vec<String>)>,
}

impl ScriptedInteraction {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Every choice question asked, with its options.
    pub fn prompts(&self) -> &[(String, Vec<String>)] {
        &self.prompts
    }

    /// Answers never consumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> Result<Answer, SyncError> {
        self.answers
            .pop_front()
            .ok_or_else(|| SyncError::Prompt(format!("no scripted answer for '{prompt}'")))
    }
}

impl Interaction for ScriptedInteraction {
    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize, SyncError> {
        self.prompts.push((prompt.to_string(), options.to_vec()));
        match self.next(prompt)? {
            Answer::Choose(label) => options
                .iter()
                .position(|option| *option == label)
                .ok_or_else(|| {
                    SyncError::Prompt(format!("'{label}' is not one of {options:?}"))
                }),
            other => Err(SyncError::Prompt(format!(
                "expected a choice for '{prompt}', scripted {other:?}"
            ))),
        }
    }

    fn input(&mut self, prompt: &str) -> Result<String, SyncError> {
        match self.next(prompt)? {
            Answer::Input(text) => Ok(text),
            other => Err(SyncError::Prompt(format!(
                "expected text for '{prompt}', scripted {other:?}"
            ))),
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, SyncError> {
        match self.next(prompt)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(SyncError::Prompt(format!(
                "expected yes/no for '{prompt}', scripted {other:?}"
            ))),
        }
    }
}
