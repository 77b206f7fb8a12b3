//! Collaborators shared by every reconciler in one run.

use std::path::{Path, PathBuf};

use pathisync_core::{EntityKind, SyncFlags};

use crate::prompt::Interaction;
use crate::remote::Remote;

/// A reconciliation run: project root, remote repository, the operator, and
/// the automation flags in force.
pub struct Session<'a> {
    pub root: &'a Path,
    pub remote: &'a dyn Remote,
    pub ui: &'a mut dyn Interaction,
    pub flags: SyncFlags,
}

impl<'a> Session<'a> {
    pub fn new(
        root: &'a Path,
        remote: &'a dyn Remote,
        ui: &'a mut dyn Interaction,
        flags: SyncFlags,
    ) -> Self {
        Self {
            root,
            remote,
            ui,
            flags,
        }
    }

    pub fn topic_root(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.topic_dir())
    }

    pub fn notice(&mut self, message: &str) {
        self.ui.notice(message);
    }
}
