//! Automation flags and the resolution action vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Automation switches that let the resolution policy answer without a human.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFlags {
    /// Never prompt; prefer local truth (overwrite/create locally).
    pub force_local: bool,
    /// With `force_local`, pick the first folder instead of asking.
    pub force_default_folder: bool,
    /// Offer delete actions in prompts. Deletes are never auto-selected.
    pub allow_delete: bool,
    /// Run triggered by a file-watch event: push differences, ignore local-only.
    pub watch: bool,
}

impl SyncFlags {
    /// Flags for a watch-triggered run, keeping the delete switch.
    pub fn for_watch(self) -> Self {
        Self {
            watch: true,
            ..self
        }
    }

    /// Whether folder selection should be skipped in favour of the first option.
    pub fn use_default_folder(&self) -> bool {
        self.force_local && self.force_default_folder
    }
}

/// One resolution for a classified difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Nothing,
    OverwriteLocal,
    PushLocalToRemote,
    CreateLocal,
    DeleteRemote,
    DeleteLocal,
    /// Content orphan: drop the member listing from the local descriptor.
    DropListing,
    /// Content orphan: fetch the member's remote bytes into its missing file.
    SaveRemoteContent,
}

impl Action {
    /// Whether choosing this action removes data on either side.
    pub fn is_destructive(self) -> bool {
        matches!(self, Action::DeleteRemote | Action::DeleteLocal)
    }

    /// Human-readable prompt label for an entity described by `subject`
    /// (e.g. `"flow"`, `"resource"`, `"_collection.json"`).
    pub fn label(self, subject: &str) -> String {
        match self {
            Action::Nothing => "Nothing".to_string(),
            Action::OverwriteLocal => format!("Overwrite local {subject}"),
            Action::PushLocalToRemote => format!("Push local {subject} to remote prod"),
            Action::CreateLocal => format!("Create new local {subject}"),
            Action::DeleteRemote => format!("Delete remote prod {subject}"),
            Action::DeleteLocal => format!("Delete local {subject}"),
            Action::DropListing => {
                "Remove resource listed in the local _collection.json file".to_string()
            }
            Action::SaveRemoteContent => format!("Save prod's {subject} to its local path"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Nothing => "nothing",
            Action::OverwriteLocal => "overwrite-local",
            Action::PushLocalToRemote => "push",
            Action::CreateLocal => "create-local",
            Action::DeleteRemote => "delete-remote",
            Action::DeleteLocal => "delete-local",
            Action::DropListing => "drop-listing",
            Action::SaveRemoteContent => "save-remote-content",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_flags_keep_delete_switch() {
        let flags = SyncFlags {
            allow_delete: true,
            ..SyncFlags::default()
        }
        .for_watch();
        assert!(flags.watch);
        assert!(flags.allow_delete);
        assert!(!flags.force_local);
    }

    #[test]
    fn default_folder_requires_force_local() {
        let only_folder = SyncFlags {
            force_default_folder: true,
            ..SyncFlags::default()
        };
        assert!(!only_folder.use_default_folder());

        let both = SyncFlags {
            force_local: true,
            force_default_folder: true,
            ..SyncFlags::default()
        };
        assert!(both.use_default_folder());
    }

    #[test]
    fn only_delete_actions_are_destructive() {
        assert!(Action::DeleteLocal.is_destructive());
        assert!(Action::DeleteRemote.is_destructive());
        assert!(!Action::DropListing.is_destructive());
        assert!(!Action::OverwriteLocal.is_destructive());
    }

    #[test]
    fn labels_name_the_subject() {
        assert_eq!(Action::OverwriteLocal.label("flow"), "Overwrite local flow");
        assert_eq!(
            Action::PushLocalToRemote.label("shared config"),
            "Push local shared config to remote prod"
        );
        assert_eq!(Action::Nothing.label("trigger"), "Nothing");
    }
}
