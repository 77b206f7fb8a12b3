//! The interaction seam between reconcilers and whoever answers them.

use std::path::{Path, PathBuf};

use pathisync_core::{Action, SyncFlags};

use crate::error::SyncError;
use crate::policy::Resolution;
use crate::store;

/// Label of the folder option that asks for a new directory name.
pub const NEW_FOLDER: &str = "<New Folder>";

/// Operator-facing I/O used while reconciling.
///
/// The CLI answers on a terminal; tests answer from a script.
pub trait Interaction {
    /// Narrate a finding ("There is a difference with ...").
    fn notice(&mut self, message: &str);

    /// Pick one of `options`, returning its index.
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize, SyncError>;

    /// Free text answer.
    fn input(&mut self, prompt: &str) -> Result<String, SyncError>;

    /// Yes/no answer.
    fn confirm(&mut self, prompt: &str) -> Result<bool, SyncError>;
}

/// Turn a policy resolution into the action to perform, asking when needed.
///
/// `None` means the entity needs no handling at all.
pub fn settle(
    ui: &mut dyn Interaction,
    resolution: Resolution,
    subject: &str,
) -> Result<Option<Action>, SyncError> {
    match resolution {
        Resolution::NoAction | Resolution::Suppressed => Ok(None),
        Resolution::Auto(action) => Ok(Some(action)),
        Resolution::Ask(choices) => {
            let labels: Vec<String> = choices.iter().map(|a| a.label(subject)).collect();
            let index = ui.choose("What do you want to do?", &labels)?;
            choices
                .get(index)
                .copied()
                .map(Some)
                .ok_or_else(|| SyncError::Prompt(format!("choice {index} is out of range")))
        }
    }
}

/// Pick (or create) the directory a new local entity is written into.
///
/// Options are `.` for the topic root, every sub-directory, then
/// [`NEW_FOLDER`]. With `--local --default-folder` the first option is taken.
pub fn choose_folder(
    ui: &mut dyn Interaction,
    topic_root: &Path,
    filter_collections: bool,
    flags: SyncFlags,
) -> Result<PathBuf, SyncError> {
    if flags.use_default_folder() {
        store::ensure_dir(topic_root)?;
        return Ok(topic_root.to_path_buf());
    }

    let dirs = store::list_dirs(topic_root, filter_collections)?;
    let mut options: Vec<String> = dirs
        .iter()
        .map(|dir| match dir.strip_prefix(topic_root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => dir.display().to_string(),
        })
        .collect();
    options.push(NEW_FOLDER.to_string());

    let prompt = format!("Choose a folder in {}", topic_root.display());
    let index = ui.choose(&prompt, &options)?;
    if let Some(dir) = dirs.get(index) {
        store::ensure_dir(dir)?;
        return Ok(dir.clone());
    }
    if index != dirs.len() {
        return Err(SyncError::Prompt(format!("choice {index} is out of range")));
    }

    let name = ui.input("Enter new folder name:")?;
    let name = name.trim().trim_matches('/');
    if name.is_empty() || Path::new(name).components().any(|c| c.as_os_str() == "..") {
        return Err(SyncError::Prompt(format!("invalid folder name '{name}'")));
    }
    let dir = topic_root.join(name);
    store::ensure_dir(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, ScriptedInteraction};
    use tempfile::TempDir;

    #[test]
    fn settle_maps_choice_back_to_action() {
        let mut ui = ScriptedInteraction::new([Answer::choose("Push local flow to remote prod")]);
        let action = settle(
            &mut ui,
            Resolution::Ask(vec![
                Action::Nothing,
                Action::OverwriteLocal,
                Action::PushLocalToRemote,
            ]),
            "flow",
        )
        .unwrap();
        assert_eq!(action, Some(Action::PushLocalToRemote));
        assert_eq!(ui.prompts()[0].1.len(), 3);
    }

    #[test]
    fn settle_without_prompt() {
        let mut ui = ScriptedInteraction::new([]);
        assert_eq!(settle(&mut ui, Resolution::Suppressed, "flow").unwrap(), None);
        assert_eq!(
            settle(&mut ui, Resolution::Auto(Action::CreateLocal), "flow").unwrap(),
            Some(Action::CreateLocal)
        );
        assert!(ui.prompts().is_empty());
    }

    #[test]
    fn folder_options_start_at_topic_root() {
        let tmp = TempDir::new().expect("tmp");
        let topic = tmp.path().join("flows");
        std::fs::create_dir_all(topic.join("auth")).unwrap();

        let mut ui = ScriptedInteraction::new([Answer::choose("auth")]);
        let dir = choose_folder(&mut ui, &topic, false, SyncFlags::default()).unwrap();
        assert_eq!(dir, topic.join("auth"));
        assert_eq!(ui.prompts()[0].1, vec![".", "auth", NEW_FOLDER]);
    }

    #[test]
    fn new_folder_is_created() {
        let tmp = TempDir::new().expect("tmp");
        let topic = tmp.path().join("triggers");
        let mut ui =
            ScriptedInteraction::new([Answer::choose(NEW_FOLDER), Answer::input("nightly")]);
        let dir = choose_folder(&mut ui, &topic, false, SyncFlags::default()).unwrap();
        assert_eq!(dir, topic.join("nightly"));
        assert!(dir.is_dir());
    }

    #[test]
    fn default_folder_skips_prompt() {
        let tmp = TempDir::new().expect("tmp");
        let topic = tmp.path().join("flows");
        let flags = SyncFlags {
            force_local: true,
            force_default_folder: true,
            ..SyncFlags::default()
        };
        let mut ui = ScriptedInteraction::new([]);
        assert_eq!(choose_folder(&mut ui, &topic, false, flags).unwrap(), topic);
        assert!(ui.prompts().is_empty());
    }
}
