use std::path::{Path, PathBuf};
use std::time::Duration;

use pathisync_core::{EntityKind, COLLECTION_DESCRIPTOR, TMP_SUFFIX};

/// Quiet period after the last event before a batch is flushed.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Topic directories under `root` that exist and can be watched.
pub fn watch_roots(root: &Path) -> Vec<PathBuf> {
    EntityKind::all()
        .iter()
        .map(|kind| root.join(kind.topic_dir()))
        .filter(|dir| dir.is_dir())
        .collect()
}

pub fn is_descriptor(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()) == Some(COLLECTION_DESCRIPTOR)
}

/// Scratch files left by atomic writes; never worth a sync.
pub fn is_scratch(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(TMP_SUFFIX))
        .unwrap_or(false)
}
