//! Local store: the on-disk side of every comparison.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   flows/**/<name>.json
//!   sharedConfigs/**/<referenceId>.json
//!   triggers/**/<config.name>.json
//!   resources/**/<collectionId>/_collection.json
//!   resources/**/<collectionId>/<resourceAccessorPath>
//! ```
//!
//! Writes go through `<path>.pathisync.tmp` + rename so a crash never leaves a
//! half-written JSON file behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use pathisync_core::{COLLECTION_DESCRIPTOR, TMP_SUFFIX};

use crate::error::{io_err, json_err, SyncError};

/// How a logical name is matched against local file paths.
#[derive(Debug, Clone, Copy)]
pub enum FileMatcher<'a> {
    /// `<stem>.json` anywhere below the directory.
    Stem(&'a str),
    /// An accessor path (leading `/` optional) relative to a base directory.
    Relative { base: &'a Path, path: &'a str },
}

impl FileMatcher<'_> {
    fn matches(&self, candidate: &Path) -> bool {
        match self {
            FileMatcher::Stem(stem) => {
                candidate.extension().and_then(|e| e.to_str()) == Some("json")
                    && candidate.file_stem().and_then(|s| s.to_str()) == Some(*stem)
            }
            FileMatcher::Relative { base, path } => {
                let relative = Path::new(path.trim_start_matches('/'));
                relative.components().next().is_some() && candidate == base.join(relative)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            FileMatcher::Stem(stem) => format!("{stem}.json"),
            FileMatcher::Relative { path, .. } => (*path).to_string(),
        }
    }
}

/// Local path of a collection member: `<collection_dir>/<accessor path>`.
///
/// The accessor path must stay inside the collection directory.
pub fn member_path(collection_dir: &Path, accessor_path: &str) -> Result<PathBuf, SyncError> {
    check_accessor_path(accessor_path)?;
    Ok(collection_dir.join(accessor_path.trim_start_matches('/')))
}

/// Reject accessor paths that are empty or climb out of their collection.
pub fn check_accessor_path(accessor_path: &str) -> Result<(), SyncError> {
    let relative = Path::new(accessor_path.trim_start_matches('/'));
    let mut named = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_accessor(accessor_path));
            }
        }
    }
    if named {
        Ok(())
    } else {
        Err(unsafe_accessor(accessor_path))
    }
}

fn unsafe_accessor(accessor_path: &str) -> SyncError {
    SyncError::UnsafeAccessorPath {
        path: accessor_path.to_string(),
    }
}

/// Recursively list files below `dir`, sorted. A missing directory is empty.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| walk_err(dir, e))?;
        if entry.file_type().is_file() && !is_tmp_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Locate at most one file below `dir` matching `matcher`.
pub fn find_file(dir: &Path, matcher: FileMatcher<'_>) -> Result<Option<PathBuf>, SyncError> {
    find_in(&list_files(dir)?, matcher)
}

/// [`find_file`] over an already-listed set of files.
pub fn find_in(files: &[PathBuf], matcher: FileMatcher<'_>) -> Result<Option<PathBuf>, SyncError> {
    let mut found: Vec<PathBuf> = files
        .iter()
        .filter(|path| matcher.matches(path))
        .cloned()
        .collect();
    if found.len() > 1 {
        return Err(SyncError::DuplicateName {
            key: matcher.describe(),
            paths: found,
        });
    }
    Ok(found.pop())
}

/// Index `<stem>.json` files by stem, failing on the first duplicate stem.
pub fn index_by_stem(files: &[PathBuf]) -> Result<BTreeMap<String, PathBuf>, SyncError> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            groups.entry(stem.to_string()).or_default().push(path.clone());
        }
    }
    collapse_groups(groups)
}

/// Index collection descriptors by the name of their directory
/// (the collection id), failing on the first duplicate id.
pub fn index_collections(files: &[PathBuf]) -> Result<BTreeMap<String, PathBuf>, SyncError> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        if !is_collection_descriptor(path) {
            continue;
        }
        if let Some(id) = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
        {
            groups.entry(id.to_string()).or_default().push(path.clone());
        }
    }
    collapse_groups(groups)
}

fn collapse_groups(
    groups: BTreeMap<String, Vec<PathBuf>>,
) -> Result<BTreeMap<String, PathBuf>, SyncError> {
    let mut index = BTreeMap::new();
    for (key, mut paths) in groups {
        if paths.len() > 1 {
            return Err(SyncError::DuplicateName { key, paths });
        }
        if let Some(path) = paths.pop() {
            index.insert(key, path);
        }
    }
    Ok(index)
}

/// Directories below (and including) `dir`, sorted.
///
/// With `filter_collections`, a directory holding a `_collection.json` is
/// opaque: neither it nor anything below it is listed.
pub fn list_dirs(dir: &Path, filter_collections: bool) -> Result<Vec<PathBuf>, SyncError> {
    if !dir.exists() {
        return Ok(vec![dir.to_path_buf()]);
    }
    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        !(filter_collections && entry.depth() > 0 && is_collection_root(entry.path()))
    });
    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_err(dir, e))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn is_collection_descriptor(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(COLLECTION_DESCRIPTOR)
}

pub fn is_collection_root(dir: &Path) -> bool {
    dir.join(COLLECTION_DESCRIPTOR).is_file()
}

pub fn is_tmp_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(TMP_SUFFIX)
}

/// Walk upward from a resource file to its owning collection directory.
///
/// Stops at `topic_root` (or a directory named like it); a resource outside
/// every collection is a [`SyncError::MissingCollectionOwner`].
pub fn find_collection_owner(
    path: &Path,
    topic_root: &Path,
) -> Result<(String, PathBuf), SyncError> {
    let topic_name = topic_root.file_name();
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == topic_root || dir.as_os_str().is_empty() || dir.file_name() == topic_name {
            break;
        }
        if is_collection_root(dir) {
            if let Some(id) = dir.file_name().and_then(|n| n.to_str()) {
                return Ok((id.to_string(), dir.to_path_buf()));
            }
        }
        current = dir.parent();
    }
    Err(SyncError::MissingCollectionOwner {
        path: path.to_path_buf(),
    })
}

pub fn read_json(path: &Path) -> Result<Value, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|e| json_err(path, e))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, SyncError> {
    std::fs::read(path).map_err(|e| io_err(path, e))
}

/// Serialize `value` as two-space pretty JSON at `path`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| json_err(path, e))?;
    write_bytes(path, json.as_bytes())
}

/// Write raw bytes at `path`, creating parent directories.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    write_bytes_with_tmp(path, bytes, &tmp)
}

fn write_bytes_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, bytes).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("wrote: {}", path.display());
    Ok(())
}

pub fn remove_file(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

pub fn remove_dir_all(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

pub fn ensure_dir(path: &Path) -> Result<(), SyncError> {
    std::fs::create_dir_all(path).map_err(|e| io_err(path, e))
}

fn walk_err(dir: &Path, err: walkdir::Error) -> SyncError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    io_err(path, source)
}
