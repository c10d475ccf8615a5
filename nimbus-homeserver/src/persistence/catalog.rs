//! Directory listings and name search over a scope.

use std::{fs::Metadata, path::Path, time::SystemTime};

use chrono::{DateTime, Utc};
use nimbus_common::constants::TRASH_DIR_NAME;
use serde::Serialize;

use super::{storage_error::ok_if_missing, walk::TreeWalk, PathResolver, ScopePath, StorageError};

/// Folder or file. Folders sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory.
    Folder,
    /// Anything that is not a directory.
    File,
}

/// A listed or found item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Base name.
    pub name: String,
    /// Slash joined path from the scope root, without a leading slash.
    pub path: String,
    /// Size in bytes as stored on disk. `None` for folders.
    pub size: Option<u64>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Folder or file.
    pub kind: EntryKind,
}

impl Entry {
    pub(crate) fn from_metadata(name: String, path: String, metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        Self {
            name,
            path,
            size: (kind == EntryKind::File).then(|| metadata.len()),
            modified: modified_at(metadata),
            kind,
        }
    }

    /// Whether this is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

pub(crate) fn modified_at(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .into()
}

/// Folders before files, then by name. Stable.
pub(crate) fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
}

/// Immediate children of `dir`, sorted. A missing directory lists as empty.
///
/// `prefix` is prepended to every entry's path.
pub(crate) async fn list_dir(
    dir: &Path,
    prefix: &str,
    hide_trash: bool,
) -> Result<Vec<Entry>, StorageError> {
    let Some(mut read_dir) = ok_if_missing(tokio::fs::read_dir(dir).await)? else {
        return Ok(vec![]);
    };

    let mut entries = vec![];
    while let Some(dir_entry) = read_dir.next_entry().await? {
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if hide_trash && name == TRASH_DIR_NAME {
            continue;
        }
        // Vanished since listing.
        let Some(metadata) = ok_if_missing(tokio::fs::symlink_metadata(dir_entry.path()).await)?
        else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        entries.push(Entry::from_metadata(name, path, &metadata));
    }
    sort_entries(&mut entries);
    Ok(entries)
}

/// Children of the scope root, trash excluded.
pub async fn list(scope_dir: &Path) -> Result<Vec<Entry>, StorageError> {
    list_dir(scope_dir, "", true).await
}

/// Children of `sub_path` inside the scope, paths relative to the scope root.
/// Trash folders are hidden at every level.
///
/// The scope root of a scope that was never written to lists as empty, any other
/// missing folder is [`StorageError::NotFound`].
pub async fn list_metadata(scope_dir: &Path, sub_path: &ScopePath) -> Result<Vec<Entry>, StorageError> {
    if sub_path.is_reserved() {
        return Err(StorageError::InvalidPath(format!(
            "'{sub_path}' is inside the trash"
        )));
    }
    if sub_path.is_root() {
        return list(scope_dir).await;
    }

    let dir = PathResolver::join(scope_dir, sub_path);
    let metadata = tokio::fs::metadata(&dir).await?;
    if !metadata.is_dir() {
        return Err(StorageError::Conflict(format!("'{sub_path}' is not a folder")));
    }
    list_dir(&dir, sub_path.relative(), true).await
}

/// Case insensitive substring search on names below the scope root.
///
/// Every folder except the trash is searched regardless of whether its own name
/// matches. A blank query finds nothing.
pub async fn search(scope_dir: &Path, query: &str, max_depth: usize) -> Result<Vec<Entry>, StorageError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(vec![]);
    }

    let mut walk = TreeWalk::new(scope_dir, max_depth).skip_trash();
    let mut found = vec![];
    while let Some(entry) = walk.next_entry().await? {
        if entry.name.to_lowercase().contains(&needle) {
            found.push(Entry::from_metadata(entry.name, entry.relative, &entry.metadata));
        }
    }
    sort_entries(&mut found);
    Ok(found)
}
