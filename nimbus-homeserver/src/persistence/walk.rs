//! Depth bounded directory traversal without recursion.

use std::{fs::Metadata, path::PathBuf};

use nimbus_common::constants::TRASH_DIR_NAME;
use tokio::fs::ReadDir;

use super::{storage_error::ok_if_missing, StorageError};

/// An item found by [`TreeWalk`].
#[derive(Debug)]
pub(crate) struct WalkEntry {
    pub name: String,
    /// Slash joined path from the walk root, without a leading slash.
    pub relative: String,
    pub metadata: Metadata,
}

impl WalkEntry {
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }
}

struct PendingDir {
    path: PathBuf,
    relative: String,
    depth: usize,
}

struct OpenDir {
    read_dir: ReadDir,
    relative: String,
    depth: usize,
}

/// Walks a directory tree with an explicit stack.
///
/// Entries that vanish between listing and stat are skipped. Symlinks are reported but
/// never followed. A missing root yields no entries.
pub(crate) struct TreeWalk {
    pending: Vec<PendingDir>,
    current: Option<OpenDir>,
    max_depth: usize,
    skip_trash: bool,
}

impl TreeWalk {
    pub fn new(root: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self {
            pending: vec![PendingDir {
                path: root.into(),
                relative: String::new(),
                depth: 0,
            }],
            current: None,
            max_depth,
            skip_trash: false,
        }
    }

    /// Don't report or descend into any `.trash` directory.
    pub fn skip_trash(mut self) -> Self {
        self.skip_trash = true;
        self
    }

    pub async fn next_entry(&mut self) -> Result<Option<WalkEntry>, StorageError> {
        loop {
            let Some(open) = self.current.as_mut() else {
                if !self.open_next_dir().await? {
                    return Ok(None);
                }
                continue;
            };

            let Some(dir_entry) = open.read_dir.next_entry().await? else {
                self.current = None;
                continue;
            };

            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if self.skip_trash && name == TRASH_DIR_NAME {
                continue;
            }
            let path = dir_entry.path();
            let Some(metadata) = ok_if_missing(tokio::fs::symlink_metadata(&path).await)? else {
                continue;
            };

            let depth = open.depth + 1;
            if depth > self.max_depth {
                return Err(StorageError::TraversalTooDeep {
                    max_depth: self.max_depth,
                });
            }
            let relative = if open.relative.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", open.relative, name)
            };

            if metadata.is_dir() {
                self.pending.push(PendingDir {
                    path,
                    relative: relative.clone(),
                    depth,
                });
            }

            return Ok(Some(WalkEntry {
                name,
                relative,
                metadata,
            }));
        }
    }

    /// Open the next pending directory. `false` once the walk is exhausted.
    async fn open_next_dir(&mut self) -> Result<bool, StorageError> {
        while let Some(dir) = self.pending.pop() {
            let Some(read_dir) = ok_if_missing(tokio::fs::read_dir(&dir.path).await)? else {
                continue;
            };
            self.current = Some(OpenDir {
                read_dir,
                relative: dir.relative,
                depth: dir.depth,
            });
            return Ok(true);
        }
        Ok(false)
    }
}
