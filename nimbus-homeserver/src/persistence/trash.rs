//! The per scope recycle bin.
//!
//! The trash is flat: an item is moved from the scope root into `.trash/` under its
//! base name and restored back to the scope root. Items trashed from subfolders by
//! other means are restored to the root as well.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nimbus_common::constants::TRASH_DIR_NAME;
use serde::Serialize;

use super::{
    catalog::{self, EntryKind},
    path_locks::PathLocks,
    storage_error::ok_if_missing,
    tree_ops, StorageError,
};

/// An item in the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashEntry {
    /// Base name, unique within the trash.
    pub filename: String,
    /// Size in bytes. `None` for folders.
    pub size: Option<u64>,
    /// Last modification time of the item itself.
    pub modified: DateTime<Utc>,
    /// Folder or file.
    pub kind: EntryKind,
}

/// Outcome of one item of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemResult {
    /// The name as given by the caller.
    pub name: String,
    /// Whether the item was processed.
    pub success: bool,
    /// Why it wasn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    fn from_outcome(name: &str, outcome: Result<(), StorageError>) -> Self {
        match outcome {
            Ok(()) => Self {
                name: name.to_string(),
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Batch item '{name}' failed: {e}");
                Self {
                    name: name.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Reject anything that isn't a plain base name of an item in a scope root.
pub(crate) fn validate_base_name(name: &str) -> Result<(), StorageError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else if name == TRASH_DIR_NAME {
        "the trash itself can't be addressed"
    } else if name.contains('/') || name.contains('\\') {
        "name contains a path separator"
    } else if name.chars().any(|c| c.is_control()) {
        "name contains control characters"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidName(format!("'{name}': {reason}")))
}

/// Single item result: a missing or unaddressable item is `false`, not an error.
fn found(outcome: Result<(), StorageError>) -> Result<bool, StorageError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(StorageError::NotFound | StorageError::InvalidName(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The trash of one scope directory.
#[derive(Debug, Clone)]
pub struct TrashBin {
    scope_dir: PathBuf,
    locks: PathLocks,
}

impl TrashBin {
    /// Trash of `scope_dir`. Mutations are serialized through `locks`.
    pub fn new(scope_dir: impl Into<PathBuf>, locks: PathLocks) -> Self {
        Self {
            scope_dir: scope_dir.into(),
            locks,
        }
    }

    fn trash_dir(&self) -> PathBuf {
        self.scope_dir.join(TRASH_DIR_NAME)
    }

    async fn exists(path: &Path) -> Result<bool, StorageError> {
        Ok(ok_if_missing(tokio::fs::symlink_metadata(path).await)?.is_some())
    }

    /// Move `name` from the scope root into the trash.
    ///
    /// `false` if there was nothing to move. An older trash item of the same name is replaced.
    pub async fn move_to_trash(&self, name: &str) -> Result<bool, StorageError> {
        found(self.try_move_to_trash(name).await)
    }

    async fn try_move_to_trash(&self, name: &str) -> Result<(), StorageError> {
        validate_base_name(name)?;
        let source = self.scope_dir.join(name);
        let target = self.trash_dir().join(name);
        let _guards = self.locks.lock_many([source.clone(), target.clone()]).await;

        if !Self::exists(&source).await? {
            return Err(StorageError::NotFound);
        }
        tokio::fs::create_dir_all(self.trash_dir()).await?;
        if tree_ops::remove_path(&target).await? {
            tracing::debug!("Replaced older trash item {}", target.display());
        }
        tokio::fs::rename(&source, &target).await?;
        tracing::debug!("Trashed {}", source.display());
        Ok(())
    }

    /// Everything currently in the trash, folders first then by name.
    ///
    /// Creates the scope directory and its trash if they don't exist yet.
    pub async fn list(&self) -> Result<Vec<TrashEntry>, StorageError> {
        tokio::fs::create_dir_all(self.trash_dir()).await?;
        let entries = catalog::list_dir(&self.trash_dir(), "", false).await?;
        Ok(entries
            .into_iter()
            .map(|entry| TrashEntry {
                filename: entry.name,
                size: entry.size,
                modified: entry.modified,
                kind: entry.kind,
            })
            .collect())
    }

    /// Move `name` out of the trash back into the scope root.
    ///
    /// `false` if the trash holds no such item. Fails with [`StorageError::Conflict`]
    /// if the scope root already has an item of that name.
    pub async fn restore(&self, name: &str) -> Result<bool, StorageError> {
        found(self.try_restore(name).await)
    }

    async fn try_restore(&self, name: &str) -> Result<(), StorageError> {
        validate_base_name(name)?;
        let source = self.trash_dir().join(name);
        let target = self.scope_dir.join(name);
        let _guards = self.locks.lock_many([source.clone(), target.clone()]).await;

        if !Self::exists(&source).await? {
            return Err(StorageError::NotFound);
        }
        if Self::exists(&target).await? {
            return Err(StorageError::Conflict(format!(
                "'{name}' already exists in the scope root"
            )));
        }
        tokio::fs::rename(&source, &target).await?;
        tracing::debug!("Restored {}", target.display());
        Ok(())
    }

    /// Delete `name` from the trash for good, recursively for folders.
    pub async fn permanently_delete(&self, name: &str) -> Result<bool, StorageError> {
        found(self.try_permanently_delete(name).await)
    }

    async fn try_permanently_delete(&self, name: &str) -> Result<(), StorageError> {
        validate_base_name(name)?;
        let target = self.trash_dir().join(name);
        let _guard = self.locks.lock(&target).await;
        if !tree_ops::remove_path(&target).await? {
            return Err(StorageError::NotFound);
        }
        tracing::debug!("Permanently deleted {}", target.display());
        Ok(())
    }

    /// Delete everything in the trash. Returns the number of items removed.
    pub async fn empty(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in self.list().await? {
            if self.permanently_delete(&entry.filename).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// [`TrashBin::move_to_trash`] for every name. Never aborts early.
    pub async fn batch_move_to_trash(&self, names: &[String]) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            results.push(BatchItemResult::from_outcome(
                name,
                self.try_move_to_trash(name).await,
            ));
        }
        results
    }

    /// [`TrashBin::restore`] for every name. Never aborts early.
    pub async fn batch_restore(&self, names: &[String]) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            results.push(BatchItemResult::from_outcome(name, self.try_restore(name).await));
        }
        results
    }

    /// [`TrashBin::permanently_delete`] for every name. Never aborts early.
    pub async fn batch_permanently_delete(&self, names: &[String]) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            results.push(BatchItemResult::from_outcome(
                name,
                self.try_permanently_delete(name).await,
            ));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bin() -> (tempfile::TempDir, TrashBin) {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = TrashBin::new(temp.path().join("scope"), PathLocks::new());
        fs::create_dir_all(temp.path().join("scope")).unwrap();
        (temp, bin)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn trash_and_restore_round_trip() {
        let (_temp, bin) = bin();
        fs::write(bin.scope_dir.join("x.txt"), b"hello").unwrap();

        assert!(bin.move_to_trash("x.txt").await.unwrap());
        assert!(!bin.scope_dir.join("x.txt").exists());
        let listed = bin.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "x.txt");
        assert_eq!(listed[0].size, Some(5));
        assert_eq!(listed[0].kind, EntryKind::File);

        assert!(bin.restore("x.txt").await.unwrap());
        assert_eq!(fs::read(bin.scope_dir.join("x.txt")).unwrap(), b"hello");
        assert!(bin.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn folders_are_trashed_whole() {
        let (_temp, bin) = bin();
        fs::create_dir_all(bin.scope_dir.join("album/2024")).unwrap();
        fs::write(bin.scope_dir.join("album/2024/a.jpg"), b"jpg").unwrap();

        assert!(bin.move_to_trash("album").await.unwrap());
        let listed = bin.list().await.unwrap();
        assert_eq!(listed[0].kind, EntryKind::Folder);
        assert_eq!(listed[0].size, None);

        assert!(bin.permanently_delete("album").await.unwrap());
        assert!(bin.list().await.unwrap().is_empty());
        assert!(!bin.trash_dir().join("album").exists());
    }

    #[tokio::test]
    async fn restore_targets_scope_root() {
        let (_temp, bin) = bin();
        // Something trashed from a subfolder still comes back to the root.
        fs::create_dir_all(bin.trash_dir()).unwrap();
        fs::write(bin.trash_dir().join("nested.txt"), b"n").unwrap();

        assert!(bin.restore("nested.txt").await.unwrap());
        assert!(bin.scope_dir.join("nested.txt").exists());
    }

    #[tokio::test]
    async fn missing_and_invalid_names_are_false() {
        let (_temp, bin) = bin();
        assert!(!bin.move_to_trash("missing").await.unwrap());
        assert!(!bin.restore("missing").await.unwrap());
        assert!(!bin.permanently_delete("missing").await.unwrap());

        for bad in ["", ".", "..", ".trash", "a/b", "../../etc"] {
            assert!(!bin.move_to_trash(bad).await.unwrap(), "'{bad}'");
            assert!(!bin.restore(bad).await.unwrap(), "'{bad}'");
            assert!(!bin.permanently_delete(bad).await.unwrap(), "'{bad}'");
        }
    }

    #[tokio::test]
    async fn same_name_replaces_older_trash_item() {
        let (_temp, bin) = bin();
        fs::write(bin.scope_dir.join("a.txt"), b"old").unwrap();
        bin.move_to_trash("a.txt").await.unwrap();
        fs::write(bin.scope_dir.join("a.txt"), b"new").unwrap();
        bin.move_to_trash("a.txt").await.unwrap();

        assert_eq!(bin.list().await.unwrap().len(), 1);
        assert_eq!(fs::read(bin.trash_dir().join("a.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn restore_over_existing_item_conflicts() {
        let (_temp, bin) = bin();
        fs::write(bin.scope_dir.join("a.txt"), b"trashed").unwrap();
        bin.move_to_trash("a.txt").await.unwrap();
        fs::write(bin.scope_dir.join("a.txt"), b"live").unwrap();

        assert!(matches!(
            bin.restore("a.txt").await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(fs::read(bin.scope_dir.join("a.txt")).unwrap(), b"live");
        assert_eq!(fs::read(bin.trash_dir().join("a.txt")).unwrap(), b"trashed");
    }

    #[tokio::test]
    async fn batch_reports_partial_failure() {
        let (_temp, bin) = bin();
        fs::write(bin.scope_dir.join("a"), b"a").unwrap();
        fs::write(bin.scope_dir.join("b"), b"b").unwrap();

        let results = bin.batch_move_to_trash(&names(&["a", "missing", "b"])).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success && results[0].error.is_none());
        assert!(!results[1].success);
        assert_eq!(results[1].name, "missing");
        assert!(results[1].error.is_some());
        assert!(results[2].success);

        let trashed: Vec<String> = bin.list().await.unwrap().into_iter().map(|e| e.filename).collect();
        assert_eq!(trashed, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn batch_records_empty_and_invalid_names() {
        let (_temp, bin) = bin();
        let results = bin.batch_move_to_trash(&names(&["", "../x"])).await;
        assert!(results.iter().all(|r| !r.success && r.error.is_some()));
    }

    #[tokio::test]
    async fn batch_restore_and_delete() {
        let (_temp, bin) = bin();
        for name in ["a", "b", "c"] {
            fs::write(bin.scope_dir.join(name), name).unwrap();
        }
        bin.batch_move_to_trash(&names(&["a", "b", "c"])).await;
        fs::write(bin.scope_dir.join("b"), b"taken").unwrap();

        let restored = bin.batch_restore(&names(&["a", "b"])).await;
        assert!(restored[0].success);
        assert!(!restored[1].success);

        let deleted = bin.batch_permanently_delete(&names(&["b", "c", "a"])).await;
        assert_eq!(
            deleted.iter().map(|r| r.success).collect::<Vec<_>>(),
            vec![true, true, false]
        );
        assert!(bin.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_trash_purges_everything() {
        let (_temp, bin) = bin();
        fs::write(bin.scope_dir.join("a"), b"a").unwrap();
        fs::create_dir_all(bin.scope_dir.join("d/e")).unwrap();
        bin.batch_move_to_trash(&names(&["a", "d"])).await;

        assert_eq!(bin.empty().await.unwrap(), 2);
        assert!(bin.list().await.unwrap().is_empty());
        assert_eq!(bin.empty().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_creates_missing_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = TrashBin::new(temp.path().join("never/written"), PathLocks::new());
        assert!(bin.list().await.unwrap().is_empty());
        assert!(temp.path().join("never/written/.trash").is_dir());
    }
}
