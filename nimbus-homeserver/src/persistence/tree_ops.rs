//! Filesystem helpers shared by the trash and the WebDAV gateway.

use std::path::{Path, PathBuf};

use super::{storage_error::ok_if_missing, StorageError};

/// Remove a file or a whole directory tree. `false` if nothing was there.
pub(crate) async fn remove_path(path: &Path) -> Result<bool, StorageError> {
    let Some(metadata) = ok_if_missing(tokio::fs::symlink_metadata(path).await)? else {
        return Ok(false);
    };
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    Ok(ok_if_missing(removed)?.is_some())
}

/// `create_dir_all` that reports a file standing in the way as a conflict.
pub(crate) async fn create_parent_dirs(dir: &Path) -> Result<(), StorageError> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::NotADirectory
            ) =>
        {
            Err(StorageError::Conflict(format!(
                "a file is in the way of folder {}",
                dir.display()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy a file, or a directory tree into a new directory at `dst`.
///
/// Directories are walked with an explicit stack. Trees nested deeper than
/// `max_depth` fail with [`StorageError::TraversalTooDeep`], leaving a partial copy.
/// A symbolic link as `src` is a [`StorageError::Conflict`] and is never followed.
pub(crate) async fn copy_tree(src: &Path, dst: &Path, max_depth: usize) -> Result<(), StorageError> {
    let metadata = tokio::fs::symlink_metadata(src).await?;
    if metadata.is_symlink() {
        return Err(StorageError::Conflict(format!(
            "{} is a symbolic link",
            src.display()
        )));
    }
    if !metadata.is_dir() {
        tokio::fs::copy(src, dst).await?;
        return Ok(());
    }

    let mut stack: Vec<(PathBuf, PathBuf, usize)> = vec![(src.to_path_buf(), dst.to_path_buf(), 0)];
    while let Some((from, to, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(StorageError::TraversalTooDeep { max_depth });
        }
        tokio::fs::create_dir(&to).await?;

        let mut read_dir = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let child_to = to.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push((entry.path(), child_to, depth + 1));
            } else if file_type.is_file() {
                tokio::fs::copy(entry.path(), child_to).await?;
            } else {
                tracing::warn!("Skipping special file {} during copy", entry.path().display());
            }
        }
    }
    Ok(())
}
