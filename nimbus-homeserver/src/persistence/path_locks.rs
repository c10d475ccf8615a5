//! Advisory per path locks serializing mutations of the same location.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<PathBuf, Arc<AsyncMutex<()>>>;

/// Keyed async mutexes. Clones share the same lock table.
///
/// A lock entry lives only as long as someone holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<LockMap>>,
}

/// Holds the lock on one path until dropped.
#[derive(Debug)]
pub struct PathGuard {
    locks: PathLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        let mutex = self
            .table()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        PathGuard {
            locks: self.clone(),
            path: path.to_path_buf(),
            guard: Some(guard),
        }
    }

    /// Lock several paths. Acquired in sorted order so two callers locking the
    /// same pair can't deadlock.
    pub async fn lock_many(&self, paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathGuard> {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();

        let mut guards = Vec::with_capacity(paths.len());
        for path in paths {
            guards.push(self.lock(&path).await);
        }
        guards
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.locks.table();
        if let Some(mutex) = table.get(&self.path) {
            // Only the table's own reference left.
            if Arc::strong_count(mutex) == 1 {
                table.remove(&self.path);
            }
        }
    }
}
