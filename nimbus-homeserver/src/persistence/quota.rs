//! Storage usage accounting.
//!
//! Usage is recomputed from disk on every call. Trashed items count until they are
//! permanently deleted.

use std::{collections::BTreeMap, path::Path};

use serde::Serialize;

use super::{walk::TreeWalk, ContentType, PathResolver, StorageError, UserId, Workspace};

/// Usage of one tenant broken down by content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaReport {
    /// Sum over all content types.
    pub total_bytes: u64,
    /// Bytes per content type. Every type is present.
    pub per_type: BTreeMap<ContentType, u64>,
}

/// Total size of every file below `dir`, trash included. A missing directory is 0.
pub(crate) async fn directory_size(dir: &Path, max_depth: usize) -> Result<u64, StorageError> {
    let mut walk = TreeWalk::new(dir, max_depth);
    let mut total = 0u64;
    while let Some(entry) = walk.next_entry().await? {
        if !entry.is_dir() {
            total += entry.metadata.len();
        }
    }
    Ok(total)
}

/// Sums usage per tenant over the resolved scope directories.
#[derive(Debug, Clone)]
pub(crate) struct QuotaAccountant {
    resolver: PathResolver,
    max_depth: usize,
}

impl QuotaAccountant {
    pub fn new(resolver: PathResolver, max_depth: usize) -> Self {
        Self {
            resolver,
            max_depth,
        }
    }

    pub async fn usage_by_type(
        &self,
        owner: &UserId,
        workspace: &Workspace,
        content_type: ContentType,
    ) -> Result<u64, StorageError> {
        let dir = self.resolver.resolve(owner, workspace, content_type);
        directory_size(&dir, self.max_depth).await
    }

    pub async fn usage_report(
        &self,
        owner: &UserId,
        workspace: &Workspace,
    ) -> Result<QuotaReport, StorageError> {
        let mut per_type = BTreeMap::new();
        for content_type in ContentType::ALL {
            per_type.insert(
                content_type,
                self.usage_by_type(owner, workspace, content_type).await?,
            );
        }
        Ok(QuotaReport {
            total_bytes: per_type.values().sum(),
            per_type,
        })
    }

    pub async fn usage(&self, owner: &UserId, workspace: &Workspace) -> Result<u64, StorageError> {
        Ok(self.usage_report(owner, workspace).await?.total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::WorkspaceId;
    use std::fs;

    fn setup() -> (tempfile::TempDir, QuotaAccountant, UserId) {
        let temp = tempfile::TempDir::new().unwrap();
        let accountant = QuotaAccountant::new(PathResolver::new(temp.path()), 64);
        (temp, accountant, UserId::new("alice").unwrap())
    }

    fn write(dir: &Path, rel: &str, len: usize) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; len]).unwrap();
    }

    #[tokio::test]
    async fn missing_scope_is_zero() {
        let (_temp, accountant, alice) = setup();
        assert_eq!(accountant.usage(&alice, &Workspace::Personal).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn total_is_sum_of_types() {
        let (temp, accountant, alice) = setup();
        let user_dir = temp.path().join("users/alice");
        write(&user_dir, "files/a.bin", 100);
        write(&user_dir, "files/deep/er/b.bin", 50);
        write(&user_dir, "notes/n.md", 7);
        write(&user_dir, "photos/p.jpg", 3000);

        let report = accountant
            .usage_report(&alice, &Workspace::Personal)
            .await
            .unwrap();
        assert_eq!(report.per_type[&ContentType::Files], 150);
        assert_eq!(report.per_type[&ContentType::Notes], 7);
        assert_eq!(report.per_type[&ContentType::Photos], 3000);
        assert_eq!(report.total_bytes, 3157);

        let total = accountant.usage(&alice, &Workspace::Personal).await.unwrap();
        let mut sum = 0;
        for ct in ContentType::ALL {
            sum += accountant
                .usage_by_type(&alice, &Workspace::Personal, ct)
                .await
                .unwrap();
        }
        assert_eq!(total, sum);
    }

    #[tokio::test]
    async fn new_file_adds_its_size() {
        let (temp, accountant, alice) = setup();
        let files = temp.path().join("users/alice/files");
        write(&files, "existing.bin", 10);
        let before = accountant.usage(&alice, &Workspace::Personal).await.unwrap();

        write(&files, "new.bin", 1234);
        let after = accountant.usage(&alice, &Workspace::Personal).await.unwrap();
        assert_eq!(after - before, 1234);
    }

    #[tokio::test]
    async fn trash_still_counts() {
        let (temp, accountant, alice) = setup();
        write(&temp.path().join("users/alice/files"), ".trash/old.bin", 500);
        assert_eq!(accountant.usage(&alice, &Workspace::Personal).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn workspaces_are_accounted_separately() {
        let (temp, accountant, alice) = setup();
        let team = Workspace::Shared(WorkspaceId::new("team").unwrap());
        write(&temp.path().join("workspaces/team/files"), "shared.bin", 42);
        write(&temp.path().join("users/alice/files"), "mine.bin", 8);

        assert_eq!(accountant.usage(&alice, &team).await.unwrap(), 42);
        let bob = UserId::new("bob").unwrap();
        assert_eq!(accountant.usage(&bob, &team).await.unwrap(), 42);
        assert_eq!(accountant.usage(&alice, &Workspace::Personal).await.unwrap(), 8);
    }
}
