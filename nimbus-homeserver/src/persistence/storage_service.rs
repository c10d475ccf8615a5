//! The service level entry point to the storage engine.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use nimbus_common::{
    constants::sealed_layout::OVERHEAD,
    keys::{KeyProvider, TenantKey},
};

use super::{
    catalog::{self, Entry},
    codec,
    path_locks::PathLocks,
    quota::{QuotaAccountant, QuotaReport},
    storage_error::ok_if_missing,
    trash::TrashBin,
    tree_ops, ContentType, PathResolver, ScopePath, StorageError, StorageScope, UserId, Workspace,
};

/// Binds the storage components to one storage root.
///
/// Cheap to clone; clones share key provider and path locks.
#[derive(Debug, Clone)]
pub struct StorageService {
    resolver: PathResolver,
    keys: Arc<dyn KeyProvider>,
    locks: PathLocks,
    quota: QuotaAccountant,
    max_depth: usize,
    quota_bytes: Option<u64>,
}

impl StorageService {
    /// Create a service over `root`.
    ///
    /// `quota_bytes` is the per tenant limit enforced on writes, `None` for unlimited.
    pub fn new(
        root: impl Into<PathBuf>,
        keys: Arc<dyn KeyProvider>,
        max_depth: usize,
        quota_bytes: Option<u64>,
    ) -> Self {
        let resolver = PathResolver::new(root);
        Self {
            quota: QuotaAccountant::new(resolver.clone(), max_depth),
            resolver,
            keys,
            locks: PathLocks::new(),
            max_depth,
            quota_bytes,
        }
    }

    /// A service over `root` with a fixed master secret and no quota.
    #[cfg(any(test, feature = "testing"))]
    pub fn test(root: &Path) -> Self {
        use nimbus_common::keys::{DerivedKeyProvider, MasterSecret};
        let keys = DerivedKeyProvider::new(MasterSecret::from_bytes([0; 32]));
        Self::new(root, Arc::new(keys), 64, None)
    }

    /// The path resolver of this service.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Per path locks shared by every mutation of this service.
    pub fn locks(&self) -> &PathLocks {
        &self.locks
    }

    /// Deepest directory level search, quota and copy will walk.
    pub fn max_traversal_depth(&self) -> usize {
        self.max_depth
    }

    /// Per tenant quota, `None` for unlimited.
    pub fn quota_bytes(&self) -> Option<u64> {
        self.quota_bytes
    }

    /// Directory of `scope`. May not exist yet.
    pub fn scope_dir(&self, scope: &StorageScope) -> PathBuf {
        self.resolver.resolve_scope(scope)
    }

    /// Directory of `scope`, created if missing.
    pub async fn ensure_scope(&self, scope: &StorageScope) -> Result<PathBuf, StorageError> {
        Ok(self.resolver.ensure(scope).await?)
    }

    async fn tenant_key(&self, scope: &StorageScope) -> Result<TenantKey, StorageError> {
        Ok(self.keys.tenant_key(&scope.tenant_key_id())?)
    }

    fn item_path(&self, scope: &StorageScope, path: &ScopePath) -> Result<PathBuf, StorageError> {
        if path.is_root() {
            return Err(StorageError::InvalidPath("the scope root is not a file".to_string()));
        }
        if path.is_reserved() {
            return Err(StorageError::InvalidPath(format!("'{path}' is inside the trash")));
        }
        Ok(PathResolver::join(&self.scope_dir(scope), path))
    }

    /// Top level entries of `scope`.
    pub async fn list(&self, scope: &StorageScope) -> Result<Vec<Entry>, StorageError> {
        catalog::list(&self.scope_dir(scope)).await
    }

    /// Entries of one folder of `scope`.
    pub async fn list_metadata(
        &self,
        scope: &StorageScope,
        sub_path: &ScopePath,
    ) -> Result<Vec<Entry>, StorageError> {
        catalog::list_metadata(&self.scope_dir(scope), sub_path).await
    }

    /// Search `scope` by name.
    pub async fn search(&self, scope: &StorageScope, query: &str) -> Result<Vec<Entry>, StorageError> {
        catalog::search(&self.scope_dir(scope), query, self.max_depth).await
    }

    /// Create a folder and any missing parents.
    pub async fn create_folder(
        &self,
        scope: &StorageScope,
        path: &ScopePath,
    ) -> Result<Entry, StorageError> {
        let target = self.item_path(scope, path)?;
        let _guard = self.locks.lock(&target).await;
        if ok_if_missing(tokio::fs::symlink_metadata(&target).await)?.is_some() {
            return Err(StorageError::Conflict(format!("'{path}' already exists")));
        }
        tree_ops::create_parent_dirs(&target).await?;
        let metadata = tokio::fs::metadata(&target).await?;
        Ok(Entry::from_metadata(
            path.file_name().unwrap_or_default().to_string(),
            path.relative().to_string(),
            &metadata,
        ))
    }

    /// Write a whole file, replacing an existing one.
    ///
    /// Files of [`ContentType::Files`] are encrypted with the tenant's key. Fails with
    /// [`StorageError::QuotaExceeded`] before writing if the tenant would go over quota.
    pub async fn write_file(
        &self,
        scope: &StorageScope,
        path: &ScopePath,
        bytes: &[u8],
    ) -> Result<Entry, StorageError> {
        let target = self.item_path(scope, path)?;
        let name = path.file_name().unwrap_or_default();
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.scope_dir(scope));
        let _guard = self.locks.lock(&target).await;

        let replaced = match ok_if_missing(tokio::fs::symlink_metadata(&target).await)? {
            Some(m) if m.is_dir() => {
                return Err(StorageError::Conflict(format!("'{path}' is a folder")));
            }
            Some(m) => m.len(),
            None => 0,
        };
        let stored_len = if scope.content_type.is_encrypted() {
            bytes.len() as u64 + OVERHEAD as u64
        } else {
            bytes.len() as u64
        };
        self.check_quota(scope, stored_len, replaced).await?;

        tree_ops::create_parent_dirs(&dir).await?;
        if scope.content_type.is_encrypted() {
            let key = self.tenant_key(scope).await?;
            codec::encrypt_and_store(&key, bytes, name, &dir).await?;
        } else {
            tokio::fs::write(&target, bytes).await?;
        }
        tracing::debug!("Wrote {} bytes to {scope}{path}", bytes.len());

        let metadata = tokio::fs::metadata(&target).await?;
        Ok(Entry::from_metadata(
            name.to_string(),
            path.relative().to_string(),
            &metadata,
        ))
    }

    /// Read a whole file, decrypting [`ContentType::Files`] payloads.
    pub async fn read_file(&self, scope: &StorageScope, path: &ScopePath) -> Result<Vec<u8>, StorageError> {
        let target = self.item_path(scope, path)?;
        if tokio::fs::metadata(&target).await?.is_dir() {
            return Err(StorageError::Conflict(format!("'{path}' is a folder")));
        }
        if !scope.content_type.is_encrypted() {
            return Ok(tokio::fs::read(&target).await?);
        }

        let key = self.tenant_key(scope).await?;
        let dir = target.parent().unwrap_or(&target);
        let name = path.file_name().unwrap_or_default();
        codec::read_and_decrypt(&key, name, dir).await.inspect_err(|e| {
            if matches!(e, StorageError::Integrity(_)) {
                tracing::error!("Integrity failure reading {scope}{path}: {e}");
            }
        })
    }

    /// The trash of `scope`.
    pub fn trash(&self, scope: &StorageScope) -> TrashBin {
        TrashBin::new(self.scope_dir(scope), self.locks.clone())
    }

    /// Bytes used by the tenant across all content types, trash included.
    pub async fn usage(&self, owner: &UserId, workspace: &Workspace) -> Result<u64, StorageError> {
        self.quota.usage(owner, workspace).await
    }

    /// Bytes used by one content type of the tenant.
    pub async fn usage_by_type(
        &self,
        owner: &UserId,
        workspace: &Workspace,
        content_type: ContentType,
    ) -> Result<u64, StorageError> {
        self.quota.usage_by_type(owner, workspace, content_type).await
    }

    /// Usage of the tenant broken down by content type.
    pub async fn usage_report(
        &self,
        owner: &UserId,
        workspace: &Workspace,
    ) -> Result<QuotaReport, StorageError> {
        self.quota.usage_report(owner, workspace).await
    }

    /// Fail if writing `incoming` bytes in place of `replaced` bytes would put the
    /// tenant of `scope` over quota.
    pub async fn check_quota(
        &self,
        scope: &StorageScope,
        incoming: u64,
        replaced: u64,
    ) -> Result<(), StorageError> {
        let Some(limit_bytes) = self.quota_bytes else {
            return Ok(());
        };
        let used = self.usage(&scope.owner, &scope.workspace).await?;
        if used + incoming.saturating_sub(replaced) > limit_bytes {
            tracing::debug!("Quota of {limit_bytes} bytes exceeded for {scope}");
            return Err(StorageError::QuotaExceeded { limit_bytes });
        }
        Ok(())
    }
}
