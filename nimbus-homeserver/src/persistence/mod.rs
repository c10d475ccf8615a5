mod catalog;
mod codec;
mod path_locks;
mod quota;
mod scope;
mod scope_path;
mod storage_error;
mod storage_service;
mod trash;
mod tree_ops;
mod walk;

pub use catalog::{Entry, EntryKind};
pub use path_locks::{PathGuard, PathLocks};
pub use quota::QuotaReport;
pub use scope::{ContentType, PathResolver, StorageScope, UserId, Workspace, WorkspaceId};
pub use scope_path::ScopePath;
pub use storage_error::StorageError;
pub use storage_service::StorageService;
pub use trash::{BatchItemResult, TrashBin, TrashEntry};

pub(crate) use catalog::list_dir;
pub(crate) use quota::directory_size;
pub(crate) use storage_error::ok_if_missing;
pub(crate) use tree_ops::{copy_tree, create_parent_dirs, remove_path};
