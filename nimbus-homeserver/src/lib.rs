#![doc = include_str!("../README.md")]
//!

#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(any(), deny(clippy::unwrap_used))]

mod app_context;
mod dav_server;
mod data_directory;
mod persistence;
mod shared;
mod tracing;

pub use app_context::{AppContext, AppContextConversionError};
pub use dav_server::{
    AccessControl, DavServer, DavServerBuildError, TrustedHeaderAccess, AUTHENTICATED_USER_HEADER,
};
pub use data_directory::*;
pub use persistence::{
    BatchItemResult, ContentType, Entry, EntryKind, PathGuard, PathLocks, PathResolver, QuotaReport,
    ScopePath, StorageError, StorageScope, StorageService, TrashBin, TrashEntry, UserId, Workspace,
    WorkspaceId,
};
pub use crate::tracing::{init_tracing_logs_if_set, init_tracing_logs_with_config_if_set};
