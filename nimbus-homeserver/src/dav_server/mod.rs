//! The WebDAV gateway: an axum router mapping DAV methods onto the storage engine.

mod access;
mod app;
mod app_state;
mod extractors;
mod layers;
mod routes;

pub use access::{AccessControl, TrustedHeaderAccess, AUTHENTICATED_USER_HEADER};
pub use app::{DavServer, DavServerBuildError};
pub(crate) use app_state::AppState;
