use std::path::PathBuf;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AppState;
use crate::{
    persistence::{ContentType, PathResolver, ScopePath, StorageScope, Workspace},
    shared::{webdav::DAV_PREFIX, HttpError},
};

/// The resource a DAV request addresses: an authorized scope and a path inside it.
///
/// Extraction authenticates the caller, so it runs after method dispatch.
#[derive(Debug, Clone)]
pub(crate) struct DavTarget {
    pub scope: StorageScope,
    pub path: ScopePath,
    /// Directory of the scope on disk. Exists once extracted.
    pub scope_dir: PathBuf,
    /// `path` on disk. May not exist.
    pub fs_path: PathBuf,
}

impl DavTarget {
    /// Another path of the same scope on disk.
    pub fn resolve(&self, path: &ScopePath) -> PathBuf {
        PathResolver::join(&self.scope_dir, path)
    }
}

impl FromRequestParts<AppState> for DavTarget {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let owner = state
            .access
            .authenticate(&parts.headers)
            .ok_or_else(HttpError::unauthorized)?;

        let workspace_value = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "workspaceId")
                .map(|(_, value)| value.into_owned())
        });
        let workspace = Workspace::from_query_value(workspace_value.as_deref())
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
        if !state.access.can_access(&owner, &workspace) {
            tracing::debug!("{owner} may not access workspace {workspace}");
            return Err(HttpError::forbidden("No access to this workspace"));
        }

        let path = dav_path(parts.uri.path())?;
        if path.is_reserved() {
            return Err(HttpError::forbidden("The trash is not reachable over WebDAV"));
        }

        let scope = StorageScope::new(owner, workspace, ContentType::Files);
        let scope_dir = state.storage.ensure_scope(&scope).await?;
        let fs_path = PathResolver::join(&scope_dir, &path);
        Ok(Self {
            scope,
            path,
            scope_dir,
            fs_path,
        })
    }
}

/// The scope path of a request URL path under the DAV mount.
fn dav_path(uri_path: &str) -> Result<ScopePath, HttpError> {
    let rest = uri_path
        .strip_prefix(DAV_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(HttpError::not_found)?;
    let decoded = percent_encoding::percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| HttpError::bad_request("Path is not valid UTF-8"))?;
    let path = if decoded.is_empty() { "/" } else { decoded.as_ref() };
    ScopePath::new(path).map_err(|e| HttpError::bad_request(e.to_string()))
}
