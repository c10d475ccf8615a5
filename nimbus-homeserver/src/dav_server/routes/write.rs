use axum::{
    body::{Body, HttpBody},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::stream::StreamExt;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::{
    dav_server::{extractors::DavTarget, AppState},
    persistence::{create_parent_dirs, ok_if_missing, remove_path, StorageScope, StorageService},
    shared::{HttpError, HttpResult},
};

pub async fn put(state: &AppState, target: DavTarget, body: Body) -> HttpResult<Response> {
    if target.path.is_root() {
        return Err(HttpError::conflict("The collection root can't be replaced by a file"));
    }
    let _guard = state.storage.locks().lock(&target.fs_path).await;

    let replaced = match ok_if_missing(tokio::fs::symlink_metadata(&target.fs_path).await)? {
        Some(m) if m.is_dir() => {
            return Err(HttpError::conflict(format!("{} is a collection", target.path)));
        }
        Some(m) => m.len(),
        None => 0,
    };

    // Check the size hint against the limits so we can fail before writing anything.
    let remaining = remaining_quota(&state.storage, &target.scope, replaced).await?;
    fail_if_size_hint_exceeds_limits(
        body.size_hint().exact(),
        state.max_body_bytes,
        remaining,
        state.storage.quota_bytes(),
    )?;

    let parent = target.fs_path.parent().unwrap_or(target.scope_dir.as_path());
    create_parent_dirs(parent).await?;
    let (written, upload) = write_stream(state, &target, parent, body, remaining).await?;
    upload.persist(&target.fs_path).map_err(|e| e.error)?;
    tracing::debug!("Stored {written} bytes at {}{}", target.scope, target.path);

    Ok(StatusCode::CREATED.into_response())
}

/// Stream `body` into a temporary file in `dir`, enforcing the body and quota limits as
/// bytes arrive. The temporary file is removed unless the returned path is persisted.
async fn write_stream(
    state: &AppState,
    target: &DavTarget,
    dir: &Path,
    body: Body,
    remaining: Option<u64>,
) -> HttpResult<(u64, TempPath)> {
    let (file, upload) = tempfile::Builder::new()
        .prefix(".upload-")
        .tempfile_in(dir)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let mut stream = body.into_data_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!("Upload to {} interrupted: {e}", target.path);
            HttpError::from(e)
        })?;
        written += chunk.len() as u64;
        fail_if_size_hint_exceeds_limits(
            Some(written),
            state.max_body_bytes,
            remaining,
            state.storage.quota_bytes(),
        )?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok((written, upload))
}

/// Bytes the tenant may still write in place of `replaced` bytes. `None` when there is
/// no quota.
async fn remaining_quota(
    storage: &StorageService,
    scope: &StorageScope,
    replaced: u64,
) -> HttpResult<Option<u64>> {
    let Some(limit) = storage.quota_bytes() else {
        return Ok(None);
    };
    let used = storage.usage(&scope.owner, &scope.workspace).await?;
    Ok(Some((limit + replaced).saturating_sub(used)))
}

/// Checks a body size against the body limit and the remaining quota.
/// Will return Ok if there is no size hint.
/// Will return Ok if there is no quota and the body limit holds.
fn fail_if_size_hint_exceeds_limits(
    content_size_hint: Option<u64>,
    max_body_bytes: u64,
    remaining_quota_bytes: Option<u64>,
    quota_bytes: Option<u64>,
) -> HttpResult<()> {
    let Some(size) = content_size_hint else {
        return Ok(()); // No size hint, so we can't check
    };
    if size > max_body_bytes {
        return Err(HttpError::payload_too_large(max_body_bytes));
    }
    match remaining_quota_bytes {
        Some(remaining) if size > remaining => Err(HttpError::insufficient_storage(
            quota_bytes.unwrap_or_default(),
        )),
        _ => Ok(()),
    }
}

pub async fn delete(state: &AppState, target: DavTarget) -> HttpResult<Response> {
    if target.path.is_root() {
        return Err(HttpError::forbidden("The collection root can't be deleted"));
    }
    let _guard = state.storage.locks().lock(&target.fs_path).await;
    if !remove_path(&target.fs_path).await? {
        return Err(HttpError::not_found());
    }
    tracing::debug!("Deleted {}{}", target.scope, target.path);
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn mkcol(state: &AppState, target: DavTarget) -> HttpResult<Response> {
    if target.path.is_root() {
        return Err(HttpError::method_not_allowed());
    }
    let _guard = state.storage.locks().lock(&target.fs_path).await;
    if ok_if_missing(tokio::fs::symlink_metadata(&target.fs_path).await)?.is_some() {
        return Err(HttpError::method_not_allowed());
    }
    let parent_is_dir = match target.fs_path.parent() {
        Some(parent) => ok_if_missing(tokio::fs::metadata(parent).await)?.is_some_and(|m| m.is_dir()),
        None => false,
    };
    if !parent_is_dir {
        return Err(HttpError::conflict("Parent collection does not exist"));
    }
    tokio::fs::create_dir(&target.fs_path).await?;
    Ok(StatusCode::CREATED.into_response())
}
