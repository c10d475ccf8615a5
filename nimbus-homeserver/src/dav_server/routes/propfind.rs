use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    dav_server::extractors::DavTarget,
    persistence::{list_dir, StorageError},
    shared::{
        webdav::{multistatus, Depth, PropEntry, XML_CONTENT_TYPE},
        HttpResult,
    },
};

/// The request body is ignored, every request is answered like `allprop`.
pub async fn propfind(headers: &HeaderMap, target: DavTarget) -> HttpResult<Response> {
    let depth = Depth::from_headers(headers)?.clamped();
    let metadata = tokio::fs::metadata(&target.fs_path)
        .await
        .map_err(StorageError::from)?;

    let mut entries = vec![PropEntry::from_metadata(&target.path, &metadata)];
    if depth != Depth::Zero && metadata.is_dir() {
        for entry in list_dir(&target.fs_path, target.path.relative(), true).await? {
            match PropEntry::from_entry(&target.path, &entry) {
                Ok(prop) => entries.push(prop),
                Err(e) => tracing::warn!("Leaving {} out of the listing: {e}", entry.path),
            }
        }
    }

    Ok((
        StatusCode::MULTI_STATUS,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        multistatus(&entries),
    )
        .into_response())
}
