use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    dav_server::{extractors::DavTarget, AppState},
    persistence::{
        copy_tree, create_parent_dirs, directory_size, ok_if_missing, remove_path, StorageError,
    },
    shared::{
        webdav::{parse_destination, parse_overwrite},
        HttpError, HttpResult,
    },
};

/// COPY (recursive) or MOVE (rename) within the target's scope.
pub async fn copy_or_move(
    state: &AppState,
    headers: &HeaderMap,
    target: DavTarget,
    is_move: bool,
) -> HttpResult<Response> {
    if target.path.is_root() {
        return Err(HttpError::forbidden("The collection root can't be copied or moved"));
    }
    let destination = parse_destination(headers, &target.scope.workspace)?;
    let overwrite = parse_overwrite(headers)?;
    if destination.is_reserved() {
        return Err(HttpError::forbidden("The trash is not reachable over WebDAV"));
    }
    if destination.is_root() || destination.starts_with(&target.path) {
        return Err(HttpError::forbidden("Destination is the source or inside it"));
    }
    if target.path.starts_with(&destination) {
        return Err(HttpError::forbidden("Destination contains the source"));
    }

    let destination_fs = target.resolve(&destination);
    let _guards = state
        .storage
        .locks()
        .lock_many([target.fs_path.clone(), destination_fs.clone()])
        .await;

    let source = tokio::fs::symlink_metadata(&target.fs_path)
        .await
        .map_err(StorageError::from)?;
    if !is_move && source.is_symlink() {
        return Err(HttpError::conflict("Symbolic links can't be copied"));
    }
    let existing = ok_if_missing(tokio::fs::symlink_metadata(&destination_fs).await)?;
    if existing.is_some() && !overwrite {
        return Err(HttpError::precondition_failed(format!(
            "{destination} exists and Overwrite is F"
        )));
    }
    if !is_move {
        let max_depth = state.storage.max_traversal_depth();
        let incoming = size_of(&target.fs_path, &source, max_depth).await?;
        let replaced = match &existing {
            Some(metadata) => size_of(&destination_fs, metadata, max_depth).await?,
            None => 0,
        };
        state
            .storage
            .check_quota(&target.scope, incoming, replaced)
            .await?;
    }
    if existing.is_some() {
        remove_path(&destination_fs).await?;
    }
    if let Some(parent) = destination_fs.parent() {
        create_parent_dirs(parent).await?;
    }

    if is_move {
        tokio::fs::rename(&target.fs_path, &destination_fs)
            .await
            .map_err(StorageError::from)?;
    } else {
        copy_tree(&target.fs_path, &destination_fs, state.storage.max_traversal_depth()).await?;
    }
    tracing::debug!(
        "{} {}{} to {destination}",
        if is_move { "Moved" } else { "Copied" },
        target.scope,
        target.path
    );

    Ok(StatusCode::CREATED.into_response())
}

/// Bytes held by a file or by every file below a folder.
async fn size_of(
    path: &std::path::Path,
    metadata: &std::fs::Metadata,
    max_depth: usize,
) -> Result<u64, StorageError> {
    if metadata.is_dir() {
        directory_size(path, max_depth).await
    } else {
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::{AppContext, ConfigToml, MockDataDir};
    use axum::http::StatusCode;
    use std::fs;

    async fn fixture() -> AppContext {
        let context = AppContext::test().await;
        let dir = files_dir(&context);
        fs::create_dir_all(dir.join("docs/sub")).unwrap();
        fs::write(dir.join("docs/a.txt"), b"a").unwrap();
        fs::write(dir.join("docs/sub/b.txt"), b"b").unwrap();
        fs::write(dir.join("note.txt"), b"note").unwrap();
        context
    }

    #[tokio::test]
    async fn copy_is_recursive() {
        let context = fixture().await;
        let server = create_test_server(&context);
        let response = request(&server, "COPY", "/dav/docs")
            .add_header("destination", "http://localhost/dav/backup/docs")
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let dir = files_dir(&context);
        assert_eq!(fs::read(dir.join("backup/docs/sub/b.txt")).unwrap(), b"b");
        assert_eq!(fs::read(dir.join("docs/a.txt")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn move_renames() {
        let context = fixture().await;
        let server = create_test_server(&context);
        let response = request(&server, "MOVE", "/dav/note.txt")
            .add_header("destination", "/dav/docs/renamed%20note.txt")
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        let dir = files_dir(&context);
        assert!(!dir.join("note.txt").exists());
        assert_eq!(fs::read(dir.join("docs/renamed note.txt")).unwrap(), b"note");
    }

    #[tokio::test]
    async fn overwrite_header_controls_replacement() {
        let context = fixture().await;
        let server = create_test_server(&context);

        let response = request(&server, "COPY", "/dav/note.txt")
            .add_header("destination", "/dav/docs/a.txt")
            .add_header("overwrite", "F")
            .await;
        assert_eq!(response.status_code(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(fs::read(files_dir(&context).join("docs/a.txt")).unwrap(), b"a");

        let response = request(&server, "COPY", "/dav/note.txt")
            .add_header("destination", "/dav/docs/a.txt")
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(fs::read(files_dir(&context).join("docs/a.txt")).unwrap(), b"note");
    }

    #[tokio::test]
    async fn rejected_destinations() {
        let context = fixture().await;
        let server = create_test_server(&context);
        let cases = [
            (None, StatusCode::BAD_REQUEST),
            (Some("/elsewhere/x"), StatusCode::BAD_REQUEST),
            (Some("/dav/docs"), StatusCode::FORBIDDEN),
            (Some("/dav/docs/sub/inner"), StatusCode::FORBIDDEN),
            (Some("/dav/.trash/docs"), StatusCode::FORBIDDEN),
            (Some("/dav/copy?workspaceId=team"), StatusCode::FORBIDDEN),
            (Some("/dav/docs/.trash/docs"), StatusCode::FORBIDDEN),
        ];
        for (destination, status) in cases {
            let mut req = request(&server, "MOVE", "/dav/docs");
            if let Some(destination) = destination {
                req = req.add_header("destination", destination);
            }
            let response = req.await;
            assert_eq!(response.status_code(), status, "{destination:?}");
        }
        assert!(files_dir(&context).join("docs/a.txt").exists());
    }

    #[tokio::test]
    async fn destination_above_the_source_is_rejected() {
        let context = fixture().await;
        let server = create_test_server(&context);
        for name in ["MOVE", "COPY"] {
            let response = request(&server, name, "/dav/docs/sub")
                .add_header("destination", "/dav/docs")
                .await;
            assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{name}");
        }
        let dir = files_dir(&context);
        assert_eq!(fs::read(dir.join("docs/a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(dir.join("docs/sub/b.txt")).unwrap(), b"b");
    }

    #[tokio::test]
    async fn copy_over_quota_leaves_the_destination() {
        let mut config = ConfigToml::test();
        config.general.storage_quota_mb = 1;
        let context = AppContext::read_from(MockDataDir::new(config, None).unwrap())
            .await
            .unwrap();
        let dir = files_dir(&context);
        fs::create_dir_all(dir.join("big")).unwrap();
        fs::write(dir.join("big/blob.bin"), vec![0u8; 600 * 1024]).unwrap();
        fs::write(dir.join("target.txt"), b"keep me").unwrap();
        let server = create_test_server(&context);

        let response = request(&server, "COPY", "/dav/big")
            .add_header("destination", "/dav/target.txt")
            .await;
        assert_eq!(response.status_code(), StatusCode::INSUFFICIENT_STORAGE);
        assert_eq!(fs::read(dir.join("target.txt")).unwrap(), b"keep me");

        // Replacing the copy's own bytes fits.
        let response = request(&server, "COPY", "/dav/target.txt")
            .add_header("destination", "/dav/big/blob.bin")
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        // Moving never adds usage.
        fs::write(dir.join("big/blob.bin"), vec![0u8; 600 * 1024]).unwrap();
        let response = request(&server, "MOVE", "/dav/big")
            .add_header("destination", "/dav/moved")
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copying_a_symlink_conflicts() {
        let context = fixture().await;
        let outside = tempfile::TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        let dir = files_dir(&context);
        std::os::unix::fs::symlink(outside.path(), dir.join("link")).unwrap();
        let server = create_test_server(&context);

        let response = request(&server, "COPY", "/dav/link")
            .add_header("destination", "/dav/note.txt")
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        assert_eq!(fs::read(dir.join("note.txt")).unwrap(), b"note");
        assert!(!dir.join("note.txt").is_dir());
    }

    #[tokio::test]
    async fn missing_source() {
        let context = fixture().await;
        let server = create_test_server(&context);
        let response = request(&server, "COPY", "/dav/nope.txt")
            .add_header("destination", "/dav/copy.txt")
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
