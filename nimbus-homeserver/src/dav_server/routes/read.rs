use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::{
    dav_server::extractors::DavTarget,
    persistence::StorageError,
    shared::{HttpError, HttpResult},
};

pub async fn get(target: DavTarget) -> HttpResult<Response> {
    let metadata = tokio::fs::metadata(&target.fs_path)
        .await
        .map_err(StorageError::from)?;
    if metadata.is_dir() {
        return Err(HttpError::method_not_allowed());
    }
    let file = tokio::fs::File::open(&target.fs_path)
        .await
        .map_err(StorageError::from)?;

    let content_type = mime_guess::from_path(target.path.as_str()).first_or_octet_stream();
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_TYPE, content_type.as_ref());
    if let Ok(modified) = metadata.modified() {
        response = response.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
    }

    Ok(response.body(Body::from_stream(ReaderStream::new(file)))?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::AppContext;
    use axum::http::{header, StatusCode};
    use std::fs;

    #[tokio::test]
    async fn streams_file_with_headers() {
        let context = AppContext::test().await;
        let dir = files_dir(&context);
        fs::create_dir_all(dir.join("docs")).unwrap();
        fs::write(dir.join("docs/readme.txt"), b"# hello").unwrap();
        let server = create_test_server(&context);

        let response = request(&server, "GET", "/dav/docs/readme.txt").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "# hello");
        assert_eq!(response.header(header::CONTENT_LENGTH), "7");
        assert_eq!(response.header(header::CONTENT_TYPE), "text/plain");
        assert!(response.maybe_header(header::LAST_MODIFIED).is_some());
    }

    #[tokio::test]
    async fn missing_file_and_collection() {
        let context = AppContext::test().await;
        fs::create_dir_all(files_dir(&context).join("docs")).unwrap();
        let server = create_test_server(&context);

        let response = request(&server, "GET", "/dav/missing.txt").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = request(&server, "GET", "/dav/docs").await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn percent_encoded_names() {
        let context = AppContext::test().await;
        fs::write(files_dir(&context).join("my notes.txt"), b"x").unwrap();
        let server = create_test_server(&context);
        let response = request(&server, "GET", "/dav/my%20notes.txt").await;
        assert_eq!(response.text(), "x");
    }
}
