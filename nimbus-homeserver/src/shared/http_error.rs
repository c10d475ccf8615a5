//! Server error
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};

use crate::persistence::StorageError;

use super::webdav::{error_body, ADVERTISED_METHODS, XML_CONTENT_TYPE};

pub(crate) type HttpResult<T, E = HttpError> = core::result::Result<T, E>;

/// An error response. Always rendered as a DAV error document.
#[derive(Debug, Clone)]
pub(crate) struct HttpError {
    status: StatusCode,
    detail: Option<String>,
}

impl Default for HttpError {
    fn default() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        }
    }
}

impl HttpError {
    pub fn new(status_code: StatusCode, message: Option<impl ToString>) -> HttpError {
        Self {
            status: status_code,
            detail: message.map(|m| m.to_string()),
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn not_found() -> HttpError {
        Self::new(StatusCode::NOT_FOUND, Some("Not Found"))
    }

    pub fn internal_server() -> HttpError {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, Some("Internal server error"))
    }

    pub fn bad_request(message: impl ToString) -> HttpError {
        Self::new(StatusCode::BAD_REQUEST, Some(message))
    }

    pub fn conflict(message: impl ToString) -> HttpError {
        Self::new(StatusCode::CONFLICT, Some(message))
    }

    pub fn method_not_allowed() -> HttpError {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, Some("Method not allowed"))
    }

    pub fn precondition_failed(message: impl ToString) -> HttpError {
        Self::new(StatusCode::PRECONDITION_FAILED, Some(message))
    }

    pub fn payload_too_large(limit_bytes: u64) -> HttpError {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            Some(format!("Request body exceeds {limit_bytes} bytes")),
        )
    }

    pub fn insufficient_storage(limit_bytes: u64) -> HttpError {
        let limit_mb = limit_bytes as f64 / 1024.0 / 1024.0;
        Self::new(
            StatusCode::INSUFFICIENT_STORAGE,
            Some(format!("Storage quota of {limit_mb:.1} MB exceeded")),
        )
    }

    pub fn forbidden(message: impl ToString) -> HttpError {
        Self::new(StatusCode::FORBIDDEN, Some(message))
    }

    pub fn unauthorized() -> HttpError {
        Self::new(StatusCode::UNAUTHORIZED, Some("Unauthorized"))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        if let Some(detail) = &self.detail {
            tracing::debug!(status = %self.status, "{detail}");
        }
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            error_body(self.status),
        )
            .into_response();

        let headers = response.headers_mut();
        match self.status {
            StatusCode::UNAUTHORIZED => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"nimbus\""),
                );
            }
            StatusCode::METHOD_NOT_ALLOWED => {
                headers.insert(header::ALLOW, HeaderValue::from_static(ADVERTISED_METHODS));
            }
            _ => {}
        }
        response
    }
}

// === INTERNAL_SERVER_ERROR ===
// Very common errors that we can just convert to a Internal Server Error.
// This way, we can use `?` to propagate errors without having to handle them.

impl From<std::io::Error> for HttpError {
    fn from(error: std::io::Error) -> Self {
        tracing::error!(?error);
        Self::internal_server()
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!(?error);
        Self::internal_server()
    }
}

impl From<axum::Error> for HttpError {
    fn from(error: axum::Error) -> Self {
        tracing::error!(?error);
        Self::internal_server()
    }
}

impl From<axum::http::Error> for HttpError {
    fn from(error: axum::http::Error) -> Self {
        tracing::error!(?error);
        Self::internal_server()
    }
}

impl From<StorageError> for HttpError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound => Self::not_found(),
            StorageError::Conflict(msg) => Self::conflict(msg),
            StorageError::InvalidName(msg) | StorageError::InvalidPath(msg) => {
                Self::bad_request(msg)
            }
            StorageError::QuotaExceeded { limit_bytes } => Self::insufficient_storage(limit_bytes),
            e => {
                tracing::error!(?e);
                Self::internal_server()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_common::crypto::CryptoError;

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (StorageError::NotFound, StatusCode::NOT_FOUND),
            (StorageError::Conflict("x".into()), StatusCode::CONFLICT),
            (StorageError::InvalidName("x".into()), StatusCode::BAD_REQUEST),
            (StorageError::InvalidPath("x".into()), StatusCode::BAD_REQUEST),
            (
                StorageError::QuotaExceeded { limit_bytes: 1 },
                StatusCode::INSUFFICIENT_STORAGE,
            ),
            (
                StorageError::Integrity(CryptoError::IntegrityFailure),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StorageError::TraversalTooDeep { max_depth: 1 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StorageError::Io(std::io::Error::other("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status(), status);
        }
    }

    #[tokio::test]
    async fn renders_dav_error_document() {
        let response = HttpError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XML_CONTENT_TYPE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<D:error xmlns:D=\"DAV:\">"));
        assert!(body.contains("<D:status>HTTP/1.1 404 Not Found</D:status>"));
    }

    #[test]
    fn unauthorized_asks_for_credentials() {
        let response = HttpError::unauthorized().into_response();
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = HttpError::method_not_allowed().into_response();
        assert_eq!(response.headers()[header::ALLOW], ADVERTISED_METHODS);
    }
}
