use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::shared::webdav::ADVERTISED_METHODS;

pub fn options() -> Response {
    (
        StatusCode::OK,
        [
            (header::HeaderName::from_static("dav"), "1, 2"),
            (header::ALLOW, ADVERTISED_METHODS),
            (header::HeaderName::from_static("ms-author-via"), "DAV"),
        ],
    )
        .into_response()
}
