use axum::http::HeaderMap;

use crate::shared::HttpError;

/// The `Depth` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    /// Parse the header. A missing header means `infinity`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, HttpError> {
        let Some(value) = headers.get("depth") else {
            return Ok(Depth::Infinity);
        };
        match value.to_str().map(str::trim) {
            Ok("0") => Ok(Depth::Zero),
            Ok("1") => Ok(Depth::One),
            Ok(v) if v.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
            _ => Err(HttpError::bad_request("Depth must be 0, 1 or infinity")),
        }
    }

    /// Infinite listings are served one level deep.
    pub fn clamped(self) -> Self {
        match self {
            Depth::Infinity => Depth::One,
            depth => depth,
        }
    }
}
