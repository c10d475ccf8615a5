use axum::http::HeaderMap;
use url::Url;

use super::DAV_PREFIX;
use crate::{
    persistence::{ScopePath, Workspace},
    shared::HttpError,
};

/// Resolve the `Destination` header of a COPY or MOVE into a path in the request's scope.
///
/// Accepts absolute URLs and absolute paths. The destination must lie under the WebDAV
/// mount and address the same workspace as the request.
pub(crate) fn parse_destination(
    headers: &HeaderMap,
    request_workspace: &Workspace,
) -> Result<ScopePath, HttpError> {
    let raw = headers
        .get("destination")
        .ok_or_else(|| HttpError::bad_request("Destination header is required"))?
        .to_str()
        .map_err(|_| HttpError::bad_request("Destination header is not valid ASCII"))?;

    let url = if raw.starts_with('/') {
        Url::parse("http://localhost").and_then(|base| base.join(raw))
    } else {
        Url::parse(raw)
    }
    .map_err(|e| HttpError::bad_request(format!("Destination is not a valid URL: {e}")))?;

    let workspace_value = url
        .query_pairs()
        .find(|(key, _)| key == "workspaceId")
        .map(|(_, value)| value.into_owned());
    let workspace = Workspace::from_query_value(workspace_value.as_deref())
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    if &workspace != request_workspace {
        return Err(HttpError::forbidden(
            "Destination must be in the same workspace as the source",
        ));
    }

    let rest = url
        .path()
        .strip_prefix(DAV_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| HttpError::bad_request("Destination is outside the WebDAV tree"))?;
    let decoded = percent_encoding::percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| HttpError::bad_request("Destination is not valid UTF-8"))?;
    let path = if decoded.is_empty() { "/" } else { decoded.as_ref() };

    ScopePath::new(path).map_err(|e| HttpError::bad_request(e.to_string()))
}

/// The `Overwrite` header. Defaults to `T`.
pub(crate) fn parse_overwrite(headers: &HeaderMap) -> Result<bool, HttpError> {
    match headers.get("overwrite").map(|v| v.to_str().map(str::trim)) {
        None => Ok(true),
        Some(Ok(v)) if v.eq_ignore_ascii_case("t") => Ok(true),
        Some(Ok(v)) if v.eq_ignore_ascii_case("f") => Ok(false),
        _ => Err(HttpError::bad_request("Overwrite must be T or F")),
    }
}
