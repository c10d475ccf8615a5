//! DAV method handlers.
//!
//! Everything under the mount goes through [`dispatch`]: the method is resolved first,
//! so an unsupported method answers 405 without touching storage or auth.

mod copy_move;
mod options;
mod propfind;
mod read;
mod write;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::Method,
    response::Response,
};

use super::{extractors::DavTarget, AppState};
use crate::shared::{HttpError, HttpResult};

/// Methods with a handler. The rest of the advertised list answers 405.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DavMethod {
    Options,
    Propfind,
    Get,
    Put,
    Delete,
    Mkcol,
    Copy,
    Move,
}

impl DavMethod {
    fn from_method(method: &Method) -> Option<Self> {
        let method = match method.as_str() {
            "OPTIONS" => Self::Options,
            "PROPFIND" => Self::Propfind,
            "GET" => Self::Get,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "MKCOL" => Self::Mkcol,
            "COPY" => Self::Copy,
            "MOVE" => Self::Move,
            _ => return None,
        };
        Some(method)
    }
}

pub async fn dispatch(State(state): State<AppState>, request: Request) -> HttpResult<Response> {
    let method = DavMethod::from_method(request.method()).ok_or_else(|| {
        tracing::debug!("Unsupported DAV method {}", request.method());
        HttpError::method_not_allowed()
    })?;
    if method == DavMethod::Options {
        return Ok(options::options());
    }

    let (mut parts, body) = request.into_parts();
    let target = DavTarget::from_request_parts(&mut parts, &state).await?;
    match method {
        DavMethod::Options => Ok(options::options()),
        DavMethod::Propfind => propfind::propfind(&parts.headers, target).await,
        DavMethod::Get => read::get(target).await,
        DavMethod::Put => write::put(&state, target, body).await,
        DavMethod::Delete => write::delete(&state, target).await,
        DavMethod::Mkcol => write::mkcol(&state, target).await,
        DavMethod::Copy => copy_move::copy_or_move(&state, &parts.headers, target, false).await,
        DavMethod::Move => copy_move::copy_or_move(&state, &parts.headers, target, true).await,
    }
}
