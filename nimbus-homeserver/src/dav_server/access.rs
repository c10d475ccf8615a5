use axum::http::HeaderMap;

use crate::persistence::{UserId, Workspace};

/// Header set by an authenticating reverse proxy.
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

/// Decides who a request belongs to and which workspaces they may touch.
pub trait AccessControl: Send + Sync + 'static {
    /// The user the request is made by. `None` answers with 401.
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId>;

    /// Whether `user` may read and write `workspace`. `false` answers with 403.
    fn can_access(&self, user: &UserId, workspace: &Workspace) -> bool;
}

/// Trusts the [`AUTHENTICATED_USER_HEADER`] of an upstream proxy and lets every user
/// into every workspace.
///
/// Only deploy behind a proxy that strips the header from client requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedHeaderAccess;

impl AccessControl for TrustedHeaderAccess {
    fn authenticate(&self, headers: &HeaderMap) -> Option<UserId> {
        let value = headers.get(AUTHENTICATED_USER_HEADER)?.to_str().ok()?;
        match UserId::new(value.trim()) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("Rejecting authenticated user header: {e}");
                None
            }
        }
    }

    fn can_access(&self, _user: &UserId, _workspace: &Workspace) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_user_from_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(TrustedHeaderAccess.authenticate(&headers), None);

        headers.insert(AUTHENTICATED_USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(
            TrustedHeaderAccess.authenticate(&headers),
            Some(UserId::new("alice").unwrap())
        );

        headers.insert(AUTHENTICATED_USER_HEADER, HeaderValue::from_static("../bob"));
        assert_eq!(TrustedHeaderAccess.authenticate(&headers), None);
    }
}
