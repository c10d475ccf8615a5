//! Tenant identity and the mapping from a storage scope to its directory.
//!
//! ```text
//! {root}/users/{userId}/{contentType}
//! {root}/workspaces/{workspaceId}/{contentType}
//! ```
//!
//! Personal and workspace trees hang off different top level directories, so no
//! identifier can make two scopes share a directory.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use nimbus_common::constants::PERSONAL_WORKSPACE;
use serde::{Deserialize, Serialize};

use super::{ScopePath, StorageError};

const MAX_IDENTIFIER_LENGTH: usize = 128;

/// One of the three content trees every scope holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Generic files. This is the tree the WebDAV gateway serves.
    Files,
    /// Notes.
    Notes,
    /// Photos.
    Photos,
}

impl ContentType {
    /// All content types, in the order they are reported.
    pub const ALL: [ContentType; 3] = [ContentType::Files, ContentType::Notes, ContentType::Photos];

    /// Directory name of this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Files => "files",
            ContentType::Notes => "notes",
            ContentType::Photos => "photos",
        }
    }

    /// Whether payloads of this type are encrypted at rest by the storage service.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ContentType::Files)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| StorageError::InvalidName(format!("unknown content type '{s}'")))
    }
}

fn validate_identifier(kind: &str, value: &str) -> Result<(), StorageError> {
    if value.is_empty() || value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(StorageError::InvalidName(format!(
            "{kind} must be 1 to {MAX_IDENTIFIER_LENGTH} characters long"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(StorageError::InvalidName(format!(
            "{kind} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Identifier of a user. Safe to use as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, StorageError> {
        let value = value.into();
        validate_identifier("user id", &value)?;
        Ok(Self(value))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a shared workspace. Never equal to `personal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Validate and wrap a workspace identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, StorageError> {
        let value = value.into();
        validate_identifier("workspace id", &value)?;
        if value == PERSONAL_WORKSPACE {
            return Err(StorageError::InvalidName(format!(
                "'{PERSONAL_WORKSPACE}' is reserved for the personal scope"
            )));
        }
        Ok(Self(value))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_conversions {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = StorageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = StorageError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

string_conversions!(UserId);
string_conversions!(WorkspaceId);

/// Personal scope or a shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Workspace {
    /// The owner's private space.
    Personal,
    /// A workspace shared between several users.
    Shared(WorkspaceId),
}

impl Workspace {
    /// Interpret a `workspaceId` request value. Absent or `personal` selects the personal scope.
    pub fn from_query_value(value: Option<&str>) -> Result<Self, StorageError> {
        match value {
            None | Some(PERSONAL_WORKSPACE) => Ok(Workspace::Personal),
            Some(id) => WorkspaceId::new(id).map(Workspace::Shared),
        }
    }

    /// Whether this is the personal scope.
    pub fn is_personal(&self) -> bool {
        matches!(self, Workspace::Personal)
    }

    /// The `workspaceId` value addressing this workspace.
    pub fn as_str(&self) -> &str {
        match self {
            Workspace::Personal => PERSONAL_WORKSPACE,
            Workspace::Shared(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(owner, workspace, content type)`: the unit every storage operation runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageScope {
    /// The user the request is made on behalf of.
    pub owner: UserId,
    /// Personal scope or a shared workspace.
    pub workspace: Workspace,
    /// The content tree inside the scope.
    pub content_type: ContentType,
}

impl StorageScope {
    /// Create a new scope.
    pub fn new(owner: UserId, workspace: Workspace, content_type: ContentType) -> Self {
        Self {
            owner,
            workspace,
            content_type,
        }
    }

    /// Same tenant, different content tree.
    pub fn with_content_type(&self, content_type: ContentType) -> Self {
        Self {
            content_type,
            ..self.clone()
        }
    }

    /// Key derivation context of the tenant owning this scope.
    ///
    /// Every member of a workspace resolves to the same context, personal scopes are
    /// isolated per user.
    pub fn tenant_key_id(&self) -> String {
        match &self.workspace {
            Workspace::Personal => format!("users/{}", self.owner),
            Workspace::Shared(id) => format!("workspaces/{id}"),
        }
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_key_id(), self.content_type)
    }
}

/// Translates scopes into directories below a storage root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a scope. Pure, the directory may not exist.
    ///
    /// For shared workspaces `owner` plays no part in the result.
    pub fn resolve(
        &self,
        owner: &UserId,
        workspace: &Workspace,
        content_type: ContentType,
    ) -> PathBuf {
        let tenant_dir = match workspace {
            Workspace::Personal => self.root.join("users").join(owner.as_str()),
            Workspace::Shared(id) => self.root.join("workspaces").join(id.as_str()),
        };
        tenant_dir.join(content_type.as_str())
    }

    /// [`PathResolver::resolve`] for a [`StorageScope`].
    pub fn resolve_scope(&self, scope: &StorageScope) -> PathBuf {
        self.resolve(&scope.owner, &scope.workspace, scope.content_type)
    }

    /// Resolve and create the scope directory. Idempotent.
    pub async fn ensure(&self, scope: &StorageScope) -> std::io::Result<PathBuf> {
        let dir = self.resolve_scope(scope);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Physical location of `path` inside `scope_dir`.
    pub fn join(scope_dir: &Path, path: &ScopePath) -> PathBuf {
        path.segments()
            .fold(scope_dir.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn personal_scope_layout() {
        let resolver = PathResolver::new("/data");
        assert_eq!(
            resolver.resolve(&alice(), &Workspace::Personal, ContentType::Notes),
            PathBuf::from("/data/users/alice/notes")
        );
    }

    #[test]
    fn workspace_scope_ignores_owner() {
        let resolver = PathResolver::new("/data");
        let team = Workspace::Shared(WorkspaceId::new("team-a").unwrap());
        let bob = UserId::new("bob").unwrap();
        let via_alice = resolver.resolve(&alice(), &team, ContentType::Photos);
        let via_bob = resolver.resolve(&bob, &team, ContentType::Photos);
        assert_eq!(via_alice, PathBuf::from("/data/workspaces/team-a/photos"));
        assert_eq!(via_alice, via_bob);
    }

    #[test]
    fn personal_and_workspace_roots_are_disjoint() {
        let resolver = PathResolver::new("/data");
        let same_name = Workspace::Shared(WorkspaceId::new("alice").unwrap());
        let personal = resolver.resolve(&alice(), &Workspace::Personal, ContentType::Files);
        let shared = resolver.resolve(&alice(), &same_name, ContentType::Files);
        assert_ne!(personal, shared);
        assert!(!personal.starts_with(&shared) && !shared.starts_with(&personal));
    }

    #[test]
    fn identifiers_reject_path_tricks() {
        let too_long = "x".repeat(129);
        for bad in ["", "..", "a/b", "a\\b", "bob.smith", "ünïcode", too_long.as_str()] {
            assert!(UserId::new(bad).is_err(), "'{bad}' should be rejected");
            assert!(WorkspaceId::new(bad).is_err(), "'{bad}' should be rejected");
        }
        assert!(UserId::new("Alice_01-x").is_ok());
        assert!(UserId::new("personal").is_ok());
        assert!(WorkspaceId::new("personal").is_err());
    }

    #[test]
    fn workspace_query_value() {
        assert_eq!(Workspace::from_query_value(None).unwrap(), Workspace::Personal);
        assert_eq!(
            Workspace::from_query_value(Some("personal")).unwrap(),
            Workspace::Personal
        );
        assert_eq!(
            Workspace::from_query_value(Some("team")).unwrap(),
            Workspace::Shared(WorkspaceId::new("team").unwrap())
        );
        assert!(Workspace::from_query_value(Some("../etc")).is_err());
    }

    #[test]
    fn tenant_key_ids() {
        let personal = StorageScope::new(alice(), Workspace::Personal, ContentType::Files);
        assert_eq!(personal.tenant_key_id(), "users/alice");

        let team = Workspace::Shared(WorkspaceId::new("team").unwrap());
        let a = StorageScope::new(alice(), team.clone(), ContentType::Files);
        let b = StorageScope::new(UserId::new("bob").unwrap(), team, ContentType::Notes);
        assert_eq!(a.tenant_key_id(), "workspaces/team");
        assert_eq!(a.tenant_key_id(), b.tenant_key_id());
    }

    #[test]
    fn content_type_names() {
        for ct in ContentType::ALL {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert!("videos".parse::<ContentType>().is_err());
        assert!(ContentType::Files.is_encrypted());
        assert!(!ContentType::Notes.is_encrypted());
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let resolver = PathResolver::new(temp.path());
        let scope = StorageScope::new(alice(), Workspace::Personal, ContentType::Files);
        assert!(!resolver.resolve_scope(&scope).exists());

        let first = resolver.ensure(&scope).await.unwrap();
        let second = resolver.ensure(&scope).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn join_maps_segments() {
        let path = ScopePath::new("/docs/2024/report.pdf").unwrap();
        assert_eq!(
            PathResolver::join(Path::new("/s"), &path),
            PathBuf::from("/s/docs/2024/report.pdf")
        );
        assert_eq!(
            PathResolver::join(Path::new("/s"), &ScopePath::root()),
            PathBuf::from("/s")
        );
    }
}
