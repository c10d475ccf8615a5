use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::layers::trace::with_trace_layer;
use super::{app_state::AppState, routes::dispatch};
use crate::shared::webdav::DAV_PREFIX;
use crate::AppContext;
#[cfg(any(test, feature = "testing"))]
use crate::MockDataDir;
use crate::{AppContextConversionError, PersistentDataDir};
use axum::{routing::any, Router};
use axum_server::Handle;
use tokio::task::JoinHandle;

/// Create the app
pub(crate) fn create_app(state: AppState) -> Router {
    let app = Router::new()
        .route("/dav", any(dispatch))
        .route("/dav/", any(dispatch))
        .route("/dav/{*path}", any(dispatch))
        .with_state(state);

    with_trace_layer(app)
}

/// Errors that can occur when building a `DavServer`.
#[derive(thiserror::Error, Debug)]
pub enum DavServerBuildError {
    /// Failed to create the WebDAV server.
    #[error("Failed to create WebDAV server: {0}")]
    Server(anyhow::Error),

    /// Failed to boostrap from the data directory.
    #[error("Failed to boostrap from the data directory: {0}")]
    AppContext(AppContextConversionError),
}

/// The WebDAV gateway bound to its listen socket.
///
/// When dropped, the server will stop.
pub struct DavServer {
    http_handle: Handle<SocketAddr>,
    join_handle: Option<JoinHandle<()>>,
    socket: SocketAddr,
}

impl DavServer {
    /// Run a server from a data directory path.
    pub async fn start_with_persistent_data_dir_path(
        data_dir_path: PathBuf,
    ) -> Result<Self, DavServerBuildError> {
        let data_dir = PersistentDataDir::new(data_dir_path);
        Self::start_with_persistent_data_dir(data_dir).await
    }

    /// Run a server from a data directory.
    pub async fn start_with_persistent_data_dir(
        data_dir: PersistentDataDir,
    ) -> Result<Self, DavServerBuildError> {
        let context = AppContext::read_from(data_dir)
            .await
            .map_err(DavServerBuildError::AppContext)?;
        Self::start(&context).await
    }

    /// Run a server from a mock data directory.
    #[cfg(any(test, feature = "testing"))]
    pub async fn start_with_mock_data_dir(
        mock_dir: MockDataDir,
    ) -> Result<Self, DavServerBuildError> {
        let context = AppContext::read_from(mock_dir)
            .await
            .map_err(DavServerBuildError::AppContext)?;
        Self::start(&context).await
    }

    /// Run the server with an existing context.
    pub async fn start(context: &AppContext) -> Result<Self, DavServerBuildError> {
        let state = AppState::new(context);
        let socket = context.config_toml.dav.listen_socket;
        let app = create_app(state).into_make_service();
        let listener = std::net::TcpListener::bind(socket)
            .map_err(|e| DavServerBuildError::Server(e.into()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| DavServerBuildError::Server(e.into()))?;
        let socket = listener
            .local_addr()
            .map_err(|e| DavServerBuildError::Server(e.into()))?;
        let http_handle = Handle::new();
        let inner_http_handle = http_handle.clone();
        let server =
            axum_server::from_tcp(listener).map_err(|e| DavServerBuildError::Server(e.into()))?;
        let join_handle = tokio::spawn(async move {
            server
                .handle(inner_http_handle)
                .serve(app)
                .await
                .unwrap_or_else(|e| tracing::error!("WebDAV server error: {}", e));
        });
        tracing::info!("WebDAV gateway bound to {socket}");
        Ok(Self {
            http_handle,
            join_handle: Some(join_handle),
            socket,
        })
    }

    /// Get the socket address the server listens on.
    pub fn listen_socket(&self) -> SocketAddr {
        self.socket
    }

    /// Base URL of the WebDAV tree.
    pub fn url(&self) -> String {
        format!("http://{}{DAV_PREFIX}/", self.socket)
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        self.http_handle
            .graceful_shutdown(Some(Duration::from_secs(5)));
        if let Some(join_handle) = self.join_handle.take() {
            if let Err(e) = join_handle.await {
                tracing::error!("WebDAV server task failed: {e}");
            }
        }
    }
}

impl Drop for DavServer {
    fn drop(&mut self) {
        self.http_handle
            .graceful_shutdown(Some(Duration::from_secs(5)));
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}
