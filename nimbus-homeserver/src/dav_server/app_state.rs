use std::sync::Arc;

use super::AccessControl;
use crate::{persistence::StorageService, AppContext};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) storage: StorageService,
    pub(crate) access: Arc<dyn AccessControl>,
    /// Largest PUT body accepted.
    pub(crate) max_body_bytes: u64,
}

impl AppState {
    pub fn new(context: &AppContext) -> Self {
        Self {
            storage: context.storage.clone(),
            access: context.access.clone(),
            max_body_bytes: context.config_toml.dav.max_body_mb * 1024 * 1024,
        }
    }
}
