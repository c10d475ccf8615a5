mod http_error;
pub(crate) mod toml_merge;
pub(crate) mod webdav;

pub(crate) use http_error::{HttpError, HttpResult};
