//! WebDAV protocol pieces that don't depend on the storage engine: header parsing
//! and response documents.

mod depth;
mod destination;
mod multistatus;

pub(crate) use depth::Depth;
pub(crate) use destination::{parse_destination, parse_overwrite};
pub(crate) use multistatus::{error_body, multistatus, PropEntry};

/// Route prefix the WebDAV tree is mounted under.
pub(crate) const DAV_PREFIX: &str = "/dav";

/// Methods listed in `Allow`. Not all of them are implemented.
pub(crate) const ADVERTISED_METHODS: &str =
    "OPTIONS, GET, HEAD, POST, DELETE, TRACE, COPY, MOVE, MKCOL, PUT, PROPFIND, PROPPATCH, LOCK, UNLOCK";

/// Content type of every XML body.
pub(crate) const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Content type reported for collections.
pub(crate) const DIRECTORY_CONTENT_TYPE: &str = "httpd/unix-directory";

// Encode all non-unreserved characters, except '/'.
// See RFC3986, and https://en.wikipedia.org/wiki/Percent-encoding .
pub(crate) const PATH_ENCODE_SET: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');
