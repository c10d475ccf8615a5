use std::{fs::Metadata, time::SystemTime};

use axum::http::StatusCode;
use percent_encoding::utf8_percent_encode;

use super::{DAV_PREFIX, DIRECTORY_CONTENT_TYPE, PATH_ENCODE_SET};
use crate::persistence::{Entry, ScopePath, StorageError};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Live properties of one resource in a PROPFIND response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropEntry {
    pub href: String,
    pub display_name: String,
    pub is_collection: bool,
    /// Only set for files.
    pub content_length: Option<u64>,
    pub last_modified: SystemTime,
    pub content_type: String,
}

impl PropEntry {
    pub fn from_metadata(path: &ScopePath, metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self::build(path, metadata.is_dir(), metadata.len(), modified)
    }

    /// A listed child of `parent`.
    pub fn from_entry(parent: &ScopePath, entry: &Entry) -> Result<Self, StorageError> {
        let path = parent.join(&entry.name)?;
        let len = entry.size.unwrap_or_default();
        Ok(Self::build(&path, entry.is_folder(), len, entry.modified.into()))
    }

    fn build(path: &ScopePath, is_collection: bool, len: u64, last_modified: SystemTime) -> Self {
        let content_type = if is_collection {
            DIRECTORY_CONTENT_TYPE.to_string()
        } else {
            mime_guess::from_path(path.as_str())
                .first_or_octet_stream()
                .to_string()
        };
        Self {
            href: href_for(path, is_collection),
            display_name: path.file_name().unwrap_or_default().to_string(),
            is_collection,
            content_length: (!is_collection).then_some(len),
            last_modified,
            content_type,
        }
    }
}

/// The URL path of a resource, percent-encoded. Collections end in `/`.
pub(crate) fn href_for(path: &ScopePath, is_collection: bool) -> String {
    let mut href = format!(
        "{DAV_PREFIX}{}",
        utf8_percent_encode(path.as_str(), PATH_ENCODE_SET)
    );
    if is_collection && !href.ends_with('/') {
        href.push('/');
    }
    href
}

/// Render a `207 Multi-Status` body.
pub(crate) fn multistatus(entries: &[PropEntry]) -> String {
    let mut xml = String::with_capacity(256 * (entries.len() + 1));
    xml.push_str(XML_DECLARATION);
    xml.push_str("\n<D:multistatus xmlns:D=\"DAV:\">");
    for entry in entries {
        xml.push_str("\n<D:response>");
        xml.push_str(&format!("<D:href>{}</D:href>", escape(&entry.href)));
        xml.push_str("<D:propstat><D:prop>");
        xml.push_str(&format!(
            "<D:displayname>{}</D:displayname>",
            escape(&entry.display_name)
        ));
        if entry.is_collection {
            xml.push_str("<D:resourcetype><D:collection/></D:resourcetype>");
        } else {
            xml.push_str("<D:resourcetype/>");
        }
        if let Some(len) = entry.content_length {
            xml.push_str(&format!("<D:getcontentlength>{len}</D:getcontentlength>"));
        }
        xml.push_str(&format!(
            "<D:getlastmodified>{}</D:getlastmodified>",
            httpdate::fmt_http_date(entry.last_modified)
        ));
        xml.push_str(&format!(
            "<D:getcontenttype>{}</D:getcontenttype>",
            escape(&entry.content_type)
        ));
        xml.push_str("</D:prop>");
        xml.push_str(&format!(
            "<D:status>{}</D:status>",
            status_line(StatusCode::OK)
        ));
        xml.push_str("</D:propstat></D:response>");
    }
    xml.push_str("\n</D:multistatus>\n");
    xml
}

/// The body of every error response.
pub(crate) fn error_body(status: StatusCode) -> String {
    format!(
        "{XML_DECLARATION}\n<D:error xmlns:D=\"DAV:\"><D:status>{}</D:status></D:error>\n",
        status_line(status)
    )
}

fn status_line(status: StatusCode) -> String {
    format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn file_entry(name: &str) -> PropEntry {
        PropEntry {
            href: href_for(&ScopePath::new(&format!("/{name}")).unwrap(), false),
            display_name: name.to_string(),
            is_collection: false,
            content_length: Some(5),
            last_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            content_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn hrefs_are_encoded_and_collections_end_in_slash() {
        assert_eq!(href_for(&ScopePath::root(), true), "/dav/");
        assert_eq!(
            href_for(&ScopePath::new("/My Docs").unwrap(), true),
            "/dav/My%20Docs/"
        );
        assert_eq!(
            href_for(&ScopePath::new("/a/b&c.txt").unwrap(), false),
            "/dav/a/b%26c.txt"
        );
    }

    #[test]
    fn error_body_names_the_status() {
        let body = error_body(StatusCode::NOT_FOUND);
        assert!(body.starts_with(XML_DECLARATION));
        assert!(body.contains(
            r#"<D:error xmlns:D="DAV:"><D:status>HTTP/1.1 404 Not Found</D:status></D:error>"#
        ));
    }

    #[test]
    fn multistatus_contains_properties() {
        let mut folder = file_entry("docs");
        folder.href = "/dav/docs/".into();
        folder.is_collection = true;
        folder.content_length = None;
        folder.content_type = DIRECTORY_CONTENT_TYPE.into();

        let xml = multistatus(&[folder, file_entry("a<b>.txt")]);
        assert_eq!(xml.matches("<D:response>").count(), 2);
        assert!(xml.contains("<D:resourcetype><D:collection/></D:resourcetype>"));
        assert!(xml.contains("<D:getcontentlength>5</D:getcontentlength>"));
        assert!(xml.contains("<D:displayname>a&lt;b&gt;.txt</D:displayname>"));
        assert!(xml.contains("<D:getlastmodified>Tue, 14 Nov 2023 22:13:20 GMT</D:getlastmodified>"));
        assert!(xml.contains("<D:getcontenttype>httpd/unix-directory</D:getcontenttype>"));
        assert!(xml.contains("<D:status>HTTP/1.1 200 OK</D:status>"));
    }
}
