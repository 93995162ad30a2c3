//! Listed entries

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::ObjectAttrs;
use crate::paths::{basename, parent_path, virtual_path};

/// A file or directory entry as shown to the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Display name; directories keep their trailing slash
    pub name: String,
    pub is_directory: bool,
    /// Virtual `/`-prefixed path, or the signed URL of a retrieved file
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl File {
    /// Directory entry for a common prefix such as `a/c/`
    pub fn directory(prefix: &str) -> Self {
        Self {
            name: basename(prefix),
            is_directory: true,
            path: virtual_path(prefix),
            content_type: None,
            size: None,
            last_modified: None,
        }
    }

    /// The `..` entry pointing at the directory containing `prefix`
    pub fn parent(prefix: &str) -> Self {
        Self {
            name: "..".to_string(),
            is_directory: true,
            path: parent_path(prefix),
            content_type: None,
            size: None,
            last_modified: None,
        }
    }

    /// File entry whose path is the object's virtual path
    pub fn object(attrs: ObjectAttrs) -> Self {
        let path = virtual_path(&attrs.name);
        Self::with_path(attrs, path)
    }

    /// File entry whose path is an externally usable URL
    pub fn signed(attrs: ObjectAttrs, url: String) -> Self {
        Self::with_path(attrs, url)
    }

    fn with_path(attrs: ObjectAttrs, path: String) -> Self {
        Self {
            name: basename(&attrs.name),
            is_directory: false,
            path,
            content_type: attrs.content_type,
            size: attrs.size,
            last_modified: attrs.updated,
        }
    }
}
