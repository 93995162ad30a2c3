//! Object storage backend abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BlobError;
use crate::paths::DELIMITER;

/// A single-level directory view: a prefix plus the `/` delimiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub prefix: String,
    pub delimiter: String,
}

impl ListingQuery {
    pub fn directory(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: DELIMITER.to_string(),
        }
    }
}

/// Metadata of a stored object as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttrs {
    /// Full object name
    pub name: String,
    pub content_type: Option<String>,
    /// Size in bytes
    pub size: Option<i64>,
    pub updated: Option<DateTime<Utc>>,
}

/// One entry of a delimited listing
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    /// A common prefix, i.e. a subdirectory
    Prefix(String),
    Object(ObjectAttrs),
}

/// One page of a delimited listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub entries: Vec<RawEntry>,
    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,
}

/// Read-only access to the objects of one bucket
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetch one page of a delimited listing
    async fn list_page(
        &self,
        query: &ListingQuery,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BlobError>;

    /// Fetch the metadata of a single object.
    ///
    /// Returns [`BlobError::NotFound`] when the object does not exist.
    async fn object_attrs(&self, name: &str) -> Result<ObjectAttrs, BlobError>;
}
