//! Error types for the blob browsing component

use axum::http::StatusCode;
use mediabrowser_core::problemdetails::{self, Problem};
use thiserror::Error;

/// Errors that can occur while listing objects or issuing signed URLs
#[derive(Error, Debug)]
pub enum BlobError {
    /// The object does not exist in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Listing or attribute fetch failed for a reason other than absence
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local signing or the remote sign-blob call failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// No usable signing identity could be resolved
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound(_))
    }

    /// Reclassify any failure as a storage failure
    pub(crate) fn into_storage(self) -> Self {
        match self {
            BlobError::Storage(_) => self,
            other => BlobError::Storage(other.to_string()),
        }
    }
}

impl From<BlobError> for Problem {
    fn from(error: BlobError) -> Self {
        match error {
            BlobError::NotFound(name) => problemdetails::new(StatusCode::NOT_FOUND)
                .with_title("Object Not Found")
                .with_detail(format!("Object '{}' does not exist", name)),

            BlobError::Storage(msg) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Storage Error")
                .with_detail(msg),

            BlobError::Signing(msg) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Signing Error")
                .with_detail(msg),

            BlobError::Credential(msg) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Credential Error")
                .with_detail(msg),

            BlobError::InvalidPath(path) => problemdetails::new(StatusCode::BAD_REQUEST)
                .with_title("Invalid Path")
                .with_detail(format!("Invalid request path: {}", path)),

            BlobError::Configuration(msg) => {
                problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                    .with_title("Configuration Error")
                    .with_detail(msg)
            }
        }
    }
}
