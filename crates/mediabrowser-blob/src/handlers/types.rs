//! Shared state for the browser handlers

use std::sync::Arc;

use crate::handlers::auth::BasicAuthCredentials;
use crate::services::BlobStore;

/// Application state for the browser handlers
pub struct BlobAppState {
    pub blob_store: Arc<BlobStore>,
    /// Basic auth credentials; requests pass unauthenticated when `None`
    pub credentials: Option<BasicAuthCredentials>,
}

impl BlobAppState {
    pub fn new(blob_store: Arc<BlobStore>, credentials: Option<BasicAuthCredentials>) -> Self {
        Self {
            blob_store,
            credentials,
        }
    }
}
