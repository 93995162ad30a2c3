//! Google Cloud clients backing the blob browser
//!
//! Every client speaks plain JSON over `reqwest` and takes its base URL from
//! [`GoogleEndpoints`](crate::services::GoogleEndpoints), so tests can point
//! them at a mock server.

mod auth;
mod iam;
mod secrets;
mod storage;

pub use auth::{
    AccessTokenProvider, AuthorizedUser, GoogleAuth, CLOUD_PLATFORM_SCOPE, IDENTITY_AUDIENCE,
};
pub use iam::IamSigner;
pub use secrets::SecretManager;
pub use storage::GcsBackend;

use std::time::Duration;

use reqwest::Client;

use crate::error::BlobError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> Result<Client, BlobError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| BlobError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Body of a non-success response, for error messages
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("status {}: {}", status, body)
}
