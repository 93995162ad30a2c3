//! Secret Manager client

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::BlobError;
use crate::gcp::{error_body, http_client, AccessTokenProvider};
use crate::services::credentials::SecretStore;

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    data: String,
}

/// Reads secret versions through the Secret Manager REST API
pub struct SecretManager {
    client: Client,
    base_url: String,
    auth: Arc<dyn AccessTokenProvider>,
}

impl SecretManager {
    pub fn new(
        base_url: impl Into<String>,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, BlobError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
            auth,
        })
    }
}

/// Full version resource name; a bare secret name reads its latest version
fn version_name(name: &str) -> String {
    let name = name.trim_matches('/');
    if name.contains("/versions/") {
        name.to_string()
    } else {
        format!("{}/versions/latest", name)
    }
}

#[async_trait]
impl SecretStore for SecretManager {
    async fn access_secret(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| BlobError::Credential(e.to_string()))?;
        let version = version_name(name);

        debug!("Secret Manager access request for {}", version);

        let response = self
            .client
            .get(format!("{}/v1/{}:access", self.base_url, version))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BlobError::Credential(format!("Secret request failed: {}", e)))?;

        if !response.status().is_success() {
            let error = error_body(response).await;
            return Err(BlobError::Credential(format!(
                "Accessing secret {} failed with {}",
                version, error
            )));
        }

        let body: AccessSecretVersionResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Credential(format!("Failed to parse secret response: {}", e)))?;

        STANDARD
            .decode(body.payload.data)
            .map_err(|e| BlobError::Credential(format!("Invalid secret payload encoding: {}", e)))
    }
}
