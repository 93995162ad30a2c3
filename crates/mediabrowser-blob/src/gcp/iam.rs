//! IAM Credentials `signBlob` client

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BlobError;
use crate::gcp::{error_body, http_client, AccessTokenProvider};
use crate::services::signer::BlobSigner;

#[derive(Debug, Serialize)]
struct SignBlobRequest {
    delegates: Vec<String>,
    payload: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignBlobResponse {
    #[allow(dead_code)]
    key_id: Option<String>,
    signed_blob: String,
}

/// Signs bytes with a service account's Google-managed key
pub struct IamSigner {
    client: Client,
    base_url: String,
    auth: Arc<dyn AccessTokenProvider>,
}

impl IamSigner {
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

#[async_trait]
impl BlobSigner for IamSigner {
    async fn sign_blob(&self, account: &str, payload: &[u8]) -> Result<Vec<u8>, BlobError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| BlobError::Signing(e.to_string()))?;

        let resource = format!("projects/-/serviceAccounts/{}", account);
        let url = format!("{}/v1/{}:signBlob", self.base_url, resource);
        let body = SignBlobRequest {
            delegates: vec![resource],
            payload: STANDARD.encode(payload),
        };

        debug!("IAM signBlob request for {}", account);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BlobError::Signing(format!("signBlob request failed: {}", e)))?;

        if !response.status().is_success() {
            let error = error_body(response).await;
            return Err(BlobError::Signing(format!(
                "signBlob for {} failed with {}",
                account, error
            )));
        }

        let signed: SignBlobResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Signing(format!("Failed to parse signBlob response: {}", e)))?;

        STANDARD
            .decode(signed.signed_blob)
            .map_err(|e| BlobError::Signing(format!("Invalid signedBlob encoding: {}", e)))
    }
}
