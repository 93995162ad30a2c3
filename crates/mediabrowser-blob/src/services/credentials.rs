//! Signing identity resolution
//!
//! A signing identity is resolved fresh for every signed URL, trying in
//! order: an explicit key file, a key stored in the secret store, the key
//! embedded in ambient credentials, and finally delegated signing for the
//! account named by the ambient token.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use mediabrowser_core::mask_sensitive;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::BlobError;
use crate::services::config::BlobConfig;
use crate::services::signer::{BlobSigner, SigningIdentity};

/// Service account key structure, as downloaded from the console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub const KEY_TYPE: &'static str = "service_account";

    pub fn from_json(json: &str) -> Result<Self, BlobError> {
        let key_type = credentials_type(json)?;
        if key_type != Self::KEY_TYPE {
            return Err(BlobError::Credential(format!(
                "Unsupported credentials type '{}', expected '{}'",
                key_type,
                Self::KEY_TYPE
            )));
        }
        serde_json::from_str(json)
            .map_err(|e| BlobError::Credential(format!("Invalid service account key: {}", e)))
    }

    pub fn signing_identity(&self) -> Result<SigningIdentity, BlobError> {
        SigningIdentity::from_pem(&self.client_email, &self.private_key)
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsType {
    #[serde(rename = "type")]
    key_type: String,
}

/// The `type` member of a credentials JSON file
pub(crate) fn credentials_type(json: &str) -> Result<String, BlobError> {
    let parsed: CredentialsType = serde_json::from_str(json)
        .map_err(|e| BlobError::Credential(format!("Invalid credentials file: {}", e)))?;
    Ok(parsed.key_type)
}

/// What ambient credential discovery found
#[derive(Debug, Clone)]
pub enum AmbientCredentials {
    /// A downloadable service account key
    ServiceAccountKey(ServiceAccountKey),
    /// A JWT for the calling identity, with no key material
    Token(String),
}

/// Discovers the default credentials of the environment
#[async_trait]
pub trait AmbientCredentialSource: Send + Sync {
    async fn discover(&self) -> Result<AmbientCredentials, BlobError>;
}

/// Fetch-by-name access to stored secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn access_secret(&self, name: &str) -> Result<Vec<u8>, BlobError>;
}

/// Where a local private key may come from
#[derive(Debug, Clone, Default)]
pub struct KeySources {
    pub service_account_email: Option<String>,
    pub private_key_secret: Option<String>,
    pub private_key_file: Option<PathBuf>,
}

impl From<&BlobConfig> for KeySources {
    fn from(config: &BlobConfig) -> Self {
        Self {
            service_account_email: config.service_account_email.clone(),
            private_key_secret: config.private_key_secret.clone(),
            private_key_file: config.private_key_file.clone(),
        }
    }
}

/// Resolves the identity signed URLs are issued for
pub struct CredentialResolver {
    sources: KeySources,
    secrets: Arc<dyn SecretStore>,
    ambient: Arc<dyn AmbientCredentialSource>,
    delegate: Arc<dyn BlobSigner>,
}

impl CredentialResolver {
    pub fn new(
        sources: KeySources,
        secrets: Arc<dyn SecretStore>,
        ambient: Arc<dyn AmbientCredentialSource>,
        delegate: Arc<dyn BlobSigner>,
    ) -> Self {
        Self {
            sources,
            secrets,
            ambient,
            delegate,
        }
    }

    /// Resolve a signing identity; nothing is cached between calls
    pub async fn resolve(&self) -> Result<SigningIdentity, BlobError> {
        if let Some(path) = &self.sources.private_key_file {
            debug!("Reading private key from {}", path.display());
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                BlobError::Credential(format!(
                    "Failed to read private key file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            return self.identity_from_key_material(&contents);
        }

        if let Some(secret) = &self.sources.private_key_secret {
            if self.sources.service_account_email.is_none() {
                return Err(BlobError::Credential(
                    "A private key secret requires a service account email".to_string(),
                ));
            }
            info!("Fetching private key from secret {}", mask_sensitive(secret));
            let bytes = self
                .secrets
                .access_secret(secret)
                .await
                .map_err(|e| match e {
                    BlobError::Credential(_) => e,
                    other => BlobError::Credential(other.to_string()),
                })?;
            let contents = String::from_utf8(bytes).map_err(|_| {
                BlobError::Credential("Private key secret is not valid UTF-8".to_string())
            })?;
            return self.identity_from_key_material(&contents);
        }

        info!("Retrieving service account credentials");
        match self.ambient.discover().await.map_err(|e| match e {
            BlobError::Credential(_) => e,
            other => BlobError::Credential(other.to_string()),
        })? {
            AmbientCredentials::ServiceAccountKey(key) => {
                debug!("Decoding service account key for {}", key.client_email);
                key.signing_identity()
            }
            AmbientCredentials::Token(token) => {
                let email = token_subject(&token)?;
                debug!("No key material available, delegating signing to {}", email);
                Ok(SigningIdentity::Delegated {
                    email,
                    signer: self.delegate.clone(),
                })
            }
        }
    }

    /// Key material is either a JSON service account key or a bare PEM key
    fn identity_from_key_material(&self, contents: &str) -> Result<SigningIdentity, BlobError> {
        if contents.trim_start().starts_with('{') {
            let key = ServiceAccountKey::from_json(contents)?;
            if let Some(configured) = &self.sources.service_account_email {
                if configured != &key.client_email {
                    warn!(
                        "Configured service account {} differs from key owner {}, using the key owner",
                        configured, key.client_email
                    );
                }
            }
            return key.signing_identity();
        }

        let email = self.sources.service_account_email.as_deref().ok_or_else(|| {
            BlobError::Credential(
                "A PEM private key requires a service account email".to_string(),
            )
        })?;
        SigningIdentity::from_pem(email, contents)
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

/// Account named by a JWT: its `email` claim, else its subject
pub fn token_subject(token: &str) -> Result<String, BlobError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(BlobError::Credential(
                "Ambient token is not a JWT".to_string(),
            ))
        }
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| BlobError::Credential(format!("Invalid token payload encoding: {}", e)))?;
    let claims: TokenClaims = serde_json::from_slice(&decoded)
        .map_err(|e| BlobError::Credential(format!("Invalid token claims: {}", e)))?;

    claims
        .email
        .or(claims.sub)
        .filter(|subject| !subject.is_empty())
        .ok_or_else(|| BlobError::Credential("Token carries no subject claim".to_string()))
}
