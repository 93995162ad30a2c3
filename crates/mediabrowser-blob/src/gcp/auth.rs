//! Google credentials: OAuth access tokens and ambient identity discovery

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::BlobError;
use crate::gcp::http_client;
use crate::services::BlobConfig;
use crate::services::credentials::{
    credentials_type, AmbientCredentialSource, AmbientCredentials, ServiceAccountKey,
};
use crate::services::signer::{parse_private_key, sign_rs256};

/// Scope requested for every API the browser talks to
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Audience of identity tokens fetched from the metadata server
pub const IDENTITY_AUDIENCE: &str = "mediabrowser";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REFRESH_TOKEN_GRANT: &str = "refresh_token";
const AUTHORIZED_USER_TYPE: &str = "authorized_user";
/// Written by `gcloud auth application-default login`
const WELL_KNOWN_CREDENTIALS_FILE: &str = "application_default_credentials.json";
const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");
/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for the Google APIs
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, BlobError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_MARGIN.as_secs() as i64) < self.expires_at
    }
}

/// OAuth client credentials of a gcloud user login
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
enum AuthSource {
    /// Self-signed JWT exchanged at the OAuth token endpoint
    ServiceAccount(ServiceAccountKey),
    /// Refresh token exchanged at the OAuth token endpoint
    AuthorizedUser(AuthorizedUser),
    /// Tokens served by the instance metadata server
    Metadata,
}

/// Application default credentials: an explicit credentials file, the
/// gcloud well-known file, or the metadata server, in that order.
pub struct GoogleAuth {
    client: Client,
    source: AuthSource,
    metadata_url: String,
    token_url: String,
    cached: RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Pick the credential source from the configuration
    pub async fn from_config(config: &BlobConfig) -> Result<Self, BlobError> {
        let path = credentials_path(
            config.credentials_file.as_deref(),
            well_known_credentials_file(),
        );
        let source = match path {
            Some(path) => read_credentials_file(&path).await?,
            None => AuthSource::Metadata,
        };

        match &source {
            AuthSource::ServiceAccount(key) => {
                info!("Using service account key for {}", key.client_email)
            }
            AuthSource::AuthorizedUser(user) => warn!(
                "Using user credentials of OAuth client {}, signed URLs need a private key",
                user.client_id
            ),
            AuthSource::Metadata => info!("Using metadata server credentials"),
        }

        Ok(Self {
            client: http_client()?,
            source,
            metadata_url: config.endpoints.metadata.clone(),
            token_url: config.endpoints.token.clone(),
            cached: RwLock::new(None),
        })
    }

    /// Credentials from a service account key
    pub fn service_account(
        key: ServiceAccountKey,
        token_url: impl Into<String>,
    ) -> Result<Self, BlobError> {
        Ok(Self {
            client: http_client()?,
            source: AuthSource::ServiceAccount(key),
            metadata_url: String::new(),
            token_url: token_url.into(),
            cached: RwLock::new(None),
        })
    }

    /// Credentials from a gcloud user login
    pub fn authorized_user(
        user: AuthorizedUser,
        token_url: impl Into<String>,
    ) -> Result<Self, BlobError> {
        Ok(Self {
            client: http_client()?,
            source: AuthSource::AuthorizedUser(user),
            metadata_url: String::new(),
            token_url: token_url.into(),
            cached: RwLock::new(None),
        })
    }

    /// Credentials from the metadata server at `metadata_url`
    pub fn metadata(metadata_url: impl Into<String>) -> Result<Self, BlobError> {
        Ok(Self {
            client: http_client()?,
            source: AuthSource::Metadata,
            metadata_url: metadata_url.into(),
            token_url: String::new(),
            cached: RwLock::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<TokenResponse, BlobError> {
        let request = match &self.source {
            AuthSource::ServiceAccount(key) => {
                let assertion = self.create_jwt(key)?;
                debug!("Exchanging JWT assertion for {}", key.client_email);
                self.client
                    .post(&self.token_url)
                    .form(&[
                        ("grant_type", JWT_BEARER_GRANT),
                        ("assertion", assertion.as_str()),
                    ])
            }
            AuthSource::AuthorizedUser(user) => {
                debug!("Refreshing user access token for {}", user.client_id);
                self.client.post(&self.token_url).form(&[
                    ("grant_type", REFRESH_TOKEN_GRANT),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ])
            }
            AuthSource::Metadata => {
                debug!("Requesting access token from metadata server");
                self.client
                    .get(format!(
                        "{}/instance/service-accounts/default/token",
                        self.metadata_url
                    ))
                    .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| BlobError::Credential(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(BlobError::Credential(format!(
                "Failed to get access token ({}): {}",
                status, error
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BlobError::Credential(format!("Failed to parse token response: {}", e)))
    }

    /// Self-signed JWT for the OAuth bearer grant
    fn create_jwt(&self, key: &ServiceAccountKey) -> Result<String, BlobError> {
        let now = Utc::now().timestamp();
        let exp = now + 3600;

        let mut header = serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        });
        if let Some(kid) = &key.private_key_id {
            header["kid"] = serde_json::Value::String(kid.clone());
        }

        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": CLOUD_PLATFORM_SCOPE,
            "aud": self.token_url,
            "iat": now,
            "exp": exp
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let message = format!("{}.{}", header_b64, claims_b64);

        let private_key = parse_private_key(&key.private_key)?;
        let signature = sign_rs256(&private_key, message.as_bytes())
            .map_err(|e| BlobError::Credential(e.to_string()))?;

        Ok(format!("{}.{}", message, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// OIDC identity token of the default service account
    async fn identity_token(&self) -> Result<String, BlobError> {
        debug!("Requesting identity token from metadata server");
        let response = self
            .client
            .get(format!(
                "{}/instance/service-accounts/default/identity",
                self.metadata_url
            ))
            .query(&[("audience", IDENTITY_AUDIENCE), ("format", "full")])
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|e| BlobError::Credential(format!("Identity token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(BlobError::Credential(format!(
                "Failed to get identity token ({}): {}",
                status, error
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| BlobError::Credential(format!("Failed to read identity token: {}", e)))?;
        Ok(token.trim().to_string())
    }
}

#[async_trait]
impl AccessTokenProvider for GoogleAuth {
    async fn access_token(&self) -> Result<String, BlobError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let response = self.fetch_token().await?;
        let expires_in = chrono::Duration::seconds(response.expires_in as i64);
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            expires_at: Utc::now() + expires_in,
        });

        Ok(response.access_token)
    }
}

#[async_trait]
impl AmbientCredentialSource for GoogleAuth {
    async fn discover(&self) -> Result<AmbientCredentials, BlobError> {
        match &self.source {
            AuthSource::ServiceAccount(key) => {
                Ok(AmbientCredentials::ServiceAccountKey(key.clone()))
            }
            AuthSource::AuthorizedUser(_) => Err(BlobError::Credential(
                "User credentials carry neither a private key nor a service account identity"
                    .to_string(),
            )),
            AuthSource::Metadata => Ok(AmbientCredentials::Token(self.identity_token().await?)),
        }
    }
}

/// gcloud's application default credentials file for the current user
fn well_known_credentials_file() -> Option<PathBuf> {
    let config_dir = if cfg!(windows) {
        dirs::config_dir()?
    } else {
        dirs::home_dir()?.join(".config")
    };
    Some(config_dir.join("gcloud").join(WELL_KNOWN_CREDENTIALS_FILE))
}

/// The configured credentials file, else `well_known` when it exists
fn credentials_path(configured: Option<&Path>, well_known: Option<PathBuf>) -> Option<PathBuf> {
    match configured {
        Some(path) => Some(path.to_path_buf()),
        None => well_known.filter(|path| path.is_file()),
    }
}

async fn read_credentials_file(path: &Path) -> Result<AuthSource, BlobError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        BlobError::Credential(format!(
            "Failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;

    if credentials_type(&contents)? == AUTHORIZED_USER_TYPE {
        let user: AuthorizedUser = serde_json::from_str(&contents)
            .map_err(|e| BlobError::Credential(format!("Invalid user credentials: {}", e)))?;
        return Ok(AuthSource::AuthorizedUser(user));
    }
    Ok(AuthSource::ServiceAccount(ServiceAccountKey::from_json(&contents)?))
}
