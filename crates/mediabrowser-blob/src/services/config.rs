//! Blob browser configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BlobError;
use crate::services::signer::{DEFAULT_SIGNED_URL_TTL, MAX_SIGNED_URL_TTL};

/// Default JSON API endpoint of Cloud Storage
pub const DEFAULT_STORAGE_API: &str = "https://storage.googleapis.com";
/// Default host signed URLs point at
pub const DEFAULT_STORAGE_HOST: &str = "storage.googleapis.com";
/// Default IAM Credentials API endpoint
pub const DEFAULT_IAM_API: &str = "https://iamcredentials.googleapis.com";
/// Default Secret Manager API endpoint
pub const DEFAULT_SECRET_MANAGER_API: &str = "https://secretmanager.googleapis.com";
/// Default metadata server, as seen from Compute Engine, Cloud Run and GKE
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1";
/// Default OAuth 2.0 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Where the Google APIs live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleEndpoints {
    pub storage_api: String,
    /// Host name embedded in signed URLs
    pub storage_host: String,
    pub iam_api: String,
    pub secret_manager_api: String,
    pub metadata: String,
    pub token: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            storage_api: DEFAULT_STORAGE_API.to_string(),
            storage_host: DEFAULT_STORAGE_HOST.to_string(),
            iam_api: DEFAULT_IAM_API.to_string(),
            secret_manager_api: DEFAULT_SECRET_MANAGER_API.to_string(),
            metadata: DEFAULT_METADATA_URL.to_string(),
            token: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

/// User-provided configuration for the blob browser
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlobInputConfig {
    /// Bucket to browse (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    /// Service account URLs are signed for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,

    /// Secret Manager resource holding the PEM private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_secret: Option<String>,

    /// Local private key, PEM or service account JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<PathBuf>,

    /// Service account JSON key used for API access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Signed URL lifetime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url_ttl_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iam_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_manager_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

/// Resolved configuration for the blob browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    pub bucket_name: String,
    pub service_account_email: Option<String>,
    pub private_key_secret: Option<String>,
    pub private_key_file: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
    pub signed_url_ttl: Duration,
    pub endpoints: GoogleEndpoints,
}

impl BlobConfig {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            service_account_email: None,
            private_key_secret: None,
            private_key_file: None,
            credentials_file: None,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
            endpoints: GoogleEndpoints::default(),
        }
    }
}

impl TryFrom<BlobInputConfig> for BlobConfig {
    type Error = BlobError;

    fn try_from(input: BlobInputConfig) -> Result<Self, Self::Error> {
        let bucket_name = non_empty(input.bucket_name).ok_or_else(|| {
            BlobError::Configuration("A bucket name is required".to_string())
        })?;

        let signed_url_ttl = match input.signed_url_ttl_secs {
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_SIGNED_URL_TTL,
        };
        if signed_url_ttl.is_zero() || signed_url_ttl > MAX_SIGNED_URL_TTL {
            return Err(BlobError::Configuration(format!(
                "Signed URL lifetime must be between 1 and {} seconds",
                MAX_SIGNED_URL_TTL.as_secs()
            )));
        }

        let defaults = GoogleEndpoints::default();
        let endpoints = GoogleEndpoints {
            storage_api: endpoint(input.storage_api, defaults.storage_api),
            storage_host: non_empty(input.storage_host).unwrap_or(defaults.storage_host),
            iam_api: endpoint(input.iam_api, defaults.iam_api),
            secret_manager_api: endpoint(input.secret_manager_api, defaults.secret_manager_api),
            metadata: endpoint(input.metadata_url, defaults.metadata),
            token: non_empty(input.token_url).unwrap_or(defaults.token),
        };

        Ok(Self {
            bucket_name,
            service_account_email: non_empty(input.service_account_email),
            private_key_secret: non_empty(input.private_key_secret),
            private_key_file: input
                .private_key_file
                .filter(|path| !path.as_os_str().is_empty()),
            credentials_file: input
                .credentials_file
                .filter(|path| !path.as_os_str().is_empty()),
            signed_url_ttl,
            endpoints,
        })
    }
}

/// Unset environment variables often arrive as empty strings
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn endpoint(value: Option<String>, default: String) -> String {
    non_empty(value)
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(bucket: &str) -> BlobInputConfig {
        BlobInputConfig {
            bucket_name: Some(bucket.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BlobConfig::try_from(input("media")).unwrap();

        assert_eq!(config.bucket_name, "media");
        assert_eq!(config.signed_url_ttl, DEFAULT_SIGNED_URL_TTL);
        assert_eq!(config.endpoints, GoogleEndpoints::default());
        assert!(config.service_account_email.is_none());
        assert!(config.private_key_secret.is_none());
    }

    #[test]
    fn test_bucket_is_required() {
        let missing = BlobConfig::try_from(BlobInputConfig::default());
        assert!(matches!(missing, Err(BlobError::Configuration(_))));

        let empty = BlobConfig::try_from(input("  "));
        assert!(matches!(empty, Err(BlobError::Configuration(_))));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = BlobConfig::try_from(BlobInputConfig {
            service_account_email: Some(String::new()),
            private_key_secret: Some(String::new()),
            private_key_file: Some(PathBuf::new()),
            ..input("media")
        })
        .unwrap();

        assert!(config.service_account_email.is_none());
        assert!(config.private_key_secret.is_none());
        assert!(config.private_key_file.is_none());
    }

    #[test]
    fn test_ttl_range() {
        for secs in [0, MAX_SIGNED_URL_TTL.as_secs() + 1] {
            let result = BlobConfig::try_from(BlobInputConfig {
                signed_url_ttl_secs: Some(secs),
                ..input("media")
            });
            assert!(matches!(result, Err(BlobError::Configuration(_))));
        }

        let config = BlobConfig::try_from(BlobInputConfig {
            signed_url_ttl_secs: Some(600),
            ..input("media")
        })
        .unwrap();
        assert_eq!(config.signed_url_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let config = BlobConfig::try_from(BlobInputConfig {
            storage_api: Some("http://127.0.0.1:4443/".to_string()),
            ..input("media")
        })
        .unwrap();
        assert_eq!(config.endpoints.storage_api, "http://127.0.0.1:4443");
    }
}
