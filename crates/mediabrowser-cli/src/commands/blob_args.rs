use std::path::PathBuf;

use clap::Args;
use mediabrowser_blob::{BlobConfig, BlobInputConfig};

/// Bucket and credential settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct BlobArgs {
    /// Bucket to browse
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Service account signed URLs are issued for
    #[arg(long, env = "SERVICE_ACCOUNT_NAME")]
    pub service_account: Option<String>,

    /// Secret Manager secret holding the service account's PEM private key
    #[arg(long, env = "PK_SECRET_NAME")]
    pub private_key_secret: Option<String>,

    /// Local private key, PEM or service account JSON
    #[arg(long, env = "PRIVATE_KEY_FILE")]
    pub private_key_file: Option<PathBuf>,

    /// Service account JSON key for API access (metadata server otherwise)
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    /// Signed URL lifetime in seconds
    #[arg(long, env = "SIGNED_URL_TTL_SECS")]
    pub signed_url_ttl_secs: Option<u64>,

    /// Cloud Storage JSON API endpoint
    #[arg(long, env = "STORAGE_API_URL")]
    pub storage_api: Option<String>,

    /// Host signed URLs point at
    #[arg(long, env = "STORAGE_HOST")]
    pub storage_host: Option<String>,

    /// IAM Credentials API endpoint
    #[arg(long, env = "IAM_API_URL")]
    pub iam_api: Option<String>,

    /// Secret Manager API endpoint
    #[arg(long, env = "SECRET_MANAGER_API_URL")]
    pub secret_manager_api: Option<String>,

    /// Metadata server base URL
    #[arg(long, env = "METADATA_URL")]
    pub metadata_url: Option<String>,

    /// OAuth token endpoint
    #[arg(long, env = "OAUTH_TOKEN_URL")]
    pub token_url: Option<String>,
}

impl BlobArgs {
    pub fn config(&self) -> anyhow::Result<BlobConfig> {
        let input = BlobInputConfig {
            bucket_name: self.bucket.clone(),
            service_account_email: self.service_account.clone(),
            private_key_secret: self.private_key_secret.clone(),
            private_key_file: self.private_key_file.clone(),
            credentials_file: self.credentials_file.clone(),
            signed_url_ttl_secs: self.signed_url_ttl_secs,
            storage_api: self.storage_api.clone(),
            storage_host: self.storage_host.clone(),
            iam_api: self.iam_api.clone(),
            secret_manager_api: self.secret_manager_api.clone(),
            metadata_url: self.metadata_url.clone(),
            token_url: self.token_url.clone(),
        };
        Ok(BlobConfig::try_from(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_bucket() {
        assert!(BlobArgs::default().config().is_err());

        let args = BlobArgs {
            bucket: Some("media".to_string()),
            signed_url_ttl_secs: Some(3600),
            ..Default::default()
        };
        let config = args.config().unwrap();
        assert_eq!(config.bucket_name, "media");
        assert_eq!(config.signed_url_ttl.as_secs(), 3600);
    }
}
