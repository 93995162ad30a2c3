//! Blob store facade: listings and signed downloads for one bucket

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backend::{ObjectAttrs, ObjectBackend};
use crate::error::BlobError;
use crate::gcp::{GcsBackend, GoogleAuth, IamSigner, SecretManager};
use crate::services::config::BlobConfig;
use crate::services::credentials::{CredentialResolver, KeySources};
use crate::services::file::File;
use crate::services::lister::ObjectLister;
use crate::services::signer::SignedUrlIssuer;

/// Browses a bucket and hands out signed download URLs
pub struct BlobStore {
    backend: Arc<dyn ObjectBackend>,
    lister: ObjectLister,
    resolver: CredentialResolver,
    issuer: SignedUrlIssuer,
    ttl: Duration,
}

impl BlobStore {
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        resolver: CredentialResolver,
        issuer: SignedUrlIssuer,
        ttl: Duration,
    ) -> Self {
        Self {
            lister: ObjectLister::new(backend.clone()),
            backend,
            resolver,
            issuer,
            ttl,
        }
    }

    /// Wire the production Google clients from `config`
    pub async fn google(config: &BlobConfig) -> Result<Self, BlobError> {
        let auth = Arc::new(GoogleAuth::from_config(config).await?);
        let endpoints = &config.endpoints;

        let backend = Arc::new(GcsBackend::new(
            &config.bucket_name,
            &endpoints.storage_api,
            auth.clone(),
        )?);
        let secrets = Arc::new(SecretManager::new(
            &endpoints.secret_manager_api,
            auth.clone(),
        )?);
        let signer = Arc::new(IamSigner::new(&endpoints.iam_api, auth.clone())?);

        let resolver = CredentialResolver::new(KeySources::from(config), secrets, auth, signer);
        let issuer = SignedUrlIssuer::new(&config.bucket_name, &endpoints.storage_host);

        info!(
            "Blob store ready for bucket {} (signed URLs valid for {}s)",
            config.bucket_name,
            config.signed_url_ttl.as_secs()
        );

        Ok(Self::new(backend, resolver, issuer, config.signed_url_ttl))
    }

    /// Directory listing of `prefix`
    pub async fn files(&self, prefix: &str) -> Result<Vec<File>, BlobError> {
        self.lister.list_objects(prefix).await
    }

    /// Object metadata with a signed download URL as its path
    pub async fn file(&self, name: &str) -> Result<File, BlobError> {
        let attrs = self.attrs(name).await?;

        let identity = self.resolver.resolve().await?;
        let url = self.issuer.sign(&attrs.name, &identity, self.ttl).await?;

        debug!("Issued signed URL for {} as {}", name, identity.email());
        Ok(File::signed(attrs, url))
    }

    /// Object metadata with its virtual path; nothing is signed
    pub async fn stat(&self, name: &str) -> Result<File, BlobError> {
        Ok(File::object(self.attrs(name).await?))
    }

    async fn attrs(&self, name: &str) -> Result<ObjectAttrs, BlobError> {
        self.backend
            .object_attrs(name)
            .await
            .map_err(|e| match e {
                BlobError::NotFound(_) => e,
                other => other.into_storage(),
            })
    }
}
