//! V4 signed URL issuance
//!
//! Builds `GOOG4-RSA-SHA256` query-string signed URLs scoped to GET. The
//! string to sign is either signed locally with the account's RSA key or
//! handed to a remote sign-blob capability acting for the same account.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::BlobError;
use crate::paths::encode_path;

pub const SIGNING_ALGORITHM: &str = "GOOG4-RSA-SHA256";
/// Signed URLs are valid for a day unless configured otherwise
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound the V4 scheme accepts for `X-Goog-Expires`
pub const MAX_SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const SIGNED_METHOD: &str = "GET";
const SIGNED_HEADERS: &str = "host";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Remote capability that signs arbitrary bytes on behalf of an account
#[async_trait]
pub trait BlobSigner: Send + Sync {
    async fn sign_blob(&self, account: &str, payload: &[u8]) -> Result<Vec<u8>, BlobError>;
}

/// The account a URL is signed for, and how the signature gets computed
#[derive(Clone)]
pub enum SigningIdentity {
    /// Service account email plus its private key; signs locally
    DirectKey {
        email: String,
        private_key: RsaPrivateKey,
    },
    /// Account without local key material; signing is delegated
    Delegated {
        email: String,
        signer: Arc<dyn BlobSigner>,
    },
}

impl SigningIdentity {
    /// Direct-key identity from a PEM encoded key (PKCS#8 or PKCS#1)
    pub fn from_pem(email: impl Into<String>, pem: &str) -> Result<Self, BlobError> {
        Ok(SigningIdentity::DirectKey {
            email: email.into(),
            private_key: parse_private_key(pem)?,
        })
    }

    pub fn email(&self) -> &str {
        match self {
            SigningIdentity::DirectKey { email, .. } => email,
            SigningIdentity::Delegated { email, .. } => email,
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, SigningIdentity::Delegated { .. })
    }

    /// RSA-SHA256 signature over `payload`
    pub async fn sign_bytes(&self, payload: &[u8]) -> Result<Vec<u8>, BlobError> {
        match self {
            SigningIdentity::DirectKey { private_key, .. } => sign_rs256(private_key, payload),
            SigningIdentity::Delegated { email, signer } => {
                signer.sign_blob(email, payload).await.map_err(|e| match e {
                    BlobError::Signing(_) => e,
                    other => BlobError::Signing(other.to_string()),
                })
            }
        }
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningIdentity::DirectKey { email, .. } => f
                .debug_struct("DirectKey")
                .field("email", email)
                .field("private_key", &"<redacted>")
                .finish(),
            SigningIdentity::Delegated { email, .. } => {
                f.debug_struct("Delegated").field("email", email).finish()
            }
        }
    }
}

/// Parse an RSA private key in PKCS#8 or PKCS#1 PEM form
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, BlobError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| BlobError::Credential(format!("Invalid private key: {}", e)))
}

/// Sign with RS256 (RSASSA-PKCS1-v1_5 using SHA-256)
pub fn sign_rs256(private_key: &RsaPrivateKey, payload: &[u8]) -> Result<Vec<u8>, BlobError> {
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key
        .try_sign(payload)
        .map_err(|e| BlobError::Signing(format!("RSA signing failed: {}", e)))?;
    Ok(signature.to_vec())
}

/// Canonical pieces of a V4 signed GET request
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CanonicalRequest {
    pub canonical_uri: String,
    pub canonical_query: String,
    pub string_to_sign: String,
}

/// Issues signed GET URLs for the objects of one bucket
#[derive(Debug, Clone)]
pub struct SignedUrlIssuer {
    bucket: String,
    host: String,
}

impl SignedUrlIssuer {
    /// `host` is the storage host the URL points at, e.g. `storage.googleapis.com`
    pub fn new(bucket: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            host: host.into().to_lowercase(),
        }
    }

    /// Signed URL for `object_name`, valid for `expiry` from now
    pub async fn sign(
        &self,
        object_name: &str,
        identity: &SigningIdentity,
        expiry: Duration,
    ) -> Result<String, BlobError> {
        self.sign_at(object_name, identity, expiry, Utc::now()).await
    }

    /// Signed URL for `object_name`, valid for `expiry` from `issued_at`
    pub async fn sign_at(
        &self,
        object_name: &str,
        identity: &SigningIdentity,
        expiry: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, BlobError> {
        if expiry.is_zero() || expiry > MAX_SIGNED_URL_TTL {
            return Err(BlobError::Signing(format!(
                "Expiry must be between 1 second and {} seconds, got {} seconds",
                MAX_SIGNED_URL_TTL.as_secs(),
                expiry.as_secs()
            )));
        }

        debug!(
            "Requesting signed URL for object {} as {} (delegated: {})",
            object_name,
            identity.email(),
            identity.is_delegated()
        );

        let request = self.canonical_request(object_name, identity.email(), expiry, issued_at);
        let signature = identity.sign_bytes(request.string_to_sign.as_bytes()).await?;

        Ok(format!(
            "https://{}{}?{}&X-Goog-Signature={}",
            self.host,
            request.canonical_uri,
            request.canonical_query,
            hex::encode(signature)
        ))
    }

    pub(crate) fn canonical_request(
        &self,
        object_name: &str,
        email: &str,
        expiry: Duration,
        issued_at: DateTime<Utc>,
    ) -> CanonicalRequest {
        let datestamp = issued_at.format("%Y%m%d").to_string();
        let timestamp = issued_at.format("%Y%m%dT%H%M%SZ").to_string();
        let credential_scope = format!("{}/auto/storage/goog4_request", datestamp);
        let credential = format!("{}/{}", email, credential_scope);

        let canonical_uri = format!(
            "/{}/{}",
            urlencoding::encode(&self.bucket),
            encode_path(object_name)
        );

        // Parameter names are already in the sorted order the scheme requires
        let params = [
            ("X-Goog-Algorithm", SIGNING_ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", expiry.as_secs().to_string()),
            ("X-Goog-SignedHeaders", SIGNED_HEADERS.to_string()),
        ];
        let canonical_query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers = format!("host:{}\n", self.host);

        let canonical = [
            SIGNED_METHOD,
            canonical_uri.as_str(),
            canonical_query.as_str(),
            canonical_headers.as_str(),
            SIGNED_HEADERS,
            UNSIGNED_PAYLOAD,
        ]
        .join("\n");

        let string_to_sign = [
            SIGNING_ALGORITHM.to_string(),
            timestamp,
            credential_scope,
            hex::encode(Sha256::digest(canonical.as_bytes())),
        ]
        .join("\n");

        CanonicalRequest {
            canonical_uri,
            canonical_query,
            string_to_sign,
        }
    }
}
