//! Test doubles shared by the unit tests of this crate

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::signature::Verifier;
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::backend::{ListingQuery, ObjectAttrs, ObjectBackend, ObjectPage, RawEntry};
use crate::error::BlobError;
use crate::gcp::AccessTokenProvider;
use crate::services::credentials::{
    AmbientCredentialSource, AmbientCredentials, SecretStore, ServiceAccountKey,
};
use crate::services::signer::{sign_rs256, BlobSigner};

/// A 2048-bit key generated once per test binary
pub fn test_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate test key")
    })
}

pub fn test_key_pem() -> String {
    test_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("failed to encode test key")
        .to_string()
}

/// Check an RS256 signature against the public half of [`test_key`]
pub fn verify_signature(message: &[u8], signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::<Sha256>::new(test_key().to_public_key());
    match Signature::try_from(signature) {
        Ok(signature) => verifying_key.verify(message, &signature).is_ok(),
        Err(_) => false,
    }
}

/// Service account JSON key for `email` carrying [`test_key`]
pub fn service_account_json(email: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": "0123456789abcdef",
        "private_key": test_key_pem(),
        "client_email": email,
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}

/// A JWT with the given claims and a dummy signature
pub fn unsigned_jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

pub fn attrs(name: &str) -> ObjectAttrs {
    ObjectAttrs {
        name: name.to_string(),
        content_type: Some("text/plain".to_string()),
        size: Some(11),
        updated: None,
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    ListPage(usize),
    ListNotFound,
    Attrs,
}

/// Bucket contents held in memory
pub struct InMemoryBackend {
    objects: Vec<ObjectAttrs>,
    pages: Option<Vec<Vec<RawEntry>>>,
    failure: Option<Failure>,
    pages_requested: AtomicUsize,
}

impl InMemoryBackend {
    /// A bucket holding `names`, listed as a single page
    pub fn with_objects(names: &[&str]) -> Self {
        Self::with_attrs(names.iter().map(|name| attrs(name)).collect())
    }

    pub fn with_attrs(objects: Vec<ObjectAttrs>) -> Self {
        Self {
            objects,
            pages: None,
            failure: None,
            pages_requested: AtomicUsize::new(0),
        }
    }

    /// A listing served verbatim as the given pages, whatever the query
    pub fn paged(pages: Vec<Vec<RawEntry>>) -> Self {
        let objects = pages
            .iter()
            .flatten()
            .filter_map(|entry| match entry {
                RawEntry::Object(attrs) => Some(attrs.clone()),
                RawEntry::Prefix(_) => None,
            })
            .collect();
        Self {
            objects,
            pages: Some(pages),
            failure: None,
            pages_requested: AtomicUsize::new(0),
        }
    }

    /// Fail with a storage error when the zero-based page `index` is requested
    pub fn failing_on_page(mut self, index: usize) -> Self {
        self.failure = Some(Failure::ListPage(index));
        self
    }

    pub fn failing_with_not_found(mut self) -> Self {
        self.failure = Some(Failure::ListNotFound);
        self
    }

    /// Fail every attribute fetch with a storage error
    pub fn failing_attrs(mut self) -> Self {
        self.failure = Some(Failure::Attrs);
        self
    }

    pub fn pages_requested(&self) -> usize {
        self.pages_requested.load(Ordering::SeqCst)
    }

    fn delimited_listing(&self, query: &ListingQuery) -> Vec<RawEntry> {
        let mut prefixes = BTreeSet::new();
        let mut objects = Vec::new();

        for object in &self.objects {
            let Some(rest) = object.name.strip_prefix(&query.prefix) else {
                continue;
            };
            match rest.find(query.delimiter.as_str()) {
                Some(idx) => {
                    let end = query.prefix.len() + idx + query.delimiter.len();
                    prefixes.insert(object.name[..end].to_string());
                }
                None => objects.push(object.clone()),
            }
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));

        prefixes
            .into_iter()
            .map(RawEntry::Prefix)
            .chain(objects.into_iter().map(RawEntry::Object))
            .collect()
    }
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    async fn list_page(
        &self,
        query: &ListingQuery,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BlobError> {
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| BlobError::Storage(format!("bad page token {}", token)))?,
        };
        self.pages_requested.fetch_add(1, Ordering::SeqCst);

        match self.failure {
            Some(Failure::ListPage(failing)) if failing == index => {
                return Err(BlobError::Storage("connection reset".to_string()))
            }
            Some(Failure::ListNotFound) => {
                return Err(BlobError::NotFound("bucket".to_string()))
            }
            _ => {}
        }

        match &self.pages {
            Some(pages) => {
                let entries = pages.get(index).cloned().unwrap_or_default();
                let next_page_token =
                    (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
                Ok(ObjectPage {
                    entries,
                    next_page_token,
                })
            }
            None => Ok(ObjectPage {
                entries: self.delimited_listing(query),
                next_page_token: None,
            }),
        }
    }

    async fn object_attrs(&self, name: &str) -> Result<ObjectAttrs, BlobError> {
        if matches!(self.failure, Some(Failure::Attrs)) {
            return Err(BlobError::Storage("permission denied".to_string()));
        }
        self.objects
            .iter()
            .find(|object| object.name == name)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }
}

/// Remote signer stand-in that signs with [`test_key`]
pub struct LocalKeySigner {
    email: String,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl LocalKeySigner {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    /// Accounts signing was requested for, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl BlobSigner for LocalKeySigner {
    async fn sign_blob(&self, account: &str, payload: &[u8]) -> Result<Vec<u8>, BlobError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(account.to_string());
        if self.fail {
            return Err(BlobError::Storage("signBlob returned 403".to_string()));
        }
        if account != self.email {
            return Err(BlobError::Signing(format!("cannot sign for {}", account)));
        }
        sign_rs256(test_key(), payload)
    }
}

/// Secret store backed by a map
pub struct FakeSecrets {
    secrets: HashMap<String, Vec<u8>>,
}

impl FakeSecrets {
    pub fn empty() -> Self {
        Self {
            secrets: HashMap::new(),
        }
    }

    pub fn with(name: &str, value: Vec<u8>) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(name.to_string(), value);
        Self { secrets }
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn access_secret(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| BlobError::Storage(format!("secret {} not found", name)))
    }
}

/// Ambient credential source returning a fixed answer
pub struct FakeAmbient {
    credentials: Option<AmbientCredentials>,
}

impl FakeAmbient {
    pub fn key(key: ServiceAccountKey) -> Self {
        Self {
            credentials: Some(AmbientCredentials::ServiceAccountKey(key)),
        }
    }

    pub fn token(token: String) -> Self {
        Self {
            credentials: Some(AmbientCredentials::Token(token)),
        }
    }

    pub fn failing() -> Self {
        Self { credentials: None }
    }
}

#[async_trait]
impl AmbientCredentialSource for FakeAmbient {
    async fn discover(&self) -> Result<AmbientCredentials, BlobError> {
        self.credentials
            .clone()
            .ok_or_else(|| BlobError::Storage("metadata server unreachable".to_string()))
    }
}

/// Access token provider handing out a fixed token
pub struct StaticToken(pub &'static str);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, BlobError> {
        Ok(self.0.to_string())
    }
}
