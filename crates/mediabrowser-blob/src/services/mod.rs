//! Blob browser services

mod blob_store;
mod config;
pub mod credentials;
mod file;
pub mod lister;
pub mod signer;

pub use blob_store::BlobStore;
pub use config::{
    BlobConfig, BlobInputConfig, GoogleEndpoints, DEFAULT_IAM_API, DEFAULT_METADATA_URL,
    DEFAULT_SECRET_MANAGER_API, DEFAULT_STORAGE_API, DEFAULT_STORAGE_HOST, DEFAULT_TOKEN_URL,
};
pub use credentials::{
    AmbientCredentialSource, AmbientCredentials, CredentialResolver, KeySources, SecretStore,
    ServiceAccountKey,
};
pub use file::File;
pub use lister::ObjectLister;
pub use signer::{
    BlobSigner, SignedUrlIssuer, SigningIdentity, DEFAULT_SIGNED_URL_TTL, MAX_SIGNED_URL_TTL,
};
