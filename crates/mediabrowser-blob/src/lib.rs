//! mediabrowser-blob: browse a Cloud Storage bucket over HTTP
//!
//! Lists one directory level of a bucket at a time and hands out
//! time-limited V4 signed URLs for its objects. Signing identities come from
//! a key file, a key stored in Secret Manager, or the ambient credentials of
//! the environment, falling back to IAM `signBlob` when no key is at hand.

pub mod backend;
pub mod error;
pub mod gcp;
pub mod handlers;
pub mod paths;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ListingQuery, ObjectAttrs, ObjectBackend, ObjectPage, RawEntry};
pub use error::BlobError;
pub use handlers::{configure_routes, BasicAuthCredentials, BlobAppState};
pub use services::{BlobConfig, BlobInputConfig, BlobStore, File};
