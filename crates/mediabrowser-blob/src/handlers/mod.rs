//! HTTP handlers for the bucket browser

pub mod auth;
pub mod handler;
pub mod render;
pub mod types;

pub use auth::{require_basic_auth, BasicAuthCredentials};
pub use handler::configure_routes;
pub use types::BlobAppState;
