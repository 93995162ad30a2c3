//! HTTP basic authentication

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine};
use mediabrowser_core::problemdetails;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::handlers::types::BlobAppState;

const CHALLENGE: &str = "Basic realm=\"mediabrowser\"";

/// Username and password every request must present
#[derive(Clone)]
pub struct BasicAuthCredentials {
    username: String,
    password: String,
}

impl BasicAuthCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials only apply when both halves are configured
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) => Some(Self::new(username, password)),
            _ => None,
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = digest(username) == digest(&self.username);
        let pass_ok = digest(password) == digest(&self.password);
        user_ok & pass_ok
    }
}

impl fmt::Debug for BasicAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn digest(value: &str) -> Vec<u8> {
    Sha256::digest(value.as_bytes()).to_vec()
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized(detail: &str) -> Response {
    let mut response = problemdetails::new(StatusCode::UNAUTHORIZED)
        .with_title("Unauthorized")
        .with_detail(detail)
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    response
}

/// Rejects requests without matching basic credentials, when any are configured
pub async fn require_basic_auth(
    State(state): State<Arc<BlobAppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.credentials else {
        return next.run(req).await;
    };

    match basic_credentials(req.headers()) {
        None => {
            warn!("Could not find or parse Authorization header");
            unauthorized("Could not find or parse Authorization header")
        }
        Some((username, password)) if !expected.matches(&username, &password) => {
            warn!("Invalid credentials provided for user {}", username);
            unauthorized("Invalid credentials provided")
        }
        Some(_) => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parses_basic_header() {
        let encoded = STANDARD.encode("alice:s3cret:with-colon");
        let parsed = basic_credentials(&headers(&format!("Basic {}", encoded)));
        assert_eq!(
            parsed,
            Some(("alice".to_string(), "s3cret:with-colon".to_string()))
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(basic_credentials(&headers("Bearer abc")).is_none());
        assert!(basic_credentials(&headers("Basic !!!")).is_none());
        assert!(basic_credentials(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_matches() {
        let credentials = BasicAuthCredentials::new("alice", "s3cret");
        assert!(credentials.matches("alice", "s3cret"));
        assert!(!credentials.matches("alice", "wrong"));
        assert!(!credentials.matches("bob", "s3cret"));
    }

    #[test]
    fn test_requires_both_parts() {
        assert!(BasicAuthCredentials::from_parts(Some("a".into()), None).is_none());
        assert!(BasicAuthCredentials::from_parts(None, Some("b".into())).is_none());
        assert!(BasicAuthCredentials::from_parts(Some("a".into()), Some("b".into())).is_some());
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", BasicAuthCredentials::new("alice", "s3cret"));
        assert!(!debug.contains("s3cret"));
    }
}
