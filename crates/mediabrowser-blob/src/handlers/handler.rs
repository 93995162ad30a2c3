//! Bucket browsing routes
//!
//! Every path outside `/favicon.ico` is browsed: a path whose last segment
//! has an extension names an object and redirects to its signed URL, any
//! other path lists a directory.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use mediabrowser_core::problemdetails::{self, Problem};
use tower_http::services::ServeFile;
use tracing::{debug, info};

use crate::handlers::auth::require_basic_auth;
use crate::handlers::render::render_listing;
use crate::handlers::types::BlobAppState;
use crate::paths::{has_extension, listing_prefix, object_name};
use crate::services::File;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Browser routes; `static_dir` holds `favicon.ico`
pub fn configure_routes(state: Arc<BlobAppState>, static_dir: impl AsRef<Path>) -> Router {
    if state.credentials.is_none() {
        info!("WEB_USERNAME and WEB_PASSWORD not set, requests will not be authenticated");
    }

    Router::new()
        .fallback(browse)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .route_service(
            "/favicon.ico",
            ServeFile::new(static_dir.as_ref().join("favicon.ico")),
        )
        .with_state(state)
}

async fn browse(
    State(state): State<Arc<BlobAppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, Problem> {
    let request_path = uri.path();

    if method != Method::GET && method != Method::HEAD {
        return Ok((
            [(header::ALLOW, "GET, HEAD")],
            problemdetails::new(StatusCode::METHOD_NOT_ALLOWED)
                .with_title("Method Not Allowed")
                .with_detail(format!("{} is not supported", method))
                .with_instance(request_path),
        )
            .into_response());
    }

    debug!("Received {} request for path {}", method, request_path);

    serve_path(&state, &method, request_path)
        .await
        .map_err(|problem| problem.with_instance(request_path))
}

async fn serve_path(
    state: &BlobAppState,
    method: &Method,
    request_path: &str,
) -> Result<Response, Problem> {
    let name = object_name(request_path)?;
    if has_extension(&name) {
        serve_file(state, method, &name).await
    } else {
        serve_listing(state, method, request_path).await
    }
}

async fn serve_listing(
    state: &BlobAppState,
    method: &Method,
    request_path: &str,
) -> Result<Response, Problem> {
    let prefix = listing_prefix(request_path)?;
    let mut files = state.blob_store.files(&prefix).await?;

    if method == Method::HEAD {
        return Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        )
            .into_response());
    }

    if !prefix.is_empty() {
        files.insert(0, File::parent(&prefix));
    }
    Ok(Html(render_listing(&prefix, &files)).into_response())
}

async fn serve_file(
    state: &BlobAppState,
    method: &Method,
    name: &str,
) -> Result<Response, Problem> {
    if method == Method::HEAD {
        let file = state.blob_store.stat(name).await?;
        return Ok((StatusCode::OK, metadata_headers(&file)).into_response());
    }

    let file = state.blob_store.file(name).await?;
    debug!("Redirecting {} to its signed URL", name);

    let location = HeaderValue::from_str(&file.path).map_err(|e| {
        problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_title("Invalid Redirect")
            .with_detail(e.to_string())
    })?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

fn metadata_headers(file: &File) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let content_type = file
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(size) = file.size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    headers
}
