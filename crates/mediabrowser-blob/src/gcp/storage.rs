//! Cloud Storage JSON API backend

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::{ListingQuery, ObjectAttrs, ObjectBackend, ObjectPage, RawEntry};
use crate::error::BlobError;
use crate::gcp::{error_body, http_client, AccessTokenProvider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(default)]
    prefixes: Vec<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    content_type: Option<String>,
    /// Decimal string, as the JSON API encodes 64-bit integers
    size: Option<String>,
    updated: Option<DateTime<Utc>>,
}

impl From<ObjectResource> for ObjectAttrs {
    fn from(resource: ObjectResource) -> Self {
        let size = resource.size.as_deref().and_then(|s| s.parse().ok());
        ObjectAttrs {
            name: resource.name,
            content_type: resource.content_type,
            size,
            updated: resource.updated,
        }
    }
}

/// Read-only view of one bucket through the JSON API
pub struct GcsBackend {
    client: Client,
    base_url: String,
    bucket: String,
    auth: Arc<dyn AccessTokenProvider>,
}

impl GcsBackend {
    pub fn new(
        bucket: impl Into<String>,
        base_url: impl Into<String>,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, BlobError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
            bucket: bucket.into(),
            auth,
        })
    }

    fn objects_url(&self) -> String {
        format!(
            "{}/storage/v1/b/{}/o",
            self.base_url,
            urlencoding::encode(&self.bucket)
        )
    }
}

#[async_trait]
impl ObjectBackend for GcsBackend {
    async fn list_page(
        &self,
        query: &ListingQuery,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, BlobError> {
        let token = self.auth.access_token().await?;

        let mut params = vec![
            ("prefix", query.prefix.as_str()),
            ("delimiter", query.delimiter.as_str()),
        ];
        if let Some(page_token) = page_token {
            params.push(("pageToken", page_token));
        }

        debug!(
            "GCS list request: bucket={} prefix={:?} page_token={:?}",
            self.bucket, query.prefix, page_token
        );

        let response = self
            .client
            .get(self.objects_url())
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| BlobError::Storage(format!("List request failed: {}", e)))?;

        if !response.status().is_success() {
            let error = error_body(response).await;
            warn!("Listing bucket {} failed: {}", self.bucket, error);
            return Err(BlobError::Storage(format!(
                "Listing bucket {} failed with {}",
                self.bucket, error
            )));
        }

        let body: ObjectsResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Storage(format!("Failed to parse list response: {}", e)))?;

        let entries = body
            .prefixes
            .into_iter()
            .map(RawEntry::Prefix)
            .chain(
                body.items
                    .into_iter()
                    .map(|item| RawEntry::Object(item.into())),
            )
            .collect();

        Ok(ObjectPage {
            entries,
            next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn object_attrs(&self, name: &str) -> Result<ObjectAttrs, BlobError> {
        let token = self.auth.access_token().await?;
        let url = format!("{}/{}", self.objects_url(), urlencoding::encode(name));

        debug!("GCS attrs request: bucket={} object={}", self.bucket, name);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BlobError::Storage(format!("Attribute request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(name.to_string()));
        }
        if !response.status().is_success() {
            let error = error_body(response).await;
            return Err(BlobError::Storage(format!(
                "Fetching attributes of {} failed with {}",
                name, error
            )));
        }

        let resource: ObjectResource = response
            .json()
            .await
            .map_err(|e| BlobError::Storage(format!("Failed to parse object resource: {}", e)))?;
        Ok(resource.into())
    }
}
