//! Google Cloud Storage client
//!
//! Speaks the Cloud Storage JSON API directly over HTTP.
//!
//! | Operation | Request | Span Name |
//! |-----------|---------|-----------|
//! | Bucket lookup | `GET /storage/v1/b/{bucket}` | `gcs.get_bucket` |
//! | Object create | `POST /upload/storage/v1/b/{bucket}/o?uploadType=media&name={name}` | `gcs.create_object` |
//!
//! Every request carries `x-goog-user-project` so that it is billed to and
//! authorized against the configured project.

use super::{BucketInfo, ObjectStore, StorageError, StoredObject, TokenProvider};
use crate::config::{resolve_endpoint, StorageConfig};
use crate::storage::CredentialsProvider;
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

/// Characters escaped in a URL path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// GCS client configuration
#[derive(Debug, Clone)]
pub struct GcsClientConfig {
    pub project_id: String,
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl From<&StorageConfig> for GcsClientConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            endpoint: config.endpoint.clone(),
            timeout: Some(Duration::from_secs(config.timeout_seconds)),
        }
    }
}

/// Cloud Storage client bound to one project
pub struct GcsClient {
    config: GcsClientConfig,
    http_client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl GcsClient {
    /// Create a new client with an explicit token provider
    pub fn new(
        config: GcsClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, StorageError> {
        if config.project_id.trim().is_empty() {
            return Err(StorageError::ConfigError("project_id is empty".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            tokens,
        })
    }

    /// Create a client from storage configuration, loading credentials
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let tokens = CredentialsProvider::from_config(config)?;
        Self::new(GcsClientConfig::from(config), tokens)
    }

    /// Get the project the client is bound to
    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        resolve_endpoint(self.config.endpoint.as_deref())
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!(
            "{}/storage/v1/b/{}",
            self.endpoint(),
            utf8_percent_encode(bucket, PATH_SEGMENT)
        )
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.endpoint(),
            utf8_percent_encode(bucket, PATH_SEGMENT)
        )
    }

    async fn error_from(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StorageError::ResponseError { status, body }
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    #[tracing::instrument(
        name = "gcs.get_bucket",
        skip(self),
        fields(
            gcs.project = %self.config.project_id,
            gcs.bucket = %bucket,
            http.method = "GET",
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn get_bucket(&self, bucket: &str) -> Result<BucketInfo, StorageError> {
        let token = self.tokens.access_token(&self.http_client).await?;

        let response = self
            .http_client
            .get(self.bucket_url(bucket))
            .query(&[("fields", "name,location")])
            .bearer_auth(token)
            .header(USER_PROJECT_HEADER, &self.config.project_id)
            .send()
            .await?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }
        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.json::<BucketInfo>().await?)
    }

    #[tracing::instrument(
        name = "gcs.create_object",
        skip(self, body),
        fields(
            gcs.project = %self.config.project_id,
            gcs.bucket = %bucket,
            gcs.object = %name,
            http.method = "POST",
            http.content_type = %content_type,
            upload.bytes = body.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn create_object(
        &self,
        bucket: &str,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let token = self.tokens.access_token(&self.http_client).await?;

        let response = self
            .http_client
            .post(self.upload_url(bucket))
            .query(&[("uploadType", "media"), ("name", name)])
            .bearer_auth(token)
            .header(USER_PROJECT_HEADER, &self.config.project_id)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        let object: StoredObject = response.json().await?;
        tracing::info!(object = %object.name, "Object created");
        Ok(object)
    }
}
