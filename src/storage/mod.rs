//! Object storage module
//!
//! Defines the [`ObjectStore`] seam the upload service writes through and the
//! Google Cloud Storage implementation of it.
//!
//! # Example
//!
//! ```no_run
//! use gcs_uploadr::storage::{GcsClient, GcsClientConfig, ObjectStore, StaticToken};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GcsClientConfig {
//!     project_id: "demo-project".to_string(),
//!     endpoint: None,
//!     timeout: None,
//! };
//! let client = GcsClient::new(config, Arc::new(StaticToken::new("ya29.token")))?;
//!
//! let bucket = client.get_bucket("user-uploads").await?;
//! let object = client
//!     .create_object(&bucket.name, "docs/report.pdf", Bytes::from("%PDF"), "application/pdf")
//!     .await?;
//! println!("Media link: {}", object.media_link);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod credentials;
pub mod gcs;

pub use credentials::{
    CredentialsError, CredentialsProvider, ServiceAccountKey, ServiceAccountTokenProvider,
    StaticToken, TokenProvider,
};
pub use gcs::{GcsClient, GcsClientConfig};

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Temp file error: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Unexpected response ({status}): {body}")]
    ResponseError { status: u16, body: String },
}

/// Bucket metadata returned by a lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Object created in a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub name: String,
    #[serde(rename = "mediaLink")]
    pub media_link: String,
}

/// Bucket-oriented object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve a bucket by name
    async fn get_bucket(&self, bucket: &str) -> Result<BucketInfo, StorageError>;

    /// Create an object holding `body`, tagged with `content_type`
    async fn create_object(
        &self,
        bucket: &str,
        name: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_object_from_gcs_json() {
        let json = r#"{
            "kind": "storage#object",
            "name": "uploads/a.png-0123.png",
            "bucket": "demo-bucket",
            "mediaLink": "https://storage.googleapis.com/download/storage/v1/b/demo-bucket/o/a?alt=media"
        }"#;
        let object: StoredObject = serde_json::from_str(json).unwrap();
        assert_eq!(object.name, "uploads/a.png-0123.png");
        assert!(object.media_link.ends_with("alt=media"));
    }

    #[test]
    fn test_bucket_info_without_location() {
        let bucket: BucketInfo = serde_json::from_str(r#"{"name": "demo-bucket"}"#).unwrap();
        assert_eq!(bucket.name, "demo-bucket");
        assert!(bucket.location.is_none());
    }
}
