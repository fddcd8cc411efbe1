//! Upload service
//!
//! Stages a payload in a temp file, validates its extension, derives a unique
//! object name and writes it to the configured bucket.
//!
//! # Example
//!
//! ```no_run
//! use gcs_uploadr::config::Config;
//! use gcs_uploadr::upload::{UploadRequest, UploadService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let service = UploadService::from_config(&config)?;
//!
//! let request = UploadRequest::new(std::fs::read("hello.png")?, "hello.png", "image/png");
//! let result = service.upload_file(request).await?;
//! println!("{} -> {}", result.object_name, result.access_link);
//! # Ok(())
//! # }
//! ```

use super::temp_file::TempArtifact;
use super::{object_name, ExtensionPolicy, UploadError, UploadRequest, UploadResult};
use crate::config::Config;
use crate::metrics;
use crate::storage::{GcsClient, ObjectStore, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Uploads files to a single bucket
pub struct UploadService {
    bucket_id: String,
    directory_prefix: String,
    policy: ExtensionPolicy,
    temp_dir: PathBuf,
    store: Arc<dyn ObjectStore>,
}

impl UploadService {
    /// Create a service writing through `store`
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket_id: config.storage.bucket_id.clone(),
            directory_prefix: config.storage.directory_prefix.clone(),
            policy: ExtensionPolicy::from(&config.upload),
            temp_dir: config.upload.temp_dir(),
            store,
        }
    }

    /// Create a service backed by a [`GcsClient`] for the configured project
    pub fn from_config(config: &Config) -> Result<Self, UploadError> {
        let client = GcsClient::from_config(&config.storage)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Bucket every upload is written to
    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// Extension policy applied before any network call
    pub fn policy(&self) -> &ExtensionPolicy {
        &self.policy
    }

    /// Store `request` under a generated unique object name
    ///
    /// Fails with `InvalidInput` when the file name is missing or the payload
    /// is empty, `UnsupportedFileType` when the name does not end with an
    /// allowed extension and `StorageUploadFailed` when staging or the remote
    /// write fails. Nothing is retried.
    #[tracing::instrument(
        name = "upload.upload_file",
        skip(self, request),
        fields(
            gcs.bucket = %self.bucket_id,
            upload.file_name = ?request.declared_file_name,
            http.content_type = %request.content_type,
            upload.bytes = request.payload.len(),
            gcs.object = tracing::field::Empty
        ),
        err
    )]
    pub async fn upload_file(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        let bytes = request.payload.len() as u64;
        let start_time = Instant::now();

        let result = self.store_request(request).await;

        let duration = start_time.elapsed();
        metrics::record_upload_duration(&self.bucket_id, duration.as_secs_f64());

        match &result {
            Ok(uploaded) => {
                metrics::record_upload_success(&self.bucket_id, bytes);
                tracing::Span::current().record("gcs.object", uploaded.object_name.as_str());
                tracing::info!(
                    object = %uploaded.object_name,
                    bytes = bytes,
                    duration_ms = duration.as_millis(),
                    "File successfully uploaded to GCS"
                );
            }
            Err(e) => {
                metrics::record_upload_failure(&self.bucket_id);
                metrics::record_error(e.kind());
                tracing::error!(
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "An error occurred while uploading data"
                );
            }
        }

        result
    }

    async fn store_request(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        let file_name = request
            .declared_file_name
            .as_deref()
            .ok_or_else(|| UploadError::InvalidInput("original file name is missing".into()))?;
        if request.payload.is_empty() {
            return Err(UploadError::InvalidInput("payload is empty".into()));
        }

        tracing::debug!("Start file uploading process on GCS");
        let mut artifact =
            TempArtifact::create(&self.temp_dir, &request.payload).map_err(StorageError::TempFile)?;
        tracing::debug!(path = %artifact.path().display(), "Staged upload payload");

        let extension = self.policy.check(file_name)?;
        let object_name = object_name::generate(&self.directory_prefix, file_name, extension);

        let bucket = self.store.get_bucket(&self.bucket_id).await?;
        let data = artifact.read_all().map_err(StorageError::TempFile)?;
        let stored = self
            .store
            .create_object(&bucket.name, &object_name, data, &request.content_type)
            .await?;

        Ok(UploadResult {
            object_name: stored.name,
            access_link: stored.media_link,
        })
    }
}
