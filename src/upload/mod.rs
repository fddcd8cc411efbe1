//! Upload module
//!
//! Validates user-submitted files and stores them in a Cloud Storage bucket
//! under a generated unique object name.

use crate::storage::StorageError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod object_name;
pub mod policy;
pub mod service;
pub mod temp_file;

pub use policy::ExtensionPolicy;
pub use service::UploadService;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not a permitted file type: {0}")]
    UnsupportedFileType(String),

    #[error("An error occurred while storing data to GCS: {0}")]
    StorageUploadFailed(#[from] StorageError),
}

impl UploadError {
    /// Label used for error metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::InvalidInput(_) => "invalid_input",
            UploadError::UnsupportedFileType(_) => "unsupported_file_type",
            UploadError::StorageUploadFailed(_) => "storage_upload_failed",
        }
    }
}

/// A file submitted for upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Bytes,
    pub declared_file_name: Option<String>,
    pub content_type: String,
}

impl UploadRequest {
    pub fn new(
        payload: impl Into<Bytes>,
        declared_file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            payload: payload.into(),
            declared_file_name: Some(declared_file_name.into()),
            content_type: content_type.into(),
        }
    }
}

/// Descriptor of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub object_name: String,
    pub access_link: String,
}
