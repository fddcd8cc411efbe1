//! GCS Uploadr Library
//!
//! Validated file uploads to Google Cloud Storage.
//!
//! # Features
//!
//! - **Extension Allow-List**: Only recognized file types are stored
//! - **Unique Object Names**: `{prefix}/{name}-{32 hex chars}{ext}`
//! - **Temp File Staging**: Internally named, removed on every exit path
//! - **Service Account Auth**: OAuth2 JWT bearer grant with token caching
//!
//! # Example
//!
//! ```no_run
//! use gcs_uploadr::{config::Config, upload::{UploadRequest, UploadService}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let service = UploadService::from_config(&config)?;
//!     let result = service
//!         .upload_file(UploadRequest::new(b"%PDF-1.7".to_vec(), "report.pdf", "application/pdf"))
//!         .await?;
//!     println!("{}", result.access_link);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use upload::{UploadError, UploadRequest, UploadResult, UploadService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
