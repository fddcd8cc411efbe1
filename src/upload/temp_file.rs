//! Temporary file staging for uploads
//!
//! The payload is written to a local file before it is sent to the bucket.
//! The file name is generated here and never derived from caller input, so
//! concurrent uploads of identically named files cannot collide.
//!
//! # Example
//!
//! ```no_run
//! use gcs_uploadr::upload::temp_file::TempArtifact;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut temp = TempArtifact::create(&std::env::temp_dir(), b"Hello, World!")?;
//!
//! println!("File: {:?}", temp.path());
//! println!("Size: {} bytes", temp.size());
//! let data = temp.read_all()?;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Temporary upload artifact
///
/// The handle is closed and the file removed when dropped.
pub struct TempArtifact {
    path: PathBuf,
    file: Option<File>,
    size: u64,
}

impl TempArtifact {
    /// Write `data` to a new temp file inside `dir` and reopen it for reading
    pub fn create(dir: &Path, data: &[u8]) -> io::Result<Self> {
        let path = dir.join(format!("gcs-uploadr-{}.tmp", uuid::Uuid::new_v4()));

        let file = File::options().write(true).create_new(true).open(&path)?;
        // The write handle is closed by `stage` before the path is removed
        if let Err(e) = stage(file, data) {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        let mut artifact = Self {
            path,
            file: None,
            size: data.len() as u64,
        };
        artifact.file = Some(File::open(&artifact.path)?);
        Ok(artifact)
    }

    /// Get the path to the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the size of the file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the staged content back
    pub fn read_all(&mut self) -> io::Result<Bytes> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("temp file is not open"))?;
        let mut buffer = Vec::with_capacity(self.size as usize);
        file.read_to_end(&mut buffer)?;
        Ok(Bytes::from(buffer))
    }
}

/// Write and flush `data`, consuming `writer` so it is closed on return
fn stage<W: Write>(mut writer: W, data: &[u8]) -> io::Result<()> {
    writer.write_all(data)?;
    writer.flush()
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        // Close before removing
        self.file.take();

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up temp file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_create_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempArtifact::create(dir.path(), b"test data").unwrap();

        assert!(temp.path().exists());
        assert!(temp.path().starts_with(dir.path()));
        assert_eq!(temp.size(), 9);
    }

    #[test]
    fn test_read_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempArtifact::create(dir.path(), b"hello").unwrap();
        assert_eq!(temp.read_all().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TempArtifact::create(dir.path(), b"a").unwrap();
        let b = TempArtifact::create(dir.path(), b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_cleanup_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let temp = TempArtifact::create(dir.path(), b"temp data").unwrap();
            path = temp.path().to_path_buf();
            assert!(path.exists());
        }
        // Dropped
        assert!(!path.exists());
    }

    struct FailingWriter {
        closed: Arc<AtomicBool>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for FailingWriter {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stage_closes_handle_on_write_error() {
        let closed = Arc::new(AtomicBool::new(false));
        let writer = FailingWriter {
            closed: Arc::clone(&closed),
        };

        let result = stage(writer, b"data");

        assert!(result.is_err());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = TempArtifact::create(&dir.path().join("missing"), b"data");
        assert!(result.is_err());
    }
}
