//! File extension allow-list

use super::UploadError;
use crate::config::{UploadPolicyConfig, DEFAULT_ALLOWED_EXTENSIONS};

/// Case-sensitive suffix allow-list
///
/// Entries are checked in order and the first match wins, so `.jpeg` listed
/// before `.peg` decides which extension a `photo.jpeg` gets.
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    allowed: Vec<String>,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }
}

impl From<&UploadPolicyConfig> for ExtensionPolicy {
    fn from(config: &UploadPolicyConfig) -> Self {
        Self::new(config.allowed_extensions.iter().cloned())
    }
}

impl ExtensionPolicy {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Return the allow-listed extension `file_name` ends with
    pub fn check<'a>(&'a self, file_name: &str) -> Result<&'a str, UploadError> {
        if file_name.contains('.') {
            if let Some(ext) = self.allowed.iter().find(|ext| file_name.ends_with(ext.as_str())) {
                tracing::debug!(extension = %ext, "Accepted file type");
                return Ok(ext.as_str());
            }
        }

        tracing::warn!(file_name = %file_name, "Not a permitted file type");
        Err(UploadError::UnsupportedFileType(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_default_extensions() {
        let policy = ExtensionPolicy::default();
        for (name, ext) in [
            ("hello.png", ".png"),
            ("photo.jpeg", ".jpeg"),
            ("report.pdf", ".pdf"),
            ("letter.doc", ".doc"),
            ("song.mp3", ".mp3"),
        ] {
            assert_eq!(policy.check(name).unwrap(), ext);
        }
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let policy = ExtensionPolicy::default();
        let err = policy.check("malware.exe").unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedFileType(ref name) if name == "malware.exe"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let policy = ExtensionPolicy::default();
        assert!(policy.check("HELLO.PNG").is_err());
    }

    #[test]
    fn test_suffix_only() {
        let policy = ExtensionPolicy::default();
        assert!(policy.check("archive.png.zip").is_err());
        assert!(policy.check("docx.doc").is_ok());
        assert!(policy.check("report.docx").is_err());
    }

    #[test]
    fn test_name_without_dot_rejected() {
        let policy = ExtensionPolicy::default();
        assert!(policy.check("png").is_err());
        assert!(policy.check("").is_err());
    }

    #[test]
    fn test_first_match_wins() {
        let policy = ExtensionPolicy::new(vec![".tar.gz".to_string(), ".gz".to_string()]);
        assert_eq!(policy.check("backup.tar.gz").unwrap(), ".tar.gz");
        assert_eq!(policy.check("log.gz").unwrap(), ".gz");
    }

    #[test]
    fn test_from_config() {
        let config = UploadPolicyConfig {
            allowed_extensions: vec![".csv".into()],
            temp_dir: None,
        };
        let policy = ExtensionPolicy::from(&config);
        assert_eq!(policy.allowed(), &[".csv".to_string()]);
        assert!(policy.check("data.csv").is_ok());
        assert!(policy.check("image.png").is_err());
    }
}
