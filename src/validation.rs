//! Client-side acceptance check for a picked media file.
//!
//! Validation only looks at the file name suffix and the reported size. It
//! never reads file content, so it is safe to run before anything touches the
//! network or the disk.

use crate::config::Config;
use bytes::Bytes;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where the bytes of a picked file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// A file the user picked, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub byte_size: u64,
    pub source: FileSource,
}

impl CandidateFile {
    /// Describe a file on disk. Only metadata is read here.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

        if !metadata.is_file() {
            anyhow::bail!("{} is not a regular file", path.display());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;

        Ok(Self {
            name,
            byte_size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            byte_size: bytes.len() as u64,
            source: FileSource::Memory(Bytes::from(bytes)),
        }
    }
}

/// A candidate that passed validation. Only [`FileValidator`] builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    name: String,
    extension: String,
    byte_size: u64,
    source: FileSource,
}

impl MediaFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased extension, without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Load the full payload for transfer.
    pub(crate) async fn read_bytes(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
            FileSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file format '{}' (allowed: {})", .given, .allowed.join(", "))]
    UnsupportedFormat { given: String, allowed: Vec<String> },

    #[error("File too large: {actual} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { limit: u64, actual: u64 },

    #[error("No target language selected")]
    NoLanguageSelected,

    #[error("Unknown target language '{code}'")]
    UnknownLanguage { code: String },
}

impl ValidationError {
    /// Text shown to the user in place of the upload control.
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::UnsupportedFormat { allowed, .. } => format!(
                "Please upload supported files: {}",
                allowed.join(", ").to_uppercase()
            ),
            ValidationError::FileTooLarge { limit, actual } => format!(
                "File size must be less than {}MB. Current size: {:.2}MB",
                format_megabytes(*limit),
                *actual as f64 / MEBIBYTE
            ),
            ValidationError::NoLanguageSelected => {
                "Please select a target language first".to_string()
            }
            ValidationError::UnknownLanguage { code } => {
                format!("Language '{}' is not offered by the service", code)
            }
        }
    }
}

const MEBIBYTE: f64 = 1024.0 * 1024.0;

fn format_megabytes(bytes: u64) -> String {
    let mb = bytes as f64 / MEBIBYTE;
    if mb.fract() == 0.0 {
        format!("{}", mb as u64)
    } else {
        format!("{:.2}", mb)
    }
}

/// Take the substring after the last `.`, lower-cased. A name without a dot
/// yields the whole name, which never matches a sane allow-list.
fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_extensions: Vec<String>,
    max_file_bytes: u64,
}

impl FileValidator {
    pub fn new<I, S>(allowed_extensions: I, max_file_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            max_file_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.allowed_extensions, config.max_file_bytes)
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Check format, then size, then language selection.
    pub fn validate(
        &self,
        candidate: CandidateFile,
        target_language: &str,
    ) -> Result<MediaFile, ValidationError> {
        let extension = extension_of(&candidate.name);
        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedFormat {
                given: extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        if candidate.byte_size > self.max_file_bytes {
            return Err(ValidationError::FileTooLarge {
                limit: self.max_file_bytes,
                actual: candidate.byte_size,
            });
        }

        if target_language.trim().is_empty() {
            return Err(ValidationError::NoLanguageSelected);
        }

        Ok(MediaFile {
            name: candidate.name,
            extension,
            byte_size: candidate.byte_size,
            source: candidate.source,
        })
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LIMIT: u64 = 52_428_800;

    fn candidate(name: &str, byte_size: u64) -> CandidateFile {
        CandidateFile {
            name: name.to_string(),
            byte_size,
            source: FileSource::Memory(Bytes::new()),
        }
    }

    // ==================== Extension Tests ====================

    #[test]
    fn test_accepts_every_canonical_extension() {
        let validator = FileValidator::default();
        for ext in ["mp3", "wav", "mp4", "avi", "mov", "m4a", "ogg"] {
            let file = validator
                .validate(candidate(&format!("clip.{}", ext), 1024), "hi")
                .expect("Should accept canonical extension");
            assert_eq!(file.extension(), ext);
        }
    }

    #[test]
    fn test_extension_is_lower_cased() {
        let validator = FileValidator::default();
        let file = validator
            .validate(candidate("LECTURE.MP4", 10), "hi")
            .expect("Should accept upper-case extension");

        assert_eq!(file.extension(), "mp4");
        assert_eq!(file.name(), "LECTURE.MP4");
    }

    #[test]
    fn test_uses_last_dot_segment() {
        let validator = FileValidator::default();

        assert!(validator.validate(candidate("archive.pdf.mp3", 10), "hi").is_ok());

        let err = validator
            .validate(candidate("song.mp3.pdf", 10), "hi")
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat { ref given, .. } if given == "pdf"));
    }

    #[test]
    fn test_rejects_pdf_with_allow_list() {
        let validator = FileValidator::default();
        let err = validator.validate(candidate("notes.pdf", 10), "hi").unwrap_err();

        assert_eq!(
            err,
            ValidationError::UnsupportedFormat {
                given: "pdf".to_string(),
                allowed: validator.allowed_extensions().to_vec(),
            }
        );
    }

    #[test]
    fn test_rejects_name_without_dot() {
        let validator = FileValidator::default();
        let err = validator.validate(candidate("recording", 10), "hi").unwrap_err();

        assert!(matches!(err, ValidationError::UnsupportedFormat { ref given, .. } if given == "recording"));
    }

    #[test]
    fn test_rejects_trailing_dot() {
        let validator = FileValidator::default();
        let err = validator.validate(candidate("clip.", 10), "hi").unwrap_err();

        assert!(matches!(err, ValidationError::UnsupportedFormat { ref given, .. } if given.is_empty()));
    }

    #[test]
    fn test_configured_list_is_normalized() {
        let validator = FileValidator::new([".FLAC", "Opus"], 100);

        assert_eq!(validator.allowed_extensions(), ["flac", "opus"]);
        assert!(validator.validate(candidate("a.flac", 1), "hi").is_ok());
        assert!(validator.validate(candidate("a.mp3", 1), "hi").is_err());
    }

    // ==================== Size Tests ====================

    #[test]
    fn test_size_exactly_at_limit_is_accepted() {
        let validator = FileValidator::default();
        assert!(validator.validate(candidate("big.wav", LIMIT), "hi").is_ok());
    }

    #[test]
    fn test_size_one_over_limit_is_rejected() {
        let validator = FileValidator::default();
        let err = validator
            .validate(candidate("big.wav", LIMIT + 1), "hi")
            .unwrap_err();

        assert_eq!(
            err,
            ValidationError::FileTooLarge {
                limit: LIMIT,
                actual: LIMIT + 1,
            }
        );
    }

    #[test]
    fn test_zero_byte_file_is_accepted() {
        let validator = FileValidator::default();
        assert!(validator.validate(candidate("empty.ogg", 0), "hi").is_ok());
    }

    // ==================== Language Tests ====================

    #[test]
    fn test_empty_language_is_rejected() {
        let validator = FileValidator::default();
        assert_eq!(
            validator.validate(candidate("a.mp3", 1), "").unwrap_err(),
            ValidationError::NoLanguageSelected
        );
        assert_eq!(
            validator.validate(candidate("a.mp3", 1), "   ").unwrap_err(),
            ValidationError::NoLanguageSelected
        );
    }

    #[test]
    fn test_format_checked_before_language() {
        let validator = FileValidator::default();
        let err = validator.validate(candidate("a.txt", 1), "").unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_size_checked_before_language() {
        let validator = FileValidator::default();
        let err = validator.validate(candidate("a.mp3", LIMIT + 1), "").unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    // ==================== User Message Tests ====================

    #[test]
    fn test_unsupported_format_message_lists_formats() {
        let err = FileValidator::default()
            .validate(candidate("notes.pdf", 1), "hi")
            .unwrap_err();

        assert_eq!(
            err.user_message(),
            "Please upload supported files: MP3, WAV, MP4, AVI, MOV, M4A, OGG"
        );
    }

    #[test]
    fn test_too_large_message_shows_sizes() {
        let err = ValidationError::FileTooLarge {
            limit: LIMIT,
            actual: 51 * 1024 * 1024,
        };

        assert_eq!(
            err.user_message(),
            "File size must be less than 50MB. Current size: 51.00MB"
        );
    }

    #[test]
    fn test_no_language_message() {
        assert_eq!(
            ValidationError::NoLanguageSelected.user_message(),
            "Please select a target language first"
        );
    }

    // ==================== CandidateFile Tests ====================

    #[test]
    fn test_candidate_from_bytes_records_size() {
        let file = CandidateFile::from_bytes("clip.wav", vec![0u8; 42]);
        assert_eq!(file.byte_size, 42);
        assert_eq!(file.name, "clip.wav");
    }

    #[tokio::test]
    async fn test_candidate_from_path_reads_metadata() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("talk.mp3");
        std::fs::write(&path, vec![1u8; 300]).expect("Failed to write file");

        let file = CandidateFile::from_path(&path).await.expect("Should stat file");

        assert_eq!(file.name, "talk.mp3");
        assert_eq!(file.byte_size, 300);
        assert_eq!(file.source, FileSource::Path(path));
    }

    #[tokio::test]
    async fn test_candidate_from_missing_path_fails() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let result = CandidateFile::from_path(dir.path().join("missing.mp3")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_candidate_from_directory_fails() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let result = CandidateFile::from_path(dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_media_file_reads_payload() {
        let file = FileValidator::default()
            .validate(CandidateFile::from_bytes("a.mp3", vec![7, 8, 9]), "hi")
            .expect("Should validate");

        assert_eq!(
            file.read_bytes().await.expect("Should read"),
            Bytes::from_static(&[7, 8, 9])
        );
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_unsupported_extension_rejected_regardless_of_size(
            stem in "[a-z]{1,12}",
            ext in "[a-z0-9]{1,5}",
            size in any::<u64>(),
        ) {
            let validator = FileValidator::default();
            prop_assume!(!validator.allowed_extensions().contains(&ext));

            let err = validator
                .validate(candidate(&format!("{}.{}", stem, ext), size), "hi")
                .unwrap_err();
            let is_unsupported = matches!(err, ValidationError::UnsupportedFormat { .. });
            prop_assert!(is_unsupported);
        }

        #[test]
        fn prop_size_boundary_is_inclusive(limit in 0u64..u64::MAX) {
            let validator = FileValidator::new(["mp3"], limit);

            prop_assert!(validator.validate(candidate("a.mp3", limit), "hi").is_ok());
            let over = validator.validate(candidate("a.mp3", limit + 1), "hi");
            let is_too_large = matches!(over, Err(ValidationError::FileTooLarge { .. }));
            prop_assert!(is_too_large);
        }
    }
}
