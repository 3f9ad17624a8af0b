//! Content-addressed upload storage.
//!
//! [`UploadService`] writes uploaded bytes under the configured upload directory, keyed by
//! their SHA-256 hash, and returns the [`Attachment`] the caller appends to a patient record.
//!
//! # Accepted Types
//!
//! Only `pdf`, `png`, `jpg`, `jpeg` and `txt` uploads are accepted. The type comes from an
//! explicitly declared type when the caller has one (the REST API passes the client's
//! declaration through), otherwise from the filename extension.
//!
//! # Inspection
//!
//! `txt` uploads are decoded (lossily) as UTF-8 and scanned for the configured keywords; the
//! first match becomes the attachment's tag. Images and PDFs are stored without inspection.
//! The media type reported by `infer` is recorded best-effort and is not used to accept or
//! reject an upload.

use crate::{scan_keywords, FilesError};
use chrono::{DateTime, Utc};
use healthdesk_ids::Sha256Hash;
use healthdesk_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the upload root holding SHA-256 addressed blobs.
pub const HASH_DIR_NAME: &str = "sha256";

/// The upload types HealthDesk accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Pdf,
    Png,
    Jpg,
    Jpeg,
    Txt,
}

impl UploadKind {
    /// Parses a declared type: a bare extension (`"pdf"`, `".txt"`) or a MIME type
    /// (`"application/pdf"`, `"image/jpeg"`, `"text/plain"`).
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::UnsupportedType`] for anything else.
    pub fn parse(declared: &str) -> Result<Self, FilesError> {
        let normalised = declared.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalised.as_str() {
            "pdf" | "application/pdf" => Ok(UploadKind::Pdf),
            "png" | "image/png" => Ok(UploadKind::Png),
            "jpg" => Ok(UploadKind::Jpg),
            "jpeg" | "image/jpeg" | "image/jpg" => Ok(UploadKind::Jpeg),
            "txt" | "text/plain" => Ok(UploadKind::Txt),
            _ => Err(FilesError::UnsupportedType(declared.trim().to_owned())),
        }
    }

    /// Derives the kind from a filename's extension.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::UnsupportedType`] when the extension is missing or not accepted.
    pub fn from_filename(filename: &str) -> Result<Self, FilesError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| FilesError::UnsupportedType(format!("no extension on '{filename}'")))?;
        Self::parse(extension)
    }

    /// True for uploads whose content is scanned for keywords.
    pub fn is_text(&self) -> bool {
        matches!(self, UploadKind::Txt)
    }

    /// Media type served back for this kind when the content was not recognised.
    pub fn mime_type(&self) -> &'static str {
        match self {
            UploadKind::Pdf => "application/pdf",
            UploadKind::Png => "image/png",
            UploadKind::Jpg | UploadKind::Jpeg => "image/jpeg",
            UploadKind::Txt => "text/plain; charset=utf-8",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Pdf => "pdf",
            UploadKind::Png => "png",
            UploadKind::Jpg => "jpg",
            UploadKind::Jpeg => "jpeg",
            UploadKind::Txt => "txt",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an uploaded file, as stored on a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename (final path component only)
    pub filename: NonEmptyText,

    /// Path of the blob relative to the upload directory
    pub stored_path: NonEmptyText,

    /// Accepted upload type
    pub kind: UploadKind,

    /// Media type sniffed from the content, if recognisable
    #[serde(default)]
    pub media_type: Option<String>,

    /// Size of the upload in bytes
    pub size_bytes: u64,

    /// SHA-256 of the content
    pub hash: Sha256Hash,

    /// First configured keyword found in a text upload
    #[serde(default)]
    pub tag: Option<String>,

    /// UTC timestamp when the upload was stored
    pub stored_at: DateTime<Utc>,
}

/// Stores uploads under one directory and scans text uploads for keywords.
#[derive(Debug, Clone)]
pub struct UploadService {
    root_directory: PathBuf,
    keywords: Vec<String>,
}

impl UploadService {
    /// Creates a service rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the directory cannot be created, is not
    /// a directory, or cannot be canonicalised.
    pub fn new(root_directory: &Path, keywords: Vec<String>) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            keywords,
        })
    }

    /// Stores an upload and returns its attachment reference.
    ///
    /// # Arguments
    ///
    /// * `filename` - Name supplied by the uploader; any directory part is discarded
    /// * `declared_type` - Optional declared type, which takes precedence over the extension
    /// * `content` - The uploaded bytes
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the filename has no usable final component
    /// - the type is not one of the accepted kinds
    /// - the content is empty
    /// - the blob cannot be written (I/O)
    pub fn store(
        &self,
        filename: &str,
        declared_type: Option<&str>,
        content: &[u8],
    ) -> Result<Attachment, FilesError> {
        let filename = sanitise_filename(filename)?;

        let kind = match declared_type.filter(|d| !d.trim().is_empty()) {
            Some(declared) => UploadKind::parse(declared)?,
            None => UploadKind::from_filename(filename.as_str())?,
        };

        if content.is_empty() {
            return Err(FilesError::EmptyUpload);
        }

        let digest: [u8; 32] = Sha256::digest(content).into();
        let hash = Sha256Hash::from_bytes(&digest);
        let storage_path = self.compute_storage_path(&hash);

        if storage_path.exists() {
            tracing::debug!(hash = %hash, "upload content already stored");
        } else {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&storage_path, content)?;
            tracing::info!(hash = %hash, size = content.len(), kind = %kind, "stored upload");
        }

        let tag = if kind.is_text() {
            scan_keywords(&String::from_utf8_lossy(content), &self.keywords)
        } else {
            None
        };

        let media_type = infer::get(content).map(|t| t.mime_type().to_owned());

        Ok(Attachment {
            filename,
            stored_path: compute_relative_path(&hash)?,
            kind,
            media_type,
            size_bytes: content.len() as u64,
            hash,
            tag,
            stored_at: Utc::now(),
        })
    }

    /// Reads back a stored blob by its hex hash.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Id`] for a malformed hash, [`FilesError::NotFound`] if nothing is
    /// stored under it, or an I/O error if reading fails.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>, FilesError> {
        let hash = Sha256Hash::parse(hash)?;
        let storage_path = self.compute_storage_path(&hash);

        if !storage_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }

        Ok(fs::read(&storage_path)?)
    }

    fn compute_storage_path(&self, hash: &Sha256Hash) -> PathBuf {
        hash.sharded_path(&self.root_directory.join(HASH_DIR_NAME))
    }
}

/// `sha256/<s1>/<s2>/<hash>`, always with forward slashes so stored records are portable.
fn compute_relative_path(hash: &Sha256Hash) -> Result<NonEmptyText, FilesError> {
    let h = hash.as_str();
    Ok(NonEmptyText::new(format!(
        "{}/{}/{}/{}",
        HASH_DIR_NAME,
        &h[0..2],
        &h[2..4],
        h
    ))?)
}

fn sanitise_filename(filename: &str) -> Result<NonEmptyText, FilesError> {
    let last = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .ok_or_else(|| FilesError::InvalidFilename(filename.to_owned()))?;

    NonEmptyText::new(last).map_err(|_| FilesError::InvalidFilename(filename.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn service(temp: &TempDir) -> UploadService {
        UploadService::new(
            &temp.path().join("uploads"),
            vec!["diabetes".into(), "asthma".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a").join("b");
        let service = UploadService::new(&root, vec![]).unwrap();
        assert!(root.is_dir());
        assert!(service.root_directory.is_absolute());
    }

    #[test]
    fn test_new_rejects_file_as_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let result = UploadService::new(&root, vec![]);
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_store_text_upload_is_tagged() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);

        let attachment = service
            .store("labs.txt", None, b"Patient reports Asthma attacks")
            .unwrap();

        assert_eq!(attachment.filename.as_str(), "labs.txt");
        assert_eq!(attachment.kind, UploadKind::Txt);
        assert_eq!(attachment.tag.as_deref(), Some("asthma"));
        assert_eq!(attachment.size_bytes, 30);
        assert!(service
            .root_directory
            .join(attachment.stored_path.as_str())
            .is_file());
    }

    #[test]
    fn test_stored_path_is_sharded_by_hash() {
        let temp = TempDir::new().unwrap();
        let attachment = service(&temp).store("a.txt", None, b"hello").unwrap();

        let h = attachment.hash.as_str();
        assert_eq!(
            attachment.stored_path.as_str(),
            format!("sha256/{}/{}/{}", &h[0..2], &h[2..4], h)
        );
    }

    #[test]
    fn test_store_text_without_keywords_has_no_tag() {
        let temp = TempDir::new().unwrap();
        let attachment = service(&temp)
            .store("notes.txt", None, b"routine check-up")
            .unwrap();
        assert_eq!(attachment.tag, None);
    }

    #[test]
    fn test_image_is_not_inspected() {
        let temp = TempDir::new().unwrap();
        let mut content = PNG_MAGIC.to_vec();
        content.extend_from_slice(b"diabetes");

        let attachment = service(&temp).store("scan.png", None, &content).unwrap();

        assert_eq!(attachment.kind, UploadKind::Png);
        assert_eq!(attachment.tag, None);
        assert_eq!(attachment.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let temp = TempDir::new().unwrap();
        let result = service(&temp).store("payload.exe", None, b"MZ");
        assert!(matches!(result, Err(FilesError::UnsupportedType(_))));

        let result = service(&temp).store("README", None, b"text");
        assert!(matches!(result, Err(FilesError::UnsupportedType(_))));
    }

    #[test]
    fn test_declared_type_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let attachment = service(&temp)
            .store("upload.bin", Some("text/plain"), b"diabetes type 2")
            .unwrap();
        assert_eq!(attachment.kind, UploadKind::Txt);
        assert_eq!(attachment.tag.as_deref(), Some("diabetes"));

        let result = service(&temp).store("notes.txt", Some("application/zip"), b"x");
        assert!(matches!(result, Err(FilesError::UnsupportedType(_))));
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        let temp = TempDir::new().unwrap();
        let result = service(&temp).store("empty.txt", None, b"");
        assert!(matches!(result, Err(FilesError::EmptyUpload)));
    }

    #[test]
    fn test_directory_components_are_stripped() {
        let temp = TempDir::new().unwrap();
        let attachment = service(&temp)
            .store("../../etc/report.pdf", None, b"%PDF-1.4")
            .unwrap();
        assert_eq!(attachment.filename.as_str(), "report.pdf");

        let result = service(&temp).store("dir/..", None, b"x");
        assert!(matches!(result, Err(FilesError::InvalidFilename(_))));
    }

    #[test]
    fn test_identical_content_is_stored_once() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);

        let first = service.store("a.txt", None, b"same bytes").unwrap();
        let second = service.store("b.txt", None, b"same bytes").unwrap();

        assert_eq!(first.hash, second.hash);
        assert_eq!(first.stored_path, second.stored_path);
        assert_ne!(first.filename, second.filename);
    }

    #[test]
    fn test_read_round_trip_and_missing() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);

        let attachment = service.store("a.txt", None, b"hello").unwrap();
        assert_eq!(service.read(attachment.hash.as_str()).unwrap(), b"hello");

        let missing = "0".repeat(64);
        assert!(matches!(service.read(&missing), Err(FilesError::NotFound(_))));
        assert!(matches!(service.read("nope"), Err(FilesError::Id(_))));
    }

    #[test]
    fn test_upload_kind_parsing() {
        assert_eq!(UploadKind::parse(".PDF").unwrap(), UploadKind::Pdf);
        assert_eq!(UploadKind::parse("image/jpeg").unwrap(), UploadKind::Jpeg);
        assert_eq!(UploadKind::from_filename("x.JPG").unwrap(), UploadKind::Jpg);
        assert!(UploadKind::parse("gif").is_err());
        assert_eq!(UploadKind::Jpg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_attachment_serialisation() {
        let temp = TempDir::new().unwrap();
        let attachment = service(&temp).store("a.txt", None, b"asthma").unwrap();

        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"kind\":\"txt\""));
        let back: Attachment = serde_json::from_str(&json).unwrap();
        assert_eq!(attachment, back);
    }
}
