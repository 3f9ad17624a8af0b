//! HealthDesk Upload Storage
//!
//! This crate stores files that patients upload from the dashboard and produces the
//! [`Attachment`] reference that is appended to their record.
//!
//! ## Design Principles
//!
//! - Record data and binary bytes are kept apart: the record store holds only the
//!   [`Attachment`] reference, never the blob
//! - Blobs are content-addressed by SHA-256 and immutable once written
//! - Identical uploads (from any patient) are stored once
//! - Only plain-text uploads are inspected; images and PDFs are stored as-is
//!
//! ## Storage Layout
//!
//! ```text
//! <upload_dir>/
//! └── sha256/
//!     └── ab/
//!         └── cd/
//!             └── abcd9e…   # full hash as filename
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use healthdesk_files::UploadService;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = UploadService::new(Path::new("healthdesk_data/uploads"), vec!["asthma".into()])?;
//! let attachment = service.store("notes.txt", None, b"History of asthma since childhood")?;
//! assert_eq!(attachment.tag.as_deref(), Some("asthma"));
//! # Ok(())
//! # }
//! ```

mod scan;
mod upload;

pub use scan::scan_keywords;
pub use upload::{Attachment, UploadKind, UploadService, HASH_DIR_NAME};

/// Errors that can occur during upload operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Upload directory could not be created or is not a directory
    #[error("Invalid upload directory: {0}")]
    InvalidRootDirectory(String),

    /// File type is not one of pdf, png, jpg, jpeg, txt
    #[error("Unsupported upload type: {0}")]
    UnsupportedType(String),

    /// Filename is empty or has no usable final component
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Upload had no content
    #[error("Upload is empty")]
    EmptyUpload,

    /// No stored blob for the requested hash
    #[error("File not found for hash: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Identifier error from healthdesk-ids crate
    #[error("Identifier error: {0}")]
    Id(#[from] healthdesk_ids::IdError),

    /// Text error from healthdesk-types crate
    #[error("Text error: {0}")]
    Text(#[from] healthdesk_types::TextError),
}
