use healthdesk_files::FilesError;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("a record with identity '{0}' already exists")]
    DuplicateIdentity(String),
    #[error("no record found for {0}")]
    NotFound(String),
    #[error("could not allocate an unused record id after {0} attempts")]
    IdGenerationExhausted(usize),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record store: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record store: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize records: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize records: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to read or write CSV records: {0}")]
    Csv(#[from] csv::Error),
    #[error("record store is corrupt: {0}")]
    CorruptStore(String),

    #[error("upload storage error: {0}")]
    Files(FilesError),
}

impl PatientError {
    /// True for errors caused by what the user typed rather than by the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PatientError::InvalidInput(_)
                | PatientError::DuplicateIdentity(_)
                | PatientError::NotFound(_)
        )
    }
}

impl From<FilesError> for PatientError {
    /// Upload rejections caused by the uploader's input surface as validation errors; the
    /// rest stay storage errors.
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::UnsupportedType(_)
            | FilesError::InvalidFilename(_)
            | FilesError::EmptyUpload
            | FilesError::Id(_) => PatientError::InvalidInput(err.to_string()),
            FilesError::NotFound(hash) => PatientError::NotFound(format!("upload {hash}")),
            other => PatientError::Files(other),
        }
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
