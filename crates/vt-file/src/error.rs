//! File I/O error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("WAV error: {0}")]
    WavError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type FileResult<T> = Result<T, FileError>;

impl From<hound::Error> for FileError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => FileError::Io(io),
            hound::Error::Unsupported => {
                FileError::UnsupportedFormat("unsupported WAV encoding".into())
            }
            other => FileError::WavError(other.to_string()),
        }
    }
}
