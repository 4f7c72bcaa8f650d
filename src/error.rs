//! Error types for pdfcheck.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document processing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document container is unreadable or not a PDF.
    #[error("corrupt document: {0}")]
    Corrupt(String),

    /// The document is encrypted and the password-less
    /// authentication attempt failed.
    #[error("document is encrypted")]
    Encrypted,

    /// A per-page transform (text extraction, rasterization, decode)
    /// failed. Contained by the pipeline unless the failure policy
    /// says otherwise.
    #[error("page {page}: {message}")]
    PageTransform {
        /// 1-based page number
        page: usize,
        /// What went wrong
        message: String,
    },

    /// A pixel buffer could not be converted into a decodable image.
    #[error("image conversion error: {0}")]
    Image(String),

    /// The worker pool could not be built.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// Output could not be written. In-memory results survive.
    #[error("failed to persist output: {0}")]
    Persistence(String),
}

impl Error {
    /// Shorthand for a contained per-page failure.
    pub fn page_transform(page: usize, message: impl Into<String>) -> Self {
        Error::PageTransform {
            page,
            message: message.into(),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Corrupt(err.to_string()),
        }
    }
}
