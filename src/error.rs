//! Error types for annopdf.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for annopdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while preparing documents for annotation.
#[derive(Error, Debug)]
pub enum Error {
    /// The document could not be opened: unreadable, not a PDF, or rejected
    /// by the PDF backend. Fatal for that document.
    #[error("Cannot open document {path}: {reason}")]
    DocumentOpen {
        /// Path of the document
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A single page failed to render. Streams recover from this by emitting
    /// a placeholder unit in the page's slot.
    #[error("Failed to render page {page} of {path}: {reason}")]
    PageRender {
        /// Path of the document
        path: PathBuf,
        /// 0-based page index
        page: u32,
        /// What went wrong
        reason: String,
    },

    /// The requested output mode cannot be served.
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input path does not exist or is not usable as a source.
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    /// An annotated example is missing data required downstream.
    #[error("Invalid example: {0}")]
    InvalidExample(String),

    /// The OCR engine failed.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Image encoding or decoding failed.
    #[error("Image encoding error: {0}")]
    Encode(String),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the PDF structure backend.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),
}

impl Error {
    /// Whether a stream can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PageRender { .. })
    }

    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DocumentOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn page(path: impl Into<PathBuf>, page: u32, reason: impl ToString) -> Self {
        Error::PageRender {
            path: path.into(),
            page,
            reason: reason.to_string(),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encode(err.to_string())
    }
}
