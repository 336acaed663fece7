//! Error types for pdfocr.
//!
//! Errors fall into two classes. Fatal errors abort the whole conversion and
//! are returned as [`Error`]. Recoverable page errors (a page that cannot be
//! rendered, or an image the OCR engine chokes on) never escape the
//! assembler: they are turned into a [`PageWarning`] and the page contributes
//! empty OCR text.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pdfocr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting a PDF to text.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the input file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with a PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a version we cannot interpret.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Malformed or unreadable document or page structure.
    #[error("Cannot read PDF document: {0}")]
    DocumentRead(String),

    /// A single page could not be rendered to a bitmap.
    #[error("Page {page} could not be rasterized: {message}")]
    Rasterization { page: u32, message: String },

    /// The OCR backend (or the renderer feeding it) is not installed or reachable.
    #[error("OCR engine unavailable: {0}")]
    OcrEngineUnavailable(String),

    /// The OCR backend failed on one page image.
    #[error("OCR failed on page {page}: {message}")]
    OcrRecognition { page: u32, message: String },

    /// Rejected configuration.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The run was cancelled between pages.
    #[error("Conversion cancelled after {completed} page(s)")]
    Cancelled { completed: u32 },

    /// Error while rendering results (JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error only affects a single page.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Rasterization { .. } | Error::OcrRecognition { .. }
        )
    }

    /// Whether this error belongs to the unreadable-document family.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::Encrypted
                | Error::DocumentRead(_)
        )
    }

    /// Process exit code a command-line front end should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_document_error() => 2,
            Error::InvalidOptions(_) => 2,
            Error::OcrEngineUnavailable(_) => 3,
            Error::Cancelled { .. } => 130,
            Error::Rasterization { .. } | Error::OcrRecognition { .. } => 4,
            _ => 1,
        }
    }

    /// Convert a recoverable error into a page warning.
    ///
    /// Returns the error unchanged when it is fatal.
    pub fn into_warning(self) -> std::result::Result<PageWarning, Error> {
        match self {
            Error::Rasterization { page, message } => Ok(PageWarning {
                page,
                kind: WarningKind::Rasterization,
                message,
            }),
            Error::OcrRecognition { page, message } => Ok(PageWarning {
                page,
                kind: WarningKind::OcrRecognition,
                message,
            }),
            other => Err(other),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::DocumentRead(err.to_string()),
        }
    }
}

/// Kind of recoverable page failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The page could not be rendered; its OCR text is empty.
    Rasterization,
    /// The OCR engine failed on the page image; its OCR text is empty.
    OcrRecognition,
    /// Some embedded text used a font that could not be decoded and was skipped.
    TextDecoding,
}

/// A recoverable failure attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWarning {
    /// Page number (1-indexed)
    pub page: u32,
    /// What failed
    pub kind: WarningKind,
    /// Backend message
    pub message: String,
}

impl std::fmt::Display for PageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            WarningKind::Rasterization => "rasterization failed",
            WarningKind::OcrRecognition => "OCR failed",
            WarningKind::TextDecoding => "embedded text incomplete",
        };
        write!(f, "page {}: {}: {}", self.page, what, self.message)
    }
}
