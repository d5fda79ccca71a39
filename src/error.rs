//! Error types for the stamp2pdf library.
//!
//! Every failure is a [`StampError`]. Callers rarely need the individual
//! variants: [`StampError::kind`] tells them whether the request itself was
//! bad ([`ErrorKind::InvalidInput`]) or the pipeline failed while working on a
//! valid request ([`ErrorKind::Processing`]), and [`StampError::stage`] names
//! the pipeline step that failed. The HTTP layer maps the former to 400 and
//! the latter to 500.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the stamp2pdf library.
#[derive(Debug, Error)]
pub enum StampError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request carried no file at all.
    #[error("No file uploaded")]
    MissingFile,

    /// A file was supplied but its declared filename is empty.
    #[error("No selected file")]
    EmptyFilename,

    /// The filename is not a single path component.
    #[error("Invalid filename '{name}': {reason}")]
    InvalidFilename { name: String, reason: &'static str },

    /// A local source file (CLI batch mode) could not be read.
    #[error("Failed to read source file '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Ingest errors ─────────────────────────────────────────────────────
    /// Could not write the upload to the staging directory.
    #[error("Failed to stage upload at '{path}': {source}")]
    StagingWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Annotate errors ───────────────────────────────────────────────────
    /// The staged bytes are not a decodable image.
    #[error("Failed to decode image '{path}': {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The active font produced no usable metrics for the overlay text.
    #[error("Unreadable font metrics for overlay text '{text}': {detail}")]
    FontMetrics { text: String, detail: String },

    /// Could not re-encode or write the annotated image.
    #[error("Failed to write annotated image '{path}': {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The annotated image could not be read back for embedding.
    #[error("Failed to read annotated image '{path}': {source}")]
    ExportReadFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// PDFium refused to create the page or embed the image.
    #[error("Failed to embed image into PDF: {detail}")]
    PdfEmbedFailed { detail: String },

    /// PDFium could not write the finished document.
    #[error("Failed to write PDF '{path}': {detail}")]
    PdfWriteFailed { path: PathBuf, detail: String },

    /// An existing PDF could not be opened for inspection.
    #[error("Failed to open PDF '{path}': {detail}")]
    PdfReadFailed { path: PathBuf, detail: String },

    /// Could not bind to a PDFium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib) to the directory holding libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output directories could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a panicked blocking task).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure class used at the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The request was malformed: nothing was processed.
    InvalidInput,
    /// A valid request failed inside the pipeline.
    Processing,
}

/// Pipeline step an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Ingest,
    Annotate,
    Export,
    /// Configuration and startup, before any request.
    Setup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Annotate => "annotate",
            Stage::Export => "export",
            Stage::Setup => "setup",
        };
        f.write_str(name)
    }
}

impl StampError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StampError::MissingFile
            | StampError::EmptyFilename
            | StampError::InvalidFilename { .. }
            | StampError::SourceReadFailed { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::Processing,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StampError::MissingFile
            | StampError::EmptyFilename
            | StampError::InvalidFilename { .. }
            | StampError::SourceReadFailed { .. }
            | StampError::StagingWriteFailed { .. } => Stage::Ingest,
            StampError::DecodeFailed { .. }
            | StampError::FontMetrics { .. }
            | StampError::EncodeFailed { .. } => Stage::Annotate,
            StampError::ExportReadFailed { .. }
            | StampError::PdfEmbedFailed { .. }
            | StampError::PdfWriteFailed { .. }
            | StampError::PdfReadFailed { .. } => Stage::Export,
            StampError::PdfiumBindingFailed(_)
            | StampError::InvalidConfig(_)
            | StampError::DirectoryCreateFailed { .. }
            | StampError::Internal(_) => Stage::Setup,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }
}
