//! # stamp2pdf
//!
//! Stamp an uploaded image with its own filename and export it as a
//! one-page PDF. Both artifacts stay on disk for download.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (filename + bytes)
//!  │
//!  ├─ 1. Ingest    write bytes verbatim to uploads/<filename>
//!  ├─ 2. Annotate  draw <filename> centred near the bottom edge
//!  │               → processed/processed_<filename>
//!  └─ 3. Export    place the annotated image on an A4 page via pdfium
//!                  → pdfs/processed_<stem>.pdf
//! ```
//!
//! Artifacts are named after the upload's filename, so uploading the same
//! name twice overwrites the earlier files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stamp2pdf::{Pipeline, PipelineConfig, UploadedAsset};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(PipelineConfig::default())?;
//!     let bytes = std::fs::read("holiday.jpg")?;
//!     let output = pipeline.process(&UploadedAsset::new("holiday.jpg", bytes))?;
//!     println!("{} / {}", output.image_name(), output.pdf_name());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP service ([`server`]) |
//! | `cli`    | on      | The `stamp2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDFium itself is loaded at runtime; point `PDFIUM_LIB_PATH` (or
//! [`PipelineConfig::pdfium_lib_path`]) at the directory holding it when it
//! is not on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod font;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageLayout, PipelineConfig, PipelineConfigBuilder, ServerConfig};
pub use error::{ErrorKind, Stage, StampError};
pub use font::{FontVariant, OverlayFont};
pub use output::{
    AnnotatedImage, ExportedDocument, PipelineOutput, PipelineStats, StagedUpload, UploadedAsset,
};
pub use pipeline::export::{DocumentExporter, DocumentSummary, PdfiumExporter};
pub use process::{FileResult, Pipeline};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
