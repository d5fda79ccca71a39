//! Pipeline stages for annotate-and-export.
//!
//! Each submodule implements exactly one step; each step consumes the path
//! the previous step produced.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ annotate ──▶ export
//! (uploads/)  (processed/)  (pdfs/)
//! ```
//!
//! 1. [`ingest`]: write the upload verbatim under its declared filename
//! 2. [`annotate`]: draw the filename centred at the bottom of the image
//! 3. [`export`]: place the annotated image on a one-page PDF

pub mod annotate;
pub mod export;
pub mod ingest;
