//! Shared helpers for the integration tests.
#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use stamp2pdf::pipeline::export::{image_rect, pdf_path_for};
use stamp2pdf::{DocumentExporter, ExportedDocument, PageLayout, Pipeline, PipelineConfig, StampError};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Exporter that records its inputs and writes a placeholder PDF, so the
/// pipeline can run without a PDFium library.
#[derive(Default)]
pub struct RecordingExporter {
    pub calls: Mutex<Vec<PathBuf>>,
}

impl RecordingExporter {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DocumentExporter for RecordingExporter {
    fn export(
        &self,
        image_path: &Path,
        pdf_dir: &Path,
        layout: &PageLayout,
    ) -> Result<ExportedDocument, StampError> {
        self.calls.lock().unwrap().push(image_path.to_path_buf());
        let (w, h) = image::image_dimensions(image_path).map_err(|e| {
            StampError::ExportReadFailed {
                path: image_path.to_path_buf(),
                source: e,
            }
        })?;
        let path = pdf_path_for(image_path, pdf_dir)?;
        std::fs::write(&path, b"%PDF-1.7\n% placeholder\n").map_err(|e| {
            StampError::PdfWriteFailed {
                path: path.clone(),
                detail: e.to_string(),
            }
        })?;
        Ok(ExportedDocument {
            path,
            page_count: 1,
            image_count: 1,
            image_rect: image_rect(layout, w, h),
        })
    }
}

/// Exporter that always fails.
pub struct FailingExporter;

impl DocumentExporter for FailingExporter {
    fn export(&self, _: &Path, _: &Path, _: &PageLayout) -> Result<ExportedDocument, StampError> {
        Err(StampError::PdfEmbedFailed {
            detail: "refused".into(),
        })
    }
}

/// A pipeline rooted in a fresh temp dir.
pub fn pipeline_with(
    exporter: Arc<dyn DocumentExporter>,
) -> (tempfile::TempDir, Arc<Pipeline>) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::rooted_at(dir.path());
    let pipeline = Pipeline::with_exporter(config, exporter).unwrap();
    (dir, Arc::new(pipeline))
}

/// Encoded bytes of a solid dark image.
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]));
    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut out), format)
            .unwrap(),
        _ => img.write_to(&mut Cursor::new(&mut out), format).unwrap(),
    }
    out
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, ImageFormat::Png)
}

/// Number of regular files directly under `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).filter(|e| e.path().is_file()).count())
        .unwrap_or(0)
}
