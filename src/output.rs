//! Values produced by each pipeline stage.

use crate::font::{FontVariant, TextSize};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Raw upload: bytes plus the filename the client declared.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedAsset {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Output of the ingest stage.
#[derive(Debug, Clone, Serialize)]
pub struct StagedUpload {
    /// `<upload_dir>/<filename>`.
    pub path: PathBuf,
    pub filename: String,
    pub bytes_written: u64,
}

/// Where the overlay text was drawn, in image pixels.
///
/// `x` is signed: text wider than the image starts left of the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextPlacement {
    pub x: i64,
    pub y: i64,
    pub text_width: u32,
    pub text_height: u32,
}

impl TextPlacement {
    /// Centre `text` horizontally and anchor its box `bottom_margin` pixels
    /// above the bottom edge of a `width` × `height` image.
    pub fn centered_bottom(width: u32, height: u32, text: TextSize, bottom_margin: u32) -> Self {
        let x = (width as i64 - text.width as i64).div_euclid(2);
        let y = height as i64 - text.height as i64 - bottom_margin as i64;
        Self {
            x,
            y,
            text_width: text.width,
            text_height: text.height,
        }
    }
}

/// Output of the annotate stage.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedImage {
    /// `<processed_dir>/<prefix><filename>`.
    pub path: PathBuf,
    /// Always the base filename of the staged upload.
    pub overlay_text: String,
    pub placement: TextPlacement,
    pub width: u32,
    pub height: u32,
    pub font: FontVariant,
}

/// Rectangle on a PDF page, in points, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Output of the export stage.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedDocument {
    pub path: PathBuf,
    pub page_count: usize,
    pub image_count: usize,
    pub image_rect: PlacedRect,
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub ingest_ms: u64,
    pub annotate_ms: u64,
    pub export_ms: u64,
    pub total_ms: u64,
}

/// Everything one pipeline call produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub staged: StagedUpload,
    pub annotated: AnnotatedImage,
    pub document: ExportedDocument,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// File name of the annotated image, as served under `/download/image/`.
    pub fn image_name(&self) -> String {
        file_name_of(&self.annotated.path)
    }

    /// File name of the PDF, as served under `/download/pdf/`.
    pub fn pdf_name(&self) -> String {
        file_name_of(&self.document.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> TextSize {
        TextSize { width, height }
    }

    #[test]
    fn placement_is_centered_and_ten_above_bottom() {
        let p = TextPlacement::centered_bottom(200, 100, size(60, 12), 10);
        assert_eq!(p.x, 70);
        assert_eq!(p.y, 100 - 12 - 10);
    }

    #[test]
    fn placement_floors_odd_remainder() {
        let p = TextPlacement::centered_bottom(101, 50, size(50, 8), 10);
        assert_eq!(p.x, 25);
    }

    #[test]
    fn placement_stays_inside_for_narrow_text() {
        for (w, tw) in [(10, 1), (10, 10), (640, 639), (3, 2), (1000, 77)] {
            let p = TextPlacement::centered_bottom(w, 100, size(tw, 10), 10);
            assert!(p.x >= 0, "x < 0 for w={w} tw={tw}");
            assert!(p.x <= (w - tw) as i64, "x too large for w={w} tw={tw}");
        }
    }

    #[test]
    fn placement_goes_negative_for_wide_text() {
        let p = TextPlacement::centered_bottom(20, 15, size(41, 30), 10);
        assert_eq!(p.x, -11);
        assert_eq!(p.y, -25);
    }

    #[test]
    fn output_names_are_file_names() {
        assert_eq!(file_name_of(Path::new("processed/processed_a.png")), "processed_a.png");
        assert_eq!(file_name_of(Path::new("/")), "");
    }
}
