//! Export: place the annotated image on a single PDF page.
//!
//! The page uses [`PageLayout`] geometry (A4 by default). The image is
//! embedded from decoded pixels, so any format the annotate stage can write
//! is accepted without re-encoding first.
//!
//! PDFium is bound once per process and the binding is shared by every
//! exporter; [`bind_pdfium`] is safe to call from several threads.

use crate::config::PageLayout;
use crate::error::StampError;
use crate::output::{ExportedDocument, PlacedRect};
use crate::pipeline::annotate::open_image;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns an annotated image into a document on disk.
///
/// [`PdfiumExporter`] is the production implementation. Embedders and tests
/// can supply their own through [`crate::Pipeline::with_exporter`].
pub trait DocumentExporter: Send + Sync {
    fn export(
        &self,
        image_path: &Path,
        pdf_dir: &Path,
        layout: &PageLayout,
    ) -> Result<ExportedDocument, StampError>;
}

/// Path of the PDF produced for `image_path`: same file name with the
/// extension replaced by `.pdf`.
pub fn pdf_path_for(image_path: &Path, pdf_dir: &Path) -> Result<PathBuf, StampError> {
    let name = image_path.file_name().ok_or_else(|| {
        StampError::Internal(format!("image path {} has no file name", image_path.display()))
    })?;
    Ok(pdf_dir.join(Path::new(name).with_extension("pdf")))
}

// ── PDFium binding ───────────────────────────────────────────────────────

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Bind to the PDFium library, once per process.
///
/// With `lib_dir` set, only that directory is tried. Otherwise the current
/// directory is tried first and then the system library search path.
/// Later calls return the first successful binding regardless of `lib_dir`.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<&'static Pdfium, StampError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match lib_dir {
            Some(dir) => {
                let dir = dir.to_string_lossy();
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&*dir))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| StampError::PdfiumBindingFailed(format!("{e:?}")))?;

        info!("PDFium library bound");
        Ok(Pdfium::new(bindings))
    })
}

// ── PDFium exporter ──────────────────────────────────────────────────────

/// Page and image counts of an existing PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub page_count: usize,
    pub image_count: usize,
}

/// [`DocumentExporter`] backed by PDFium.
pub struct PdfiumExporter {
    pdfium: &'static Pdfium,
}

impl PdfiumExporter {
    /// Bind PDFium (see [`bind_pdfium`]) and build an exporter around it.
    pub fn new(lib_dir: Option<&Path>) -> Result<Self, StampError> {
        Ok(Self {
            pdfium: bind_pdfium(lib_dir)?,
        })
    }

    /// Count pages and embedded images of the PDF at `path`.
    pub fn inspect(&self, path: &Path) -> Result<DocumentSummary, StampError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| StampError::PdfReadFailed {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

        let pages = document.pages();
        let image_count = pages
            .iter()
            .map(|page| {
                page.objects()
                    .iter()
                    .filter(|object| object.object_type() == PdfPageObjectType::Image)
                    .count()
            })
            .sum();

        Ok(DocumentSummary {
            page_count: pages.len() as usize,
            image_count,
        })
    }
}

impl DocumentExporter for PdfiumExporter {
    fn export(
        &self,
        image_path: &Path,
        pdf_dir: &Path,
        layout: &PageLayout,
    ) -> Result<ExportedDocument, StampError> {
        let (image, _) = open_image(image_path).map_err(|e| StampError::ExportReadFailed {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(StampError::PdfEmbedFailed {
                detail: format!("{} has zero size", image_path.display()),
            });
        }

        let pdf_path = pdf_path_for(image_path, pdf_dir)?;
        let embed_failed = |e: PdfiumError| StampError::PdfEmbedFailed {
            detail: format!("{e:?}"),
        };

        let mut document = self.pdfium.create_new_pdf().map_err(embed_failed)?;

        let rect = {
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(
                    PdfPoints::new(mm_to_pt(layout.page_width_mm)),
                    PdfPoints::new(mm_to_pt(layout.page_height_mm)),
                ))
                .map_err(embed_failed)?;

            let rect = image_rect(layout, image.width(), image.height());
            page.objects_mut()
                .create_image_object(
                    PdfPoints::new(rect.x),
                    PdfPoints::new(rect.y),
                    &image,
                    Some(PdfPoints::new(rect.width)),
                    Some(PdfPoints::new(rect.height)),
                )
                .map_err(embed_failed)?;
            rect
        };
        debug!(
            "Placed {}x{} image at ({:.1}, {:.1}) pt, {:.1}x{:.1} pt",
            image.width(),
            image.height(),
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );

        document
            .save_to_file(&pdf_path)
            .map_err(|e| StampError::PdfWriteFailed {
                path: pdf_path.clone(),
                detail: format!("{e:?}"),
            })?;

        Ok(ExportedDocument {
            path: pdf_path,
            page_count: 1,
            image_count: 1,
            image_rect: rect,
        })
    }
}

/// Rectangle (PDF points, bottom-left origin) occupied by a `width` ×
/// `height` pixel image placed per `layout`.
pub fn image_rect(layout: &PageLayout, width: u32, height: u32) -> PlacedRect {
    let w = mm_to_pt(layout.image_width_mm);
    let h = w * height as f32 / width as f32;
    let x = mm_to_pt(layout.image_x_mm);
    let y = mm_to_pt(layout.page_height_mm) - mm_to_pt(layout.image_y_mm) - h;
    PlacedRect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_name_swaps_extension() {
        let dir = Path::new("pdfs");
        assert_eq!(
            pdf_path_for(Path::new("processed/processed_a.png"), dir).unwrap(),
            PathBuf::from("pdfs/processed_a.pdf")
        );
        assert_eq!(
            pdf_path_for(Path::new("processed/processed_photo.JPEG"), dir).unwrap(),
            PathBuf::from("pdfs/processed_photo.pdf")
        );
        assert_eq!(
            pdf_path_for(Path::new("processed/processed_scan"), dir).unwrap(),
            PathBuf::from("pdfs/processed_scan.pdf")
        );
        // Only the last extension is replaced.
        assert_eq!(
            pdf_path_for(Path::new("processed/processed_a.png.jpg"), dir).unwrap(),
            PathBuf::from("pdfs/processed_a.png.pdf")
        );
    }

    #[test]
    fn image_rect_keeps_aspect_ratio_and_top_offset() {
        let layout = PageLayout::default();
        let rect = image_rect(&layout, 400, 200);

        let expected_w = 180.0 * 72.0 / 25.4;
        assert!((rect.width - expected_w).abs() < 1e-3);
        assert!((rect.height - expected_w / 2.0).abs() < 1e-3);
        assert!((rect.x - 10.0 * 72.0 / 25.4).abs() < 1e-3);

        // Top edge sits 10 mm below the top of a 297 mm page.
        let top = rect.y + rect.height;
        assert!((top - 287.0 * 72.0 / 25.4).abs() < 1e-2);
    }
}
