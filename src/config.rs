//! Configuration types for the annotate-and-export pipeline.
//!
//! Every knob lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`] and handed to [`crate::Pipeline::new`] once at
//! startup. Nothing is read from process-wide state after that.

use crate::error::StampError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the annotate-and-export pipeline.
///
/// # Example
/// ```rust
/// use stamp2pdf::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .upload_dir("/srv/stamp/uploads")
///     .processed_dir("/srv/stamp/processed")
///     .pdf_dir("/srv/stamp/pdfs")
///     .font_size(24.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.processed_prefix, "processed_");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Staging directory for raw uploads. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Directory for annotated images. Default: `processed`.
    pub processed_dir: PathBuf,

    /// Directory for exported PDFs. Default: `pdfs`.
    pub pdf_dir: PathBuf,

    /// Prefix prepended to the upload filename for the annotated image.
    /// Default: `processed_`.
    pub processed_prefix: String,

    /// Scalable font to use for the overlay. If `None`, a list of well-known
    /// system locations is searched; if nothing loads the builtin bitmap face
    /// is used.
    pub font_path: Option<PathBuf>,

    /// Pixel size of the scalable face. Range: 6–200. Default: 30.
    pub font_size: f32,

    /// Overlay colour as RGBA. Default: opaque white.
    pub text_color: [u8; 4],

    /// Gap in pixels between the bottom of the text box and the bottom edge
    /// of the image. Default: 10.
    pub bottom_margin: u32,

    /// Page geometry and image placement for the exported PDF.
    pub page_layout: PageLayout,

    /// Directory containing the PDFium shared library. If `None`, the system
    /// library search path is used.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            pdf_dir: PathBuf::from("pdfs"),
            processed_prefix: "processed_".to_string(),
            font_path: None,
            font_size: 30.0,
            text_color: [255, 255, 255, 255],
            bottom_margin: 10,
            page_layout: PageLayout::default(),
            pdfium_lib_path: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Convenience for tests and embedders: all three directories under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            upload_dir: root.join("uploads"),
            processed_dir: root.join("processed"),
            pdf_dir: root.join("pdfs"),
            ..Self::default()
        }
    }

    /// Create the three output directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), StampError> {
        for dir in [&self.upload_dir, &self.processed_dir, &self.pdf_dir] {
            std::fs::create_dir_all(dir).map_err(|e| StampError::DirectoryCreateFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.processed_dir = dir.into();
        self
    }

    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn processed_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.processed_prefix = prefix.into();
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn font_size(mut self, px: f32) -> Self {
        self.config.font_size = px.clamp(6.0, 200.0);
        self
    }

    pub fn text_color(mut self, rgba: [u8; 4]) -> Self {
        self.config.text_color = rgba;
        self
    }

    pub fn bottom_margin(mut self, px: u32) -> Self {
        self.config.bottom_margin = px;
        self
    }

    pub fn page_layout(mut self, layout: PageLayout) -> Self {
        self.config.page_layout = layout;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, StampError> {
        let c = &self.config;
        for (name, dir) in [
            ("upload_dir", &c.upload_dir),
            ("processed_dir", &c.processed_dir),
            ("pdf_dir", &c.pdf_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(StampError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        if !c.font_size.is_finite() || c.font_size <= 0.0 {
            return Err(StampError::InvalidConfig(format!(
                "font size must be positive, got {}",
                c.font_size
            )));
        }
        c.page_layout.validate()?;
        Ok(self.config)
    }
}

// ── Page layout ──────────────────────────────────────────────────────────

/// Page geometry of the exported PDF, in millimetres.
///
/// The image is placed with its top-left corner `image_x_mm` from the left
/// edge and `image_y_mm` from the top edge, scaled to `image_width_mm`. Its
/// height follows the image aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub image_x_mm: f32,
    pub image_y_mm: f32,
    pub image_width_mm: f32,
}

impl Default for PageLayout {
    /// A4 portrait with a 180 mm wide image at (10 mm, 10 mm).
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            image_x_mm: 10.0,
            image_y_mm: 10.0,
            image_width_mm: 180.0,
        }
    }
}

impl PageLayout {
    fn validate(&self) -> Result<(), StampError> {
        let all = [
            self.page_width_mm,
            self.page_height_mm,
            self.image_x_mm,
            self.image_y_mm,
            self.image_width_mm,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(StampError::InvalidConfig(
                "page layout values must be finite and non-negative".into(),
            ));
        }
        if self.page_width_mm == 0.0 || self.page_height_mm == 0.0 || self.image_width_mm == 0.0 {
            return Err(StampError::InvalidConfig(
                "page and image width must be non-zero".into(),
            ));
        }
        if self.image_x_mm + self.image_width_mm > self.page_width_mm {
            return Err(StampError::InvalidConfig(format!(
                "image ({} mm at x = {} mm) does not fit a {} mm wide page",
                self.image_width_mm, self.image_x_mm, self.page_width_mm
            )));
        }
        Ok(())
    }
}

// ── HTTP service ─────────────────────────────────────────────────────────

/// Listener settings for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Default: `0.0.0.0`.
    pub host: String,
    /// Default: 5000.
    pub port: u16,
    /// Largest accepted request body. Default: 16 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_folders() {
        let c = PipelineConfig::default();
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.processed_dir, PathBuf::from("processed"));
        assert_eq!(c.pdf_dir, PathBuf::from("pdfs"));
        assert_eq!(c.bottom_margin, 10);
        assert_eq!(c.font_size, 30.0);
    }

    #[test]
    fn font_size_is_clamped() {
        let c = PipelineConfig::builder().font_size(1000.0).build().unwrap();
        assert_eq!(c.font_size, 200.0);
        let c = PipelineConfig::builder().font_size(1.0).build().unwrap();
        assert_eq!(c.font_size, 6.0);
    }

    #[test]
    fn empty_dir_is_rejected() {
        let err = PipelineConfig::builder().pdf_dir("").build().unwrap_err();
        assert!(err.to_string().contains("pdf_dir"), "got: {err}");
    }

    #[test]
    fn oversized_image_width_is_rejected() {
        let layout = PageLayout {
            image_width_mm: 205.0,
            ..PageLayout::default()
        };
        let err = PipelineConfig::builder()
            .page_layout(layout)
            .build()
            .unwrap_err();
        assert!(matches!(err, StampError::InvalidConfig(_)));
    }

    #[test]
    fn ensure_dirs_creates_all_three() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::rooted_at(tmp.path());
        config.ensure_dirs().unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.processed_dir.is_dir());
        assert!(config.pdf_dir.is_dir());
    }

    #[test]
    fn server_defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 5000);
        assert_eq!(c.max_upload_bytes, 16 * 1024 * 1024);
    }
}
