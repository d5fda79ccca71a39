//! Overlay font resolution and text rendering.
//!
//! The overlay font is a two-variant capability resolved once when the
//! pipeline is built: a scalable TrueType/OpenType face at a fixed pixel
//! size when one can be loaded, or the builtin 8×8 bitmap face otherwise.
//! Both variants expose the same measure/draw operations so the annotate
//! stage never branches on which one is active.

use crate::config::PipelineConfig;
use crate::error::StampError;
use ab_glyph::{FontArc, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Side length of a builtin glyph cell in pixels.
pub const BUILTIN_GLYPH_SIZE: u32 = 8;

/// System locations searched, in order, when no font path is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Which face rendered an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FontVariant {
    Preferred,
    Builtin,
}

/// Pixel dimensions of a rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

/// The font used to draw the filename overlay.
#[derive(Debug, Clone)]
pub enum OverlayFont {
    /// A scalable face loaded from disk.
    Preferred {
        face: FontArc,
        scale: PxScale,
        source: PathBuf,
    },
    /// The builtin 8×8 bitmap face.
    Builtin,
}

impl OverlayFont {
    /// Resolve the overlay font for `config`.
    ///
    /// Tries `config.font_path` first, then [`SYSTEM_FONT_CANDIDATES`].
    /// Never fails: the builtin face is the last resort.
    pub fn resolve(config: &PipelineConfig) -> Self {
        let configured = config.font_path.iter().map(PathBuf::as_path);
        let system = SYSTEM_FONT_CANDIDATES.iter().map(Path::new);

        for candidate in configured.chain(system) {
            match Self::load(candidate, config.font_size) {
                Ok(font) => {
                    info!("Overlay font: {} at {}px", candidate.display(), config.font_size);
                    return font;
                }
                Err(reason) => {
                    if config.font_path.as_deref() == Some(candidate) {
                        warn!("Configured font {} unusable: {}", candidate.display(), reason);
                    } else {
                        debug!("Font candidate {} skipped: {}", candidate.display(), reason);
                    }
                }
            }
        }

        warn!("No scalable font found; falling back to the builtin bitmap face");
        OverlayFont::Builtin
    }

    /// Load a scalable face from `path` at `size_px`.
    pub fn load(path: &Path, size_px: f32) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        let face = FontArc::try_from_vec(bytes).map_err(|e| e.to_string())?;
        Ok(OverlayFont::Preferred {
            face,
            scale: PxScale::from(size_px),
            source: path.to_path_buf(),
        })
    }

    pub fn variant(&self) -> FontVariant {
        match self {
            OverlayFont::Preferred { .. } => FontVariant::Preferred,
            OverlayFont::Builtin => FontVariant::Builtin,
        }
    }

    /// Human-readable summary, e.g. for `stamp2pdf fonts`.
    pub fn describe(&self) -> String {
        match self {
            OverlayFont::Preferred { scale, source, .. } => {
                format!("{} ({}px)", source.display(), scale.y)
            }
            OverlayFont::Builtin => format!(
                "builtin bitmap face ({0}x{0}px glyphs)",
                BUILTIN_GLYPH_SIZE
            ),
        }
    }

    /// Measure the bounding box of `text` with this face.
    pub fn measure(&self, text: &str) -> Result<TextSize, StampError> {
        let size = match self {
            OverlayFont::Preferred { face, scale, .. } => {
                let (width, height) = imageproc::drawing::text_size(*scale, face, text);
                TextSize { width, height }
            }
            OverlayFont::Builtin => TextSize {
                width: BUILTIN_GLYPH_SIZE * text.chars().count() as u32,
                height: BUILTIN_GLYPH_SIZE,
            },
        };

        if !text.is_empty() && size.width == 0 && size.height == 0 {
            return Err(StampError::FontMetrics {
                text: text.to_string(),
                detail: format!("{} reported an empty bounding box", self.describe()),
            });
        }
        Ok(size)
    }

    /// Draw `text` with its top-left corner at (`x`, `y`). Pixels falling
    /// outside the canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        match self {
            OverlayFont::Preferred { face, scale, .. } => {
                imageproc::drawing::draw_text_mut(canvas, color, x, y, *scale, face, text);
            }
            OverlayFont::Builtin => draw_builtin(canvas, x, y, color, text),
        }
    }
}

/// Blit `text` using the 8×8 bitmap glyphs. Characters outside the basic
/// Latin set render as `?`.
fn draw_builtin(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let cell = BUILTIN_GLYPH_SIZE as i64;

    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x as i64 + i as i64 * cell;

        for (row, bits) in glyph.iter().enumerate() {
            let py = y as i64 + row as i64;
            if py < 0 || py >= height {
                continue;
            }
            for bit in 0..8 {
                if bits & (1 << bit) == 0 {
                    continue;
                }
                let px = origin_x + bit;
                if px >= 0 && px < width {
                    canvas.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}
