//! Annotate: stamp the base filename onto the bottom of the image.
//!
//! The text box is measured with the active [`OverlayFont`], centred
//! horizontally and anchored `bottom_margin` pixels above the bottom edge.
//! The result is re-encoded in the format implied by the output extension;
//! formats without an alpha channel are written from an RGB buffer. When that
//! format cannot be written (no encoder, or limits such as ICO's 256 px), the
//! source format is used instead, then PNG.

use crate::config::PipelineConfig;
use crate::error::StampError;
use crate::font::OverlayFont;
use crate::output::{AnnotatedImage, TextPlacement};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Rgba};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decode an image, sniffing the format from its content first and falling
/// back to the file extension.
pub(crate) fn open_image(path: &Path) -> Result<(DynamicImage, Option<ImageFormat>), ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?;
    Ok((image, format))
}

/// Path of the annotated copy of `filename`.
pub fn processed_path_for(config: &PipelineConfig, filename: &str) -> PathBuf {
    config
        .processed_dir
        .join(format!("{}{}", config.processed_prefix, filename))
}

/// Annotate the staged image at `staged` and write it to the processed
/// directory.
pub fn annotate_image(
    staged: &Path,
    config: &PipelineConfig,
    font: &OverlayFont,
) -> Result<AnnotatedImage, StampError> {
    let overlay_text = staged
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StampError::Internal(format!("staged path {} has no file name", staged.display())))?;

    let (image, source_format) = open_image(staged).map_err(|e| StampError::DecodeFailed {
        path: staged.to_path_buf(),
        source: e,
    })?;

    let mut canvas = image.to_rgba8();
    let (width, height) = canvas.dimensions();

    let text_size = font.measure(&overlay_text)?;
    let placement = TextPlacement::centered_bottom(width, height, text_size, config.bottom_margin);
    debug!(
        "Overlay '{}' {}x{} at ({}, {}) on {}x{} image",
        overlay_text, text_size.width, text_size.height, placement.x, placement.y, width, height
    );

    font.draw(
        &mut canvas,
        clamp_to_i32(placement.x),
        clamp_to_i32(placement.y),
        Rgba(config.text_color),
        &overlay_text,
    );

    let out_path = processed_path_for(config, &overlay_text);
    let encode_failed = |source| StampError::EncodeFailed {
        path: out_path.clone(),
        source,
    };

    let format = match ImageFormat::from_path(&out_path) {
        Ok(format) => format,
        Err(e) => source_format.ok_or_else(|| encode_failed(e))?,
    };

    let annotated = DynamicImage::ImageRgba8(canvas);
    let written = match save_as(&annotated, &out_path, format) {
        Ok(()) => format,
        Err(e @ (ImageError::Unsupported(_) | ImageError::Parameter(_))) => {
            let fallback = fallback_format(format, source_format);
            if fallback == format {
                return Err(encode_failed(e));
            }
            debug!("Cannot write {:?} ({}); writing {:?} instead", format, e, fallback);
            save_as(&annotated, &out_path, fallback).map_err(encode_failed)?;
            fallback
        }
        Err(e) => return Err(encode_failed(e)),
    };
    debug!("Wrote {} as {:?}", out_path.display(), written);

    Ok(AnnotatedImage {
        path: out_path,
        overlay_text,
        placement,
        width,
        height,
        font: font.variant(),
    })
}

/// Encode `image` as `format`. Formats without alpha get an RGB buffer.
fn save_as(image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<(), ImageError> {
    if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)
    } else {
        image.save_with_format(path, format)
    }
}

/// Format to write when `preferred` has no usable encoder: the source
/// format if it can be written, PNG otherwise.
fn fallback_format(preferred: ImageFormat, source: Option<ImageFormat>) -> ImageFormat {
    source
        .filter(|f| *f != preferred && f.writing_enabled())
        .unwrap_or(ImageFormat::Png)
}

fn clamp_to_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage};

    fn setup() -> (tempfile::TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::rooted_at(dir.path());
        config.ensure_dirs().unwrap();
        (dir, config)
    }

    fn write_png(config: &PipelineConfig, name: &str, w: u32, h: u32) -> PathBuf {
        let path = config.upload_dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn overlay_text_is_exact_base_filename() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "Mixed Case.PNG", 200, 60);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        assert_eq!(out.overlay_text, "Mixed Case.PNG");
        assert_eq!(out.path, config.processed_dir.join("processed_Mixed Case.PNG"));
        assert!(out.path.exists());
    }

    #[test]
    fn builtin_placement_matches_formula() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "a.png", 100, 50);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        // "a.png" → 5 glyphs × 8 px.
        assert_eq!(out.placement.text_width, 40);
        assert_eq!(out.placement.x, 30);
        assert_eq!(out.placement.y, 50 - 8 - 10);
    }

    #[test]
    fn text_pixels_are_drawn_in_light_color() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "a.png", 100, 50);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        let img = image::open(&out.path).unwrap().to_rgba8();
        let p = out.placement;
        let white_in_box = (p.x as u32..p.x as u32 + p.text_width)
            .flat_map(|x| (p.y as u32..p.y as u32 + p.text_height).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y) == &Rgba([255, 255, 255, 255]))
            .count();
        assert!(white_in_box > 0);
        // Outside the box the image is untouched.
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn jpeg_is_written_without_alpha() {
        let (_dir, config) = setup();
        let staged = config.upload_dir.join("photo.jpg");
        RgbImage::from_pixel(64, 64, Rgb([10, 20, 30]))
            .save_with_format(&staged, ImageFormat::Jpeg)
            .unwrap();

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        let (reopened, format) = open_image(&out.path).unwrap();
        assert_eq!(format, Some(ImageFormat::Jpeg));
        assert_eq!(reopened.width(), 64);
    }

    #[test]
    fn extensionless_name_keeps_source_format() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "scan", 32, 32);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        let (_, format) = open_image(&out.path).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn truncated_image_is_decode_error() {
        let (_dir, config) = setup();
        let staged = config.upload_dir.join("broken.png");
        let mut bytes = Vec::new();
        RgbaImage::new(50, 50)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes.truncate(bytes.len() / 2);
        std::fs::write(&staged, bytes).unwrap();

        let err = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap_err();
        assert!(matches!(err, StampError::DecodeFailed { .. }), "got {err}");
        assert!(!config.processed_dir.join("processed_broken.png").exists());
    }

    #[test]
    fn wide_text_on_tiny_image_still_succeeds() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "a_very_long_file_name_for_a_tiny_image.png", 8, 8);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        assert!(out.placement.x < 0);
        assert!(out.path.exists());
    }
    #[test]
    fn tiff_webp_and_ico_keep_their_format() {
        let (_dir, config) = setup();
        for (name, format) in [
            ("scan.tiff", ImageFormat::Tiff),
            ("photo.webp", ImageFormat::WebP),
            ("icon.ico", ImageFormat::Ico),
        ] {
            let staged = config.upload_dir.join(name);
            RgbaImage::from_pixel(48, 32, Rgba([0, 0, 0, 255]))
                .save_with_format(&staged, format)
                .unwrap();

            let out = annotate_image(&staged, &config, &OverlayFont::Builtin)
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            let (reopened, written) = open_image(&out.path).unwrap();
            assert_eq!(written, Some(format), "{name}");
            assert_eq!((reopened.width(), reopened.height()), (48, 32));
        }
    }

    #[test]
    fn png_content_under_tiff_name_is_written_as_tiff() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "scan.tiff", 60, 40);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        assert_eq!(out.path, config.processed_dir.join("processed_scan.tiff"));
        let (_, format) = open_image(&out.path).unwrap();
        assert_eq!(format, Some(ImageFormat::Tiff));
    }

    #[test]
    fn extension_without_encoder_falls_back_to_source_format() {
        let (_dir, config) = setup();
        let staged = write_png(&config, "scan.tga", 40, 30);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        assert_eq!(out.path, config.processed_dir.join("processed_scan.tga"));
        let (_, format) = open_image(&out.path).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
    }

    #[test]
    fn oversized_ico_falls_back_to_source_format() {
        // ICO frames are limited to 256 px per side.
        let (_dir, config) = setup();
        let staged = write_png(&config, "big.ico", 300, 40);

        let out = annotate_image(&staged, &config, &OverlayFont::Builtin).unwrap();
        let (reopened, format) = open_image(&out.path).unwrap();
        assert_eq!(format, Some(ImageFormat::Png));
        assert_eq!(reopened.width(), 300);
    }

    #[test]
    fn fallback_prefers_writable_source_then_png() {
        assert_eq!(
            fallback_format(ImageFormat::Tga, Some(ImageFormat::Jpeg)),
            ImageFormat::Jpeg
        );
        assert_eq!(fallback_format(ImageFormat::Tga, None), ImageFormat::Png);
        // The failing format itself is never picked again.
        assert_eq!(
            fallback_format(ImageFormat::Ico, Some(ImageFormat::Ico)),
            ImageFormat::Png
        );
    }
}
