//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `ImageDecoder::dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate, format sniffed from content |
//! | Orientation | EXIF tag via `ImageDecoder::orientation`, applied with `DynamicImage::apply_orientation` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the step's quality |
//! | Read size | `std::fs::metadata` |
//!
//! The format is always detected from the file contents, never from the
//! extension: camera and picker temp files often have none, or the wrong one.
//! Encoded output carries no EXIF, so orientation is baked into the pixels.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::resized_dimensions;
use super::params::{EncodeParams, ResizeAction};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Extensions the compiled-in decoders can read.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension one of the decoders handles.
///
/// Only used to pick images out of directories; explicitly named files are
/// decoded whatever their extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| e.eq_ignore_ascii_case(supported))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: image::ImageError) -> BackendError {
    BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
}

/// Open a decoder for `path`, choosing the format from its contents.
fn open_decoder(path: &Path) -> Result<impl ImageDecoder, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .into_decoder()
        .map_err(|e| decode_error(path, e))
}

/// Dimensions as displayed once `orientation` is applied.
fn oriented_dimensions((width, height): (u32, u32), orientation: Orientation) -> Dimensions {
    match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => Dimensions {
            width: height,
            height: width,
        },
        _ => Dimensions { width, height },
    }
}

/// Load, decode, and orient an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let mut decoder = open_decoder(path)?;
    let orientation = decoder.orientation().map_err(|e| decode_error(path, e))?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Encode as baseline JPEG. Alpha is dropped; JPEG has no transparency.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let rgb = img.to_rgb8();
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    writer.flush().map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    type Rendered = DynamicImage;

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let mut decoder = open_decoder(path)?;
        let orientation = decoder.orientation().map_err(|e| decode_error(path, e))?;
        Ok(oriented_dimensions(decoder.dimensions(), orientation))
    }

    fn render(&self, source: &Path, resize: ResizeAction) -> Result<DynamicImage, BackendError> {
        let img = load_image(source)?;
        Ok(match resize {
            ResizeAction::Keep => img,
            action => {
                let (width, height) = resized_dimensions((img.width(), img.height()), action);
                img.resize_exact(width, height, FilterType::Lanczos3)
            }
        })
    }

    fn encode(
        &self,
        rendered: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Dimensions, BackendError> {
        save_jpeg(rendered, &params.output, params.quality.jpeg_quality())?;
        Ok(Dimensions {
            width: rendered.width(),
            height: rendered.height(),
        })
    }

    fn read_size(&self, path: &Path) -> Result<Option<u64>, BackendError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{
        create_noisy_jpeg, create_oriented_jpeg, create_test_jpeg, create_test_png,
    };
    use tempfile::TempDir;

    /// Render with `resize` and encode at `quality` into `output`.
    fn render_to(
        backend: &RustBackend,
        source: &Path,
        output: &Path,
        resize: ResizeAction,
        quality: f32,
    ) -> Result<Dimensions, BackendError> {
        let rendered = backend.render(source, resize)?;
        backend.encode(
            &rendered,
            &EncodeParams {
                output: output.to_path_buf(),
                quality: Quality::new(quality),
            },
        )
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn is_supported_image_ignores_case() {
        assert!(is_supported_image(Path::new("IMG_0001.JPG")));
        assert!(is_supported_image(Path::new("scan.tiff")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    // =========================================================================
    // Identify
    // =========================================================================

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        assert_eq!(RustBackend::new().identify(&path).unwrap(), dims(200, 150));
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn identify_jpeg_without_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("capture_0001");
        create_test_jpeg(&path, 120, 90);

        assert_eq!(RustBackend::new().identify(&path).unwrap(), dims(120, 90));
    }

    #[test]
    fn identify_png_with_jpeg_extension() {
        let tmp = TempDir::new().unwrap();
        let real_png = tmp.path().join("picked.png");
        create_test_png(&real_png, 64, 48);
        let misnamed = tmp.path().join("picked.jpg");
        std::fs::rename(&real_png, &misnamed).unwrap();

        assert_eq!(RustBackend::new().identify(&misnamed).unwrap(), dims(64, 48));
    }

    #[test]
    fn identify_reports_oriented_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("portrait.jpg");
        // Stored landscape, displayed portrait (EXIF orientation 6)
        create_oriented_jpeg(&path, 80, 40, 6);

        assert_eq!(RustBackend::new().identify(&path).unwrap(), dims(40, 80));
    }

    #[test]
    fn oriented_dimensions_swap_only_for_quarter_turns() {
        assert_eq!(
            oriented_dimensions((80, 40), Orientation::Rotate90),
            dims(40, 80)
        );
        assert_eq!(
            oriented_dimensions((80, 40), Orientation::Rotate270FlipH),
            dims(40, 80)
        );
        assert_eq!(
            oriented_dimensions((80, 40), Orientation::Rotate180),
            dims(80, 40)
        );
        assert_eq!(
            oriented_dimensions((80, 40), Orientation::NoTransforms),
            dims(80, 40)
        );
    }

    // =========================================================================
    // Render and encode
    // =========================================================================

    #[test]
    fn encode_keep_preserves_dimensions() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);
        let output = tmp.path().join("out.jpg");
        let backend = RustBackend::new();

        let written = render_to(&backend, &source, &output, ResizeAction::Keep, 0.8).unwrap();

        assert_eq!(written, dims(400, 300));
        assert_eq!(backend.identify(&output).unwrap(), written);
    }

    #[test]
    fn encode_pins_long_side() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 300, 400);
        let output = tmp.path().join("out.jpg");
        let backend = RustBackend::new();

        let written =
            render_to(&backend, &source, &output, ResizeAction::Height(200), 0.6).unwrap();

        assert_eq!(written, dims(150, 200));
        assert!(backend.read_size(&output).unwrap().unwrap() > 0);
    }

    #[test]
    fn one_render_encodes_at_several_qualities() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("noise.jpg");
        create_noisy_jpeg(&source, 256, 256);
        let backend = RustBackend::new();
        let rendered = backend.render(&source, ResizeAction::Keep).unwrap();

        let mut sizes = Vec::new();
        for (name, q) in [("high.jpg", 0.9), ("low.jpg", 0.2)] {
            let output = tmp.path().join(name);
            backend
                .encode(
                    &rendered,
                    &EncodeParams {
                        output: output.clone(),
                        quality: Quality::new(q),
                    },
                )
                .unwrap();
            sizes.push(backend.read_size(&output).unwrap().unwrap());
        }

        assert!(sizes[1] < sizes[0], "sizes: {sizes:?}");
    }

    #[test]
    fn encode_png_source_to_jpeg() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 64, 48);
        let output = tmp.path().join("out.jpg");

        render_to(&RustBackend::new(), &source, &output, ResizeAction::Keep, 0.8).unwrap();

        let sniffed = ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(sniffed, Some(image::ImageFormat::Jpeg));
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn render_misnamed_and_extensionless_sources() {
        let tmp = TempDir::new().unwrap();
        let bare = tmp.path().join("capture_0001");
        create_test_jpeg(&bare, 50, 40);
        let real_png = tmp.path().join("picked.png");
        create_test_png(&real_png, 30, 20);
        let misnamed = tmp.path().join("picked.jpg");
        std::fs::rename(&real_png, &misnamed).unwrap();
        let backend = RustBackend::new();

        let from_bare =
            render_to(&backend, &bare, &tmp.path().join("a.jpg"), ResizeAction::Keep, 0.8);
        let from_misnamed =
            render_to(&backend, &misnamed, &tmp.path().join("b.jpg"), ResizeAction::Keep, 0.8);

        assert_eq!(from_bare.unwrap(), dims(50, 40));
        assert_eq!(from_misnamed.unwrap(), dims(30, 20));
    }

    #[test]
    fn render_applies_exif_orientation() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("portrait.jpg");
        // Stored 80x40 with a red band down the left edge; orientation 6
        // rotates it 90° clockwise, so the band ends up along the top.
        create_oriented_jpeg(&source, 80, 40, 6);
        let output = tmp.path().join("out.jpg");
        let backend = RustBackend::new();

        let written = render_to(&backend, &source, &output, ResizeAction::Keep, 0.9).unwrap();
        assert_eq!(written, dims(40, 80));

        let img = image::open(&output).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (40, 80));
        let top = img.get_pixel(20, 3);
        let bottom = img.get_pixel(20, 70);
        assert!(top[0] > 200 && top[2] < 80, "top pixel {top:?}");
        assert!(bottom[2] > 200 && bottom[0] < 80, "bottom pixel {bottom:?}");
    }

    #[test]
    fn render_garbage_source_errors() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let result = RustBackend::new().render(&source, ResizeAction::Keep);
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    // =========================================================================
    // Read size
    // =========================================================================

    #[test]
    fn read_size_missing_file_is_none() {
        let backend = RustBackend::new();
        assert_eq!(
            backend.read_size(Path::new("/nonexistent/out.jpg")).unwrap(),
            None
        );
    }

    #[test]
    fn read_size_directory_is_none() {
        let tmp = TempDir::new().unwrap();
        let backend = RustBackend::new();
        assert_eq!(backend.read_size(tmp.path()).unwrap(), None);
    }
}
