//! Region image encoding.
//!
//! Extracted regions are arena images; this module turns them into JPEG or PNG
//! bytes, and decodes encoded files into arena images for use as an
//! in-memory pyramid base.
//!
//! # Design Decisions
//!
//! - **Alpha is dropped for JPEG**: JPEG has no alpha channel, so RGBA images
//!   are flattened to RGB by discarding alpha. Use PNG to keep it.
//!
//! - **8-bit only**: L, RGB and RGBA images can be encoded. Other modes are
//!   rejected rather than silently converted.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GrayImage, ImageReader, RgbImage, RgbaImage};

use crate::error::EncodeError;

use super::arena::MemoryArena;
use super::image::{Image, PixelMode};

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Guess the format from a file extension (`jpg`, `jpeg`, `png`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

// =============================================================================
// Region Encoder
// =============================================================================

/// Encoder for extracted regions.
///
/// # Example
///
/// ```
/// use wsi_region::imaging::{Image, MemoryArena, OutputFormat, PixelMode, RegionEncoder};
///
/// let mut arena = MemoryArena::new();
/// let image = Image::new(&mut arena, PixelMode::Rgba, 16, 16).unwrap();
///
/// let png = RegionEncoder::new().encode(&image, OutputFormat::Png, 80).unwrap();
/// assert_eq!(&png[1..4], b"PNG");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegionEncoder {}

impl RegionEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode `image` in `format`.
    ///
    /// `quality` only applies to JPEG and is clamped to 1-100.
    ///
    /// # Errors
    ///
    /// Returns an error if the image mode is not L, RGB or RGBA, or if the
    /// underlying encoder fails.
    pub fn encode(
        &self,
        image: &Image,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, EncodeError> {
        let dynamic = to_dynamic(image)?;
        let mut output = Vec::new();

        match format {
            OutputFormat::Jpeg => {
                let flattened = match dynamic {
                    DynamicImage::ImageRgba8(_) => DynamicImage::ImageRgb8(dynamic.to_rgb8()),
                    other => other,
                };
                let mut encoder = JpegEncoder::new_with_quality(&mut output, clamp_quality(quality));
                encoder
                    .encode_image(&flattened)
                    .map_err(|e| EncodeError::Encode {
                        message: e.to_string(),
                    })?;
            }
            OutputFormat::Png => {
                dynamic
                    .write_with_encoder(PngEncoder::new(&mut output))
                    .map_err(|e| EncodeError::Encode {
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(Bytes::from(output))
    }

    /// Decode an encoded image (format guessed from its contents) into an
    /// RGBA arena image.
    pub fn decode(&self, arena: &mut MemoryArena, source: &[u8]) -> Result<Image, EncodeError> {
        let decoded = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| EncodeError::Decode {
                message: e.to_string(),
            })?
            .decode()
            .map_err(|e| EncodeError::Decode {
                message: e.to_string(),
            })?
            .into_rgba8();

        let (width, height) = decoded.dimensions();
        let alloc_err = |e: crate::error::ArenaError| EncodeError::Decode {
            message: e.to_string(),
        };
        let mut block = arena
            .acquire(decoded.as_raw().len(), true)
            .map_err(alloc_err)?;
        block.as_mut_slice().copy_from_slice(decoded.as_raw());
        Image::from_packed(arena, PixelMode::Rgba, width, height, block).map_err(alloc_err)
    }

    /// Image dimensions without fully decoding.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), EncodeError> {
        ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| EncodeError::Decode {
                message: e.to_string(),
            })?
            .into_dimensions()
            .map_err(|e| EncodeError::Decode {
                message: e.to_string(),
            })
    }
}

/// Copy an 8-bit arena image into an `image` buffer of matching layout.
fn to_dynamic(image: &Image) -> Result<DynamicImage, EncodeError> {
    let (width, height) = (image.width(), image.height());
    let unsupported = || EncodeError::UnsupportedMode {
        mode: image.mode().name(),
    };

    let dynamic = match image.mode() {
        PixelMode::L => GrayImage::from_raw(width, height, image.to_packed())
            .map(DynamicImage::ImageLuma8),
        PixelMode::Rgb => {
            let rgb: Vec<u8> = image
                .to_packed()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        PixelMode::Rgba => RgbaImage::from_raw(width, height, image.to_packed())
            .map(DynamicImage::ImageRgba8),
        _ => return Err(unsupported()),
    };

    dynamic.ok_or_else(unsupported)
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
