//! Arena-backed images.
//!
//! An [`Image`] is a single contiguous arena [`Block`] addressed by
//! `(row, byte offset)` through a computed row stride. Pixel layout is a
//! closed [`PixelMode`], resolved once when the image is created.

use crate::error::ArenaError;

use super::arena::{Block, MemoryArena};

// =============================================================================
// Pixel Modes
// =============================================================================

/// Numeric representation of a pixel's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// 8-bit unsigned samples
    U8,
    /// One 32-bit signed integer sample
    I32,
    /// One 32-bit float sample
    F32,
    /// Packed layouts without resampling support
    Special,
}

/// Supported pixel layouts.
///
/// Multi-band 8-bit modes store each pixel in 4 bytes; unused bytes are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelMode {
    /// 1-bit, stored one byte per pixel
    Bilevel,
    /// 8-bit grayscale
    L,
    /// 8-bit grayscale with alpha (bytes 0 and 3)
    LA,
    /// 8-bit grayscale with premultiplied alpha
    La,
    /// 8-bit RGB (byte 3 unused)
    Rgb,
    /// 8-bit RGB with straight alpha
    Rgba,
    /// 8-bit RGB with premultiplied alpha
    RgbaPremultiplied,
    /// 8-bit RGB with a padding byte
    Rgbx,
    /// 8-bit colour separation
    Cmyk,
    /// 8-bit video format (byte 3 unused)
    YCbCr,
    /// 32-bit signed integer
    I32,
    /// 32-bit float
    F32,
    /// 16-bit raw integer
    I16,
}

impl PixelMode {
    /// Number of bands.
    pub const fn bands(self) -> usize {
        match self {
            PixelMode::Bilevel | PixelMode::L | PixelMode::I32 | PixelMode::F32 | PixelMode::I16 => 1,
            PixelMode::LA | PixelMode::La => 2,
            PixelMode::Rgb | PixelMode::YCbCr => 3,
            PixelMode::Rgba | PixelMode::RgbaPremultiplied | PixelMode::Rgbx | PixelMode::Cmyk => 4,
        }
    }

    /// Bytes used to store one pixel.
    pub const fn pixel_size(self) -> usize {
        match self {
            PixelMode::Bilevel | PixelMode::L => 1,
            PixelMode::I16 => 2,
            _ => 4,
        }
    }

    pub const fn sample_kind(self) -> SampleKind {
        match self {
            PixelMode::I32 => SampleKind::I32,
            PixelMode::F32 => SampleKind::F32,
            PixelMode::Bilevel | PixelMode::I16 => SampleKind::Special,
            _ => SampleKind::U8,
        }
    }

    /// Conventional short name ("L", "RGBA", ...).
    pub const fn name(self) -> &'static str {
        match self {
            PixelMode::Bilevel => "1",
            PixelMode::L => "L",
            PixelMode::LA => "LA",
            PixelMode::La => "La",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
            PixelMode::RgbaPremultiplied => "RGBa",
            PixelMode::Rgbx => "RGBX",
            PixelMode::Cmyk => "CMYK",
            PixelMode::YCbCr => "YCbCr",
            PixelMode::I32 => "I",
            PixelMode::F32 => "F",
            PixelMode::I16 => "I;16",
        }
    }
}

/// Round `value` up to a multiple of `alignment` (a power of two).
#[inline]
fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

// =============================================================================
// Image
// =============================================================================

/// A 2-D pixel buffer backed by arena storage.
///
/// Images are moved, never shared: passing one into
/// [`resample`](super::resample::resample) hands its storage to the callee.
/// Return storage to the arena with [`Image::release`]; dropping an image
/// simply frees its memory.
#[derive(Debug)]
pub struct Image {
    mode: PixelMode,
    width: u32,
    height: u32,
    stride: usize,
    block: Block,
}

impl Image {
    /// Create a zero-filled image.
    pub fn new(
        arena: &mut MemoryArena,
        mode: PixelMode,
        width: u32,
        height: u32,
    ) -> Result<Self, ArenaError> {
        Self::allocate(arena, mode, width, height, false)
    }

    /// Create an image whose contents are unspecified.
    pub fn new_dirty(
        arena: &mut MemoryArena,
        mode: PixelMode,
        width: u32,
        height: u32,
    ) -> Result<Self, ArenaError> {
        Self::allocate(arena, mode, width, height, true)
    }

    fn allocate(
        arena: &mut MemoryArena,
        mode: PixelMode,
        width: u32,
        height: u32,
        dirty: bool,
    ) -> Result<Self, ArenaError> {
        let stride = Self::stride_for(arena, mode, width)?;
        let size = stride
            .checked_mul(height as usize)
            .ok_or(ArenaError::AllocationFailure { requested: usize::MAX })?;

        // Zero-sized images carry no storage.
        let block = if size == 0 {
            Block::empty()
        } else {
            arena.acquire(size, dirty)?
        };

        arena.record_new_image();
        Ok(Self {
            mode,
            width,
            height,
            stride,
            block,
        })
    }

    /// Wrap a tightly packed block (`width * pixel_size` bytes per row).
    ///
    /// The block is adopted when the arena's stride matches the packed row
    /// size; otherwise rows are copied into a fresh image and the block is
    /// returned to the arena.
    pub fn from_packed(
        arena: &mut MemoryArena,
        mode: PixelMode,
        width: u32,
        height: u32,
        block: Block,
    ) -> Result<Self, ArenaError> {
        let packed = width as usize * mode.pixel_size();
        let stride = Self::stride_for(arena, mode, width)?;
        let required = packed * height as usize;
        if block.len() < required {
            arena.release(block);
            return Err(ArenaError::AllocationFailure { requested: required });
        }

        if stride == packed && block.len() == required {
            arena.record_new_image();
            return Ok(Self {
                mode,
                width,
                height,
                stride,
                block,
            });
        }

        let mut image = match Self::new_dirty(arena, mode, width, height) {
            Ok(image) => image,
            Err(err) => {
                arena.release(block);
                return Err(err);
            }
        };
        for y in 0..height as usize {
            let src = &block.as_slice()[y * packed..(y + 1) * packed];
            let row = image.row_mut(y);
            row[..packed].copy_from_slice(src);
            row[packed..].fill(0);
        }
        arena.release(block);
        Ok(image)
    }

    fn stride_for(arena: &MemoryArena, mode: PixelMode, width: u32) -> Result<usize, ArenaError> {
        let linesize = (width as usize)
            .checked_mul(mode.pixel_size())
            .ok_or(ArenaError::AllocationFailure { requested: usize::MAX })?;
        Ok(align_up(linesize, arena.alignment()))
    }

    pub fn mode(&self) -> PixelMode {
        self.mode
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row `y`, including any alignment padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.block.as_slice()[y * self.stride..(y + 1) * self.stride]
    }

    /// Mutable row `y`, including any alignment padding.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.stride;
        &mut self.block.as_mut_slice()[y * stride..(y + 1) * stride]
    }

    /// Raw storage, `stride * height` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.block.as_slice()
    }

    /// Copy pixels out as tightly packed rows.
    pub fn to_packed(&self) -> Vec<u8> {
        let packed = self.width as usize * self.mode.pixel_size();
        let mut out = Vec::with_capacity(packed * self.height as usize);
        for y in 0..self.height as usize {
            out.extend_from_slice(&self.row(y)[..packed]);
        }
        out
    }

    /// Return the image storage to the arena.
    pub fn release(self, arena: &mut MemoryArena) {
        arena.release(self.block);
    }
}

// =============================================================================
// Tests
// =============================================================================
