//! In-memory pyramid built from a decoded image.
//!
//! Lets regions be extracted from ordinary image files: the image becomes
//! level 0 and every further level is a box-filtered downscale of it. Levels
//! are stored the way slide readers deliver pixels (premultiplied ARGB), so
//! reads go through the same normalization path as any other source.

use tracing::debug;

use crate::error::SourceError;
use crate::geom::IntPos;
use crate::imaging::{premultiply_channels, resize, Filter, Image, MemoryArena, PixelMode};

use super::source::PyramidSource;

struct MemoryLevel {
    downsample: f64,
    width: u32,
    height: u32,
    /// Premultiplied ARGB, native-endian `u32` per pixel
    pixels: Vec<u8>,
}

impl MemoryLevel {
    fn row(&self, y: usize) -> &[u8] {
        let stride = self.width as usize * 4;
        &self.pixels[y * stride..(y + 1) * stride]
    }
}

/// A pyramid held entirely in memory.
///
/// # Example
///
/// ```
/// use wsi_region::imaging::{Image, MemoryArena, PixelMode};
/// use wsi_region::slide::{InMemoryPyramid, PyramidSource};
///
/// let mut arena = MemoryArena::new();
/// let base = Image::new(&mut arena, PixelMode::Rgba, 1000, 600).unwrap();
/// let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();
///
/// assert_eq!(pyramid.level_count(), 2);
/// assert_eq!(pyramid.level_dimensions(1).unwrap().x, 250);
/// ```
pub struct InMemoryPyramid {
    levels: Vec<MemoryLevel>,
}

impl InMemoryPyramid {
    /// Build a pyramid from an RGBA base image and level downsamples.
    ///
    /// Level `i` has dimensions `round(base / downsamples[i])`, at least 1.
    /// The base image is consumed and its storage returned to `arena`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidPyramid`] if the base is not RGBA, is
    /// empty, or the downsamples are not `1.0` followed by non-decreasing
    /// finite values.
    pub fn from_image(
        arena: &mut MemoryArena,
        base: Image,
        downsamples: &[f64],
    ) -> Result<Self, SourceError> {
        if let Err(reason) = validate_downsamples(&base, downsamples) {
            base.release(arena);
            return Err(SourceError::InvalidPyramid { reason });
        }

        let (width, height) = (base.width(), base.height());
        let packed = base.to_packed();
        base.release(arena);

        let mut levels = Vec::with_capacity(downsamples.len());
        for &downsample in downsamples {
            let level_width = ((width as f64 / downsample).round() as u32).max(1);
            let level_height = ((height as f64 / downsample).round() as u32).max(1);

            let mut pixels = if (level_width, level_height) == (width, height) {
                packed.clone()
            } else {
                downscale(arena, &packed, (width, height), (level_width, level_height))?
            };
            premultiply_channels(&mut pixels, level_width as usize * level_height as usize)?;

            debug!(
                level = levels.len(),
                downsample,
                width = level_width,
                height = level_height,
                "built pyramid level"
            );
            levels.push(MemoryLevel {
                downsample,
                width: level_width,
                height: level_height,
                pixels,
            });
        }

        Ok(Self { levels })
    }

    fn level(&self, level: usize) -> Result<&MemoryLevel, SourceError> {
        self.levels.get(level).ok_or(SourceError::LevelOutOfRange {
            level,
            count: self.levels.len(),
        })
    }
}

fn validate_downsamples(base: &Image, downsamples: &[f64]) -> Result<(), String> {
    if base.mode() != PixelMode::Rgba {
        return Err(format!("base image must be RGBA, got {}", base.mode().name()));
    }
    if base.width() == 0 || base.height() == 0 {
        return Err("base image is empty".to_string());
    }
    match downsamples.first() {
        None => return Err("pyramid has no levels".to_string()),
        Some(&first) if first != 1.0 => {
            return Err(format!("level 0 downsample is {}, expected 1", first))
        }
        Some(_) => {}
    }
    if downsamples
        .windows(2)
        .any(|w| !w[1].is_finite() || w[1] < w[0])
    {
        return Err("downsamples must be finite and non-decreasing".to_string());
    }
    Ok(())
}

/// Box-filter `packed` RGBA pixels down to `to`.
fn downscale(
    arena: &mut MemoryArena,
    packed: &[u8],
    (width, height): (u32, u32),
    to: (u32, u32),
) -> Result<Vec<u8>, SourceError> {
    let read_err = |e: &dyn std::fmt::Display| SourceError::Read(e.to_string());

    let mut block = arena.acquire(packed.len(), true).map_err(|e| read_err(&e))?;
    block.as_mut_slice().copy_from_slice(packed);
    let image = Image::from_packed(arena, PixelMode::Rgba, width, height, block)
        .map_err(|e| read_err(&e))?;

    let scaled = resize(arena, image, to, Filter::Box).map_err(|e| read_err(&e))?;
    let pixels = scaled.to_packed();
    scaled.release(arena);
    Ok(pixels)
}

impl PyramidSource for InMemoryPyramid {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.levels.get(level).map(|l| l.downsample)
    }

    fn level_dimensions(&self, level: usize) -> Option<IntPos> {
        self.levels
            .get(level)
            .map(|l| IntPos::new(l.width as i64, l.height as i64))
    }

    fn read_region(
        &self,
        dest: &mut [u8],
        x0: i64,
        y0: i64,
        level: usize,
        width: i64,
        height: i64,
    ) -> Result<(), SourceError> {
        let lvl = self.level(level)?;
        if width < 0 || height < 0 {
            return Err(SourceError::Read(format!(
                "negative region size {}x{}",
                width, height
            )));
        }

        let row_bytes = width as usize * 4;
        let required = row_bytes * height as usize;
        if dest.len() < required {
            return Err(SourceError::BufferTooSmall {
                required,
                actual: dest.len(),
            });
        }

        // Level-0 origin mapped onto the level grid.
        let lx0 = (x0 as f64 / lvl.downsample).floor() as i64;
        let ly0 = (y0 as f64 / lvl.downsample).floor() as i64;

        // Columns of the destination row that overlap the level.
        let first = (-lx0).clamp(0, width);
        let last = (lvl.width as i64 - lx0).clamp(first, width);

        for (y, out) in dest[..required].chunks_exact_mut(row_bytes.max(1)).enumerate() {
            out.fill(0);
            let ly = ly0 + y as i64;
            if ly < 0 || ly >= lvl.height as i64 || first == last {
                continue;
            }
            let src = lvl.row(ly as usize);
            let sx = (lx0 + first) as usize * 4;
            let len = (last - first) as usize * 4;
            out[first as usize * 4..first as usize * 4 + len].copy_from_slice(&src[sx..sx + len]);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
