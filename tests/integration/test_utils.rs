//! Test utilities for integration tests.
//!
//! This module provides a mock pyramid source that tracks reads, and helpers
//! for building test images and pyramid descriptions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wsi_region::geom::IntPos;
use wsi_region::imaging::{Image, MemoryArena, PixelMode};
use wsi_region::{LevelProperties, PyramidSource, SourceError};

// =============================================================================
// Tracking Mock Source
// =============================================================================

/// One recorded `read_region` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCall {
    pub x0: i64,
    pub y0: i64,
    pub level: usize,
    pub width: i64,
    pub height: i64,
}

/// A mock pyramid source that serves a constant ARGB pixel and records reads.
///
/// Level geometry is taken from a [`LevelProperties`].
pub struct TrackingSource {
    props: LevelProperties,
    pixel: u32,
    fail_reads: bool,
    read_count: Arc<AtomicUsize>,
    reads: Arc<Mutex<Vec<ReadCall>>>,
}

impl TrackingSource {
    pub fn new(props: LevelProperties) -> Self {
        Self {
            props,
            pixel: 0xFF80_8080,
            fail_reads: false,
            read_count: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve `pixel` (premultiplied ARGB) everywhere.
    pub fn with_pixel(mut self, pixel: u32) -> Self {
        self.pixel = pixel;
        self
    }

    /// Make every read fail.
    pub fn failing(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.reads.lock().unwrap().clone()
    }
}

impl PyramidSource for TrackingSource {
    fn level_count(&self) -> usize {
        self.props.level_count()
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        self.props.level_downsample(level)
    }

    fn level_dimensions(&self, level: usize) -> Option<IntPos> {
        self.props.level_dimension(level)
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
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.reads.lock().unwrap().push(ReadCall {
            x0,
            y0,
            level,
            width,
            height,
        });

        if self.fail_reads {
            return Err(SourceError::Read("simulated read failure".to_string()));
        }

        let required = (width * height * 4) as usize;
        if dest.len() < required {
            return Err(SourceError::BufferTooSmall {
                required,
                actual: dest.len(),
            });
        }
        for px in dest[..required].chunks_exact_mut(4) {
            px.copy_from_slice(&self.pixel.to_ne_bytes());
        }
        Ok(())
    }
}

// =============================================================================
// Pyramid Descriptions
// =============================================================================

/// Three-level pyramid of a 100000 x 71398 slide (downsamples 1, 4, 16).
pub fn slide_levels() -> LevelProperties {
    LevelProperties::new(
        IntPos::new(100000, 71398),
        vec![1.0, 4.0, 16.0],
        vec![
            IntPos::new(100000, 71398),
            IntPos::new(25000, 17849),
            IntPos::new(6250, 4462),
        ],
    )
    .unwrap()
}

/// Small two-level pyramid (downsamples 1, 4) for pixel-level checks.
pub fn small_levels() -> LevelProperties {
    LevelProperties::new(
        IntPos::new(1024, 768),
        vec![1.0, 4.0],
        vec![IntPos::new(1024, 768), IntPos::new(256, 192)],
    )
    .unwrap()
}

// =============================================================================
// Image Helpers
// =============================================================================

/// Create an image of `mode` filled by `f(x, y)` (first `pixel_size` bytes used).
pub fn image_from_fn(
    arena: &mut MemoryArena,
    mode: PixelMode,
    width: u32,
    height: u32,
    f: impl Fn(u32, u32) -> [u8; 4],
) -> Image {
    let mut image = Image::new(arena, mode, width, height).unwrap();
    let ps = mode.pixel_size();
    for y in 0..height {
        let row = image.row_mut(y as usize);
        for x in 0..width {
            let px = f(x, y);
            let start = x as usize * ps;
            row[start..start + ps].copy_from_slice(&px[..ps]);
        }
    }
    image
}

/// RGBA image with a horizontal gray ramp and opaque alpha.
pub fn ramp_rgba(arena: &mut MemoryArena, width: u32, height: u32) -> Image {
    image_from_fn(arena, PixelMode::Rgba, width, height, |x, _| {
        let v = (x * 255 / width.max(2).saturating_sub(1)).min(255) as u8;
        [v, v, v, 255]
    })
}
