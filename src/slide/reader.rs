//! RegionReader: arbitrary-scale region extraction from a pyramid source.
//!
//! The reader ties the pieces together:
//!
//! 1. validate the region against the scaled slide
//! 2. map it to a native level fetch window ([`compute_request`])
//! 3. fetch the window from the [`PyramidSource`] into an arena block
//! 4. convert premultiplied ARGB to straight RGBA
//! 5. crop the requested region out of the padded window and resample it
//!    to the output size
//!
//! The output is an `RGBA` [`Image`] owned by the caller's arena.

use tracing::{debug, trace};

use crate::error::RegionError;
use crate::geom::IntPos;
use crate::imaging::{normalize_channels, resample, Filter, Image, MemoryArena, PixelMode};
use crate::region::{check_region, compute_request, RegionRequest};

use super::level::LevelProperties;
use super::source::PyramidSource;

/// Region extractor over a pyramid source.
///
/// Level geometry is captured once, when the reader is created.
///
/// # Example
///
/// ```
/// use wsi_region::geom::IntPos;
/// use wsi_region::imaging::{Image, MemoryArena, PixelMode};
/// use wsi_region::slide::{InMemoryPyramid, RegionReader};
///
/// let mut arena = MemoryArena::new();
/// let base = Image::new(&mut arena, PixelMode::Rgba, 512, 512).unwrap();
/// let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();
///
/// let reader = RegionReader::new(pyramid).unwrap();
/// let region = reader
///     .read_region(&mut arena, IntPos::new(10, 10), 0.3, IntPos::new(64, 48))
///     .unwrap();
/// assert_eq!((region.width(), region.height()), (64, 48));
/// ```
pub struct RegionReader<S> {
    source: S,
    properties: LevelProperties,
    filter: Filter,
}

impl<S: PyramidSource> RegionReader<S> {
    /// Create a reader, snapshotting the source's level properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the source reports inconsistent level geometry.
    pub fn new(source: S) -> Result<Self, RegionError> {
        let properties = source.level_properties()?;
        debug!(
            levels = properties.level_count(),
            width = properties.slide_size().x,
            height = properties.slide_size().y,
            "opened pyramid source"
        );
        Ok(Self {
            source,
            properties,
            filter: Filter::default(),
        })
    }

    /// Use `filter` for resampling instead of lanczos.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn properties(&self) -> &LevelProperties {
        &self.properties
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Validate a region and map it to a fetch request.
    pub fn request(
        &self,
        location: IntPos,
        scaling: f64,
        size: IntPos,
    ) -> Result<RegionRequest, RegionError> {
        check_region(location, scaling, size, &self.properties)?;
        Ok(compute_request(location, scaling, size, &self.properties))
    }

    /// Read the region at `location` and `size` in the slide scaled by `scaling`.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is invalid, the source read fails, or
    /// resampling fails. No arena storage is leaked on failure.
    pub fn read_region(
        &self,
        arena: &mut MemoryArena,
        location: IntPos,
        scaling: f64,
        size: IntPos,
    ) -> Result<Image, RegionError> {
        let request = self.request(location, scaling, size)?;
        self.read_request(arena, &request, size)
    }

    /// Fetch `request` and resample it to `output_size`.
    pub fn read_request(
        &self,
        arena: &mut MemoryArena,
        request: &RegionRequest,
        output_size: IntPos,
    ) -> Result<Image, RegionError> {
        let fetched = request.size;
        let (width, height) = to_extent(fetched)?;
        let out = to_extent(output_size)?;

        trace!(
            level = request.level,
            x = request.location.x,
            y = request.location.y,
            width,
            height,
            "fetching native region"
        );

        let pixel_count = width as usize * height as usize;
        let mut block = arena.acquire(pixel_count * 4, true)?;

        let prepared = self
            .source
            .read_region(
                block.as_mut_slice(),
                request.location.x,
                request.location.y,
                request.level,
                fetched.x,
                fetched.y,
            )
            .and_then(|()| normalize_channels(block.as_mut_slice(), pixel_count));
        if let Err(err) = prepared {
            arena.release(block);
            return Err(err.into());
        }

        let native = Image::from_packed(arena, PixelMode::Rgba, width, height, block)?;
        let crop = request.crop_box(fetched);

        debug!(
            level = request.level,
            fetched_width = width,
            fetched_height = height,
            out_width = out.0,
            out_height = out.1,
            filter = %self.filter,
            "resampling region"
        );

        Ok(resample(arena, native, out, self.filter, crop)?)
    }
}

fn to_extent(size: IntPos) -> Result<(u32, u32), RegionError> {
    match (u32::try_from(size.x), u32::try_from(size.y)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(RegionError::InvalidSize { size }),
    }
}
