//! PyramidSource trait for format-agnostic pyramid access.
//!
//! Region extraction never parses slide files itself. Anything that can report
//! its level geometry and fill a buffer with pixels from one level implements
//! [`PyramidSource`]; the region reader works against that interface only.

use crate::error::SourceError;
use crate::geom::IntPos;

use super::level::{self, LevelProperties};

/// Read-only access to a multi-resolution image pyramid.
///
/// Level 0 is the full-resolution image; each further level has a larger (or
/// equal) downsample factor.
///
/// # Pixel format
///
/// [`read_region`](PyramidSource::read_region) writes premultiplied ARGB, one
/// native-endian `u32` per pixel, rows tightly packed. Pixels outside the level
/// are written as transparent zero.
///
/// # Example
///
/// ```
/// use wsi_region::geom::IntPos;
/// use wsi_region::slide::PyramidSource;
/// use wsi_region::SourceError;
///
/// struct Blank;
///
/// impl PyramidSource for Blank {
///     fn level_count(&self) -> usize {
///         1
///     }
///
///     fn level_downsample(&self, level: usize) -> Option<f64> {
///         (level == 0).then_some(1.0)
///     }
///
///     fn level_dimensions(&self, level: usize) -> Option<IntPos> {
///         (level == 0).then_some(IntPos::new(512, 512))
///     }
///
///     fn read_region(
///         &self,
///         dest: &mut [u8],
///         _x0: i64,
///         _y0: i64,
///         _level: usize,
///         _width: i64,
///         _height: i64,
///     ) -> Result<(), SourceError> {
///         dest.fill(0);
///         Ok(())
///     }
/// }
///
/// let props = Blank.level_properties().unwrap();
/// assert_eq!(props.slide_size(), IntPos::new(512, 512));
/// ```
pub trait PyramidSource {
    /// Number of pyramid levels.
    fn level_count(&self) -> usize;

    /// Downsample factor of `level` relative to level 0, or `None` if out of range.
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// Pixel dimensions of `level`, or `None` if out of range.
    fn level_dimensions(&self, level: usize) -> Option<IntPos>;

    /// Fill `dest` with a `width x height` block of `level`.
    ///
    /// `(x0, y0)` is the top-left corner in level-0 coordinates. `dest` holds
    /// at least `width * height * 4` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the level does not exist, the buffer is too small,
    /// or the underlying reader fails.
    fn read_region(
        &self,
        dest: &mut [u8],
        x0: i64,
        y0: i64,
        level: usize,
        width: i64,
        height: i64,
    ) -> Result<(), SourceError>;

    /// Finest level whose downsample does not exceed `downsample`.
    fn best_level_for_downsample(&self, downsample: f64) -> usize {
        let downsamples: Vec<f64> = (0..self.level_count())
            .filter_map(|level| self.level_downsample(level))
            .collect();
        level::best_level_for_downsample(&downsamples, downsample)
    }

    /// Snapshot of the pyramid geometry.
    ///
    /// The slide size is the level-0 dimensions.
    fn level_properties(&self) -> Result<LevelProperties, SourceError> {
        let count = self.level_count();
        let mut downsamples = Vec::with_capacity(count);
        let mut dimensions = Vec::with_capacity(count);
        for level in 0..count {
            let out_of_range = SourceError::LevelOutOfRange { level, count };
            downsamples.push(self.level_downsample(level).ok_or(out_of_range.clone())?);
            dimensions.push(self.level_dimensions(level).ok_or(out_of_range)?);
        }

        let slide_size = dimensions.first().copied().unwrap_or(IntPos::ZERO);
        LevelProperties::new(slide_size, downsamples, dimensions)
    }
}

impl<S: PyramidSource + ?Sized> PyramidSource for &S {
    fn level_count(&self) -> usize {
        (**self).level_count()
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        (**self).level_downsample(level)
    }

    fn level_dimensions(&self, level: usize) -> Option<IntPos> {
        (**self).level_dimensions(level)
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
        (**self).read_region(dest, x0, y0, level, width, height)
    }
}
