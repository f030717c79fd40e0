//! Region request mapping.
//!
//! A region is asked for in the idealized scaled coordinate space: the slide
//! as if it had been resampled by `scaling`, with a top-left `location` and a
//! `size` in that space. Pyramids only store a handful of fixed levels, so
//! the region is read from the coarsest level that still has at least the
//! requested resolution, and resampled afterwards.
//!
//! # Mapping
//!
//! ```text
//!   scaled space          native level                  level 0
//!  ┌───────────┐        ┌─────────────────┐
//!  │ loc, size │ ─────► │ loc / ns - extra│ ──floor──► integer fetch
//!  └───────────┘        │ (+ extra right) │            location
//!                       └─────────────────┘
//! ```
//!
//! `ns` is the scaling relative to the chosen level. The fetched block is
//! padded by `extra` native pixels on every side so that the resampling
//! kernel has the samples it needs at the region border. The sub-pixel
//! position of the requested region inside that block is carried in
//! [`NativeRegion`] and turned into a crop box once the fetched size is known.

use serde::Serialize;

use crate::error::RegionError;
use crate::geom::{CropBox, FloatPos, IntPos};
use crate::slide::{scaled_size, LevelProperties};

/// Padding in native pixels at native scaling above 1.
///
/// Matches the support of the lanczos kernel.
const BORDER_SUPPORT: f64 = 3.0;

/// Sub-pixel placement of the requested region inside the fetched block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NativeRegion {
    /// Offset of the requested region from the fetched block's top-left corner
    pub fractional_coordinates: FloatPos,
    /// Extent of the requested region in native level pixels
    pub native_size: FloatPos,
}

/// What to fetch from the pyramid, and how to crop it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionRequest {
    /// Top-left corner of the fetch window, in level-0 pixels
    pub location: IntPos,
    /// Pyramid level to read
    pub level: usize,
    /// Fetch window size, in native level pixels
    pub size: IntPos,
    pub native: NativeRegion,
}

impl RegionRequest {
    /// Crop box of the requested region inside a fetched block of `fetched` pixels.
    ///
    /// Both corners are clamped into the block, as sources may return fewer
    /// pixels at the slide border than the request asked for.
    pub fn crop_box(&self, fetched: IntPos) -> CropBox {
        let top_left = self.native.fractional_coordinates;
        let bottom_right = top_left + self.native.native_size;
        CropBox::from_corners(top_left.clip_to_size(fetched), bottom_right.clip_to_size(fetched))
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Whether `(location, size)` fits the slide scaled by `scaling`.
pub fn is_valid_region(
    location: IntPos,
    scaling: f64,
    size: IntPos,
    props: &LevelProperties,
) -> bool {
    check_region(location, scaling, size, props).is_ok()
}

/// Validate a region request.
///
/// # Errors
///
/// - [`RegionError::InvalidScaling`] unless `scaling` is finite and positive
/// - [`RegionError::InvalidRegion`] when the size or location is negative, or
///   the region extends past the scaled slide
pub fn check_region(
    location: IntPos,
    scaling: f64,
    size: IntPos,
    props: &LevelProperties,
) -> Result<(), RegionError> {
    if !scaling.is_finite() || scaling <= 0.0 {
        return Err(RegionError::InvalidScaling(scaling));
    }

    let level_size = scaled_size(props.slide_size(), scaling);
    let far_corner = location
        .x
        .checked_add(size.x)
        .zip(location.y.checked_add(size.y))
        .map(|(x, y)| IntPos::new(x, y));
    let outside = level_size.any_negative()
        || location.any_negative()
        || size.any_negative()
        || far_corner.map_or(true, |far| far.any_greater(level_size));

    if outside {
        return Err(RegionError::InvalidRegion {
            location,
            size,
            level_size,
        });
    }
    Ok(())
}

// =============================================================================
// Mapping
// =============================================================================

/// Map a region in scaled space to a pyramid fetch request.
///
/// The region is assumed valid (see [`check_region`]); out-of-range inputs
/// yield a request clamped to the native level.
pub fn compute_request(
    location: IntPos,
    scaling: f64,
    size: IntPos,
    props: &LevelProperties,
) -> RegionRequest {
    let level = props.best_level_for_downsample(1.0 / scaling);
    let level_dims = props.level_dimensions()[level];
    let downsample = props.level_downsamples()[level];

    let native_scaling = scaling * downsample;
    let native_location = location.to_float() / native_scaling;
    let native_size = size.to_float() / native_scaling;

    // Kernel support widens when the native level is downscaled.
    let extra = if native_scaling > 1.0 {
        BORDER_SUPPORT
    } else {
        (BORDER_SUPPORT / native_scaling).ceil()
    };

    let adapted = native_location
        .sub_scalar(extra)
        .floor()
        .clip_to_size(level_dims);

    // Round-trip through integer level-0 coordinates.
    let level0 = (adapted * downsample).floor();
    let adapted = level0 / downsample;

    let upper = (native_location + native_size)
        .add_scalar(extra)
        .ceil()
        .clip_to_size(level_dims);

    RegionRequest {
        location: level0.to_int(),
        level,
        size: (upper - adapted).to_int(),
        native: NativeRegion {
            fractional_coordinates: native_location - adapted,
            native_size,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
