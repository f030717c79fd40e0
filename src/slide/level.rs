//! Pyramid level model.
//!
//! [`LevelProperties`] is a validated snapshot of a pyramid's geometry: the
//! level-0 size plus the downsample factor and pixel dimensions of every
//! level. It is what the region mapper works against, and the shape of the
//! JSON pyramid description the CLI reads.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::geom::IntPos;

// =============================================================================
// Level Selection
// =============================================================================

/// Pick the level to read for a target downsample.
///
/// Returns the finest level whose downsample does not exceed `target`. Among
/// levels with equal downsamples the lowest index wins. Targets below every
/// downsample (including NaN) select level 0.
pub fn best_level_for_downsample(downsamples: &[f64], target: f64) -> usize {
    let mut best = 0;
    for (level, &ds) in downsamples.iter().enumerate() {
        if ds > target {
            break;
        }
        if ds > downsamples[best] {
            best = level;
        }
    }
    best
}

/// Scaling that maps a slide at `slide_mpp` microns per pixel to `target_mpp`.
pub fn scaling_for_mpp(slide_mpp: f64, target_mpp: f64) -> f64 {
    slide_mpp / target_mpp
}

/// Size of `size` after scaling, truncated toward zero per axis.
pub fn scaled_size(size: IntPos, scaling: f64) -> IntPos {
    IntPos::new(
        (size.x as f64 * scaling) as i64,
        (size.y as f64 * scaling) as i64,
    )
}

// =============================================================================
// Level Properties
// =============================================================================

/// Validated pyramid geometry.
///
/// Invariants, checked on construction:
/// - at least one level
/// - as many downsamples as level dimensions
/// - level 0 has downsample 1.0, downsamples never decrease
/// - every dimension is positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLevelProperties")]
pub struct LevelProperties {
    slide_size: IntPos,
    level_downsamples: Vec<f64>,
    level_dimensions: Vec<IntPos>,
}

/// Unvalidated JSON shape. `slide_size` defaults to the level-0 dimensions.
#[derive(Deserialize)]
struct RawLevelProperties {
    #[serde(default)]
    slide_size: Option<IntPos>,
    level_downsamples: Vec<f64>,
    level_dimensions: Vec<IntPos>,
}

impl TryFrom<RawLevelProperties> for LevelProperties {
    type Error = SourceError;

    fn try_from(raw: RawLevelProperties) -> Result<Self, Self::Error> {
        let slide_size = match raw.slide_size {
            Some(size) => size,
            None => *raw
                .level_dimensions
                .first()
                .ok_or_else(|| invalid("pyramid has no levels"))?,
        };
        LevelProperties::new(slide_size, raw.level_downsamples, raw.level_dimensions)
    }
}

fn invalid(reason: impl Into<String>) -> SourceError {
    SourceError::InvalidPyramid {
        reason: reason.into(),
    }
}

impl LevelProperties {
    /// Build and validate level properties.
    pub fn new(
        slide_size: IntPos,
        level_downsamples: Vec<f64>,
        level_dimensions: Vec<IntPos>,
    ) -> Result<Self, SourceError> {
        if level_downsamples.is_empty() {
            return Err(invalid("pyramid has no levels"));
        }
        if level_downsamples.len() != level_dimensions.len() {
            return Err(invalid(format!(
                "{} downsamples for {} levels",
                level_downsamples.len(),
                level_dimensions.len()
            )));
        }
        if level_downsamples[0] != 1.0 {
            return Err(invalid(format!(
                "level 0 downsample is {}, expected 1",
                level_downsamples[0]
            )));
        }
        if let Some(i) = level_downsamples
            .windows(2)
            .position(|w| !w[1].is_finite() || w[1] < w[0])
        {
            return Err(invalid(format!(
                "downsample of level {} ({}) is smaller than level {} ({})",
                i + 1,
                level_downsamples[i + 1],
                i,
                level_downsamples[i]
            )));
        }
        if slide_size.x <= 0 || slide_size.y <= 0 {
            return Err(invalid(format!(
                "slide size {}x{} is not positive",
                slide_size.x, slide_size.y
            )));
        }
        if let Some(level) = level_dimensions.iter().position(|d| d.x <= 0 || d.y <= 0) {
            return Err(invalid(format!(
                "level {} has non-positive dimensions {}x{}",
                level, level_dimensions[level].x, level_dimensions[level].y
            )));
        }

        Ok(Self {
            slide_size,
            level_downsamples,
            level_dimensions,
        })
    }

    /// Level-0 size in pixels.
    pub fn slide_size(&self) -> IntPos {
        self.slide_size
    }

    pub fn level_count(&self) -> usize {
        self.level_downsamples.len()
    }

    pub fn level_downsamples(&self) -> &[f64] {
        &self.level_downsamples
    }

    pub fn level_dimensions(&self) -> &[IntPos] {
        &self.level_dimensions
    }

    /// Downsample of `level`, or `None` if out of range.
    pub fn level_downsample(&self, level: usize) -> Option<f64> {
        self.level_downsamples.get(level).copied()
    }

    /// Dimensions of `level`, or `None` if out of range.
    pub fn level_dimension(&self, level: usize) -> Option<IntPos> {
        self.level_dimensions.get(level).copied()
    }

    /// See [`best_level_for_downsample`].
    pub fn best_level_for_downsample(&self, target: f64) -> usize {
        best_level_for_downsample(&self.level_downsamples, target)
    }
}

// =============================================================================
// Tests
// =============================================================================
