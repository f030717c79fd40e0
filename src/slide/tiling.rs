//! Regular tile grids over a scaled slide.
//!
//! Tiles are laid out from the top-left corner with a fixed stride
//! (`tile_size - overlap`). Tiles that would extend past the level edge are
//! skipped, so every location yields a valid region.

use crate::error::RegionError;
use crate::geom::IntPos;

/// Grid of tile locations over a level of `level_size` pixels.
///
/// # Example
///
/// ```
/// use wsi_region::geom::IntPos;
/// use wsi_region::slide::TileGrid;
///
/// let grid = TileGrid::new(IntPos::new(1000, 600), IntPos::new(256, 256), IntPos::ZERO).unwrap();
/// assert_eq!(grid.counts(), IntPos::new(3, 2));
/// assert_eq!(grid.locations().nth(1), Some(IntPos::new(256, 0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_size: IntPos,
    stride: IntPos,
    counts: IntPos,
}

impl TileGrid {
    /// Build a grid. `overlap` is shared between neighbouring tiles.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidTiling`] if the tile size is not positive
    /// or the overlap is negative or not smaller than the tile size.
    pub fn new(level_size: IntPos, tile_size: IntPos, overlap: IntPos) -> Result<Self, RegionError> {
        if tile_size.x <= 0 || tile_size.y <= 0 {
            return Err(RegionError::InvalidTiling {
                reason: format!("tile size {}x{} is not positive", tile_size.x, tile_size.y),
            });
        }
        if overlap.any_negative() {
            return Err(RegionError::InvalidTiling {
                reason: format!("overlap {}x{} is negative", overlap.x, overlap.y),
            });
        }

        let stride = tile_size - overlap;
        if stride.x <= 0 || stride.y <= 0 {
            return Err(RegionError::InvalidTiling {
                reason: format!(
                    "overlap {}x{} leaves no stride for tile size {}x{}",
                    overlap.x, overlap.y, tile_size.x, tile_size.y
                ),
            });
        }

        let count = |size: i64, tile: i64, stride: i64| {
            if size < tile {
                0
            } else {
                (size - tile) / stride + 1
            }
        };

        Ok(Self {
            tile_size,
            stride,
            counts: IntPos::new(
                count(level_size.x, tile_size.x, stride.x),
                count(level_size.y, tile_size.y, stride.y),
            ),
        })
    }

    pub fn tile_size(&self) -> IntPos {
        self.tile_size
    }

    pub fn stride(&self) -> IntPos {
        self.stride
    }

    /// Number of tiles along each axis.
    pub fn counts(&self) -> IntPos {
        self.counts
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        (self.counts.x * self.counts.y) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left corner of every tile, row-major.
    pub fn locations(&self) -> impl Iterator<Item = IntPos> + '_ {
        (0..self.counts.y).flat_map(move |row| {
            (0..self.counts.x).map(move |col| IntPos::new(col * self.stride.x, row * self.stride.y))
        })
    }
}
