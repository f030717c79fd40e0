//! # WSI Region
//!
//! Arbitrary-scale region extraction from multi-resolution image pyramids.
//!
//! Whole-slide images store a handful of fixed-resolution levels. This library
//! reads a region at any scaling: it picks the best native level, fetches a
//! padded window from it, and resamples that window to the requested size
//! with a separable windowed filter.
//!
//! ## Features
//!
//! - **Region mapping**: scaled-space regions become integer level-0 fetch
//!   windows plus a sub-pixel crop box, padded for the filter support
//! - **Separable resampling**: box, bilinear, hamming, bicubic and lanczos
//!   kernels, fixed-point 8-bit and floating 32-bit paths
//! - **Memory arena**: image buffers come from and return to a bounded block pool
//! - **Source agnostic**: anything implementing [`PyramidSource`] can be read
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`geom`] - integer and float 2-D vectors, crop boxes
//! - [`region`] - region validation and request mapping
//! - [`slide`] - pyramid source trait, level model, region reader, tiling
//! - [`imaging`] - arena, images, filters, resampling, pixel conversion, encoding
//! - [`replay`] - regression replay of recorded requests
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use wsi_region::geom::IntPos;
//! use wsi_region::{compute_request, LevelProperties};
//!
//! let props = LevelProperties::new(
//!     IntPos::new(100000, 71398),
//!     vec![1.0, 4.0, 16.0],
//!     vec![
//!         IntPos::new(100000, 71398),
//!         IntPos::new(25000, 17849),
//!         IntPos::new(6250, 4462),
//!     ],
//! )
//! .unwrap();
//!
//! let request = compute_request(IntPos::new(6912, 5376), 0.2495, IntPos::new(256, 256), &props);
//! assert_eq!(request.level, 1);
//! assert_eq!(request.location, IntPos::new(27684, 21528));
//! ```

pub mod config;
pub mod error;
pub mod geom;
pub mod imaging;
pub mod region;
pub mod replay;
pub mod slide;

// Re-export commonly used types
pub use config::{Cli, Command, ExtractConfig, ReplayConfig, RequestConfig, TilesConfig};
pub use error::{ArenaError, EncodeError, RegionError, ReplayError, ResampleError, SourceError};
pub use geom::{CropBox, FloatPos, IntPos};
pub use imaging::{
    resample, Filter, Image, MemoryArena, OutputFormat, PixelMode, RegionEncoder,
};
pub use region::{check_region, compute_request, is_valid_region, NativeRegion, RegionRequest};
pub use replay::{compare, parse_cases, FieldDiff, ReplayCase};
pub use slide::{
    best_level_for_downsample, scaled_size, scaling_for_mpp, InMemoryPyramid, LevelProperties,
    PyramidSource, RegionReader, TileGrid,
};
