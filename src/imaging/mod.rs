//! Image storage and resampling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      RegionReader (crate::slide)        │
//! └──────┬───────────────┬──────────────────┘
//!        │ ARGB buffer   │ RGBA image
//!        ▼               ▼
//! ┌─────────────┐  ┌──────────────────────┐
//! │  convert    │  │  resample            │
//! │ (ARGB→RGBA) │  │ (two-pass, filters)  │
//! └─────────────┘  └──────────┬───────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────┐
//! │        Image ◄── MemoryArena            │
//! │  (strided rows over pooled blocks)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! [`RegionEncoder`] sits beside the pipeline and turns finished images into
//! JPEG or PNG bytes.

mod arena;
mod convert;
mod encoder;
mod filter;
mod image;
mod resample;

pub use arena::{
    ArenaConfig, ArenaStats, Block, MemoryArena, DEFAULT_ALIGNMENT, DEFAULT_BLOCK_SIZE,
    DEFAULT_MAX_CACHED_BLOCKS,
};
pub use convert::{normalize_channels, premultiply_channels};
pub use encoder::{
    clamp_quality, is_valid_quality, OutputFormat, RegionEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use filter::{Filter, FilterKernel, BICUBIC, BILINEAR, BOX, HAMMING, LANCZOS};
pub use self::image::{Image, PixelMode, SampleKind};
pub use resample::{
    precompute_coefficients, resample, rescale, resize, Bounds, Coefficients, PRECISION_BITS,
};
