//! Pyramid abstraction layer.
//!
//! This module provides a unified interface for reading regions from
//! multi-resolution images regardless of where their pixels come from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Caller / CLI               │
//! └────────────────────┬────────────────────┘
//!                      │ location, scaling, size
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             RegionReader                │
//! │  (validate, map, fetch, resample)       │
//! └────────────────────┬────────────────────┘
//!                      │ level, level-0 window
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          PyramidSource Trait            │
//! │  (level geometry + ARGB region reads)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │ InMemoryPyramid │    │  host slide reader  │
//! │ (decoded image) │    │  (any file format)  │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! [`TileGrid`] enumerates regular tile locations over a scaled level for
//! batch extraction.

mod level;
mod memory;
mod reader;
mod source;
mod tiling;

pub use level::{best_level_for_downsample, scaled_size, scaling_for_mpp, LevelProperties};
pub use memory::InMemoryPyramid;
pub use reader::RegionReader;
pub use source::PyramidSource;
pub use tiling::TileGrid;
