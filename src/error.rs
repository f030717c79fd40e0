use thiserror::Error;

use crate::geom::IntPos;

/// Errors from the memory arena
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// A block or pool allocation could not be satisfied
    #[error("Allocation failure: could not allocate {requested} bytes")]
    AllocationFailure { requested: usize },
}

/// Errors reported by a pyramid source or while preparing its pixels
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Level description is inconsistent (empty, mismatched lengths, bad downsamples)
    #[error("Invalid pyramid: {reason}")]
    InvalidPyramid { reason: String },

    /// Requested level does not exist
    #[error("Level {level} out of range (pyramid has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// Destination buffer cannot hold the requested pixels
    #[error("Buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// The underlying reader failed
    #[error("Read error: {0}")]
    Read(String),
}

/// Errors that can occur while resampling an image
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    /// Pixel layout has no defined resampling behavior (bilevel, 16-bit special)
    #[error("Unsupported image mode: {mode}")]
    UnsupportedMode { mode: &'static str },

    /// Numeric filter id does not name a resampling filter
    #[error("Unsupported resampling filter: {0}")]
    UnsupportedFilter(u8),

    /// Coefficient table or image buffer could not be allocated
    #[error("Allocation failure: could not allocate {requested} bytes")]
    AllocationFailure { requested: usize },

    /// Output size has a zero extent
    #[error("Invalid output size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Crop box is inverted or falls outside the input image
    #[error("Invalid crop box ({x1}, {y1}, {x2}, {y2}) for {width}x{height} image")]
    InvalidCropBox {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: u32,
        height: u32,
    },
}

impl From<ArenaError> for ResampleError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::AllocationFailure { requested } => {
                ResampleError::AllocationFailure { requested }
            }
        }
    }
}

/// Errors from region reads and request mapping
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    /// Requested region falls outside the scaled level-0 bounds
    #[error(
        "Requested region is outside level boundaries: location {location:?} + size {size:?} exceeds {level_size:?}"
    )]
    InvalidRegion {
        location: IntPos,
        size: IntPos,
        level_size: IntPos,
    },

    /// Fetch window or output size cannot be represented as an image
    #[error("Invalid region size {size:?}")]
    InvalidSize { size: IntPos },

    /// Scaling must be finite and strictly positive
    #[error("Invalid scaling: {0}")]
    InvalidScaling(f64),

    /// Tile grid parameters do not describe a usable grid
    #[error("Invalid tiling: {reason}")]
    InvalidTiling { reason: String },

    /// Pyramid source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Resampling error
    #[error("Resample error: {0}")]
    Resample(#[from] ResampleError),

    /// Arena error
    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),
}

/// Errors that can occur when encoding an extracted region
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    /// The encoder only handles L, RGB and RGBA images
    #[error("Cannot encode image mode {mode}")]
    UnsupportedMode { mode: &'static str },

    /// Failed to decode an input image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// Failed to encode the output image
    #[error("Failed to encode image: {message}")]
    Encode { message: String },
}

/// Errors from parsing a request replay file
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// A row has the wrong number of columns
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A column is not a number
    #[error("Line {line}, column {column}: cannot parse '{value}' as a number")]
    Parse {
        line: usize,
        column: usize,
        value: String,
    },
}
