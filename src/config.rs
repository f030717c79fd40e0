//! Configuration management for the `wsi-region` tool.
//!
//! This module provides the command-line interface:
//! - Subcommands and arguments via clap
//! - Environment variables with `WSI_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `WSI_LEVELS` - Pyramid description JSON file
//! - `WSI_FILTER` - Resampling filter (default: lanczos)
//! - `WSI_JPEG_QUALITY` - JPEG quality for extracted regions (default: 80)
//! - `WSI_ARENA_BLOCKS` - Max blocks cached by the memory arena (default: 16)
//! - `WSI_ARENA_BLOCK_SIZE` - Preferred arena block size in bytes (default: 16MB)
//! - `WSI_ARENA_ALIGNMENT` - Image row alignment in bytes (default: 1)
//! - `WSI_TILE_SIZE` - Tile edge for the `tiles` command (default: 256)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::geom::IntPos;
use crate::imaging::{
    ArenaConfig, Filter, OutputFormat, DEFAULT_ALIGNMENT, DEFAULT_BLOCK_SIZE,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_CACHED_BLOCKS,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: i64 = 256;

/// Default replay comparison tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default pyramid downsamples for the `extract` command.
pub const DEFAULT_DOWNSAMPLES: &str = "1,4,16";

// =============================================================================
// CLI Structure
// =============================================================================

/// WSI Region - arbitrary-scale region extraction from image pyramids.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-region")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Map a region to the native pyramid request and print it
    Request(RequestConfig),

    /// Recompute recorded requests from a CSV file and report differences
    Replay(ReplayConfig),

    /// Print the request of every tile of a grid at a given resolution
    Tiles(TilesConfig),

    /// Extract a region from an image file through an in-memory pyramid
    Extract(ExtractConfig),
}

/// How requests are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrintFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON document
    Json,
}

// =============================================================================
// Shared Arguments
// =============================================================================

/// A region in scaled slide coordinates.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RegionArgs {
    /// Region left edge in scaled coordinates.
    #[arg(short = 'x', long, allow_negative_numbers = true)]
    pub x: i64,

    /// Region top edge in scaled coordinates.
    #[arg(short = 'y', long, allow_negative_numbers = true)]
    pub y: i64,

    /// Scaling relative to level 0 (0.25 reads a quarter-resolution region).
    #[arg(short, long)]
    pub scaling: f64,

    /// Region width in output pixels.
    #[arg(long)]
    pub width: i64,

    /// Region height in output pixels.
    #[arg(long)]
    pub height: i64,
}

impl RegionArgs {
    pub fn location(&self) -> IntPos {
        IntPos::new(self.x, self.y)
    }

    pub fn size(&self) -> IntPos {
        IntPos::new(self.width, self.height)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.scaling.is_finite() || self.scaling <= 0.0 {
            return Err(format!("scaling must be a positive number, got {}", self.scaling));
        }
        if self.width <= 0 || self.height <= 0 {
            return Err(format!(
                "region size must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

/// Memory arena tuning.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ArenaArgs {
    /// Maximum number of blocks kept by the memory arena.
    #[arg(long, default_value_t = DEFAULT_MAX_CACHED_BLOCKS, env = "WSI_ARENA_BLOCKS")]
    pub arena_blocks: usize,

    /// Preferred arena block size in bytes.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "WSI_ARENA_BLOCK_SIZE")]
    pub arena_block_size: usize,

    /// Image row alignment in bytes (power of two).
    #[arg(long, default_value_t = DEFAULT_ALIGNMENT, env = "WSI_ARENA_ALIGNMENT")]
    pub arena_alignment: usize,
}

impl ArenaArgs {
    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            alignment: self.arena_alignment,
            block_size: self.arena_block_size,
            max_cached_blocks: self.arena_blocks,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !self.arena_alignment.is_power_of_two() {
            return Err(format!(
                "arena_alignment must be a power of two, got {}",
                self.arena_alignment
            ));
        }
        if self.arena_block_size == 0 {
            return Err("arena_block_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn validate_levels_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("Pyramid description is required. Set --levels or WSI_LEVELS".to_string());
    }
    Ok(())
}

// =============================================================================
// Request Command
// =============================================================================

/// Configuration for the `request` command.
#[derive(Args, Debug, Clone)]
pub struct RequestConfig {
    /// Pyramid description JSON (level_downsamples, level_dimensions, slide_size).
    #[arg(long, env = "WSI_LEVELS")]
    pub levels: PathBuf,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: PrintFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RequestConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_levels_path(&self.levels)?;
        self.region.validate()
    }
}

// =============================================================================
// Replay Command
// =============================================================================

/// Configuration for the `replay` command.
#[derive(Args, Debug, Clone)]
pub struct ReplayConfig {
    /// Pyramid description JSON the requests were recorded against.
    #[arg(long, env = "WSI_LEVELS")]
    pub levels: PathBuf,

    /// CSV file of requests and their recorded results.
    pub input: PathBuf,

    /// Largest difference that still counts as a match.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Exit with failure if any request differs.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ReplayConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_levels_path(&self.levels)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tiles Command
// =============================================================================

/// Configuration for the `tiles` command.
#[derive(Args, Debug, Clone)]
pub struct TilesConfig {
    /// Pyramid description JSON.
    #[arg(long, env = "WSI_LEVELS")]
    pub levels: PathBuf,

    /// Scaling relative to level 0. Mutually exclusive with --mpp.
    #[arg(long, conflicts_with = "mpp")]
    pub scaling: Option<f64>,

    /// Target resolution in microns per pixel. Requires --slide-mpp.
    #[arg(long, requires = "slide_mpp")]
    pub mpp: Option<f64>,

    /// Level-0 resolution of the slide in microns per pixel.
    #[arg(long)]
    pub slide_mpp: Option<f64>,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "WSI_TILE_SIZE")]
    pub tile_size: i64,

    /// Overlap between neighbouring tiles in pixels.
    #[arg(long, default_value_t = 0)]
    pub overlap: i64,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: PrintFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl TilesConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_levels_path(&self.levels)?;
        let scaling = self.scaling()?;
        if !scaling.is_finite() || scaling <= 0.0 {
            return Err(format!("scaling must be a positive number, got {}", scaling));
        }
        if self.tile_size <= 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.overlap < 0 || self.overlap >= self.tile_size {
            return Err(format!(
                "overlap must be between 0 and tile_size - 1, got {}",
                self.overlap
            ));
        }
        Ok(())
    }

    /// Scaling from `--scaling`, or from `--mpp` and `--slide-mpp`.
    pub fn scaling(&self) -> Result<f64, String> {
        match (self.scaling, self.mpp, self.slide_mpp) {
            (Some(scaling), None, _) => Ok(scaling),
            (None, Some(mpp), Some(slide_mpp)) => {
                Ok(crate::slide::scaling_for_mpp(slide_mpp, mpp))
            }
            (None, Some(_), None) => Err("--mpp requires --slide-mpp".to_string()),
            (None, None, _) => Err("either --scaling or --mpp is required".to_string()),
            (Some(_), Some(_), _) => Err("--scaling and --mpp are mutually exclusive".to_string()),
        }
    }

    pub fn tile_size(&self) -> IntPos {
        IntPos::new(self.tile_size, self.tile_size)
    }

    pub fn overlap(&self) -> IntPos {
        IntPos::new(self.overlap, self.overlap)
    }
}

// =============================================================================
// Extract Command
// =============================================================================

/// Configuration for the `extract` command.
#[derive(Args, Debug, Clone)]
pub struct ExtractConfig {
    /// Input image (JPEG or PNG) used as pyramid level 0.
    #[arg(long)]
    pub input: PathBuf,

    /// Downsample factor of every pyramid level, starting with 1.
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_DOWNSAMPLES)]
    pub downsamples: Vec<f64>,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Resampling filter.
    #[arg(long, value_enum, default_value_t = Filter::Lanczos, env = "WSI_FILTER")]
    pub filter: Filter,

    /// Output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format. Guessed from the output extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_JPEG_QUALITY")]
    pub quality: u8,

    #[command(flatten)]
    pub arena: ArenaArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExtractConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.region.validate()?;
        self.arena.validate()?;

        match self.downsamples.first() {
            None => return Err("at least one downsample is required".to_string()),
            Some(&first) if first != 1.0 => {
                return Err(format!("the first downsample must be 1, got {}", first))
            }
            Some(_) => {}
        }
        if self.downsamples.windows(2).any(|w| w[1] < w[0]) {
            return Err("downsamples must be non-decreasing".to_string());
        }

        if self.quality == 0 || self.quality > 100 {
            return Err("quality must be between 1 and 100".to_string());
        }

        self.output_format().map(|_| ())
    }

    /// Explicit `--format`, or the format implied by the output extension.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        if let Some(format) = self.format {
            return Ok(format);
        }
        self.output
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormat::from_extension)
            .ok_or_else(|| {
                format!(
                    "cannot infer output format from '{}'; use --format",
                    self.output.display()
                )
            })
    }
}

// =============================================================================
// Tests
// =============================================================================
