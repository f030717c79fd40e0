//! WSI Region - arbitrary-scale region extraction from image pyramids.
//!
//! This binary maps regions to pyramid requests, replays recorded requests,
//! enumerates tile grids, and extracts regions from image files.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_region::{
    compare, compute_request, is_valid_region, parse_cases,
    config::{Cli, Command, ExtractConfig, PrintFormat, ReplayConfig, RequestConfig, TilesConfig},
    imaging::{MemoryArena, RegionEncoder},
    scaled_size, InMemoryPyramid, LevelProperties, RegionReader, RegionRequest, TileGrid,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Request(config) => run_request(config),
        Command::Replay(config) => run_replay(config),
        Command::Tiles(config) => run_tiles(config),
        Command::Extract(config) => run_extract(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_region=debug"
    } else {
        "wsi_region=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate a pyramid description file.
fn load_levels(path: &Path) -> Result<LevelProperties, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid pyramid description {}: {}", path.display(), e))
}

fn print_request_text(request: &RegionRequest) {
    println!("level:      {}", request.level);
    println!("location:   {}, {}", request.location.x, request.location.y);
    println!("size:       {}, {}", request.size.x, request.size.y);
    println!(
        "fractional: {:.6}, {:.6}",
        request.native.fractional_coordinates.x, request.native.fractional_coordinates.y
    );
    println!(
        "native:     {:.6}, {:.6}",
        request.native.native_size.x, request.native.native_size.y
    );
}

fn print_json(value: &impl serde::Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Request Command
// =============================================================================

fn run_request(config: RequestConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let props = match load_levels(&config.levels) {
        Ok(props) => props,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let (location, size) = (config.region.location(), config.region.size());
    if !is_valid_region(location, config.region.scaling, size, &props) {
        let level_size = scaled_size(props.slide_size(), config.region.scaling);
        error!(
            "Region {}x{} at ({}, {}) does not fit the {}x{} scaled slide",
            size.x, size.y, location.x, location.y, level_size.x, level_size.y
        );
        return ExitCode::FAILURE;
    }

    let request = compute_request(location, config.region.scaling, size, &props);
    debug!(?request, "computed request");

    match config.format {
        PrintFormat::Json => print_json(&request),
        PrintFormat::Text => {
            print_request_text(&request);
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Replay Command
// =============================================================================

fn run_replay(config: ReplayConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let props = match load_levels(&config.levels) {
        Ok(props) => props,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cases = match fs::read_to_string(&config.input)
        .map_err(|e| e.to_string())
        .and_then(|text| parse_cases(&text).map_err(|e| e.to_string()))
    {
        Ok(cases) => cases,
        Err(e) => {
            error!("Failed to load {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let (mut matched, mut differing, mut skipped) = (0usize, 0usize, 0usize);
    for case in &cases {
        if !is_valid_region(case.location, case.scaling, case.size, &props) {
            warn!(line = case.line, "skipping invalid region");
            skipped += 1;
            continue;
        }

        let actual = compute_request(case.location, case.scaling, case.size, &props);
        let diffs = compare(&case.expected, &actual, config.tolerance);
        if diffs.is_empty() {
            matched += 1;
            continue;
        }

        differing += 1;
        println!(
            "line {}: location ({}, {}) scaling {} size ({}, {})",
            case.line, case.location.x, case.location.y, case.scaling, case.size.x, case.size.y
        );
        for diff in &diffs {
            println!(
                "  {:<14} expected {:>14.6}  actual {:>14.6}  diff {:>+12.6}",
                diff.field,
                diff.expected,
                diff.actual,
                diff.delta()
            );
        }
    }

    info!(
        "Replayed {} request(s): {} matched, {} differ, {} skipped",
        cases.len(),
        matched,
        differing,
        skipped
    );

    if config.strict && differing > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// =============================================================================
// Tiles Command
// =============================================================================

fn run_tiles(config: TilesConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let props = match load_levels(&config.levels) {
        Ok(props) => props,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // validate() already checked the scaling source.
    let Ok(scaling) = config.scaling() else {
        return ExitCode::FAILURE;
    };

    let level_size = scaled_size(props.slide_size(), scaling);
    let grid = match TileGrid::new(level_size, config.tile_size(), config.overlap()) {
        Ok(grid) => grid,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Scaling {:.6}: level {}x{}, {} x {} tiles",
        scaling,
        level_size.x,
        level_size.y,
        grid.counts().x,
        grid.counts().y
    );

    let tile = config.tile_size();
    let requests: Vec<RegionRequest> = grid
        .locations()
        .map(|location| compute_request(location, scaling, tile, &props))
        .collect();

    match config.format {
        PrintFormat::Json => print_json(&requests),
        PrintFormat::Text => {
            for (location, request) in grid.locations().zip(&requests) {
                println!(
                    "{},{},{},{},{},{},{},{:.6},{:.6},{:.6},{:.6}",
                    location.x,
                    location.y,
                    request.location.x,
                    request.location.y,
                    request.level,
                    request.size.x,
                    request.size.y,
                    request.native.fractional_coordinates.x,
                    request.native.fractional_coordinates.y,
                    request.native.native_size.x,
                    request.native.native_size.y
                );
            }
            ExitCode::SUCCESS
        }
    }
}

// =============================================================================
// Extract Command
// =============================================================================

fn run_extract(config: ExtractConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match extract(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn extract(config: &ExtractConfig) -> Result<(), String> {
    let format = config.output_format()?;
    let mut arena = MemoryArena::with_config(config.arena.arena_config());
    let encoder = RegionEncoder::new();

    let source = fs::read(&config.input)
        .map_err(|e| format!("Failed to read {}: {}", config.input.display(), e))?;
    let base = encoder
        .decode(&mut arena, &source)
        .map_err(|e| format!("{}: {}", config.input.display(), e))?;
    info!(
        "Loaded {} ({}x{})",
        config.input.display(),
        base.width(),
        base.height()
    );

    let pyramid = InMemoryPyramid::from_image(&mut arena, base, &config.downsamples)
        .map_err(|e| e.to_string())?;
    let reader = RegionReader::new(pyramid)
        .map_err(|e| e.to_string())?
        .with_filter(config.filter);

    let (location, size) = (config.region.location(), config.region.size());
    let request = reader
        .request(location, config.region.scaling, size)
        .map_err(|e| e.to_string())?;
    info!(
        "Reading level {} at ({}, {}), {}x{} native pixels",
        request.level, request.location.x, request.location.y, request.size.x, request.size.y
    );

    let region = reader
        .read_request(&mut arena, &request, size)
        .map_err(|e| e.to_string())?;
    let encoded = encoder
        .encode(&region, format, config.quality)
        .map_err(|e| e.to_string());
    region.release(&mut arena);
    let encoded = encoded?;

    fs::write(&config.output, &encoded)
        .map_err(|e| format!("Failed to write {}: {}", config.output.display(), e))?;

    let stats = arena.stats();
    debug!(
        allocated = stats.allocated,
        reused = stats.reused,
        reallocated = stats.reallocated,
        freed = stats.freed,
        images = stats.new_images,
        "arena statistics"
    );
    info!(
        "Wrote {} ({} bytes, {}x{})",
        config.output.display(),
        encoded.len(),
        size.x,
        size.y
    );
    Ok(())
}
