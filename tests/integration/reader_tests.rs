//! RegionReader integration tests.
//!
//! Covers the full read path: validation, request mapping, source fetch,
//! channel normalization, resampling and encoding.

use wsi_region::geom::IntPos;
use wsi_region::imaging::{ArenaConfig, Filter, Image, MemoryArena, OutputFormat, PixelMode, RegionEncoder};
use wsi_region::{
    compute_request, InMemoryPyramid, PyramidSource, RegionError, RegionReader, ResampleError,
    SourceError,
};

use super::test_utils::{image_from_fn, ramp_rgba, slide_levels, small_levels, TrackingSource};

fn assert_uniform(image: &Image, expected: [u8; 4]) {
    for (i, px) in image.to_packed().chunks_exact(4).enumerate() {
        assert_eq!(px, expected, "pixel {}", i);
    }
}

// =============================================================================
// Mock Source
// =============================================================================

#[test]
fn test_reader_fetches_mapped_window() {
    let mut arena = MemoryArena::new();
    let reader = RegionReader::new(TrackingSource::new(slide_levels())).unwrap();
    assert_eq!(reader.properties(), &slide_levels());
    assert_eq!(reader.filter(), Filter::Lanczos);

    let (location, size) = (IntPos::new(6912, 5376), IntPos::new(256, 256));
    let region = reader.read_region(&mut arena, location, 0.2495, size).unwrap();
    assert_eq!((region.width(), region.height()), (256, 256));
    assert_eq!(region.mode(), PixelMode::Rgba);

    let expected = compute_request(location, 0.2495, size, &slide_levels());
    let reads = reader.source().reads();
    assert_eq!(reads.len(), 1);
    assert_eq!((reads[0].x0, reads[0].y0), (27684, 21528));
    assert_eq!(reads[0].level, 1);
    assert_eq!((reads[0].width, reads[0].height), (expected.size.x, expected.size.y));

    // 0xFF808080 premultiplied ARGB is opaque mid gray.
    assert_uniform(&region, [128, 128, 128, 255]);
    region.release(&mut arena);
}

#[test]
fn test_reader_unpremultiplies_translucent_pixels() {
    let mut arena = MemoryArena::new();
    let source = TrackingSource::new(slide_levels()).with_pixel(0x8040_2010);
    let reader = RegionReader::new(source).unwrap().with_filter(Filter::Bilinear);

    let region = reader
        .read_region(&mut arena, IntPos::new(500, 500), 0.1, IntPos::new(40, 30))
        .unwrap();
    assert_uniform(&region, [127, 63, 31, 128]);
    region.release(&mut arena);
}

#[test]
fn test_invalid_region_never_reaches_source() {
    let mut arena = MemoryArena::new();
    let reader = RegionReader::new(TrackingSource::new(slide_levels())).unwrap();

    let err = reader
        .read_region(&mut arena, IntPos::new(99_990, 0), 1.0, IntPos::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RegionError::InvalidRegion { .. }));

    let err = reader
        .read_region(&mut arena, IntPos::ZERO, -1.0, IntPos::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RegionError::InvalidScaling(_)));

    assert_eq!(reader.source().read_count(), 0);
    assert_eq!(arena.stats().allocated, 0);
}

#[test]
fn test_source_failure_returns_block_to_arena() {
    let mut arena = MemoryArena::new();
    let reader = RegionReader::new(TrackingSource::new(slide_levels()).failing()).unwrap();

    let err = reader
        .read_region(&mut arena, IntPos::new(100, 100), 0.5, IntPos::new(64, 64))
        .unwrap_err();
    assert!(matches!(err, RegionError::Source(SourceError::Read(_))));
    assert_eq!(reader.source().read_count(), 1);

    assert_eq!(arena.stats().allocated, 1);
    assert_eq!(arena.cached_blocks(), 1);
}

#[test]
fn test_zero_output_size_is_rejected_after_fetch() {
    let mut arena = MemoryArena::new();
    let reader = RegionReader::new(TrackingSource::new(slide_levels())).unwrap();

    let err = reader
        .read_region(&mut arena, IntPos::new(100, 100), 0.5, IntPos::new(0, 16))
        .unwrap_err();
    assert!(matches!(
        err,
        RegionError::Resample(ResampleError::InvalidSize { width: 0, .. })
    ));

    // The fetched block is back in the pool.
    assert_eq!(arena.cached_blocks() as u64, arena.stats().allocated);
}

#[test]
fn test_reader_rejects_broken_geometry() {
    struct NoLevels;

    impl PyramidSource for NoLevels {
        fn level_count(&self) -> usize {
            0
        }

        fn level_downsample(&self, _level: usize) -> Option<f64> {
            None
        }

        fn level_dimensions(&self, _level: usize) -> Option<IntPos> {
            None
        }

        fn read_region(
            &self,
            _dest: &mut [u8],
            _x0: i64,
            _y0: i64,
            _level: usize,
            _width: i64,
            _height: i64,
        ) -> Result<(), SourceError> {
            Ok(())
        }
    }

    let err = RegionReader::new(NoLevels).err().unwrap();
    assert!(matches!(
        err,
        RegionError::Source(SourceError::InvalidPyramid { .. })
    ));
}

// =============================================================================
// In-Memory Pyramid
// =============================================================================

#[test]
fn test_memory_pyramid_matches_level_description() {
    let mut arena = MemoryArena::new();
    let base = ramp_rgba(&mut arena, 1024, 768);
    let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();

    let props = pyramid.level_properties().unwrap();
    assert_eq!(props, small_levels());
    assert_eq!(pyramid.best_level_for_downsample(5.0), 1);
    assert_eq!(pyramid.best_level_for_downsample(0.5), 0);
}

#[test]
fn test_uniform_pyramid_reads_exact_color() {
    let mut arena = MemoryArena::new();
    let base = image_from_fn(&mut arena, PixelMode::Rgba, 512, 384, |_, _| [200, 100, 50, 255]);
    let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();

    for filter in Filter::ALL {
        let reader = RegionReader::new(&pyramid).unwrap().with_filter(filter);
        for scaling in [1.0, 0.6, 0.2] {
            let region = reader
                .read_region(&mut arena, IntPos::new(40, 40), scaling, IntPos::new(30, 20))
                .unwrap();
            assert_eq!((region.width(), region.height()), (30, 20));
            assert_uniform(&region, [200, 100, 50, 255]);
            region.release(&mut arena);
        }
    }
}

#[test]
fn test_ramp_region_follows_source() {
    let mut arena = MemoryArena::new();
    let base = ramp_rgba(&mut arena, 1024, 768);
    let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();
    let reader = RegionReader::new(pyramid).unwrap().with_filter(Filter::Bilinear);

    // Native scaling at level 0 with an integer location is a plain copy.
    let region = reader
        .read_region(&mut arena, IntPos::new(100, 50), 1.0, IntPos::new(64, 8))
        .unwrap();
    let row = region.row(3);
    for x in 0..64usize {
        let expected = ((100 + x) * 255 / 1023) as u8;
        assert_eq!(row[x * 4], expected, "column {}", x);
        assert_eq!(row[x * 4 + 3], 255);
    }
    region.release(&mut arena);
}

#[test]
fn test_repeated_reads_reuse_arena_blocks() {
    let mut arena = MemoryArena::with_config(ArenaConfig {
        max_cached_blocks: 4,
        ..ArenaConfig::default()
    });
    let reader = RegionReader::new(TrackingSource::new(slide_levels())).unwrap();

    for i in 0..10 {
        let region = reader
            .read_region(&mut arena, IntPos::new(1000 + i * 97, 2000), 0.07, IntPos::new(128, 128))
            .unwrap();
        region.release(&mut arena);
    }

    let stats = arena.stats();
    assert_eq!(stats.allocated, 3);
    assert_eq!(stats.freed, 0);
    assert!(arena.cached_blocks() <= 4);
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_png_round_trip_of_region() {
    let mut arena = MemoryArena::new();
    let base = ramp_rgba(&mut arena, 512, 384);
    let pyramid = InMemoryPyramid::from_image(&mut arena, base, &[1.0, 4.0]).unwrap();
    let reader = RegionReader::new(pyramid).unwrap();

    let region = reader
        .read_region(&mut arena, IntPos::new(20, 30), 0.35, IntPos::new(48, 32))
        .unwrap();

    let encoder = RegionEncoder::new();
    let png = encoder.encode(&region, OutputFormat::Png, 80).unwrap();
    assert_eq!(encoder.dimensions(&png).unwrap(), (48, 32));

    let decoded = encoder.decode(&mut arena, &png).unwrap();
    assert_eq!(decoded.mode(), PixelMode::Rgba);
    assert_eq!(decoded.to_packed(), region.to_packed());

    let jpeg = encoder.encode(&region, OutputFormat::Jpeg, 90).unwrap();
    assert_eq!(&jpeg[..2], &[0xFFu8, 0xD8]);

    decoded.release(&mut arena);
    region.release(&mut arena);
}
