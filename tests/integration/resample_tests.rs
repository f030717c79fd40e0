//! Resampling integration tests.
//!
//! These tests exercise the resampler together with the memory arena:
//! pixel results for the common scenarios and block accounting across
//! repeated calls.

use wsi_region::geom::CropBox;
use wsi_region::imaging::{
    resample, rescale, resize, ArenaConfig, Filter, MemoryArena, PixelMode,
};
use wsi_region::ResampleError;

use super::test_utils::{image_from_fn, ramp_rgba};

fn arena(max_cached_blocks: usize) -> MemoryArena {
    MemoryArena::with_config(ArenaConfig {
        alignment: 1,
        block_size: 4 * 1024 * 1024,
        max_cached_blocks,
    })
}

// =============================================================================
// Pixel Results
// =============================================================================

#[test]
fn test_uniform_gray_box_downscale() {
    let mut arena = arena(8);
    let image = image_from_fn(&mut arena, PixelMode::Rgba, 10, 10, |_, _| [128, 128, 128, 255]);

    let out = resample(&mut arena, image, (5, 5), Filter::Box, CropBox::full(10, 10)).unwrap();
    assert_eq!((out.width(), out.height()), (5, 5));
    assert_eq!(out.mode(), PixelMode::Rgba);
    for px in out.to_packed().chunks_exact(4) {
        assert_eq!(px, [128u8, 128, 128, 255]);
    }
    out.release(&mut arena);
}

#[test]
fn test_checkerboard_box_downscale_averages() {
    let mut arena = arena(8);
    let image = image_from_fn(&mut arena, PixelMode::L, 8, 8, |x, y| {
        [if (x + y) % 2 == 0 { 0 } else { 255 }, 0, 0, 0]
    });

    let out = resize(&mut arena, image, (4, 4), Filter::Box).unwrap();
    assert!(out.to_packed().iter().all(|&v| v == 128));
    out.release(&mut arena);
}

#[test]
fn test_rescale_truncates_size() {
    let mut arena = arena(8);
    let image = ramp_rgba(&mut arena, 9, 7);
    let out = rescale(&mut arena, image, 0.5, Filter::Bilinear).unwrap();
    assert_eq!((out.width(), out.height()), (4, 3));
    out.release(&mut arena);
}

#[test]
fn test_integer_crop_at_unit_scale_is_a_copy() {
    let pixel = |x: u32, y: u32| [(x * 20) as u8, (y * 30) as u8, (x * y) as u8, 255];

    for filter in Filter::ALL {
        let mut arena = arena(8);
        let image = image_from_fn(&mut arena, PixelMode::Rgba, 8, 6, pixel);
        let crop = CropBox::new(2.0, 1.0, 6.0, 4.0);

        let out = resample(&mut arena, image, (4, 3), filter, crop).unwrap();
        for y in 0..3u32 {
            for x in 0..4u32 {
                let start = (x * 4) as usize;
                assert_eq!(
                    out.row(y as usize)[start..start + 4],
                    pixel(x + 2, y + 1),
                    "{} at ({}, {})",
                    filter,
                    x,
                    y
                );
            }
        }
        out.release(&mut arena);
    }
}

#[test]
fn test_ramp_stays_monotonic() {
    let mut arena = arena(8);
    for filter in [Filter::Box, Filter::Bilinear, Filter::Hamming] {
        let image = ramp_rgba(&mut arena, 64, 4);
        let out = resize(&mut arena, image, (23, 4), filter).unwrap();

        let row = out.row(2);
        let reds: Vec<u8> = row.chunks_exact(4).map(|px| px[0]).take(23).collect();
        assert!(reds.windows(2).all(|w| w[0] <= w[1]), "{}: {:?}", filter, reds);
        assert!(row.chunks_exact(4).take(23).all(|px| px[3] == 255));
        out.release(&mut arena);
    }
}

// =============================================================================
// Arena Accounting
// =============================================================================

#[test]
fn test_repeated_resampling_reuses_blocks() {
    let mut arena = arena(4);
    let rounds = 20;

    for _ in 0..rounds {
        let image = ramp_rgba(&mut arena, 40, 30);
        let out = resize(&mut arena, image, (13, 17), Filter::Lanczos).unwrap();
        out.release(&mut arena);
        assert!(arena.cached_blocks() <= 4);
    }

    // Input, horizontal temp and output are live at once; nothing more is
    // ever allocated after the first round.
    let stats = arena.stats();
    assert_eq!(stats.allocated, 3);
    assert_eq!(stats.reused, 3 * (rounds - 1));
    assert_eq!(stats.new_images, 3 * rounds);
    assert_eq!(stats.freed, 0);
}

#[test]
fn test_small_pool_frees_excess_blocks() {
    let mut arena = arena(1);

    let image = ramp_rgba(&mut arena, 40, 30);
    let out = resize(&mut arena, image, (13, 17), Filter::Bicubic).unwrap();
    out.release(&mut arena);

    let stats = arena.stats();
    assert_eq!(arena.cached_blocks(), 1);
    assert_eq!(stats.allocated, 3);
    assert_eq!(stats.freed, 2);
}

#[test]
fn test_errors_return_input_storage() {
    let mut arena = arena(8);

    let image = ramp_rgba(&mut arena, 10, 10);
    let err = resample(&mut arena, image, (0, 5), Filter::Box, CropBox::full(10, 10)).unwrap_err();
    assert!(matches!(err, ResampleError::InvalidSize { width: 0, height: 5 }));
    assert_eq!(arena.cached_blocks(), 1);

    let image = ramp_rgba(&mut arena, 10, 10);
    let crop = CropBox::new(2.0, 2.0, 12.0, 8.0);
    let err = resample(&mut arena, image, (5, 5), Filter::Box, crop).unwrap_err();
    assert!(matches!(err, ResampleError::InvalidCropBox { .. }));
    assert_eq!(arena.cached_blocks(), 1);

    let image = image_from_fn(&mut arena, PixelMode::I16, 10, 10, |_, _| [1, 0, 0, 0]);
    let err = resize(&mut arena, image, (5, 5), Filter::Box).unwrap_err();
    assert!(matches!(err, ResampleError::UnsupportedMode { .. }));
    assert_eq!(arena.cached_blocks(), 1);
    assert_eq!(arena.stats().allocated, 1);
}
