//! Separable two-pass resampling.
//!
//! Resampling crops a box out of the input and resizes it to the output size
//! with two 1-D convolutions: horizontal first, then vertical. Each pass uses
//! a coefficient table precomputed for its axis.
//!
//! # Pipeline
//!
//! ```text
//! input ──► horizontal pass ──► temp (only the rows the vertical pass needs)
//!                                 │
//!                                 ▼
//!                          vertical pass ──► output
//! ```
//!
//! An axis whose output extent equals its input extent, with a box covering
//! the whole axis, skips its pass. When neither pass is needed the input is
//! returned untouched.
//!
//! 8-bit data is convolved in fixed point (22 fractional bits) and clipped
//! through a lookup table. 32-bit integer and float data is accumulated in
//! `f64`.

use std::marker::PhantomData;

use tracing::debug;

use crate::error::ResampleError;
use crate::geom::CropBox;

use super::arena::MemoryArena;
use super::filter::{Filter, FilterKernel};
use super::image::{Image, PixelMode, SampleKind};

/// Fractional bits of the 8-bit fixed-point weights.
///
/// 8 bits for the result and 2 bits of headroom: kernels with negative lobes
/// can sum above 1.0 or below 0.0 on part of the window.
pub const PRECISION_BITS: u32 = 32 - 8 - 2;

const CLIP_OFFSET: i32 = 640;

/// Maps `accumulator >> PRECISION_BITS` in `-640..640` to `0..=255`.
static CLIP8_LOOKUP: [u8; 1280] = build_clip_table();

const fn build_clip_table() -> [u8; 1280] {
    let mut table = [0u8; 1280];
    let mut i = 0;
    while i < 1280 {
        let v = i as i32 - CLIP_OFFSET;
        table[i] = if v < 0 {
            0
        } else if v > 255 {
            255
        } else {
            v as u8
        };
        i += 1;
    }
    table
}

#[inline]
fn clip8(acc: i32) -> u8 {
    let idx = (acc >> PRECISION_BITS).clamp(-CLIP_OFFSET, CLIP_OFFSET - 1) + CLIP_OFFSET;
    CLIP8_LOOKUP[idx as usize]
}

/// Round half away from zero.
#[inline]
fn round_up(value: f64) -> i32 {
    if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    }
}

// =============================================================================
// Coefficients
// =============================================================================

/// Contributing source window for one output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// First contributing source index
    pub start: usize,
    /// Number of contributing source pixels
    pub len: usize,
}

/// Per-axis filter coefficient table.
///
/// Row `o` holds `ksize` weights; only the first `bounds[o].len` are used.
#[derive(Debug, Clone)]
pub struct Coefficients {
    ksize: usize,
    bounds: Vec<Bounds>,
    weights: Vec<f64>,
}

impl Coefficients {
    /// Maximum number of weights per output sample.
    pub fn ksize(&self) -> usize {
        self.ksize
    }

    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    /// Normalized weights for output sample `index`.
    pub fn weights(&self, index: usize) -> &[f64] {
        let start = index * self.ksize;
        &self.weights[start..start + self.bounds[index].len]
    }

    /// Weights converted to fixed point with `PRECISION_BITS` fractional bits.
    ///
    /// Rounding is symmetric: half away from zero.
    pub fn fixed_point(&self) -> Vec<i32> {
        let unit = (1u32 << PRECISION_BITS) as f64;
        self.weights
            .iter()
            .map(|&w| {
                if w < 0.0 {
                    (-0.5 + w * unit) as i32
                } else {
                    (0.5 + w * unit) as i32
                }
            })
            .collect()
    }

    /// Shift every window start down by `offset` source rows.
    fn shift(&mut self, offset: usize) {
        for b in &mut self.bounds {
            b.start -= offset;
        }
    }
}

/// Compute the coefficient table for one axis.
///
/// `in0..in1` is the crop span on the input axis, mapped onto `out_size`
/// output samples. Weights of every output sample are normalized to sum to 1
/// unless their sum is exactly zero.
pub fn precompute_coefficients(
    in_size: u32,
    in0: f64,
    in1: f64,
    out_size: u32,
    kernel: &FilterKernel,
) -> Result<Coefficients, ResampleError> {
    let scale = (in1 - in0) / out_size as f64;
    let filterscale = scale.max(1.0);

    // Kernel half-width in source pixels.
    let support = kernel.support * filterscale;
    let ksize = support.ceil() as usize * 2 + 1;

    let out = out_size as usize;
    let total = out
        .checked_mul(ksize)
        .filter(|n| n.checked_mul(std::mem::size_of::<f64>()).is_some())
        .ok_or(ResampleError::AllocationFailure {
            requested: usize::MAX,
        })?;

    let mut weights: Vec<f64> = Vec::new();
    weights
        .try_reserve_exact(total)
        .map_err(|_| ResampleError::AllocationFailure {
            requested: total * std::mem::size_of::<f64>(),
        })?;
    weights.resize(total, 0.0);

    let mut bounds: Vec<Bounds> = Vec::new();
    bounds
        .try_reserve_exact(out)
        .map_err(|_| ResampleError::AllocationFailure {
            requested: out * std::mem::size_of::<Bounds>(),
        })?;

    let ss = 1.0 / filterscale;
    for xx in 0..out {
        let center = in0 + (xx as f64 + 0.5) * scale;
        let xmin = (center - support + 0.5).floor().max(0.0) as usize;
        let xmax = ((center + support + 0.5).ceil().max(0.0) as usize).min(in_size as usize);
        let len = xmax.saturating_sub(xmin).min(ksize);

        let k = &mut weights[xx * ksize..xx * ksize + len];
        let mut ww = 0.0;
        for (x, w) in k.iter_mut().enumerate() {
            *w = (kernel.weight)(((x + xmin) as f64 - center + 0.5) * ss);
            ww += *w;
        }
        if ww != 0.0 {
            for w in k.iter_mut() {
                *w /= ww;
            }
        }

        bounds.push(Bounds { start: xmin, len });
    }

    Ok(Coefficients {
        ksize,
        bounds,
        weights,
    })
}

// =============================================================================
// Convolution Passes
// =============================================================================

/// One pixel-kind family of horizontal and vertical convolution passes.
///
/// Chosen once per resample call from the input's [`SampleKind`].
trait Convolution {
    /// Convolve rows `offset..offset + out.height()` of `input` along x.
    fn horizontal(&self, out: &mut Image, input: &Image, offset: usize, coeffs: &Coefficients);

    /// Convolve `input` along y.
    fn vertical(&self, out: &mut Image, input: &Image, coeffs: &Coefficients);
}

/// Byte offsets of the samples to convolve inside one stored pixel.
fn channels(mode: PixelMode) -> &'static [usize] {
    match (mode.pixel_size(), mode.bands()) {
        (1, _) => &[0],
        (_, 2) => &[0, 3],
        (_, 3) => &[0, 1, 2],
        _ => &[0, 1, 2, 3],
    }
}

/// 8-bit samples, fixed-point weights.
struct FixedPoint8;

impl FixedPoint8 {
    #[inline]
    fn write_pixel(dst: &mut [u8], channels: &[usize], sums: &[i32; 4]) {
        dst.fill(0);
        for &c in channels {
            dst[c] = clip8(sums[c]);
        }
    }
}

impl Convolution for FixedPoint8 {
    fn horizontal(&self, out: &mut Image, input: &Image, offset: usize, coeffs: &Coefficients) {
        let kk = coeffs.fixed_point();
        let ksize = coeffs.ksize();
        let pixel_size = input.mode().pixel_size();
        let channels = channels(input.mode());
        let out_width = out.width() as usize;

        for yy in 0..out.height() as usize {
            let src = input.row(yy + offset);
            let dst = out.row_mut(yy);
            for xx in 0..out_width {
                let b = coeffs.bounds()[xx];
                let k = &kk[xx * ksize..xx * ksize + b.len];
                let mut sums = [1i32 << (PRECISION_BITS - 1); 4];
                for (x, &w) in k.iter().enumerate() {
                    let px = (b.start + x) * pixel_size;
                    for &c in channels {
                        sums[c] += src[px + c] as i32 * w;
                    }
                }
                Self::write_pixel(
                    &mut dst[xx * pixel_size..(xx + 1) * pixel_size],
                    channels,
                    &sums,
                );
            }
        }
    }

    fn vertical(&self, out: &mut Image, input: &Image, coeffs: &Coefficients) {
        let kk = coeffs.fixed_point();
        let ksize = coeffs.ksize();
        let pixel_size = input.mode().pixel_size();
        let channels = channels(input.mode());
        let out_width = out.width() as usize;

        for yy in 0..out.height() as usize {
            let b = coeffs.bounds()[yy];
            let k = &kk[yy * ksize..yy * ksize + b.len];
            let dst = out.row_mut(yy);
            for xx in 0..out_width {
                let px = xx * pixel_size;
                let mut sums = [1i32 << (PRECISION_BITS - 1); 4];
                for (y, &w) in k.iter().enumerate() {
                    let src = input.row(b.start + y);
                    for &c in channels {
                        sums[c] += src[px + c] as i32 * w;
                    }
                }
                Self::write_pixel(&mut dst[px..px + pixel_size], channels, &sums);
            }
        }
    }
}

/// A single 32-bit sample convolved in `f64`.
trait WideSample {
    fn load(bytes: [u8; 4]) -> f64;
    fn store(value: f64) -> [u8; 4];
}

struct Int32Sample;

impl WideSample for Int32Sample {
    #[inline]
    fn load(bytes: [u8; 4]) -> f64 {
        i32::from_ne_bytes(bytes) as f64
    }

    #[inline]
    fn store(value: f64) -> [u8; 4] {
        round_up(value).to_ne_bytes()
    }
}

struct Float32Sample;

impl WideSample for Float32Sample {
    #[inline]
    fn load(bytes: [u8; 4]) -> f64 {
        f32::from_ne_bytes(bytes) as f64
    }

    #[inline]
    fn store(value: f64) -> [u8; 4] {
        (value as f32).to_ne_bytes()
    }
}

#[inline]
fn sample_at(row: &[u8], x: usize) -> [u8; 4] {
    [row[x * 4], row[x * 4 + 1], row[x * 4 + 2], row[x * 4 + 3]]
}

/// 32-bit samples, floating-point weights.
struct Wide<S>(PhantomData<S>);

impl<S: WideSample> Convolution for Wide<S> {
    fn horizontal(&self, out: &mut Image, input: &Image, offset: usize, coeffs: &Coefficients) {
        let out_width = out.width() as usize;
        for yy in 0..out.height() as usize {
            let src = input.row(yy + offset);
            let dst = out.row_mut(yy);
            for xx in 0..out_width {
                let b = coeffs.bounds()[xx];
                let ss: f64 = coeffs
                    .weights(xx)
                    .iter()
                    .enumerate()
                    .map(|(x, &w)| S::load(sample_at(src, b.start + x)) * w)
                    .sum();
                dst[xx * 4..xx * 4 + 4].copy_from_slice(&S::store(ss));
            }
        }
    }

    fn vertical(&self, out: &mut Image, input: &Image, coeffs: &Coefficients) {
        let out_width = out.width() as usize;
        for yy in 0..out.height() as usize {
            let b = coeffs.bounds()[yy];
            let k = coeffs.weights(yy);
            let dst = out.row_mut(yy);
            for xx in 0..out_width {
                let ss: f64 = k
                    .iter()
                    .enumerate()
                    .map(|(y, &w)| S::load(sample_at(input.row(b.start + y), xx)) * w)
                    .sum();
                dst[xx * 4..xx * 4 + 4].copy_from_slice(&S::store(ss));
            }
        }
    }
}

static FIXED_POINT_8: FixedPoint8 = FixedPoint8;
static INT32: Wide<Int32Sample> = Wide(PhantomData);
static FLOAT32: Wide<Float32Sample> = Wide(PhantomData);

fn convolution_for(mode: PixelMode) -> Result<&'static dyn Convolution, ResampleError> {
    match mode.sample_kind() {
        SampleKind::U8 => Ok(&FIXED_POINT_8),
        SampleKind::I32 => Ok(&INT32),
        SampleKind::F32 => Ok(&FLOAT32),
        SampleKind::Special => Err(ResampleError::UnsupportedMode { mode: mode.name() }),
    }
}

// =============================================================================
// Resample
// =============================================================================

fn validate_box(input: &Image, crop: &CropBox) -> Result<(), ResampleError> {
    let (w, h) = (input.width() as f64, input.height() as f64);
    let valid = crop.x1 >= 0.0
        && crop.y1 >= 0.0
        && crop.x2 <= w
        && crop.y2 <= h
        && crop.x1 <= crop.x2
        && crop.y1 <= crop.y2;
    if valid {
        Ok(())
    } else {
        Err(ResampleError::InvalidCropBox {
            x1: crop.x1,
            y1: crop.y1,
            x2: crop.x2,
            y2: crop.y2,
            width: input.width(),
            height: input.height(),
        })
    }
}

/// Crop `crop` out of `input` and resample it to `size` with `filter`.
///
/// `input` is consumed: its storage goes back to `arena` once it is no longer
/// needed, on success and on failure alike. The result owns fresh arena
/// storage, except when no pass is needed and the input itself is returned.
///
/// # Errors
///
/// - [`ResampleError::UnsupportedMode`] for bilevel and 16-bit images
/// - [`ResampleError::InvalidSize`] when an output extent is zero
/// - [`ResampleError::InvalidCropBox`] when the box is inverted or outside the input
/// - [`ResampleError::AllocationFailure`] when a table or buffer cannot be allocated
pub fn resample(
    arena: &mut MemoryArena,
    input: Image,
    size: (u32, u32),
    filter: Filter,
    crop: CropBox,
) -> Result<Image, ResampleError> {
    match resample_inner(arena, &input, size, filter.kernel(), crop) {
        Ok(Some(output)) => {
            input.release(arena);
            Ok(output)
        }
        Ok(None) => Ok(input),
        Err(err) => {
            input.release(arena);
            Err(err)
        }
    }
}

/// Resize the whole image to `size`.
pub fn resize(
    arena: &mut MemoryArena,
    input: Image,
    size: (u32, u32),
    filter: Filter,
) -> Result<Image, ResampleError> {
    let crop = CropBox::full(input.width(), input.height());
    resample(arena, input, size, filter, crop)
}

/// Resize the whole image by `scaling`, truncating the output size.
pub fn rescale(
    arena: &mut MemoryArena,
    input: Image,
    scaling: f64,
    filter: Filter,
) -> Result<Image, ResampleError> {
    let width = (input.width() as f64 * scaling) as u32;
    let height = (input.height() as f64 * scaling) as u32;
    resize(arena, input, (width, height), filter)
}

/// Returns `Ok(None)` when neither axis needs a pass.
fn resample_inner(
    arena: &mut MemoryArena,
    input: &Image,
    (xsize, ysize): (u32, u32),
    kernel: &FilterKernel,
    crop: CropBox,
) -> Result<Option<Image>, ResampleError> {
    let convolution = convolution_for(input.mode())?;

    if xsize == 0 || ysize == 0 {
        return Err(ResampleError::InvalidSize {
            width: xsize,
            height: ysize,
        });
    }
    validate_box(input, &crop)?;

    let need_horizontal =
        xsize != input.width() || crop.x1 != 0.0 || crop.x2 != input.width() as f64;
    let need_vertical =
        ysize != input.height() || crop.y1 != 0.0 || crop.y2 != input.height() as f64;

    if !need_horizontal && !need_vertical {
        return Ok(None);
    }

    let coeffs_horiz = precompute_coefficients(input.width(), crop.x1, crop.x2, xsize, kernel)?;
    let mut coeffs_vert = precompute_coefficients(input.height(), crop.y1, crop.y2, ysize, kernel)?;

    // Source rows actually touched by the vertical pass.
    let first = coeffs_vert.bounds()[0];
    let last = coeffs_vert.bounds()[ysize as usize - 1];
    let ybox_first = first.start;
    let ybox_last = (last.start + last.len).max(ybox_first);

    debug!(
        mode = input.mode().name(),
        in_width = input.width(),
        in_height = input.height(),
        out_width = xsize,
        out_height = ysize,
        need_horizontal,
        need_vertical,
        "resampling image"
    );

    let temp = if need_horizontal {
        coeffs_vert.shift(ybox_first);
        let mut temp =
            Image::new_dirty(arena, input.mode(), xsize, (ybox_last - ybox_first) as u32)?;
        convolution.horizontal(&mut temp, input, ybox_first, &coeffs_horiz);
        Some(temp)
    } else {
        None
    };

    if !need_vertical {
        return Ok(temp);
    }

    // Vertical pass reads the horizontal output when there is one.
    let source = temp.as_ref().unwrap_or(input);
    let output = match Image::new_dirty(arena, input.mode(), source.width(), ysize) {
        Ok(mut output) => {
            convolution.vertical(&mut output, source, &coeffs_vert);
            Ok(output)
        }
        Err(err) => Err(err.into()),
    };

    if let Some(temp) = temp {
        temp.release(arena);
    }
    output.map(Some)
}

// =============================================================================
// Tests
// =============================================================================
