//! Pixel format adaptation between pyramid sources and images.
//!
//! Pyramid sources fill buffers with premultiplied ARGB, one native-endian
//! `u32` per pixel. Images use straight RGBA byte order.

use crate::error::SourceError;

fn check_len(buf: &[u8], pixel_count: usize) -> Result<(), SourceError> {
    let required = pixel_count.saturating_mul(4);
    if buf.len() < required {
        return Err(SourceError::BufferTooSmall {
            required,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Convert `pixel_count` premultiplied ARGB pixels to straight RGBA in place.
///
/// Fully transparent pixels become all-zero. Opaque pixels are only reordered.
/// Anything else has its colour divided by alpha, rounding down.
pub fn normalize_channels(buf: &mut [u8], pixel_count: usize) -> Result<(), SourceError> {
    check_len(buf, pixel_count)?;

    for px in buf[..pixel_count * 4].chunks_exact_mut(4) {
        let p = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
        let a = p >> 24;
        let r = (p >> 16) & 0xff;
        let g = (p >> 8) & 0xff;
        let b = p & 0xff;

        let rgba = match a {
            0 => [0, 0, 0, 0],
            255 => [r as u8, g as u8, b as u8, 255],
            _ => [
                (r * 255 / a) as u8,
                (g * 255 / a) as u8,
                (b * 255 / a) as u8,
                a as u8,
            ],
        };
        px.copy_from_slice(&rgba);
    }
    Ok(())
}

/// Convert `pixel_count` straight RGBA pixels to premultiplied ARGB in place.
///
/// Inverse of [`normalize_channels`] up to rounding.
pub fn premultiply_channels(buf: &mut [u8], pixel_count: usize) -> Result<(), SourceError> {
    check_len(buf, pixel_count)?;

    for px in buf[..pixel_count * 4].chunks_exact_mut(4) {
        let [r, g, b, a] = [px[0] as u32, px[1] as u32, px[2] as u32, px[3] as u32];
        let mul = |c: u32| match a {
            0 => 0,
            255 => c,
            _ => (c * a + 127) / 255,
        };
        let p = (a << 24) | (mul(r) << 16) | (mul(g) << 8) | mul(b);
        px.copy_from_slice(&p.to_ne_bytes());
    }
    Ok(())
}
