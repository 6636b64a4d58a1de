//! Final brightness/contrast adjustment.
//!
//! Per channel: `(value - 128) * contrast + 128 * brightness`, clamped
//! to `[0, 255]`. Contrast pivots around mid-gray; brightness shifts
//! the pivot itself. Pure single pass with no stage dependencies.

use crate::types::PixelBuffer;

/// Adjust brightness and contrast in place.
///
/// Both multipliers are neutral at 1.0 (the pass is then an identity,
/// modulo integer rounding, which the formula avoids exactly at 1.0).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn brightness_contrast(buffer: &mut PixelBuffer, brightness: f32, contrast: f32) {
    let brightness = f64::from(brightness);
    let contrast = f64::from(contrast);

    for px in buffer.as_bytes_mut().chunks_exact_mut(PixelBuffer::CHANNELS) {
        for channel in 0..3 {
            let centered = f64::from(px[channel]) - 128.0;
            let adjusted = centered.mul_add(contrast, 128.0 * brightness);
            px[channel] = adjusted.clamp(0.0, 255.0).round() as u8;
        }
    }
}
