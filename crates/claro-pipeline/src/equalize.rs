//! Global histogram equalization over perceptual luminance.
//!
//! Builds a 256-bin luminance histogram of the whole frame, then
//! remaps each pixel's luminance through the normalized CDF:
//!
//! ```text
//! new_luminance = round((cdf[L] - cdf_min) / (total - cdf_min) * 255)
//! ```
//!
//! where `cdf_min` is the CDF value at the first occupied bin. The
//! R, G, B samples are then scaled by `new_luminance / max(L, 1)` so
//! hue is roughly preserved while the tonal range spreads out.

use crate::luma::{self, Histogram};
use crate::types::PixelBuffer;

/// What the equalization pass did, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualizeOutcome {
    /// CDF value at the first occupied luminance bin.
    pub cdf_min: u64,
    /// Total pixel count of the frame.
    pub total_pixels: u64,
    /// `false` when the remap denominator was zero (every pixel in
    /// the first occupied bin) and the frame passed through unchanged.
    pub remapped: bool,
}

/// Equalize the frame's luminance histogram in place.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn equalize(buffer: &mut PixelBuffer) -> EqualizeOutcome {
    let histogram = Histogram::from_buffer(buffer);
    let cdf = histogram.cdf();
    let cdf_min = cdf.first_nonzero();
    let total = histogram.total();

    // Degenerate frame: all pixels share the first occupied bin, so
    // the remap denominator is zero. Identity pass.
    if total == cdf_min {
        return EqualizeOutcome {
            cdf_min,
            total_pixels: total,
            remapped: false,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let denominator = (total - cdf_min) as f64;

    for px in buffer.as_bytes_mut().chunks_exact_mut(PixelBuffer::CHANNELS) {
        let level = luma::luminance(px[0], px[1], px[2]);
        #[allow(clippy::cast_precision_loss)]
        let numerator = (cdf.at(level) - cdf_min) as f64;
        let new_level = (numerator / denominator * 255.0).round();
        let ratio = new_level / f64::from(level.max(1));

        for channel in 0..3 {
            let scaled = (f64::from(px[channel]) * ratio).min(255.0);
            px[channel] = scaled.round() as u8;
        }
    }

    EqualizeOutcome {
        cdf_min,
        total_pixels: total,
        remapped: true,
    }
}
