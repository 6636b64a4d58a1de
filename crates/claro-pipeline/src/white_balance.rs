//! Gray-world auto white balance.
//!
//! Assumes the scene averages out to neutral gray: each channel is
//! scaled so its mean meets the global mean of the three channel
//! means. A color cast (e.g. the orange tint of indoor lighting)
//! shows up as one channel mean drifting from the others, and the
//! scaling pulls it back.

use crate::types::PixelBuffer;

/// Apply gray-world white balance in place.
///
/// Returns the `[red, green, blue]` scale factors that were applied,
/// for diagnostics. A channel whose mean is zero keeps a scale of 1
/// rather than dividing by zero, so fully black frames pass through
/// unchanged.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gray_world(buffer: &mut PixelBuffer) -> [f64; 3] {
    let pixel_count = buffer.pixel_count() as f64;

    let mut sums = [0.0_f64; 3];
    for px in buffer.as_bytes().chunks_exact(PixelBuffer::CHANNELS) {
        sums[0] += f64::from(px[0]);
        sums[1] += f64::from(px[1]);
        sums[2] += f64::from(px[2]);
    }

    let means = sums.map(|sum| sum / pixel_count);
    let target = (means[0] + means[1] + means[2]) / 3.0;
    let scales = means.map(|mean| if mean > 0.0 { target / mean } else { 1.0 });

    for px in buffer.as_bytes_mut().chunks_exact_mut(PixelBuffer::CHANNELS) {
        for (channel, &scale) in scales.iter().enumerate() {
            let scaled = (f64::from(px[channel]) * scale).min(255.0);
            px[channel] = scaled.round() as u8;
        }
    }

    scales
}
