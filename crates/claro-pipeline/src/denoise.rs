//! Adaptive noise reduction keyed on local standard deviation.
//!
//! For every interior pixel, each color channel is compared against
//! its 3x3 neighborhood: if the local standard deviation is below
//! `30 * sensitivity`, the channel is flat enough that variation is
//! treated as sensor noise and replaced with the local mean. Channels
//! sitting on real detail (high local deviation) are left alone, so
//! edges stay sharp while flat regions smooth out.
//!
//! All reads come from a snapshot taken before the pass starts, so a
//! smoothed pixel never contaminates its neighbors within the same
//! pass. The one-pixel border is never modified.

use crate::types::PixelBuffer;

/// Neighborhood edge length. Fixed; the sensitivity knob scales the
/// threshold, not the window.
pub const KERNEL_SIZE: u32 = 3;

/// Base threshold multiplied by the sensitivity to get the smoothing
/// cutoff on the local standard deviation.
pub const THRESHOLD_SCALE: f64 = 30.0;

/// Smooth low-variance channels in place.
///
/// `sensitivity` is expected in `[0, 1]`; 0 turns smoothing off.
/// Returns the number of channel samples that were replaced, for
/// diagnostics.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn adaptive(buffer: &mut PixelBuffer, sensitivity: f32) -> u64 {
    let width = buffer.width();
    let height = buffer.height();
    if width < KERNEL_SIZE || height < KERNEL_SIZE {
        return 0;
    }

    let threshold = THRESHOLD_SCALE * f64::from(sensitivity);
    let offset = KERNEL_SIZE / 2;
    let snapshot = buffer.as_bytes().to_vec();
    #[allow(clippy::cast_precision_loss)]
    let count = f64::from(KERNEL_SIZE * KERNEL_SIZE);

    let mut smoothed = 0_u64;
    for y in offset..height - offset {
        for x in offset..width - offset {
            let mut sums = [0.0_f64; 3];
            let mut squares = [0.0_f64; 3];
            for ky in y - offset..=y + offset {
                for kx in x - offset..=x + offset {
                    let i = buffer.offset(kx, ky);
                    for channel in 0..3 {
                        let v = f64::from(snapshot[i + channel]);
                        sums[channel] += v;
                        squares[channel] += v * v;
                    }
                }
            }

            let i = buffer.offset(x, y);
            for channel in 0..3 {
                let mean = sums[channel] / count;
                let variance = (squares[channel] / count - mean * mean).max(0.0);
                if variance.sqrt() < threshold {
                    buffer.as_bytes_mut()[i + channel] = mean.round().min(255.0) as u8;
                    smoothed += 1;
                }
            }
        }
    }

    smoothed
}
