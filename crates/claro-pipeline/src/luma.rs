//! Perceptual luminance and luminance histograms.
//!
//! Every tonal stage discretizes pixels into 256 luminance levels
//! using the Rec. 601 weights (`0.299 R + 0.587 G + 0.114 B`). The
//! [`Histogram`] here is rebuilt per stage invocation and never
//! persisted; its [`Cdf`] is the running total used for remapping.

use crate::types::PixelBuffer;

/// Number of luminance levels / histogram bins.
pub const BINS: usize = 256;

/// Red channel luminance weight (Rec. 601).
pub const WEIGHT_R: f64 = 0.299;
/// Green channel luminance weight (Rec. 601).
pub const WEIGHT_G: f64 = 0.587;
/// Blue channel luminance weight (Rec. 601).
pub const WEIGHT_B: f64 = 0.114;

/// Perceptual luminance of one pixel as an unrounded value in
/// `[0, 255]`.
#[must_use]
pub fn luminance_f64(r: u8, g: u8, b: u8) -> f64 {
    WEIGHT_R.mul_add(
        f64::from(r),
        WEIGHT_G.mul_add(f64::from(g), WEIGHT_B * f64::from(b)),
    )
}

/// Perceptual luminance discretized to the nearest of the 256 levels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    // Weights sum to 1.0, so the rounded value never exceeds 255.
    luminance_f64(r, g, b).round() as u8
}

/// A 256-bin luminance histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u32; BINS],
}

impl Histogram {
    /// An empty histogram.
    #[must_use]
    pub const fn new() -> Self {
        Self { bins: [0; BINS] }
    }

    /// Count one sample at the given luminance level.
    pub fn record(&mut self, level: u8) {
        self.bins[level as usize] += 1;
    }

    /// Histogram of the whole frame's luminance.
    #[must_use]
    pub fn from_buffer(buffer: &PixelBuffer) -> Self {
        let mut histogram = Self::new();
        for px in buffer.as_bytes().chunks_exact(PixelBuffer::CHANNELS) {
            histogram.record(luminance(px[0], px[1], px[2]));
        }
        histogram
    }

    /// Histogram of the luminance inside a rectangular region.
    ///
    /// The region is `[x0, x1) x [y0, y1)` and must lie within the
    /// frame bounds.
    #[must_use]
    pub fn from_region(buffer: &PixelBuffer, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        let mut histogram = Self::new();
        for y in y0..y1 {
            for x in x0..x1 {
                let [r, g, b, _] = buffer.rgba(x, y);
                histogram.record(luminance(r, g, b));
            }
        }
        histogram
    }

    /// The count in one bin.
    #[must_use]
    pub const fn bin(&self, level: u8) -> u32 {
        self.bins[level as usize]
    }

    /// All bin counts in level order.
    #[must_use]
    pub const fn bins(&self) -> &[u32; BINS] {
        &self.bins
    }

    /// Total sample count across all bins.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&count| u64::from(count)).sum()
    }

    /// The cumulative distribution function over the bins.
    #[must_use]
    pub fn cdf(&self) -> Cdf {
        let mut running = [0_u64; BINS];
        let mut sum = 0_u64;
        for (slot, &count) in running.iter_mut().zip(self.bins.iter()) {
            sum += u64::from(count);
            *slot = sum;
        }
        Cdf { running }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Cumulative distribution over 256 luminance levels. Non-decreasing
/// by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdf {
    running: [u64; BINS],
}

impl Cdf {
    /// The cumulative count at the given level.
    #[must_use]
    pub const fn at(&self, level: u8) -> u64 {
        self.running[level as usize]
    }

    /// The CDF value at the first non-empty bin, i.e. the smallest
    /// non-zero cumulative count. Zero for an all-empty histogram.
    #[must_use]
    pub fn first_nonzero(&self) -> u64 {
        self.running
            .iter()
            .copied()
            .find(|&value| value > 0)
            .unwrap_or(0)
    }

    /// All cumulative counts in level order.
    #[must_use]
    pub const fn values(&self) -> &[u64; BINS] {
        &self.running
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Uniform-color frame helper.
    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> PixelBuffer {
        let px = [rgb[0], rgb[1], rgb[2], 255];
        let data: Vec<u8> = px
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn luminance_weights_order_channels() {
        // Green carries the largest weight, blue the smallest.
        let g = luminance(0, 255, 0);
        let r = luminance(255, 0, 0);
        let b = luminance(0, 0, 255);
        assert!(g > r && r > b, "expected G > R > B, got {g}, {r}, {b}");
    }

    #[test]
    fn luminance_of_gray_is_the_gray_level() {
        for level in [0_u8, 1, 60, 128, 254, 255] {
            assert_eq!(luminance(level, level, level), level);
        }
    }

    #[test]
    fn histogram_counts_every_pixel_once() {
        let buffer = solid(8, 4, [128, 128, 128]);
        let histogram = Histogram::from_buffer(&buffer);
        assert_eq!(histogram.total(), 32);
        assert_eq!(histogram.bin(128), 32);
    }

    #[test]
    fn region_histogram_is_scoped() {
        // 4x4 frame, left half black, right half white.
        let mut data = Vec::new();
        for _y in 0..4 {
            for x in 0..4 {
                let v = if x < 2 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let buffer = PixelBuffer::from_raw(4, 4, data).unwrap();

        let left = Histogram::from_region(&buffer, 0, 0, 2, 4);
        assert_eq!(left.total(), 8);
        assert_eq!(left.bin(0), 8);
        assert_eq!(left.bin(255), 0);

        let right = Histogram::from_region(&buffer, 2, 0, 4, 4);
        assert_eq!(right.bin(255), 8);
    }

    #[test]
    fn cdf_is_non_decreasing_and_ends_at_total() {
        let mut histogram = Histogram::new();
        for level in [3_u8, 3, 10, 200, 200, 200, 255] {
            histogram.record(level);
        }
        let cdf = histogram.cdf();
        let values = cdf.values();
        for window in values.windows(2) {
            assert!(window[1] >= window[0], "CDF must be non-decreasing");
        }
        assert_eq!(values[BINS - 1], histogram.total());
    }

    #[test]
    fn cdf_first_nonzero_is_first_occupied_bin_count() {
        let mut histogram = Histogram::new();
        histogram.record(10);
        histogram.record(10);
        histogram.record(250);
        assert_eq!(histogram.cdf().first_nonzero(), 2);
    }

    #[test]
    fn empty_histogram_cdf_first_nonzero_is_zero() {
        assert_eq!(Histogram::new().cdf().first_nonzero(), 0);
    }
}
