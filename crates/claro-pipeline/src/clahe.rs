//! Tiled, clip-limited local contrast enhancement (CLAHE-style).
//!
//! The frame is partitioned into a grid of tiles (default 64 px edge,
//! right/bottom tiles clipped to the frame bounds, never padded) and
//! each tile's luminance histogram is equalized independently after
//! clipping: every bin is capped at `clip_limit * tile_pixels / 256`
//! and the removed excess is redistributed uniformly across all 256
//! bins, bounding how much local contrast a near-uniform tile can
//! gain.
//!
//! Tiles are remapped with no blending across tile boundaries, so
//! seams can be visible where neighboring tiles derive very different
//! mappings. Full CLAHE removes these with bilinear interpolation of
//! neighboring tile mappings; that refinement is deliberately not
//! done here.

use crate::luma::{self, BINS, Histogram};
use crate::types::{Dimensions, PixelBuffer};

/// A rectangular sub-region of a frame: `[x0, x1) x [y0, y1)`.
///
/// Tiles are coordinate ranges only; they never own pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Left edge, inclusive.
    pub x0: u32,
    /// Top edge, inclusive.
    pub y0: u32,
    /// Right edge, exclusive.
    pub x1: u32,
    /// Bottom edge, exclusive.
    pub y1: u32,
}

impl Tile {
    /// Tile width in pixels.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.x1 - self.x0
    }

    /// Tile height in pixels.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.y1 - self.y0
    }

    /// Number of pixels covered by the tile.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Partition a frame into a grid of tiles of at most `tile_size` px
/// per edge. The last row and column are clipped to the frame bounds.
#[must_use]
pub fn tile_grid(dimensions: Dimensions, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut y0 = 0;
    while y0 < dimensions.height {
        let y1 = (y0 + tile_size).min(dimensions.height);
        let mut x0 = 0;
        while x0 < dimensions.width {
            let x1 = (x0 + tile_size).min(dimensions.width);
            tiles.push(Tile { x0, y0, x1, y1 });
            x0 = x1;
        }
        y0 = y1;
    }
    tiles
}

/// Apply clip-limited local contrast enhancement in place.
///
/// Returns the number of tiles processed, for diagnostics.
pub fn apply(buffer: &mut PixelBuffer, clip_limit: f32, tile_size: u32) -> usize {
    let tiles = tile_grid(buffer.dimensions(), tile_size);
    for tile in &tiles {
        equalize_tile(buffer, *tile, clip_limit);
    }
    tiles.len()
}

/// Clip-limit and equalize one tile's luminance histogram, remapping
/// the tile's pixels in place.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn equalize_tile(buffer: &mut PixelBuffer, tile: Tile, clip_limit: f32) {
    let histogram = Histogram::from_region(buffer, tile.x0, tile.y0, tile.x1, tile.y1);
    #[allow(clippy::cast_precision_loss)]
    let tile_pixels = tile.pixel_count() as f64;

    let cdf = clipped_cdf(&histogram, tile_pixels, clip_limit);

    for y in tile.y0..tile.y1 {
        for x in tile.x0..tile.x1 {
            let offset = buffer.offset(x, y);
            let bytes = buffer.as_bytes_mut();
            let level = luma::luminance(bytes[offset], bytes[offset + 1], bytes[offset + 2]);
            let new_level = (cdf[level as usize] / tile_pixels * 255.0).round();
            let ratio = new_level / f64::from(level.max(1));

            for channel in 0..3 {
                let scaled = (f64::from(bytes[offset + channel]) * ratio).min(255.0);
                bytes[offset + channel] = scaled.round() as u8;
            }
        }
    }
}

/// CDF over the clipped-and-redistributed histogram.
///
/// Bins become fractional once the clipped excess is spread back
/// uniformly, so the CDF is computed in `f64`. Total mass is
/// conserved: the CDF still sums to the tile's pixel count.
fn clipped_cdf(histogram: &Histogram, tile_pixels: f64, clip_limit: f32) -> [f64; BINS] {
    let clip_value = f64::from(clip_limit) * tile_pixels / 256.0;

    let mut bins = [0.0_f64; BINS];
    let mut excess = 0.0_f64;
    for (slot, &count) in bins.iter_mut().zip(histogram.bins().iter()) {
        let count = f64::from(count);
        if count > clip_value {
            excess += count - clip_value;
            *slot = clip_value;
        } else {
            *slot = count;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let share = excess / BINS as f64;
    let mut cdf = [0.0_f64; BINS];
    let mut running = 0.0_f64;
    for (slot, bin) in cdf.iter_mut().zip(bins.iter()) {
        running += bin + share;
        *slot = running;
    }
    cdf
}
