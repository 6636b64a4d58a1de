//! Capture-quality analysis: metrics, verdict, and advisories.
//!
//! Four metrics are measured on the final frame:
//!
//! - **brightness** — mean per-pixel channel average.
//! - **contrast** — population standard deviation of that grayscale
//!   around the mean.
//! - **sharpness** — mean absolute horizontal+vertical neighbor
//!   difference of the red channel over interior pixels.
//! - **noise** — mean luminance variance of 3x3 blocks sampled on a
//!   stride-3 grid.
//!
//! Thresholds for the verdict and advisories apply to the raw 0–255
//! scale values; the reported metric fields are rescaled to
//! percentages afterwards. The low-light cutoff of raw 60 is
//! therefore ~23.5% in the reported scale.

use crate::luma;
use crate::types::{PixelBuffer, QualityMetrics, Recommendation};

/// Raw brightness below this is flagged as low light.
pub const LOW_LIGHT_THRESHOLD: f64 = 60.0;
/// Raw brightness below this triggers the "very dark" advisory and
/// fails acceptance.
pub const VERY_DARK_THRESHOLD: f64 = 30.0;
/// Minimum raw contrast for an acceptable frame.
pub const MIN_CONTRAST: f64 = 15.0;
/// Minimum raw sharpness for an acceptable frame.
pub const MIN_SHARPNESS: f64 = 20.0;
/// Maximum raw noise for an acceptable frame.
pub const MAX_NOISE: f64 = 70.0;

/// Raw sharpness value reported as 100%.
const SHARPNESS_FULL_SCALE: f64 = 50.0;
/// Raw noise value reported as 100%.
const NOISE_FULL_SCALE: f64 = 100.0;
/// Block edge length for the noise estimate.
const NOISE_KERNEL: u32 = 3;

/// Analyze a frame and produce metrics, verdict, and advisories.
#[must_use]
pub fn analyze(buffer: &PixelBuffer) -> QualityMetrics {
    let brightness = mean_brightness(buffer);
    let contrast = std_dev_contrast(buffer, brightness);
    let sharpness = mean_gradient(buffer);
    let noise = mean_block_variance(buffer);

    let mut recommendations = Vec::new();
    if brightness < VERY_DARK_THRESHOLD {
        recommendations.push(Recommendation::VeryDark);
    } else if brightness < LOW_LIGHT_THRESHOLD {
        recommendations.push(Recommendation::LowLight);
    }
    if contrast < MIN_CONTRAST {
        recommendations.push(Recommendation::LowContrast);
    }
    if sharpness < MIN_SHARPNESS {
        recommendations.push(Recommendation::Blurry);
    }
    if noise > MAX_NOISE {
        recommendations.push(Recommendation::Noisy);
    }

    QualityMetrics {
        brightness: brightness / 255.0 * 100.0,
        contrast: contrast / 128.0 * 100.0,
        sharpness: (sharpness / SHARPNESS_FULL_SCALE * 100.0).min(100.0),
        noise: (noise / NOISE_FULL_SCALE * 100.0).min(100.0),
        is_low_light: brightness < LOW_LIGHT_THRESHOLD,
        is_acceptable: brightness > VERY_DARK_THRESHOLD
            && contrast > MIN_CONTRAST
            && sharpness > MIN_SHARPNESS
            && noise < MAX_NOISE,
        recommendations,
    }
}

/// Mean of the per-pixel channel averages, in `[0, 255]`.
#[allow(clippy::cast_precision_loss)]
fn mean_brightness(buffer: &PixelBuffer) -> f64 {
    let mut sum = 0.0;
    for px in buffer.as_bytes().chunks_exact(PixelBuffer::CHANNELS) {
        sum += (f64::from(px[0]) + f64::from(px[1]) + f64::from(px[2])) / 3.0;
    }
    sum / buffer.pixel_count() as f64
}

/// Population standard deviation of per-pixel grayscale around `mean`.
#[allow(clippy::cast_precision_loss)]
fn std_dev_contrast(buffer: &PixelBuffer, mean: f64) -> f64 {
    let mut sum_squares = 0.0;
    for px in buffer.as_bytes().chunks_exact(PixelBuffer::CHANNELS) {
        let gray = (f64::from(px[0]) + f64::from(px[1]) + f64::from(px[2])) / 3.0;
        let delta = gray - mean;
        sum_squares += delta * delta;
    }
    (sum_squares / buffer.pixel_count() as f64).sqrt()
}

/// Mean absolute neighbor difference of the red channel over interior
/// pixels. Zero for frames too small to have an interior.
#[allow(clippy::cast_precision_loss)]
fn mean_gradient(buffer: &PixelBuffer) -> f64 {
    let width = buffer.width();
    let height = buffer.height();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let bytes = buffer.as_bytes();
    let mut sum = 0.0;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let here = f64::from(bytes[buffer.offset(x, y)]);
            let left = f64::from(bytes[buffer.offset(x - 1, y)]);
            let up = f64::from(bytes[buffer.offset(x, y - 1)]);
            sum += ((here - left).abs() + (here - up).abs()) / 2.0;
        }
    }
    sum / (f64::from(width - 2) * f64::from(height - 2))
}

/// Mean luminance variance over 3x3 blocks sampled on a stride-3
/// grid, normalized by the nominal block-grid size.
fn mean_block_variance(buffer: &PixelBuffer) -> f64 {
    let width = buffer.width();
    let height = buffer.height();
    if width < 2 * NOISE_KERNEL || height < 2 * NOISE_KERNEL {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut y = NOISE_KERNEL;
    while y < height - NOISE_KERNEL {
        let mut x = NOISE_KERNEL;
        while x < width - NOISE_KERNEL {
            sum += block_variance(buffer, x, y, NOISE_KERNEL);
            x += NOISE_KERNEL;
        }
        y += NOISE_KERNEL;
    }

    let blocks = (f64::from(width) / f64::from(NOISE_KERNEL))
        * (f64::from(height) / f64::from(NOISE_KERNEL));
    sum / blocks
}

/// Luminance variance of the `size`-square block anchored at `(x, y)`.
#[allow(clippy::cast_precision_loss)]
fn block_variance(buffer: &PixelBuffer, x: u32, y: u32, size: u32) -> f64 {
    let mut sum = 0.0;
    let mut sum_squares = 0.0;
    for by in y..y + size {
        for bx in x..x + size {
            let [r, g, b, _] = buffer.rgba(bx, by);
            let gray = luma::luminance_f64(r, g, b);
            sum += gray;
            sum_squares += gray * gray;
        }
    }
    let count = f64::from(size * size);
    let mean = sum / count;
    (sum_squares / count - mean * mean).max(0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

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

    fn checkerboard(width: u32, height: u32, block: u32) -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if ((x / block) + (y / block)) % 2 == 0 {
                    0
                } else {
                    255
                };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn uniform_gray_verdict() {
        let metrics = analyze(&solid(32, 32, [128, 128, 128]));

        // Raw brightness 128 -> ~50.2%.
        assert!((metrics.brightness - 128.0 / 255.0 * 100.0).abs() < 1e-9);
        assert!(metrics.contrast.abs() < 1e-9);
        assert!(!metrics.is_low_light, "128 is above the raw 60 cutoff");
        assert!(!metrics.is_acceptable, "zero contrast must fail acceptance");
        assert!(
            metrics
                .recommendations
                .contains(&Recommendation::LowContrast),
        );
    }

    #[test]
    fn all_black_verdict() {
        let metrics = analyze(&solid(16, 16, [0, 0, 0]));
        assert!(metrics.brightness.abs() < 1e-9);
        assert!(metrics.is_low_light);
        assert!(!metrics.is_acceptable);
        assert_eq!(metrics.recommendations[0], Recommendation::VeryDark);
        assert!(
            !metrics.recommendations.contains(&Recommendation::LowLight),
            "very dark supersedes the low-light advisory",
        );
    }

    #[test]
    fn very_dark_and_low_light_tiers() {
        // Raw brightness 45: below 60, above 30 -> LowLight only.
        let metrics = analyze(&solid(8, 8, [45, 45, 45]));
        assert!(metrics.is_low_light);
        assert!(metrics.recommendations.contains(&Recommendation::LowLight));
        assert!(
            !metrics.recommendations.contains(&Recommendation::VeryDark),
        );
    }

    #[test]
    fn checkerboard_has_high_contrast_and_sharpness() {
        let metrics = analyze(&checkerboard(30, 30, 3));
        assert!(
            metrics.contrast > 90.0,
            "half 0 / half 255 should be near the 128 full scale, got {}",
            metrics.contrast,
        );
        assert!(
            metrics.sharpness > 50.0,
            "block seams every 3 px should read sharp, got {}",
            metrics.sharpness,
        );
        assert!(!metrics.is_low_light);
    }

    #[test]
    fn recommendations_follow_metric_order() {
        // All-black frame trips the brightness, contrast, and
        // sharpness advisories in that order.
        let metrics = analyze(&solid(16, 16, [0, 0, 0]));
        assert_eq!(
            metrics.recommendations,
            vec![
                Recommendation::VeryDark,
                Recommendation::LowContrast,
                Recommendation::Blurry,
            ],
        );
    }

    #[test]
    fn metrics_are_percentages() {
        let metrics = analyze(&checkerboard(60, 60, 1));
        for (name, value) in [
            ("brightness", metrics.brightness),
            ("contrast", metrics.contrast),
            ("sharpness", metrics.sharpness),
            ("noise", metrics.noise),
        ] {
            assert!(
                (0.0..=100.0).contains(&value),
                "{name} must be a percentage, got {value}",
            );
        }
    }

    #[test]
    fn single_pixel_frame_has_zero_gradient_and_noise() {
        let metrics = analyze(&solid(1, 1, [200, 200, 200]));
        assert!(metrics.sharpness.abs() < 1e-9);
        assert!(metrics.noise.abs() < 1e-9);
    }

    #[test]
    fn fine_checkerboard_reads_noisy() {
        // 1px alternation inside every 3x3 block drives block variance
        // through the cap.
        let metrics = analyze(&checkerboard(30, 30, 1));
        assert!(
            (metrics.noise - 100.0).abs() < 1e-9,
            "expected capped noise, got {}",
            metrics.noise,
        );
        assert!(!metrics.is_acceptable);
        assert!(metrics.recommendations.contains(&Recommendation::Noisy));
    }

    #[test]
    fn analysis_is_deterministic() {
        let buffer = checkerboard(24, 18, 2);
        assert_eq!(analyze(&buffer), analyze(&buffer));
    }
}
