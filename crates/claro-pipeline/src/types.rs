//! Shared types for the claro enhancement pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can convert frames at the
/// I/O boundary without depending on `image` directly.
pub use image::RgbaImage;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An owned RGBA frame: a `width * height` grid of 8-bit samples in
/// row-major order, four samples (R, G, B, A) per pixel.
///
/// The buffer length is always exactly `width * height * 4`; the shape
/// is checked once at construction and never changes afterwards, so
/// stages may index freely without re-validating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Number of samples per pixel (R, G, B, A).
    pub const CHANNELS: usize = 4;

    /// Build a buffer from raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyFrame`] if either dimension is
    /// zero, and [`PipelineError::InvalidFrame`] if `data` is not
    /// exactly `width * height * 4` bytes long.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyFrame { width, height });
        }
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(PipelineError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer from a decoded [`RgbaImage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyFrame`] for zero-area images.
    pub fn from_image(image: RgbaImage) -> Result<Self, PipelineError> {
        Self::from_raw(image.width(), image.height(), image.into_raw())
    }

    /// Convert the buffer back into an [`RgbaImage`] for encoding.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        // The shape invariant guarantees the raw length matches.
        #[allow(clippy::unreachable)]
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| unreachable!("PixelBuffer shape invariant violated"))
    }

    /// Frame width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.dimensions().pixel_count()
    }

    /// Byte offset of the pixel at `(x, y)` within the raw data.
    #[must_use]
    pub const fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::CHANNELS
    }

    /// The RGBA samples of the pixel at `(x, y)`.
    #[must_use]
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// The raw sample bytes, row-major RGBA.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the raw sample bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Serde-compatible proxy for `PixelBuffer`, so deserialization goes
/// through the same shape validation as [`PixelBuffer::from_raw`].
#[derive(Serialize, Deserialize)]
struct PixelBufferProxy {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Serialize for PixelBuffer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = PixelBufferProxy {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PixelBuffer {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PixelBufferProxy::deserialize(deserializer)?;
        Self::from_raw(proxy.width, proxy.height, proxy.data).map_err(serde::de::Error::custom)
    }
}

/// Configuration for the enhancement pipeline.
///
/// Boolean fields enable or disable individual stages; the stage order
/// itself is fixed (white balance → equalization → local contrast →
/// denoise → brightness/contrast) and cannot be changed by
/// configuration. Numeric parameters are validated by
/// [`validate`](Self::validate) before any stage runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Apply gray-world auto white balance.
    pub white_balance: bool,

    /// Apply global histogram equalization over luminance.
    pub equalize: bool,

    /// Apply tiled, clip-limited local contrast enhancement.
    pub local_contrast: bool,

    /// Apply adaptive noise reduction.
    pub denoise: bool,

    /// Apply the final brightness/contrast adjustment.
    pub adjust: bool,

    /// Local-contrast clip limit: the maximum histogram bin count,
    /// expressed as a multiple of the uniform bin level
    /// (`tile_pixels / 256`). Higher values allow stronger local
    /// contrast amplification. Must be finite and positive.
    pub clip_limit: f32,

    /// Local-contrast tile edge length in pixels. Tiles at the right
    /// and bottom edges are clipped to the frame bounds. Must be at
    /// least 1.
    pub tile_size: u32,

    /// Noise-reduction sensitivity in `[0, 1]`. The smoothing
    /// threshold is `30 * sensitivity` on the local standard
    /// deviation; 0 disables smoothing entirely.
    pub sensitivity: f32,

    /// Brightness multiplier for the final adjustment. 1.0 is neutral.
    pub brightness: f32,

    /// Contrast multiplier for the final adjustment. 1.0 is neutral.
    pub contrast: f32,
}

impl PipelineConfig {
    /// Default local-contrast clip limit.
    pub const DEFAULT_CLIP_LIMIT: f32 = 2.0;
    /// Default local-contrast tile size in pixels.
    pub const DEFAULT_TILE_SIZE: u32 = 64;
    /// Default noise-reduction sensitivity.
    pub const DEFAULT_SENSITIVITY: f32 = 0.5;
    /// Default brightness multiplier.
    pub const DEFAULT_BRIGHTNESS: f32 = 1.2;
    /// Default contrast multiplier.
    pub const DEFAULT_CONTRAST: f32 = 1.1;

    /// Check numeric parameters against their documented ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the offending
    /// parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.clip_limit.is_finite() && self.clip_limit > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "clip_limit must be finite and positive, got {}",
                self.clip_limit,
            )));
        }
        if self.tile_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "tile_size must be at least 1".to_string(),
            ));
        }
        if !(self.sensitivity.is_finite() && (0.0..=1.0).contains(&self.sensitivity)) {
            return Err(PipelineError::InvalidConfig(format!(
                "sensitivity must be within [0, 1], got {}",
                self.sensitivity,
            )));
        }
        if !(self.brightness.is_finite() && self.brightness >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "brightness must be finite and non-negative, got {}",
                self.brightness,
            )));
        }
        if !(self.contrast.is_finite() && self.contrast >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "contrast must be finite and non-negative, got {}",
                self.contrast,
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            white_balance: true,
            equalize: true,
            local_contrast: true,
            denoise: true,
            adjust: true,
            clip_limit: Self::DEFAULT_CLIP_LIMIT,
            tile_size: Self::DEFAULT_TILE_SIZE,
            sensitivity: Self::DEFAULT_SENSITIVITY,
            brightness: Self::DEFAULT_BRIGHTNESS,
            contrast: Self::DEFAULT_CONTRAST,
        }
    }
}

/// A single capture-quality advisory, ordered by the metric that
/// triggered it (brightness first, noise last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// Brightness below the hard floor: the frame is nearly black.
    VeryDark,
    /// Brightness below the low-light threshold but above the floor.
    LowLight,
    /// Contrast below the acceptance threshold.
    LowContrast,
    /// Sharpness below the acceptance threshold.
    Blurry,
    /// Noise above the acceptance ceiling.
    Noisy,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let advice = match self {
            Self::VeryDark => "image is very dark - use the flash or move closer to a light source",
            Self::LowLight => "low light - enable the flash for better quality",
            Self::LowContrast => "low contrast - avoid uniform backgrounds",
            Self::Blurry => "image is blurred - hold the device steady",
            Self::Noisy => "too much noise - improve the lighting",
        };
        f.write_str(advice)
    }
}

/// Quality metrics for an enhanced frame.
///
/// The four metric fields are percentages in `[0, 100]`. The derived
/// flags and recommendations are computed from the underlying raw
/// (0–255 scale) values, preserving the decision boundaries of the
/// raw thresholds (e.g. the low-light cutoff is raw brightness 60,
/// which is ~23.5%). Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean intensity as a percentage of full scale.
    pub brightness: f64,
    /// Grayscale standard deviation as a percentage of 128.
    pub contrast: f64,
    /// Mean gradient magnitude, scaled and capped at 100.
    pub sharpness: f64,
    /// Mean block variance, scaled and capped at 100.
    pub noise: f64,
    /// Whether the frame is too dark for reliable capture.
    pub is_low_light: bool,
    /// Whether all four metrics clear their acceptance thresholds.
    pub is_acceptable: bool,
    /// Advisories in metric order: brightness, contrast, sharpness,
    /// noise. Empty when nothing is wrong.
    pub recommendations: Vec<Recommendation>,
}

/// Result of running the one-shot [`enhance`](crate::enhance) entry
/// point: the enhanced frame plus its quality verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceResult {
    /// The enhanced frame, same dimensions as the input.
    pub buffer: PixelBuffer,
    /// Quality metrics computed from the enhanced frame.
    pub quality: QualityMetrics,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each optional field holds the frame as it looked after that stage,
/// or `None` when the stage was disabled by configuration. Retaining
/// every intermediate costs five extra frame copies for a fully
/// enabled pipeline; callers that only need the final frame should
/// prefer [`enhance`](crate::enhance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedResult {
    /// The untouched input frame.
    pub original: PixelBuffer,
    /// After gray-world white balance, when enabled.
    pub balanced: Option<PixelBuffer>,
    /// After global histogram equalization, when enabled.
    pub equalized: Option<PixelBuffer>,
    /// After tiled local contrast, when enabled.
    pub local_contrast: Option<PixelBuffer>,
    /// After adaptive noise reduction, when enabled.
    pub denoised: Option<PixelBuffer>,
    /// After the final brightness/contrast adjustment, when enabled.
    pub adjusted: Option<PixelBuffer>,
    /// The final enhanced frame (identical to the last enabled stage's
    /// output, or to `original` if every stage was disabled).
    pub enhanced: PixelBuffer,
    /// Quality metrics computed from `enhanced`.
    pub quality: QualityMetrics,
    /// Frame dimensions (identical across all intermediates).
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
///
/// Every variant is a precondition violation surfaced before any
/// pixel is mutated; no stage fails mid-run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The frame has zero area.
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame {
        /// Claimed width in pixels.
        width: u32,
        /// Claimed height in pixels.
        height: u32,
    },

    /// The raw byte length does not match the claimed dimensions.
    #[error("invalid frame: {width}x{height} RGBA needs {expected} bytes, got {actual}")]
    InvalidFrame {
        /// Claimed width in pixels.
        width: u32,
        /// Claimed height in pixels.
        height: u32,
        /// Required byte length (`width * height * 4`).
        expected: usize,
        /// Actual byte length supplied.
        actual: usize,
    },

    /// A configuration parameter is outside its documented range.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- PixelBuffer tests ---

    #[test]
    fn from_raw_accepts_matching_shape() {
        let buffer = PixelBuffer::from_raw(2, 3, vec![0; 24]).unwrap();
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.pixel_count(), 6);
        assert_eq!(buffer.as_bytes().len(), 24);
    }

    #[test]
    fn from_raw_rejects_zero_area() {
        let result = PixelBuffer::from_raw(0, 5, vec![]);
        assert!(matches!(
            result,
            Err(PipelineError::EmptyFrame {
                width: 0,
                height: 5,
            }),
        ));
    }

    #[test]
    fn from_raw_rejects_shape_mismatch() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidFrame {
                expected: 16,
                actual: 15,
                ..
            }),
        ));
    }

    #[test]
    fn offset_is_row_major() {
        let buffer = PixelBuffer::from_raw(4, 4, vec![0; 64]).unwrap();
        assert_eq!(buffer.offset(0, 0), 0);
        assert_eq!(buffer.offset(1, 0), 4);
        assert_eq!(buffer.offset(0, 1), 16);
        assert_eq!(buffer.offset(3, 3), 60);
    }

    #[test]
    fn rgba_reads_the_addressed_pixel() {
        let mut data = vec![0; 16];
        data[4..8].copy_from_slice(&[10, 20, 30, 40]);
        let buffer = PixelBuffer::from_raw(2, 2, data).unwrap();
        assert_eq!(buffer.rgba(1, 0), [10, 20, 30, 40]);
    }

    #[test]
    fn image_round_trip_preserves_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            image::Rgba([u8::try_from(x).unwrap(), u8::try_from(y).unwrap(), 7, 255])
        });
        let buffer = PixelBuffer::from_image(img.clone()).unwrap();
        assert_eq!(buffer.into_image(), img);
    }

    #[test]
    fn from_image_rejects_zero_area() {
        let img = RgbaImage::new(0, 0);
        assert!(matches!(
            PixelBuffer::from_image(img),
            Err(PipelineError::EmptyFrame { .. }),
        ));
    }

    #[test]
    fn pixel_buffer_serde_round_trip() {
        let buffer = PixelBuffer::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let json = serde_json::to_string(&buffer).unwrap();
        let deserialized: PixelBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(buffer, deserialized);
    }

    #[test]
    fn pixel_buffer_serde_rejects_corrupt_shape() {
        // Hand-built JSON with a byte count that contradicts the
        // claimed dimensions must fail to deserialize.
        let json = r#"{"width":2,"height":2,"data":[0,0,0]}"#;
        let result: Result<PixelBuffer, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    // --- Dimensions tests ---

    #[test]
    fn pixel_count_multiplies_dimensions() {
        let dims = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(dims.pixel_count(), 307_200);
    }

    // --- PipelineConfig tests ---

    #[test]
    fn default_config_enables_all_stages() {
        let config = PipelineConfig::default();
        assert!(config.white_balance);
        assert!(config.equalize);
        assert!(config.local_contrast);
        assert!(config.denoise);
        assert!(config.adjust);
        assert!((config.clip_limit - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.tile_size, 64);
        assert!((config.sensitivity - 0.5).abs() < f32::EPSILON);
        assert!((config.brightness - 1.2).abs() < f32::EPSILON);
        assert!((config.contrast - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn default_config_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_tile_size() {
        let config = PipelineConfig {
            tile_size: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_)),
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_sensitivity() {
        for bad in [-0.1, 1.1, f32::NAN] {
            let config = PipelineConfig {
                sensitivity: bad,
                ..PipelineConfig::default()
            };
            assert!(
                config.validate().is_err(),
                "sensitivity {bad} should be rejected",
            );
        }
    }

    #[test]
    fn validate_rejects_non_positive_clip_limit() {
        for bad in [0.0, -2.0, f32::INFINITY] {
            let config = PipelineConfig {
                clip_limit: bad,
                ..PipelineConfig::default()
            };
            assert!(
                config.validate().is_err(),
                "clip_limit {bad} should be rejected",
            );
        }
    }

    #[test]
    fn validate_rejects_negative_multipliers() {
        let config = PipelineConfig {
            brightness: -1.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            contrast: f32::NAN,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pipeline_config_serde_round_trip() {
        let config = PipelineConfig {
            white_balance: false,
            equalize: true,
            local_contrast: false,
            denoise: true,
            adjust: false,
            clip_limit: 3.0,
            tile_size: 32,
            sensitivity: 0.8,
            brightness: 1.0,
            contrast: 1.3,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- Recommendation tests ---

    #[test]
    fn recommendation_display_is_human_readable() {
        assert!(Recommendation::VeryDark.to_string().contains("very dark"));
        assert!(Recommendation::LowLight.to_string().contains("flash"));
        assert!(Recommendation::LowContrast.to_string().contains("contrast"));
        assert!(Recommendation::Blurry.to_string().contains("steady"));
        assert!(Recommendation::Noisy.to_string().contains("noise"));
    }

    // --- PipelineError tests ---

    #[test]
    fn error_display_names_the_shape() {
        let err = PipelineError::InvalidFrame {
            width: 2,
            height: 2,
            expected: 16,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "invalid frame: 2x2 RGBA needs 16 bytes, got 12",
        );
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::InvalidConfig("tile_size must be at least 1".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }
}
