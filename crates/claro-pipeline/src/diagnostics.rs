//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! These diagnostics are permanent instrumentation intended for
//! algorithm tuning and parameter experimentation. Call
//! [`enhance_staged_with_diagnostics`] to collect them alongside the
//! pipeline results.
//!
//! Duration measurements use [`std::time::Duration`]. Timestamps are
//! captured through the caller-supplied [`Clock`] so the crate itself
//! stays free of platform timing assumptions.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, PipelineStage};
use crate::types::{PipelineConfig, PipelineError, PixelBuffer, StagedResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
///
/// Binaries supply an implementation backed by
/// [`std::time::Instant`]; tests can supply a fixed clock for
/// deterministic output.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
///
/// Each field captures metrics for one stage. Stages disabled by
/// configuration have `Option` fields that are `None`; analysis always
/// runs and is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: gray-world white balance.
    pub white_balance: Option<StageDiagnostics>,
    /// Stage 2: global histogram equalization.
    pub equalization: Option<StageDiagnostics>,
    /// Stage 3: tiled, clip-limited local contrast.
    pub local_contrast: Option<StageDiagnostics>,
    /// Stage 4: adaptive noise reduction.
    pub denoise: Option<StageDiagnostics>,
    /// Stage 5: brightness/contrast adjustment.
    pub adjust: Option<StageDiagnostics>,
    /// Stage 6: quality analysis.
    pub analysis: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across the run.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Gray-world white balance metrics.
    WhiteBalance {
        /// Multiplier applied to the red channel.
        red_scale: f64,
        /// Multiplier applied to the green channel.
        green_scale: f64,
        /// Multiplier applied to the blue channel.
        blue_scale: f64,
    },
    /// Global histogram equalization metrics.
    Equalization {
        /// CDF value at the first occupied luminance bin.
        cdf_min: u64,
        /// Total pixel count of the frame.
        total_pixels: u64,
        /// Whether the remap ran (`false` for degenerate frames that
        /// passed through unchanged).
        applied: bool,
    },
    /// Tiled local contrast metrics.
    LocalContrast {
        /// Clip limit as a multiple of the uniform bin level.
        clip_limit: f32,
        /// Tile edge length in pixels.
        tile_size: u32,
        /// Number of tiles processed.
        tile_count: usize,
    },
    /// Adaptive noise reduction metrics.
    Denoise {
        /// Sensitivity knob in `[0, 1]`.
        sensitivity: f32,
        /// Smoothing cutoff on the local standard deviation.
        threshold: f64,
        /// Number of channel samples replaced by their local mean.
        smoothed_samples: u64,
    },
    /// Brightness/contrast adjustment metrics.
    Adjust {
        /// Brightness multiplier.
        brightness: f32,
        /// Contrast multiplier.
        contrast: f32,
    },
    /// Quality analysis metrics.
    Analysis {
        /// Brightness percentage.
        brightness: f64,
        /// Contrast percentage.
        contrast: f64,
        /// Sharpness percentage.
        sharpness: f64,
        /// Noise percentage.
        noise: f64,
        /// Whether the frame was flagged as low light.
        low_light: bool,
        /// Whether the frame cleared all acceptance thresholds.
        acceptable: bool,
        /// Number of advisories produced.
        recommendation_count: usize,
    },
}

/// High-level summary counts for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Whether the enhanced frame cleared all acceptance thresholds.
    pub acceptable: bool,
    /// Number of advisories produced by analysis.
    pub recommendation_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Frame: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        // Per-stage breakdown.
        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let stages: Vec<(&str, &StageDiagnostics)> = {
            let mut s = Vec::new();
            if let Some(ref wb) = self.white_balance {
                s.push(("White Balance", wb));
            }
            if let Some(ref eq) = self.equalization {
                s.push(("Equalization", eq));
            }
            if let Some(ref lc) = self.local_contrast {
                s.push(("Local Contrast", lc));
            }
            if let Some(ref dn) = self.denoise {
                s.push(("Denoise", dn));
            }
            if let Some(ref adj) = self.adjust {
                s.push(("Adjust", adj));
            }
            s.push(("Analysis", &self.analysis));
            s
        };

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Acceptable: {}  |  Recommendations: {}",
            self.summary.acceptable, self.summary.recommendation_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::WhiteBalance {
            red_scale,
            green_scale,
            blue_scale,
        } => {
            format!("scales r={red_scale:.3} g={green_scale:.3} b={blue_scale:.3}")
        }
        StageMetrics::Equalization {
            cdf_min,
            total_pixels,
            applied,
        } => {
            format!("cdf_min={cdf_min} pixels={total_pixels} applied={applied}")
        }
        StageMetrics::LocalContrast {
            clip_limit,
            tile_size,
            tile_count,
        } => {
            format!("clip={clip_limit:.1} tile={tile_size}px tiles={tile_count}")
        }
        StageMetrics::Denoise {
            sensitivity,
            threshold,
            smoothed_samples,
        } => {
            format!(
                "sensitivity={sensitivity:.2} threshold={threshold:.1} smoothed={smoothed_samples}",
            )
        }
        StageMetrics::Adjust {
            brightness,
            contrast,
        } => {
            format!("brightness={brightness:.2} contrast={contrast:.2}")
        }
        StageMetrics::Analysis {
            brightness,
            contrast,
            sharpness,
            noise,
            low_light,
            acceptable,
            recommendation_count,
        } => {
            format!(
                "b={brightness:.1}% c={contrast:.1}% s={sharpness:.1}% n={noise:.1}% low_light={low_light} ok={acceptable} advisories={recommendation_count}",
            )
        }
    }
}

/// Run the staged pipeline, timing each stage with the supplied clock.
///
/// Returns the full [`StagedResult`] plus a [`PipelineDiagnostics`]
/// with per-stage durations and metrics. Disabled stages appear as
/// `None` in the diagnostics; the time spent skipping them is folded
/// into the total.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if configuration
/// validation fails.
pub fn enhance_staged_with_diagnostics<C: Clock>(
    frame: PixelBuffer,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();

    let start = clock.now();
    let balanced = Pipeline::new(frame, config.clone()).balance()?;
    let white_balance = timed(clock.elapsed(&start), balanced.metrics());

    let start = clock.now();
    let equalized = balanced.equalize();
    let equalization = timed(clock.elapsed(&start), equalized.metrics());

    let start = clock.now();
    let contrasted = equalized.enhance_contrast();
    let local_contrast = timed(clock.elapsed(&start), contrasted.metrics());

    let start = clock.now();
    let denoised = contrasted.denoise();
    let denoise = timed(clock.elapsed(&start), denoised.metrics());

    let start = clock.now();
    let adjusted = denoised.adjust();
    let adjust = timed(clock.elapsed(&start), adjusted.metrics());

    let start = clock.now();
    let analyzed = adjusted.analyze();
    let quality = analyzed.quality();
    let analysis = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Analysis {
            brightness: quality.brightness,
            contrast: quality.contrast,
            sharpness: quality.sharpness,
            noise: quality.noise,
            low_light: quality.is_low_light,
            acceptable: quality.is_acceptable,
            recommendation_count: quality.recommendations.len(),
        },
    };

    let dimensions = analyzed.dimensions();
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: u64::from(dimensions.width) * u64::from(dimensions.height),
        acceptable: quality.is_acceptable,
        recommendation_count: quality.recommendations.len(),
    };

    let diagnostics = PipelineDiagnostics {
        white_balance,
        equalization,
        local_contrast,
        denoise,
        adjust,
        analysis,
        total_duration: clock.elapsed(&total_start),
        summary,
    };

    Ok((analyzed.into_result(), diagnostics))
}

/// Pair a stage duration with its metrics, if the stage ran.
fn timed(duration: Duration, metrics: Option<StageMetrics>) -> Option<StageDiagnostics> {
    metrics.map(|metrics| StageDiagnostics { duration, metrics })
}
