//! claro-bench: CLI tool for pipeline parameter experimentation and diagnostics.
//!
//! Runs the enhancement pipeline on a given image file with configurable
//! parameters, printing detailed per-stage diagnostics. Useful for:
//!
//! - Tuning clip limit, tile size, and denoise sensitivity
//! - Measuring per-stage durations to identify bottlenecks
//! - Checking how parameter changes affect the quality verdict
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin claro-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use claro_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use claro_pipeline::{PipelineConfig, PixelBuffer};

/// Pipeline parameter experimentation and diagnostics for claro.
///
/// Runs the enhancement pipeline on a given image with configurable
/// parameters and prints detailed per-stage timing and metric
/// diagnostics.
#[derive(Parser)]
#[command(name = "claro-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Disable gray-world white balance.
    #[arg(long)]
    no_white_balance: bool,

    /// Disable global histogram equalization.
    #[arg(long)]
    no_equalize: bool,

    /// Disable tiled local contrast enhancement.
    #[arg(long)]
    no_local_contrast: bool,

    /// Disable adaptive noise reduction.
    #[arg(long)]
    no_denoise: bool,

    /// Disable the final brightness/contrast adjustment.
    #[arg(long)]
    no_adjust: bool,

    /// Local-contrast clip limit (multiple of the uniform bin level).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CLIP_LIMIT)]
    clip_limit: f32,

    /// Local-contrast tile edge length in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_TILE_SIZE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    tile_size: u32,

    /// Noise-reduction sensitivity (0.0-1.0).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SENSITIVITY)]
    sensitivity: f32,

    /// Brightness multiplier for the final adjustment.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BRIGHTNESS)]
    brightness: f32,

    /// Contrast multiplier for the final adjustment.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CONTRAST)]
    contrast: f32,

    /// Write the enhanced frame to this path as PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        white_balance: !cli.no_white_balance,
        equalize: !cli.no_equalize,
        local_contrast: !cli.no_local_contrast,
        denoise: !cli.no_denoise,
        adjust: !cli.no_adjust,
        clip_limit: cli.clip_limit,
        tile_size: cli.tile_size,
        sensitivity: cli.sensitivity,
        brightness: cli.brightness,
        contrast: cli.contrast,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let frame = match load_frame(&cli.image_path) {
        Ok(frame) => frame,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        frame.width(),
        frame.height(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match claro_pipeline::diagnostics::enhance_staged_with_diagnostics(
            frame.clone(),
            &config,
            &StdClock,
        ) {
            Ok((staged, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                    for advisory in &staged.quality.recommendations {
                        println!("  advisory: {advisory}");
                    }
                }

                // Write the enhanced frame on the first run only.
                if run == 0
                    && let Some(ref output_path) = cli.output
                {
                    match staged.enhanced.clone().into_image().save(output_path) {
                        Ok(()) => {
                            eprintln!("Enhanced frame written to {}", output_path.display());
                        }
                        Err(e) => {
                            eprintln!("Error writing {}: {e}", output_path.display());
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Decode an image file into an RGBA frame.
fn load_frame(path: &PathBuf) -> Result<PixelBuffer, String> {
    let image = image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    PixelBuffer::from_image(image.into_rgba8())
        .map_err(|e| format!("Error loading {}: {e}", path.display()))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("White Balance", |d| {
            d.white_balance.as_ref().map(|s| s.duration)
        }),
        ("Equalization", |d| {
            d.equalization.as_ref().map(|s| s.duration)
        }),
        ("Local Contrast", |d| {
            d.local_contrast.as_ref().map(|s| s.duration)
        }),
        ("Denoise", |d| d.denoise.as_ref().map(|s| s.duration)),
        ("Adjust", |d| d.adjust.as_ref().map(|s| s.duration)),
        ("Analysis", |d| Some(d.analysis.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
