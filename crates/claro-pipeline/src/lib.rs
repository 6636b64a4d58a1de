//! claro-pipeline: pure still-frame enhancement pipeline (sans-IO).
//!
//! Improves the legibility of a single RGBA frame through:
//! white balance -> equalization -> local contrast -> denoise ->
//! brightness/contrast -> quality analysis.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Decoding and encoding of
//! image files live in the binaries.
//!
//! The stage order is fixed; configuration can disable individual
//! stages but never reorder them. All processing is synchronous,
//! single-threaded, and deterministic: the same frame and config
//! always produce bit-identical output.

pub mod adjust;
pub mod clahe;
pub mod denoise;
pub mod diagnostics;
pub mod equalize;
pub mod luma;
pub mod pipeline;
pub mod quality;
pub mod types;
pub mod white_balance;

pub use pipeline::Pipeline;
pub use types::{
    Dimensions, EnhanceResult, PipelineConfig, PipelineError, PixelBuffer, QualityMetrics,
    Recommendation, StagedResult,
};

/// Run the full enhancement pipeline on a frame.
///
/// Applies every enabled stage in fixed order, then analyzes the
/// result. A single working buffer is mutated throughout, so this is
/// the memory-light entry point; use [`enhance_staged`] when the
/// per-stage intermediates are needed.
///
/// # Pipeline steps
///
/// 1. Gray-world auto white balance
/// 2. Global histogram equalization over luminance
/// 3. Tiled, clip-limited local contrast enhancement
/// 4. Adaptive noise reduction
/// 5. Brightness/contrast adjustment
/// 6. Quality analysis (always runs)
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if a numeric parameter is
/// outside its documented range. No pixel is touched on error.
pub fn enhance(frame: PixelBuffer, config: &PipelineConfig) -> Result<EnhanceResult, PipelineError> {
    config.validate()?;
    let mut working = frame;

    if config.white_balance {
        white_balance::gray_world(&mut working);
    }
    if config.equalize {
        equalize::equalize(&mut working);
    }
    if config.local_contrast {
        clahe::apply(&mut working, config.clip_limit, config.tile_size);
    }
    if config.denoise {
        denoise::adaptive(&mut working, config.sensitivity);
    }
    if config.adjust {
        adjust::brightness_contrast(&mut working, config.brightness, config.contrast);
    }

    let quality = quality::analyze(&working);
    Ok(EnhanceResult {
        buffer: working,
        quality,
    })
}

/// Run the full enhancement pipeline, retaining every intermediate.
///
/// Equivalent to [`enhance`] but returns a [`StagedResult`] holding
/// the frame as it looked after each enabled stage, for visualization
/// and comparison tooling. Internally drives the incremental
/// [`Pipeline`] to completion.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if a numeric parameter is
/// outside its documented range.
pub fn enhance_staged(
    frame: PixelBuffer,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(frame, config.clone())
        .balance()?
        .equalize()
        .enhance_contrast()
        .denoise()
        .adjust()
        .analyze()
        .into_result())
}
