//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate frame before continuing.
//!
//! Unlike [`crate::enhance_staged`] which runs the entire pipeline in
//! one call, [`Pipeline`] lets the caller drive execution one step at
//! a time:
//!
//! ```rust
//! # use claro_pipeline::{Pipeline, PipelineConfig, PipelineError, PixelBuffer};
//! # fn run() -> Result<(), PipelineError> {
//! let frame = PixelBuffer::from_raw(2, 2, vec![128; 16])?;
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::new(frame, config)
//!     .balance()?
//!     .equalize()
//!     .enhance_contrast()
//!     .denoise()
//!     .adjust()
//!     .analyze();
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. The caller
//! can inspect the current stage's output via accessor methods at any
//! point. Stages disabled by configuration still advance the chain but
//! leave the working frame untouched and record no intermediate.
//!
//! # Memory
//!
//! Every enabled stage snapshots its output frame so [`StagedResult`]
//! can expose the full progression. A fully enabled pipeline on a
//! 1000×1000 frame therefore pins roughly 24 MB of RGBA copies until
//! [`Analyzed::into_result`] consumes the final stage. Callers that
//! only need the final frame should prefer [`crate::enhance`], which
//! keeps a single working buffer throughout.

use crate::diagnostics::StageMetrics;
use crate::types::{
    Dimensions, PipelineConfig, PipelineError, PixelBuffer, QualityMetrics, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source frame and config are stored but not yet touched. Call
/// [`balance`](Self::balance) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .balance() to continue"]
pub struct Pending {
    config: PipelineConfig,
    frame: PixelBuffer,
}

impl Pending {
    /// The untouched source frame.
    #[must_use]
    pub const fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    /// Validate the configuration and advance to the [`Balanced`]
    /// stage, applying gray-world white balance when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if a numeric parameter
    /// is outside its documented range. No pixel is touched on error.
    pub fn balance(self) -> Result<Balanced, PipelineError> {
        self.config.validate()?;
        let original = self.frame.clone();
        let mut working = self.frame;
        let scales = if self.config.white_balance {
            Some(crate::white_balance::gray_world(&mut working))
        } else {
            None
        };
        let balanced = scales.is_some().then(|| working.clone());
        Ok(Balanced {
            config: self.config,
            original,
            working,
            balanced,
            scales,
        })
    }
}

// ───────────────────────── Stage 1: Balanced ─────────────────────────

/// Pipeline state after gray-world white balance.
///
/// Call [`equalize`](Self::equalize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .equalize() to continue"]
pub struct Balanced {
    config: PipelineConfig,
    original: PixelBuffer,
    working: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
}

impl Balanced {
    /// The white-balanced frame, or `None` if the stage was disabled.
    #[must_use]
    pub const fn balanced(&self) -> Option<&PixelBuffer> {
        self.balanced.as_ref()
    }

    /// Advance to the global histogram equalization stage.
    pub fn equalize(self) -> Equalized {
        let mut working = self.working;
        let outcome = if self.config.equalize {
            Some(crate::equalize::equalize(&mut working))
        } else {
            None
        };
        let equalized = outcome.is_some().then(|| working.clone());
        Equalized {
            config: self.config,
            original: self.original,
            working,
            balanced: self.balanced,
            scales: self.scales,
            equalized,
            outcome,
        }
    }
}

// ───────────────────────── Stage 2: Equalized ────────────────────────

/// Pipeline state after global histogram equalization.
///
/// Call [`enhance_contrast`](Self::enhance_contrast) to advance to the
/// next stage.
#[must_use = "pipeline stages are consumed by advancing — call .enhance_contrast() to continue"]
pub struct Equalized {
    config: PipelineConfig,
    original: PixelBuffer,
    working: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
    equalized: Option<PixelBuffer>,
    outcome: Option<crate::equalize::EqualizeOutcome>,
}

impl Equalized {
    /// The equalized frame, or `None` if the stage was disabled.
    #[must_use]
    pub const fn equalized(&self) -> Option<&PixelBuffer> {
        self.equalized.as_ref()
    }

    /// Advance to the tiled local contrast stage.
    pub fn enhance_contrast(self) -> Contrasted {
        let mut working = self.working;
        let tile_count = if self.config.local_contrast {
            Some(crate::clahe::apply(
                &mut working,
                self.config.clip_limit,
                self.config.tile_size,
            ))
        } else {
            None
        };
        let local_contrast = tile_count.is_some().then(|| working.clone());
        Contrasted {
            config: self.config,
            original: self.original,
            working,
            balanced: self.balanced,
            scales: self.scales,
            equalized: self.equalized,
            outcome: self.outcome,
            local_contrast,
            tile_count,
        }
    }
}

// ───────────────────────── Stage 3: Contrasted ───────────────────────

/// Pipeline state after tiled, clip-limited local contrast.
///
/// Call [`denoise`](Self::denoise) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .denoise() to continue"]
pub struct Contrasted {
    config: PipelineConfig,
    original: PixelBuffer,
    working: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
    equalized: Option<PixelBuffer>,
    outcome: Option<crate::equalize::EqualizeOutcome>,
    local_contrast: Option<PixelBuffer>,
    tile_count: Option<usize>,
}

impl Contrasted {
    /// The locally contrast-enhanced frame, or `None` if the stage was
    /// disabled.
    #[must_use]
    pub const fn local_contrast(&self) -> Option<&PixelBuffer> {
        self.local_contrast.as_ref()
    }

    /// Advance to the adaptive noise reduction stage.
    pub fn denoise(self) -> Denoised {
        let mut working = self.working;
        let smoothed_samples = if self.config.denoise {
            Some(crate::denoise::adaptive(
                &mut working,
                self.config.sensitivity,
            ))
        } else {
            None
        };
        let denoised = smoothed_samples.is_some().then(|| working.clone());
        Denoised {
            config: self.config,
            original: self.original,
            working,
            balanced: self.balanced,
            scales: self.scales,
            equalized: self.equalized,
            outcome: self.outcome,
            local_contrast: self.local_contrast,
            tile_count: self.tile_count,
            denoised,
            smoothed_samples,
        }
    }
}

// ───────────────────────── Stage 4: Denoised ─────────────────────────

/// Pipeline state after adaptive noise reduction.
///
/// Call [`adjust`](Self::adjust) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .adjust() to continue"]
pub struct Denoised {
    config: PipelineConfig,
    original: PixelBuffer,
    working: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
    equalized: Option<PixelBuffer>,
    outcome: Option<crate::equalize::EqualizeOutcome>,
    local_contrast: Option<PixelBuffer>,
    tile_count: Option<usize>,
    denoised: Option<PixelBuffer>,
    smoothed_samples: Option<u64>,
}

impl Denoised {
    /// The denoised frame, or `None` if the stage was disabled.
    #[must_use]
    pub const fn denoised(&self) -> Option<&PixelBuffer> {
        self.denoised.as_ref()
    }

    /// Advance to the final brightness/contrast adjustment stage.
    pub fn adjust(self) -> Adjusted {
        let mut working = self.working;
        let applied = self.config.adjust;
        if applied {
            crate::adjust::brightness_contrast(
                &mut working,
                self.config.brightness,
                self.config.contrast,
            );
        }
        let adjusted = applied.then(|| working.clone());
        Adjusted {
            config: self.config,
            original: self.original,
            working,
            balanced: self.balanced,
            scales: self.scales,
            equalized: self.equalized,
            outcome: self.outcome,
            local_contrast: self.local_contrast,
            tile_count: self.tile_count,
            denoised: self.denoised,
            smoothed_samples: self.smoothed_samples,
            adjusted,
            applied,
        }
    }
}

// ───────────────────────── Stage 5: Adjusted ─────────────────────────

/// Pipeline state after the final brightness/contrast adjustment.
///
/// Call [`analyze`](Self::analyze) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing — call .analyze() to continue"]
pub struct Adjusted {
    config: PipelineConfig,
    original: PixelBuffer,
    working: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
    equalized: Option<PixelBuffer>,
    outcome: Option<crate::equalize::EqualizeOutcome>,
    local_contrast: Option<PixelBuffer>,
    tile_count: Option<usize>,
    denoised: Option<PixelBuffer>,
    smoothed_samples: Option<u64>,
    adjusted: Option<PixelBuffer>,
    applied: bool,
}

impl Adjusted {
    /// The adjusted frame, or `None` if the stage was disabled.
    #[must_use]
    pub const fn adjusted(&self) -> Option<&PixelBuffer> {
        self.adjusted.as_ref()
    }

    /// Advance to the quality analysis stage — the final pipeline step.
    ///
    /// Analysis always runs, regardless of which enhancement stages
    /// were enabled: it measures whatever frame the chain produced.
    pub fn analyze(self) -> Analyzed {
        let quality = crate::quality::analyze(&self.working);
        let dimensions = self.working.dimensions();
        Analyzed {
            config: self.config,
            original: self.original,
            enhanced: self.working,
            balanced: self.balanced,
            scales: self.scales,
            equalized: self.equalized,
            outcome: self.outcome,
            local_contrast: self.local_contrast,
            tile_count: self.tile_count,
            denoised: self.denoised,
            smoothed_samples: self.smoothed_samples,
            adjusted: self.adjusted,
            applied: self.applied,
            quality,
            dimensions,
        }
    }
}

// ───────────────────────── Stage 6: Analyzed ─────────────────────────

/// Pipeline state after quality analysis — the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Analyzed {
    config: PipelineConfig,
    original: PixelBuffer,
    enhanced: PixelBuffer,
    balanced: Option<PixelBuffer>,
    scales: Option<[f64; 3]>,
    equalized: Option<PixelBuffer>,
    outcome: Option<crate::equalize::EqualizeOutcome>,
    local_contrast: Option<PixelBuffer>,
    tile_count: Option<usize>,
    denoised: Option<PixelBuffer>,
    smoothed_samples: Option<u64>,
    adjusted: Option<PixelBuffer>,
    applied: bool,
    quality: QualityMetrics,
    dimensions: Dimensions,
}

impl Analyzed {
    /// The final enhanced frame.
    #[must_use]
    pub const fn enhanced(&self) -> &PixelBuffer {
        &self.enhanced
    }

    /// Quality metrics computed from the enhanced frame.
    #[must_use]
    pub const fn quality(&self) -> &QualityMetrics {
        &self.quality
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original,
            balanced: self.balanced,
            equalized: self.equalized,
            local_contrast: self.local_contrast,
            denoised: self.denoised,
            adjusted: self.adjusted,
            enhanced: self.enhanced,
            quality: self.quality,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 7;

/// The output produced by a single pipeline stage.
///
/// Each variant borrows the data that the corresponding stage computed.
/// Use this with [`PipelineStage::output`] or [`Stage::output`] to
/// inspect intermediates in a uniform, type-erased way.
#[must_use]
pub enum StageOutput<'a> {
    /// Source frame (not yet processed).
    Source {
        /// The untouched input frame.
        frame: &'a PixelBuffer,
    },
    /// White balance result.
    Balanced {
        /// The balanced frame, or `None` if the stage was disabled.
        balanced: Option<&'a PixelBuffer>,
    },
    /// Global histogram equalization result.
    Equalized {
        /// The equalized frame, or `None` if the stage was disabled.
        equalized: Option<&'a PixelBuffer>,
    },
    /// Tiled local contrast result.
    Contrasted {
        /// The enhanced frame, or `None` if the stage was disabled.
        local_contrast: Option<&'a PixelBuffer>,
    },
    /// Adaptive noise reduction result.
    Denoised {
        /// The denoised frame, or `None` if the stage was disabled.
        denoised: Option<&'a PixelBuffer>,
    },
    /// Brightness/contrast adjustment result.
    Adjusted {
        /// The adjusted frame, or `None` if the stage was disabled.
        adjusted: Option<&'a PixelBuffer>,
    },
    /// Quality analysis result.
    Analyzed {
        /// The final enhanced frame.
        enhanced: &'a PixelBuffer,
        /// Quality metrics for the enhanced frame.
        quality: &'a QualityMetrics,
        /// Frame dimensions.
        dimensions: Dimensions,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Both the typed API (individual stage structs) and the dynamic API
/// ([`Stage`] enum) are available. This trait bridges the two: each
/// stage struct implements it, and [`Stage`] delegates to whichever
/// variant it holds.
///
/// # Loop pattern
///
/// ```rust
/// # use claro_pipeline::{Pipeline, PipelineConfig, PipelineError, PixelBuffer};
/// # use claro_pipeline::pipeline::{Stage, PipelineStage, Advance};
/// # fn run() -> Result<(), PipelineError> {
/// # let frame = PixelBuffer::from_raw(2, 2, vec![128; 16])?;
/// let mut stage: Stage = Pipeline::new(frame, PipelineConfig::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"denoise"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `6` for
    /// Analyzed).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial [`Pending`] stage and for stages
    /// that were disabled by configuration. All executed stages return
    /// `Some(metrics)` describing the work done to reach this state.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage, or `Err` if the stage transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when configuration
    /// validation fails on the first transition.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages to completion and return the final
    /// [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source { frame: &self.frame }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Balanced(self.balance()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.balance()?.complete()
    }
}

impl PipelineStage for Balanced {
    const NAME: &str = "white-balance";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Balanced {
            balanced: self.balanced.as_ref(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.scales.map(|[red, green, blue]| StageMetrics::WhiteBalance {
            red_scale: red,
            green_scale: green,
            blue_scale: blue,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Equalized(self.equalize())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.equalize().complete()
    }
}

impl PipelineStage for Equalized {
    const NAME: &str = "equalize";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Equalized {
            equalized: self.equalized.as_ref(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.outcome.map(|outcome| StageMetrics::Equalization {
            cdf_min: outcome.cdf_min,
            total_pixels: outcome.total_pixels,
            applied: outcome.remapped,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Contrasted(self.enhance_contrast())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.enhance_contrast().complete()
    }
}

impl PipelineStage for Contrasted {
    const NAME: &str = "local-contrast";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Contrasted {
            local_contrast: self.local_contrast.as_ref(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.tile_count.map(|tile_count| StageMetrics::LocalContrast {
            clip_limit: self.config.clip_limit,
            tile_size: self.config.tile_size,
            tile_count,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Denoised(self.denoise())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.denoise().complete()
    }
}

impl PipelineStage for Denoised {
    const NAME: &str = "denoise";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Denoised {
            denoised: self.denoised.as_ref(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.smoothed_samples
            .map(|smoothed_samples| StageMetrics::Denoise {
                sensitivity: self.config.sensitivity,
                threshold: crate::denoise::THRESHOLD_SCALE * f64::from(self.config.sensitivity),
                smoothed_samples,
            })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Adjusted(self.adjust())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.adjust().complete()
    }
}

impl PipelineStage for Adjusted {
    const NAME: &str = "adjust";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Adjusted {
            adjusted: self.adjusted.as_ref(),
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        self.applied.then(|| StageMetrics::Adjust {
            brightness: self.config.brightness,
            contrast: self.config.contrast,
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Analyzed(self.analyze())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.analyze().into_result())
    }
}

impl PipelineStage for Analyzed {
    const NAME: &str = "analyze";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Analyzed {
            enhanced: &self.enhanced,
            quality: &self.quality,
            dimensions: self.dimensions,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Analysis {
            brightness: self.quality.brightness,
            contrast: self.quality.contrast,
            sharpness: self.quality.sharpness,
            noise: self.quality.noise,
            low_light: self.quality.is_low_light,
            acceptable: self.quality.is_acceptable,
            recommendation_count: self.quality.recommendations.len(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Use [`From`] conversions to enter the dynamic API from any typed
/// stage, then call [`advance`](Self::advance) in a loop.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Balanced`].
    Balanced(Balanced),
    /// See [`Equalized`].
    Equalized(Equalized),
    /// See [`Contrasted`].
    Contrasted(Contrasted),
    /// See [`Denoised`].
    Denoised(Denoised),
    /// See [`Adjusted`].
    Adjusted(Adjusted),
    /// See [`Analyzed`].
    Analyzed(Analyzed),
}

/// Compile-time guard: if a [`Stage`] variant is added, this match becomes
/// non-exhaustive and the build fails — reminding you to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Balanced(_)
        | Stage::Equalized(_)
        | Stage::Contrasted(_)
        | Stage::Denoised(_)
        | Stage::Adjusted(_)
        | Stage::Analyzed(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage — returned unchanged.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Balanced(s) => s.$method($($arg),*),
            Self::Equalized(s) => s.$method($($arg),*),
            Self::Contrasted(s) => s.$method($($arg),*),
            Self::Denoised(s) => s.$method($($arg),*),
            Self::Adjusted(s) => s.$method($($arg),*),
            Self::Analyzed(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial `Pending` stage and for stages
    /// that were disabled by configuration.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Analyzed(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success, `Ok(None)` if
    /// already complete (the `Analyzed` value is consumed), or `Err`
    /// if the transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// This is the loop-friendly version of [`next`](Self::next).
    /// Unlike `next()`, which consumes the final stage and returns
    /// `Ok(None)`, `advance()` returns [`Advance::Complete`] with
    /// the final stage so you can still call
    /// [`complete`](Self::complete) on it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete stages always return Ok(Some(_)) from next().
        // The is_complete() guard above ensures we never reach None here.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// Provide a private helper trait so the macro can call `.name()` and
// `.index()` on `&self` — the `PipelineStage` trait's associated
// constants aren't callable via `self.NAME`.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Balanced> for Stage {
    fn from(s: Balanced) -> Self {
        Self::Balanced(s)
    }
}

impl From<Equalized> for Stage {
    fn from(s: Equalized) -> Self {
        Self::Equalized(s)
    }
}

impl From<Contrasted> for Stage {
    fn from(s: Contrasted) -> Self {
        Self::Contrasted(s)
    }
}

impl From<Denoised> for Stage {
    fn from(s: Denoised) -> Self {
        Self::Denoised(s)
    }
}

impl From<Adjusted> for Stage {
    fn from(s: Adjusted) -> Self {
        Self::Adjusted(s)
    }
}

impl From<Analyzed> for Stage {
    fn from(s: Analyzed) -> Self {
        Self::Analyzed(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental frame enhancement pipeline.
///
/// Created via [`Pipeline::new`], which stores the source frame and
/// config without doing any processing. The caller then chains stage
/// methods to advance through the pipeline:
///
/// ```rust
/// # use claro_pipeline::{Pipeline, PipelineConfig, PipelineError, PixelBuffer};
/// # fn run() -> Result<(), PipelineError> {
/// # let frame = PixelBuffer::from_raw(2, 2, vec![128; 16])?;
/// let result = Pipeline::new(frame, PipelineConfig::default())
///     .balance()?
///     .equalize()
///     .enhance_contrast()
///     .denoise()
///     .adjust()
///     .analyze()
///     .into_result();
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from a source frame and config.
    ///
    /// No processing is performed — the frame and config are simply
    /// stored. Call [`.balance()`](Pending::balance) (or convert to a
    /// [`Stage`] and loop) to begin processing.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(frame: PixelBuffer, config: PipelineConfig) -> Pending {
        Pending { config, frame }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Two-axis gradient frame with enough tonal variety to exercise
    /// every stage.
    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                #[allow(clippy::cast_possible_truncation)]
                let v = ((x * 255) / (width - 1).max(1)) as u8;
                #[allow(clippy::cast_possible_truncation)]
                let w = ((y * 255) / (height - 1).max(1)) as u8;
                data.extend_from_slice(&[v, w, v / 2, 255]);
            }
        }
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    // ─────────── Typed API tests ─────────────────────────────────

    #[test]
    fn pending_exposes_frame() {
        let frame = gradient(8, 8);
        let pending = Pipeline::new(frame.clone(), PipelineConfig::default());
        assert_eq!(pending.frame(), &frame);
    }

    #[test]
    fn balance_rejects_invalid_config() {
        let config = PipelineConfig {
            tile_size: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(gradient(8, 8), config).balance();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn balanced_exposes_balanced_frame() {
        let balanced = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap();
        let frame = balanced.balanced().unwrap();
        assert_eq!(frame.width(), 8);
        assert_eq!(frame.height(), 8);
    }

    #[test]
    fn disabled_stage_records_no_intermediate() {
        let config = PipelineConfig {
            white_balance: false,
            ..PipelineConfig::default()
        };
        let balanced = Pipeline::new(gradient(8, 8), config).balance().unwrap();
        assert!(balanced.balanced().is_none());
        assert!(balanced.metrics().is_none());
    }

    #[test]
    fn equalized_exposes_equalized_frame() {
        let equalized = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize();
        assert!(equalized.equalized().is_some());
        assert!(matches!(
            equalized.metrics(),
            Some(StageMetrics::Equalization { .. }),
        ));
    }

    #[test]
    fn contrasted_reports_tile_count() {
        let config = PipelineConfig {
            tile_size: 4,
            ..PipelineConfig::default()
        };
        let contrasted = Pipeline::new(gradient(8, 8), config)
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast();
        assert!(contrasted.local_contrast().is_some());
        assert!(matches!(
            contrasted.metrics(),
            Some(StageMetrics::LocalContrast { tile_count: 4, .. }),
        ));
    }

    #[test]
    fn denoised_exposes_denoised_frame() {
        let denoised = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise();
        assert!(denoised.denoised().is_some());
        assert!(matches!(
            denoised.metrics(),
            Some(StageMetrics::Denoise { .. }),
        ));
    }

    #[test]
    fn adjusted_exposes_adjusted_frame() {
        let adjusted = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust();
        assert!(adjusted.adjusted().is_some());
        assert!(matches!(
            adjusted.metrics(),
            Some(StageMetrics::Adjust { .. }),
        ));
    }

    #[test]
    fn analyzed_exposes_quality_and_dimensions() {
        let analyzed = Pipeline::new(gradient(10, 6), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze();
        assert_eq!(
            analyzed.dimensions(),
            Dimensions {
                width: 10,
                height: 6,
            },
        );
        assert!((0.0..=100.0).contains(&analyzed.quality().brightness));
        assert!(matches!(
            analyzed.metrics(),
            Some(StageMetrics::Analysis { .. }),
        ));
    }

    #[test]
    fn all_stages_disabled_passes_frame_through() {
        let frame = gradient(8, 8);
        let config = PipelineConfig {
            white_balance: false,
            equalize: false,
            local_contrast: false,
            denoise: false,
            adjust: false,
            ..PipelineConfig::default()
        };
        let staged = Pipeline::new(frame.clone(), config)
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze()
            .into_result();

        assert_eq!(staged.enhanced, frame);
        assert!(staged.balanced.is_none());
        assert!(staged.equalized.is_none());
        assert!(staged.local_contrast.is_none());
        assert!(staged.denoised.is_none());
        assert!(staged.adjusted.is_none());
    }

    #[test]
    fn intermediates_track_the_working_frame() {
        let staged = Pipeline::new(gradient(12, 12), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze()
            .into_result();

        // The last enabled stage's snapshot is the enhanced frame.
        assert_eq!(staged.adjusted.as_ref().unwrap(), &staged.enhanced);
        // Every intermediate keeps the source shape.
        for frame in [
            staged.balanced.as_ref().unwrap(),
            staged.equalized.as_ref().unwrap(),
            staged.local_contrast.as_ref().unwrap(),
            staged.denoised.as_ref().unwrap(),
        ] {
            assert_eq!(frame.dimensions(), staged.dimensions);
        }
    }

    #[test]
    fn full_pipeline_matches_enhance_staged() {
        let frame = gradient(16, 16);
        let config = PipelineConfig::default();

        let staged = crate::enhance_staged(frame.clone(), &config).unwrap();
        let chained = Pipeline::new(frame, config)
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze()
            .into_result();

        assert_eq!(staged, chained);
    }

    // ─────────── Helper: drive a Stage to completion ────────────

    /// Advance a [`Stage`] to completion, returning the final stage
    /// and a log of `(index, name)` pairs visited along the way.
    #[allow(clippy::type_complexity)]
    fn drive_to_end(start: Stage) -> Result<(Stage, Vec<(usize, &'static str)>), PipelineError> {
        let mut log = vec![(start.index(), start.name())];
        let mut stage = start;
        loop {
            match stage.advance()? {
                Advance::Next(next) => {
                    log.push((next.index(), next.name()));
                    stage = next;
                }
                Advance::Complete(done) => return Ok((done, log)),
            }
        }
    }

    // ─────────── PipelineStage trait + Stage enum tests ───────────

    #[test]
    fn stage_names_and_indices() {
        let start: Stage = Pipeline::new(gradient(8, 8), PipelineConfig::default()).into();

        let (_, log) = drive_to_end(start).unwrap();
        let expected = [
            (0, "source"),
            (1, "white-balance"),
            (2, "equalize"),
            (3, "local-contrast"),
            (4, "denoise"),
            (5, "adjust"),
            (6, "analyze"),
        ];
        assert_eq!(log.as_slice(), &expected);
    }

    #[test]
    fn loop_to_completion_matches_chained_api() {
        let frame = gradient(16, 16);
        let config = PipelineConfig::default();

        let chained = Pipeline::new(frame.clone(), config.clone())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze()
            .into_result();

        let start: Stage = Pipeline::new(frame, config).into();
        let (final_stage, _) = drive_to_end(start).unwrap();
        let looped = final_stage.complete().unwrap();

        assert_eq!(chained, looped);
    }

    #[test]
    fn complete_from_pending() {
        let pending = Pipeline::new(gradient(8, 8), PipelineConfig::default());
        let result = pending.complete().unwrap();
        assert_eq!(result.enhanced.dimensions(), result.dimensions);
    }

    #[test]
    fn complete_from_mid_stage() {
        let equalized = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize();
        let result = equalized.complete().unwrap();
        assert!(result.adjusted.is_some());
    }

    #[test]
    fn next_on_analyzed_returns_none() {
        let analyzed = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize()
            .enhance_contrast()
            .denoise()
            .adjust()
            .analyze();
        assert!(analyzed.next().unwrap().is_none());
    }

    #[test]
    fn stage_is_complete() {
        let start: Stage = Pipeline::new(gradient(8, 8), PipelineConfig::default()).into();
        assert!(!start.is_complete());

        let (final_stage, _) = drive_to_end(start).unwrap();
        assert!(final_stage.is_complete());
    }

    #[test]
    fn output_variant_matches_stage() {
        let start: Stage = Pipeline::new(gradient(8, 8), PipelineConfig::default()).into();

        let mut stage = start;
        let mut visited = 0;
        loop {
            let idx = stage.index();
            let variant_idx = match stage.output() {
                StageOutput::Source { .. } => 0,
                StageOutput::Balanced { .. } => 1,
                StageOutput::Equalized { .. } => 2,
                StageOutput::Contrasted { .. } => 3,
                StageOutput::Denoised { .. } => 4,
                StageOutput::Adjusted { .. } => 5,
                StageOutput::Analyzed { .. } => 6,
            };
            assert_eq!(idx, variant_idx, "output variant mismatch at index {idx}");
            visited += 1;
            match stage.advance().unwrap() {
                Advance::Next(next) => stage = next,
                Advance::Complete(_) => break,
            }
        }
        assert_eq!(visited, STAGE_COUNT);
    }

    #[test]
    fn from_conversions_preserve_index() {
        let pending = Pipeline::new(gradient(8, 8), PipelineConfig::default());
        let stage: Stage = pending.into();
        assert_eq!(stage.index(), 0);

        let balanced = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap();
        let stage: Stage = balanced.into();
        assert_eq!(stage.index(), 1);

        let equalized = Pipeline::new(gradient(8, 8), PipelineConfig::default())
            .balance()
            .unwrap()
            .equalize();
        let stage: Stage = equalized.into();
        assert_eq!(stage.index(), 2);
    }

    #[test]
    fn stage_complete_from_enum() {
        let stage: Stage = Pipeline::new(gradient(8, 8), PipelineConfig::default()).into();
        let result = stage.complete().unwrap();
        assert_eq!(result.dimensions.pixel_count(), 64);
    }

    #[test]
    fn invalid_config_surfaces_via_advance() {
        let config = PipelineConfig {
            sensitivity: 2.0,
            ..PipelineConfig::default()
        };
        let stage: Stage = Pipeline::new(gradient(8, 8), config).into();
        let result = stage.advance();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn metrics_follow_stage_toggles() {
        let config = PipelineConfig {
            equalize: false,
            denoise: false,
            ..PipelineConfig::default()
        };
        let mut stage: Stage = Pipeline::new(gradient(8, 8), config).into();
        let mut with_metrics = Vec::new();
        loop {
            if stage.metrics().is_some() {
                with_metrics.push(stage.name());
            }
            match stage.advance().unwrap() {
                Advance::Next(next) => stage = next,
                Advance::Complete(_) => break,
            }
        }
        assert_eq!(
            with_metrics,
            vec!["white-balance", "local-contrast", "adjust", "analyze"],
        );
    }
}
