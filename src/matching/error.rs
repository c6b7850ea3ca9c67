use crate::platform::PlatformError;
use thiserror::Error;

/// A specialized `Result` type for a single strategy run.
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Why a strategy produced no candidate. Never leaves the strategy: the
/// `Strategy::find` boundary logs it and returns `None`.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Template '{path}' could not be loaded: {source}")]
    TemplateUnavailable {
        path: String,
        source: image::ImageError,
    },

    #[error("Screen capture failed: {source}")]
    Capture {
        #[from]
        source: PlatformError,
    },

    #[error("Screen search failed: {source}")]
    Locate { source: PlatformError },

    #[error("Template {template_w}x{template_h} is larger than the screen {screen_w}x{screen_h}")]
    TemplateTooLarge {
        template_w: u32,
        template_h: u32,
        screen_w: u32,
        screen_h: u32,
    },

    #[error("Insufficient features (template: {template}, screen: {screen}, need {required})")]
    InsufficientFeatures {
        template: usize,
        screen: usize,
        required: usize,
    },

    #[error("Not enough good matches: {found} < {required}")]
    NotEnoughMatches { found: usize, required: f64 },

    #[error("Homography estimation failed")]
    HomographyFailed,

    #[error("Insufficient inliers: {inliers} < {required}")]
    InsufficientInliers { inliers: usize, required: f64 },

    #[error("Degenerate homography (determinant {determinant:e})")]
    DegenerateHomography { determinant: f64 },

    #[error("Projected template outline is not convex")]
    NonConvex,

    #[error("Implausible area ratio {ratio:.3}")]
    ImplausibleArea { ratio: f64 },

    #[error("Center ({x}, {y}) lies outside the {width}x{height} screen")]
    OutOfBounds { x: i32, y: i32, width: u32, height: u32 },

    #[error("Best score {score:.3} below threshold {threshold:.3}")]
    BelowThreshold { score: f64, threshold: f64 },

    #[error("Template not found on screen")]
    NotFound,
}

impl StrategyError {
    /// Failures of the environment rather than an ordinary "no match".
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StrategyError::TemplateUnavailable { .. }
                | StrategyError::Capture { .. }
                | StrategyError::Locate { .. }
        )
    }
}
