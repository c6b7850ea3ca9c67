use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// The error type for screen capture and input primitives.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Fail-safe triggered: pointer moved to corner at x={x}, y={y}")]
    FailSafe { x: i32, y: i32 },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("Failed to load screenshot {path:?}: {source}")]
    ScreenshotLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Input injection '{action}' failed: {description}")]
    InjectionFailed { action: String, description: String },

    #[error("Unknown key '{key}'")]
    InvalidKey { key: String },

    #[error("Failed to start input listener: {source}")]
    ListenerFailed {
        #[from]
        source: std::io::Error,
    },
}

impl PlatformError {
    pub fn is_fail_safe(&self) -> bool {
        matches!(self, PlatformError::FailSafe { .. })
    }
}
