use crate::platform::PlatformError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for configuration and run preparation.
pub type SetupResult<T> = Result<T, SetupError>;

/// Conditions under which the engine cannot start. These are returned as
/// values to the caller, leaving the core idle.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write config {path:?}: {source}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {source}")]
    ConfigSerialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid configuration format in {path:?}: no 'profiles' section")]
    InvalidImport { path: PathBuf },

    #[error("Profile {name:?} not set or not found")]
    ProfileNotFound { name: Option<String> },

    #[error("No valid image files found in profile '{profile}'")]
    NoValidTemplates { profile: String },

    #[error("No matching strategies selected")]
    NoStrategiesSelected,

    #[error("No screen source available, pass --screen=PATH")]
    NoScreenSource,

    #[error("Screen source unusable: {source}")]
    Screen { source: PlatformError },

    #[error("Failed to open log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to start async runtime: {source}")]
    Runtime { source: std::io::Error },
}
