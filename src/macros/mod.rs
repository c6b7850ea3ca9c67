//! Macro record and replay
//!
//! Recordings are ordered event lists with offsets in seconds from the start
//! of recording. They are stored per profile in the config file.

pub mod player;
pub mod recorder;
pub mod types;

#[cfg(test)]
mod tests;

pub use player::{PlaybackReport, PlayerConfig, play_macro};
pub use recorder::MacroRecorder;
pub use types::{MacroAction, MacroEvent, RecorderState};
