use serde::{Deserialize, Serialize};

/// One recorded input action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MacroAction {
    KeyPress { key: String },
    KeyRelease { key: String },
    MouseMove { x: i32, y: i32 },
    MouseClick { x: i32, y: i32, button: String, pressed: bool },
    MouseScroll { x: i32, y: i32, dx: i32, dy: i32 },
}

/// A recorded action with its offset from the start of recording.
///
/// Serialized flat: `{"type": "key_press", "key": "a", "time": 0.25}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroEvent {
    #[serde(flatten)]
    pub action: MacroAction,
    /// Seconds since recording started
    pub time: f64,
}

impl MacroEvent {
    pub fn new(time: f64, action: MacroAction) -> Self {
        Self { action, time }
    }
}

/// Recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
}
