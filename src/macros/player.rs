//! Real-time macro replay

use super::types::{MacroAction, MacroEvent};
use crate::platform::{InputInjector, PlatformResult};
use crate::state::CancellationFlag;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// Sleep between checks while waiting for the next event
    pub poll_interval: Duration,
    /// Pause between two passes over the recording
    pub loop_pause: Duration,
    /// Stop after this many passes; loop until cancelled when `None`
    pub max_loops: Option<usize>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            loop_pause: Duration::from_millis(500),
            max_loops: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    pub loops_completed: usize,
    pub events_dispatched: usize,
    pub cancelled: bool,
}

/// Replay `recording` through `injector`, each event at its recorded offset
/// from the start of the pass, until `cancel` is set or `max_loops` passes
/// are done.
///
/// Injector errors are logged and playback continues.
pub fn play_macro(
    recording: &[MacroEvent],
    injector: &dyn InputInjector,
    cancel: &CancellationFlag,
    config: &PlayerConfig,
) -> PlaybackReport {
    let mut report = PlaybackReport::default();
    if recording.is_empty() {
        log::info!("No macro recorded, nothing to play");
        return report;
    }

    log::info!("▶️ Macro playback started ({} events)", recording.len());
    'passes: loop {
        if config.max_loops.is_some_and(|max| report.loops_completed >= max) {
            break;
        }
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let t0 = Instant::now();
        for event in recording {
            let offset = Duration::try_from_secs_f64(event.time.max(0.0)).unwrap_or(Duration::ZERO);
            let reached = match t0.checked_add(offset) {
                Some(deadline) => cancel.sleep_until(deadline, config.poll_interval),
                None => {
                    cancel.wait(config.poll_interval);
                    false
                }
            };
            if !reached {
                report.cancelled = true;
                break 'passes;
            }
            if let Err(e) = dispatch(injector, &event.action) {
                log::warn!("⚠️ Macro action {:?} failed: {}", event.action, e);
            }
            report.events_dispatched += 1;
        }
        report.loops_completed += 1;

        let more = config.max_loops.is_none_or(|max| report.loops_completed < max);
        if more && !cancel.sleep(config.loop_pause, config.poll_interval) {
            report.cancelled = true;
            break;
        }
    }

    log::info!(
        "⏹️ Macro playback ended after {} loops, {} events",
        report.loops_completed,
        report.events_dispatched
    );
    report
}

fn dispatch(injector: &dyn InputInjector, action: &MacroAction) -> PlatformResult<()> {
    match action {
        MacroAction::KeyPress { key } => injector.key_down(key),
        MacroAction::KeyRelease { key } => injector.key_up(key),
        MacroAction::MouseMove { x, y } => injector.move_cursor(*x, *y),
        MacroAction::MouseClick {
            x,
            y,
            button,
            pressed,
        } => injector.press_button(*x, *y, button, *pressed),
        MacroAction::MouseScroll { x, y, dx, dy } => injector.scroll_at(*x, *y, *dx, *dy),
    }
}
