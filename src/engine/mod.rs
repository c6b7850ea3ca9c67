// Matching engine: dispatch, log, debounce, act

pub mod gate;

pub use gate::{DEBOUNCE_DISTANCE_PX, DEBOUNCE_WINDOW, DebounceState};

use crate::matching::{Dispatcher, MatchCandidate, SelectionMask};
use crate::platform::InputInjector;
use crate::state::SharedState;
use std::sync::{Arc, PoisonError};
use std::time::Instant;

/// Couples the dispatcher with the click gate and the input injector.
pub struct Engine {
    dispatcher: Dispatcher,
    injector: Arc<dyn InputInjector>,
}

impl Engine {
    pub fn new(dispatcher: Dispatcher, injector: Arc<dyn InputInjector>) -> Self {
        Self {
            dispatcher,
            injector,
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        self.dispatcher.state()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Find `template_id` with the strategies in `mask` and click the fused
    /// result unless it repeats the previous click. Returns the fused
    /// decision whether or not a click happened.
    pub fn dispatch_match(&self, mask: &SelectionMask, template_id: &str) -> Option<MatchCandidate> {
        self.dispatch_match_at(mask, template_id, Instant::now)
    }

    /// As `dispatch_match`, with the gate's clock supplied by the caller.
    pub fn dispatch_match_at(
        &self,
        mask: &SelectionMask,
        template_id: &str,
        now: impl FnOnce() -> Instant,
    ) -> Option<MatchCandidate> {
        let Some(candidate) = self.dispatcher.find_best_match(mask, template_id) else {
            log::info!("No valid match for {template_id}");
            return None;
        };

        let state = self.state();
        let line = format!("Best match for {template_id}: {candidate}");
        log::info!("🎯 {line}");
        state.match_log.push(line);

        let (x, y) = candidate.center;
        let permitted = state
            .debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .permit(candidate.center, now());
        if !permitted {
            return Some(candidate);
        }

        let acted = self
            .injector
            .move_cursor(x, y)
            .and_then(|()| self.injector.click_at(x, y));
        match acted {
            Ok(()) => {}
            Err(e) if e.is_fail_safe() => log::warn!("⚠️ {e}, click skipped"),
            Err(e) => log::error!("❌ Click at ({x}, {y}) failed: {e}"),
        }
        Some(candidate)
    }
}
