//! Concurrent strategy dispatch and result fusion

use super::correlation::TemplateCorrelation;
use super::features::{AkazeFeatures, OrbFeatures, SiftFeatures};
use super::locate::DirectLocate;
use super::strategy::{MatchContext, Strategy};
use super::types::{MatchCandidate, ScreenCapture, SelectionMask};
use crate::platform::ScreenSource;
use crate::state::SharedState;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Runs the selected strategies in parallel against one capture and fuses
/// their candidates into a single decision.
pub struct Dispatcher {
    strategies: Vec<Box<dyn Strategy>>,
    screen: Arc<dyn ScreenSource>,
    state: Arc<SharedState>,
}

impl Dispatcher {
    /// Dispatcher with the five built-in strategies in registration order.
    pub fn new(screen: Arc<dyn ScreenSource>, state: Arc<SharedState>) -> Self {
        Self::with_strategies(
            vec![
                Box::new(DirectLocate),
                Box::new(TemplateCorrelation),
                Box::new(OrbFeatures::orb()),
                Box::new(SiftFeatures::sift()),
                Box::new(AkazeFeatures::akaze()),
            ],
            screen,
            state,
        )
    }

    /// Dispatcher over a custom strategy list. The selection mask indexes
    /// this list.
    pub fn with_strategies(
        strategies: Vec<Box<dyn Strategy>>,
        screen: Arc<dyn ScreenSource>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            strategies,
            screen,
            state,
        }
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.kind().name()).collect()
    }

    /// Run every strategy enabled in `mask` for `template_id` and return the
    /// fused best candidate.
    pub fn find_best_match(&self, mask: &SelectionMask, template_id: &str) -> Option<MatchCandidate> {
        let selected: Vec<(usize, &dyn Strategy)> = self
            .strategies
            .iter()
            .enumerate()
            .filter(|(index, _)| mask.is_enabled(*index))
            .map(|(index, strategy)| (index, strategy.as_ref()))
            .collect();
        if selected.is_empty() {
            log::debug!("No matching strategies selected for {template_id}");
            return None;
        }

        let capture: Option<ScreenCapture> = if selected.iter().any(|(_, s)| s.needs_capture()) {
            match self.screen.capture_gray() {
                Ok(image) => Some(Arc::new(image)),
                Err(e) => {
                    log::error!("❌ Screen capture failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        // Without a capture, only strategies that search on their own can run.
        let runnable: Vec<(usize, &dyn Strategy)> = selected
            .into_iter()
            .filter(|(_, s)| capture.is_some() || !s.needs_capture())
            .collect();

        let thresholds = self.state.thresholds();
        let ctx = MatchContext::new(&self.state, self.screen.as_ref(), capture.as_ref());
        let results: Mutex<Vec<(usize, MatchCandidate)>> = Mutex::new(Vec::with_capacity(runnable.len()));

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(runnable.len());
            for (index, strategy) in &runnable {
                let (index, strategy) = (*index, *strategy);
                let threshold = thresholds.for_strategy(strategy.kind());
                let results = &results;
                let spawned = thread::Builder::new()
                    .name(format!("match-{}", strategy.kind().name()))
                    .spawn_scoped(scope, move || {
                        if let Some(candidate) = strategy.find(&ctx, template_id, Some(threshold)) {
                            results
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push((index, candidate));
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push((strategy.kind(), handle)),
                    Err(e) => log::error!("❌ Failed to start {} thread: {}", strategy.kind(), e),
                }
            }

            for (kind, handle) in handles {
                if handle.join().is_err() {
                    log::error!("❌ {} panicked while matching {}", kind.display_name(), template_id);
                }
            }
        });

        drop(capture);
        let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        fuse(results)
    }
}

/// Pick the highest score; an exact tie goes to the earliest registration
/// index. Scores of different strategies are compared as plain numbers.
pub fn fuse(mut results: Vec<(usize, MatchCandidate)>) -> Option<MatchCandidate> {
    results.sort_by_key(|(index, _)| *index);
    let mut best: Option<MatchCandidate> = None;
    for (_, candidate) in results {
        let better = best
            .as_ref()
            .is_none_or(|current| candidate.score > current.score);
        if better {
            best = Some(candidate);
        }
    }
    best
}
