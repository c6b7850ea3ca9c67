// Strategy contract shared by every matching method

use super::error::{StrategyError, StrategyResult};
use super::types::{MatchCandidate, ScreenCapture, StrategyKind};
use crate::platform::ScreenSource;
use crate::state::SharedState;
use image::GrayImage;
use std::sync::Arc;

/// Everything a strategy may read during one dispatch call.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub state: &'a SharedState,
    pub screen: &'a dyn ScreenSource,
    /// Capture taken by the dispatcher, absent when run standalone.
    pub capture: Option<&'a ScreenCapture>,
}

impl<'a> MatchContext<'a> {
    pub fn new(
        state: &'a SharedState,
        screen: &'a dyn ScreenSource,
        capture: Option<&'a ScreenCapture>,
    ) -> Self {
        Self {
            state,
            screen,
            capture,
        }
    }

    /// The shared capture, or a fresh one when there is none.
    pub fn capture(&self) -> StrategyResult<ScreenCapture> {
        match self.capture {
            Some(capture) => Ok(Arc::clone(capture)),
            None => Ok(Arc::new(self.screen.capture_gray()?)),
        }
    }

    pub fn template(&self, template_id: &str) -> StrategyResult<Arc<GrayImage>> {
        self.state
            .templates
            .get_or_load(template_id)
            .map_err(|source| StrategyError::TemplateUnavailable {
                path: template_id.to_string(),
                source,
            })
    }
}

/// One way of finding a template on screen.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Threshold used when the caller does not pass one.
    fn default_threshold(&self) -> f64;

    fn needs_capture(&self) -> bool {
        self.kind().needs_capture()
    }

    /// Run the strategy, reporting why nothing was accepted.
    fn locate(
        &self,
        ctx: &MatchContext<'_>,
        template_id: &str,
        threshold: f64,
    ) -> StrategyResult<MatchCandidate>;

    /// Run the strategy. Failures are logged here and never propagate.
    fn find(
        &self,
        ctx: &MatchContext<'_>,
        template_id: &str,
        threshold: Option<f64>,
    ) -> Option<MatchCandidate> {
        let threshold = threshold.unwrap_or_else(|| self.default_threshold());
        match self.locate(ctx, template_id, threshold) {
            Ok(candidate) => {
                log::debug!(
                    "{} found {} at ({}, {}) score {}",
                    self.kind(),
                    template_id,
                    candidate.center.0,
                    candidate.center.1,
                    candidate.score
                );
                Some(candidate)
            }
            Err(e) if e.is_failure() => {
                log::error!("❌ {} error for {}: {}", self.kind().display_name(), template_id, e);
                None
            }
            Err(e) => {
                log::debug!("{} rejected {}: {}", self.kind(), template_id, e);
                None
            }
        }
    }
}
