use super::error::{StrategyError, StrategyResult};
use super::strategy::{MatchContext, Strategy};
use super::types::{MatchCandidate, StrategyKind};

/// Delegates the whole search to the screen source. Never reads the shared
/// capture; a hit always scores 1.0.
#[derive(Debug, Default)]
pub struct DirectLocate;

impl DirectLocate {
    pub const DEFAULT_CONFIDENCE: f64 = 0.8;
}

impl Strategy for DirectLocate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectLocate
    }

    fn default_threshold(&self) -> f64 {
        Self::DEFAULT_CONFIDENCE
    }

    fn locate(
        &self,
        ctx: &MatchContext<'_>,
        template_id: &str,
        threshold: f64,
    ) -> StrategyResult<MatchCandidate> {
        let template = ctx.template(template_id)?;
        let center = ctx
            .screen
            .locate_on_screen(&template, threshold)
            .map_err(|source| StrategyError::Locate { source })?
            .ok_or(StrategyError::NotFound)?;
        Ok(MatchCandidate::new(center, 1.0, self.kind().name()))
    }
}
