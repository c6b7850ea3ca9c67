//! Multi-strategy template matching
//!
//! Five strategies locate a template on screen independently; the
//! dispatcher runs the selected ones concurrently and fuses their results.

pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod features;
pub mod locate;
pub mod strategy;
pub mod template;
pub mod types;

#[cfg(test)]
mod tests;

pub use correlation::{CorrelationHit, TemplateCorrelation, best_correlation};
pub use dispatcher::{Dispatcher, fuse};
pub use error::{StrategyError, StrategyResult};
pub use features::{AkazeFeatures, FeatureStrategy, OrbFeatures, SiftFeatures};
pub use locate::DirectLocate;
pub use strategy::{MatchContext, Strategy};
pub use template::TemplateCache;
pub use types::{MatchCandidate, ScreenCapture, SelectionMask, StrategyKind};
