// Run loop: resolve the active profile, then scan its templates until
// cancelled while the profile's macro replays alongside.

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{SetupError, SetupResult};
use crate::macros::{MacroEvent, PlaybackReport, PlayerConfig, play_macro};
use crate::matching::SelectionMask;
use crate::platform::{InputInjector, ScreenSource};
use crate::state::CancellationFlag;
use std::sync::Arc;
use std::time::Duration;

/// How often cancellation is checked while sleeping between scans.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// What to scan for, resolved from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPlan {
    pub profile: String,
    /// Template identifiers (paths) in configured order
    pub templates: Vec<String>,
    pub mask: SelectionMask,
    pub scan_interval: Duration,
}

/// Resolve the active profile into a plan. Picks the first profile as
/// default when none is set; missing template files are skipped.
pub fn prepare(config: &mut Config) -> SetupResult<MatchPlan> {
    config.ensure_default_profile();
    let (name, profile) = config.active_profile()?;

    let mut templates = Vec::new();
    for path in profile.template_paths() {
        if path.is_file() {
            templates.push(path.to_string_lossy().to_string());
        } else {
            log::warn!("⚠️ Template not found, skipped: {}", path.display());
        }
    }
    if templates.is_empty() {
        return Err(SetupError::NoValidTemplates {
            profile: name.to_string(),
        });
    }

    let mask = config.selection_mask();
    if !mask.any() {
        return Err(SetupError::NoStrategiesSelected);
    }

    Ok(MatchPlan {
        profile: name.to_string(),
        templates,
        mask,
        scan_interval: config.scan_interval(),
    })
}

/// Check that `screen` can be read before the loop starts. Returns its size.
pub fn check_screen(screen: &dyn ScreenSource) -> SetupResult<(u32, u32)> {
    let (width, height) = screen
        .screen_size()
        .map_err(|source| SetupError::Screen { source })?;
    log::info!("📱 Screen source is {width}x{height}");
    Ok((width, height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchingSummary {
    /// Completed passes over the template list
    pub passes: usize,
    pub dispatches: usize,
    /// Dispatches that produced a candidate
    pub matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub matching: MatchingSummary,
    /// Present when a macro was replayed
    pub playback: Option<PlaybackReport>,
}

#[derive(Clone)]
pub struct Runner {
    engine: Arc<Engine>,
    injector: Arc<dyn InputInjector>,
    player: PlayerConfig,
}

impl Runner {
    pub fn new(engine: Arc<Engine>, injector: Arc<dyn InputInjector>, player: PlayerConfig) -> Self {
        Self {
            engine,
            injector,
            player,
        }
    }

    pub fn cancel_flag(&self) -> CancellationFlag {
        self.engine.state().cancel.clone()
    }

    /// Scan every template of `plan` in order, sleeping the scan interval
    /// after each, until cancelled. With `once`, stop after one pass.
    pub fn run_matching(&self, plan: &MatchPlan, once: bool) -> MatchingSummary {
        let cancel = self.cancel_flag();
        let mut summary = MatchingSummary::default();
        log::info!(
            "🔍 Scanning {} templates of profile '{}' every {:?}",
            plan.templates.len(),
            plan.profile,
            plan.scan_interval
        );

        'scan: while !cancel.is_cancelled() {
            for template in &plan.templates {
                if cancel.is_cancelled() {
                    break 'scan;
                }
                summary.dispatches += 1;
                if self.engine.dispatch_match(&plan.mask, template).is_some() {
                    summary.matches += 1;
                }
                if !cancel.sleep(plan.scan_interval, CANCEL_POLL) {
                    break 'scan;
                }
            }
            summary.passes += 1;
            if once {
                break;
            }
            if !cancel.sleep(plan.scan_interval, CANCEL_POLL) {
                break;
            }
        }

        log::info!(
            "Matching stopped after {} passes ({} matches in {} dispatches)",
            summary.passes,
            summary.matches,
            summary.dispatches
        );
        summary
    }

    /// Run matching and macro playback side by side on blocking threads.
    /// When matching ends, playback is cancelled and awaited.
    pub async fn run(&self, plan: MatchPlan, recording: Vec<MacroEvent>, once: bool) -> RunSummary {
        let cancel = self.cancel_flag();

        let player = if recording.is_empty() {
            None
        } else {
            let injector = Arc::clone(&self.injector);
            let cancel = cancel.clone();
            let config = self.player;
            Some(tokio::task::spawn_blocking(move || {
                play_macro(&recording, injector.as_ref(), &cancel, &config)
            }))
        };

        let runner = self.clone();
        let matching = match tokio::task::spawn_blocking(move || runner.run_matching(&plan, once)).await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("❌ Matching task failed: {e}");
                MatchingSummary::default()
            }
        };

        cancel.cancel();
        let playback = match player {
            Some(handle) => match handle.await {
                Ok(report) => Some(report),
                Err(e) => {
                    log::error!("❌ Macro playback task failed: {e}");
                    None
                }
            },
            None => None,
        };

        RunSummary { matching, playback }
    }
}
