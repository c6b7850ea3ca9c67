use screen_match_run::args::Args;
use screen_match_run::config::Config;
use screen_match_run::engine::Engine;
use screen_match_run::error::{SetupError, SetupResult};
use screen_match_run::macros::PlayerConfig;
use screen_match_run::matching::Dispatcher;
use screen_match_run::platform::{FileScreen, InputInjector, LoggingInjector};
use screen_match_run::runner::{self, Runner};
use screen_match_run::state::SharedState;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    if let Err(e) = init_logging(&args) {
        eprintln!("❌ {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Args) -> SetupResult<()> {
    let default_level = if args.debug_mode { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path).map_err(|source| SetupError::LogFile {
            path: path.clone(),
            source,
        })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Apply maintenance flags to the config. Returns whether the config changed.
fn apply_admin_actions(args: &Args, config: &mut Config) -> SetupResult<bool> {
    let mut changed = false;
    if let Some(path) = &args.import {
        config.import_from(path)?;
        changed = true;
    }
    if let Some(profile) = &args.clear_macro {
        config.clear_macro(profile)?;
        log::info!("🗑️ Macro cleared for profile '{profile}'");
        changed = true;
    }
    if let Some(profile) = &args.macro_profile {
        config.set_macro_profile(profile)?;
        log::info!("Macro profile set to '{profile}'");
        changed = true;
    }
    Ok(changed)
}

fn run(args: Args) -> SetupResult<()> {
    let mut config = Config::load(&args.config_path)?;
    if apply_admin_actions(&args, &mut config)? {
        config.save(&args.config_path)?;
    }

    let Some(screen_path) = args.screen.clone() else {
        if args.has_admin_action() {
            return Ok(());
        }
        return Err(SetupError::NoScreenSource);
    };

    let default_before = config.default_profile.clone();
    let plan = runner::prepare(&mut config)?;
    if config.default_profile != default_before {
        config.save(&args.config_path)?;
    }

    let recording = if args.no_macro {
        Vec::new()
    } else {
        config.macro_recording().map(<[_]>::to_vec).unwrap_or_default()
    };

    let state = SharedState::new(config.accuracy_thresholds, config.mode);
    let injector: Arc<dyn InputInjector> = Arc::new(LoggingInjector::new());
    let screen = Arc::new(FileScreen::new(screen_path));
    runner::check_screen(screen.as_ref())?;
    let dispatcher = Dispatcher::new(screen, Arc::clone(&state));
    log::debug!("Registered strategies: {:?}", dispatcher.strategy_names());
    let engine = Arc::new(Engine::new(dispatcher, Arc::clone(&injector)));
    let runner = Runner::new(engine, injector, PlayerConfig::default());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| SetupError::Runtime { source })?;

    let summary = runtime.block_on(async {
        let cancel = state.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("🛑 Stop requested");
                cancel.cancel();
            }
        });
        if let Some(secs) = args.timeout_secs {
            let cancel = state.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                log::info!("⏰ Timeout reached after {secs}s");
                cancel.cancel();
            });
        }
        runner.run(plan, recording, args.once).await
    });

    log::info!(
        "✅ Done: {} passes, {} matches",
        summary.matching.passes,
        summary.matching.matches
    );
    if let Some(playback) = summary.playback {
        log::info!(
            "Macro: {} loops, {} events",
            playback.loops_completed,
            playback.events_dispatched
        );
    }
    Ok(())
}
