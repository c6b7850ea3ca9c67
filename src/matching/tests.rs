//! Tests for strategy dispatch, fusion and the built-in strategies

use super::*;
use crate::config::{AccuracyThresholds, MatchMode};
use crate::platform::{ScreenSource, StaticScreen};
use crate::state::SharedState;
use crate::test_support::{noise_image, screen_with};
use image::{GrayImage, Luma};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Strategy with a canned outcome.
struct FixedStrategy {
    kind: StrategyKind,
    outcome: Option<((i32, i32), f64)>,
    panics: bool,
    saw_shared_capture: Arc<AtomicBool>,
}

impl FixedStrategy {
    fn boxed(kind: StrategyKind, outcome: Option<((i32, i32), f64)>) -> Box<dyn Strategy> {
        Box::new(Self {
            kind,
            outcome,
            panics: false,
            saw_shared_capture: Arc::new(AtomicBool::new(false)),
        })
    }

    fn panicking(kind: StrategyKind) -> Box<dyn Strategy> {
        Box::new(Self {
            kind,
            outcome: None,
            panics: true,
            saw_shared_capture: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Strategy for FixedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn default_threshold(&self) -> f64 {
        0.0
    }

    fn locate(&self, ctx: &MatchContext<'_>, _template_id: &str, _threshold: f64) -> StrategyResult<MatchCandidate> {
        if self.panics {
            panic!("strategy blew up");
        }
        if ctx.capture.is_some() {
            self.saw_shared_capture.store(true, Ordering::SeqCst);
        }
        self.outcome
            .map(|(center, score)| MatchCandidate::new(center, score, self.kind.name()))
            .ok_or(StrategyError::NotFound)
    }
}

fn blank_screen() -> Arc<StaticScreen> {
    Arc::new(StaticScreen::new(GrayImage::from_pixel(64, 48, Luma([0]))))
}

fn fake_dispatcher(strategies: Vec<Box<dyn Strategy>>, screen: Arc<StaticScreen>) -> Dispatcher {
    let state = SharedState::new(AccuracyThresholds::default(), MatchMode::Performance);
    Dispatcher::with_strategies(strategies, screen, state)
}

fn five_fakes(outcomes: [Option<((i32, i32), f64)>; 5]) -> Vec<Box<dyn Strategy>> {
    StrategyKind::ALL
        .iter()
        .zip(outcomes)
        .map(|(kind, outcome)| FixedStrategy::boxed(*kind, outcome))
        .collect()
}

#[test]
fn test_empty_mask_returns_none_without_capture() {
    let screen = blank_screen();
    let dispatcher = fake_dispatcher(five_fakes([Some(((1, 1), 1.0)); 5]), screen.clone());

    assert_eq!(dispatcher.find_best_match(&SelectionMask::none(), "t"), None);
    assert_eq!(dispatcher.find_best_match(&SelectionMask::new(vec![false; 5]), "t"), None);
    assert_eq!(screen.capture_count(), 0);
}

#[test]
fn test_all_strategies_none_returns_none() {
    let screen = blank_screen();
    let dispatcher = fake_dispatcher(five_fakes([None; 5]), screen.clone());

    assert_eq!(dispatcher.find_best_match(&SelectionMask::all(), "t"), None);
    assert_eq!(screen.capture_count(), 1, "Exactly one shared capture per dispatch");
}

#[test]
fn test_fused_score_is_maximum() {
    let dispatcher = fake_dispatcher(
        five_fakes([
            None,
            Some(((10, 10), 0.9)),
            Some(((20, 20), 12.0)),
            Some(((30, 30), 40.0)),
            Some(((40, 40), 3.0)),
        ]),
        blank_screen(),
    );

    let best = dispatcher.find_best_match(&SelectionMask::all(), "t").unwrap();
    assert_eq!(best.center, (30, 30));
    assert_eq!(best.score, 40.0);
    assert_eq!(best.strategy, "sift-features");
}

#[test]
fn test_exact_tie_goes_to_earliest_registration() {
    let dispatcher = fake_dispatcher(
        five_fakes([
            None,
            None,
            Some(((20, 20), 25.0)),
            Some(((30, 30), 25.0)),
            Some(((40, 40), 25.0)),
        ]),
        blank_screen(),
    );

    for _ in 0..10 {
        let best = dispatcher.find_best_match(&SelectionMask::all(), "t").unwrap();
        assert_eq!(best.strategy, "orb-features");
        assert_eq!(best.center, (20, 20));
    }
}

#[test]
fn test_cross_scale_scores_compare_numerically() {
    // A correlation probability never beats a feature match count.
    let dispatcher = fake_dispatcher(
        five_fakes([None, Some(((100, 100), 0.90)), Some(((400, 300), 45.0)), None, None]),
        blank_screen(),
    );
    let mask = SelectionMask::new(vec![false, true, true, false, false]);

    let best = dispatcher.find_best_match(&mask, "t").unwrap();
    assert_eq!(best.center, (400, 300));
    assert_eq!(best.score, 45.0);
    assert_eq!(best.strategy, "orb-features");
}

#[test]
fn test_disabled_strategies_are_ignored() {
    let dispatcher = fake_dispatcher(
        five_fakes([
            Some(((1, 1), 1.0)),
            Some(((2, 2), 0.5)),
            Some(((3, 3), 99.0)),
            None,
            None,
        ]),
        blank_screen(),
    );

    // Short mask: missing trailing entries count as disabled.
    let best = dispatcher
        .find_best_match(&SelectionMask::new(vec![false, true]), "t")
        .unwrap();
    assert_eq!(best.center, (2, 2));
}

#[test]
fn test_panicking_strategy_counts_as_none() {
    let strategies = vec![
        FixedStrategy::boxed(StrategyKind::DirectLocate, None),
        FixedStrategy::panicking(StrategyKind::TemplateCorrelation),
        FixedStrategy::boxed(StrategyKind::OrbFeatures, Some(((5, 6), 20.0))),
    ];
    let dispatcher = fake_dispatcher(strategies, blank_screen());

    let best = dispatcher.find_best_match(&SelectionMask::all(), "t").unwrap();
    assert_eq!(best.center, (5, 6));
}

#[test]
fn test_shared_capture_only_when_needed() {
    let screen = blank_screen();
    let direct_saw = Arc::new(AtomicBool::new(false));
    let corr_saw = Arc::new(AtomicBool::new(false));
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(FixedStrategy {
            kind: StrategyKind::DirectLocate,
            outcome: Some(((1, 1), 1.0)),
            panics: false,
            saw_shared_capture: direct_saw.clone(),
        }),
        Box::new(FixedStrategy {
            kind: StrategyKind::TemplateCorrelation,
            outcome: None,
            panics: false,
            saw_shared_capture: corr_saw.clone(),
        }),
    ];
    let dispatcher = fake_dispatcher(strategies, screen.clone());

    dispatcher.find_best_match(&SelectionMask::only(&[StrategyKind::DirectLocate]), "t");
    assert_eq!(screen.capture_count(), 0);
    assert!(!direct_saw.load(Ordering::SeqCst));

    dispatcher.find_best_match(&SelectionMask::all(), "t");
    assert_eq!(screen.capture_count(), 1);
    assert!(corr_saw.load(Ordering::SeqCst));
}

#[test]
fn test_fuse_empty_is_none() {
    assert_eq!(fuse(Vec::new()), None);
}

#[test]
fn test_fuse_orders_by_registration_index() {
    // Completion order must not decide ties.
    let results = vec![
        (3, MatchCandidate::new((3, 3), 7.0, "sift-features")),
        (2, MatchCandidate::new((2, 2), 7.0, "orb-features")),
    ];
    assert_eq!(fuse(results).unwrap().strategy, "orb-features");
}

fn state_with_template(id: &str, template: GrayImage) -> Arc<SharedState> {
    let state = SharedState::new(AccuracyThresholds::default(), MatchMode::Performance);
    state.templates.insert(id, template);
    state
}

#[test]
fn test_correlation_only_match_reports_center() {
    let template = noise_image(24, 24, 11);
    let mut screen_image = noise_image(160, 120, 99);
    image::imageops::replace(&mut screen_image, &template, 40, 30);
    let state = state_with_template("button", template);
    let dispatcher = Dispatcher::new(Arc::new(StaticScreen::new(screen_image)), state);

    let mask = SelectionMask::new(vec![false, true, false, false, false]);
    let best = dispatcher.find_best_match(&mask, "button").unwrap();

    assert_eq!(best.center, (52, 42));
    assert_eq!(best.strategy, "template-correlation");
    assert!(best.score >= 0.95, "Score {} below config threshold", best.score);
}

#[test]
fn test_correlation_no_match_returns_none() {
    let state = state_with_template("absent", noise_image(24, 24, 5));
    let dispatcher = Dispatcher::new(Arc::new(StaticScreen::new(noise_image(160, 120, 6))), state);

    let mask = SelectionMask::only(&[StrategyKind::TemplateCorrelation]);
    assert_eq!(dispatcher.find_best_match(&mask, "absent"), None);
}

#[test]
fn test_correlation_rejects_blank_screen() {
    let template = GrayImage::from_fn(24, 24, |x, y| Luma([100 + ((x * 7 + y * 13) % 101) as u8]));
    let blank = GrayImage::from_pixel(160, 120, Luma([255]));
    assert_eq!(best_correlation(&blank, &template).map(|hit| hit.score), Some(0.0));

    let state = state_with_template("textured", template);
    let dispatcher = Dispatcher::new(Arc::new(StaticScreen::new(blank)), state);
    let mask = SelectionMask::only(&[StrategyKind::DirectLocate, StrategyKind::TemplateCorrelation]);
    assert_eq!(dispatcher.find_best_match(&mask, "textured"), None);
}

#[test]
fn test_correlation_ignores_brightness_offset() {
    let template = noise_image(24, 24, 41);
    let mut screen_image = noise_image(120, 90, 42);
    let brighter = GrayImage::from_fn(24, 24, |x, y| Luma([template.get_pixel(x, y)[0] / 2 + 100]));
    image::imageops::replace(&mut screen_image, &brighter, 50, 40);

    let hit = best_correlation(&screen_image, &template).unwrap();
    assert_eq!((hit.x, hit.y), (50, 40));
    assert!(hit.score > 0.99, "Score {} for an affine copy", hit.score);
}

#[test]
fn test_flat_template_never_matches() {
    let flat = GrayImage::from_pixel(10, 10, Luma([77]));
    let screen = screen_with(60, 60, 77, &flat, 5, 5);
    assert_eq!(best_correlation(&screen, &flat).map(|hit| hit.score), Some(0.0));
}

#[test]
fn test_correlation_accuracy_mode_still_finds_template() {
    let template = noise_image(24, 24, 21);
    let mut screen_image = noise_image(160, 120, 22);
    image::imageops::replace(&mut screen_image, &template, 90, 60);
    let state = state_with_template("icon", template);
    state.set_mode(MatchMode::Accuracy);
    let screen = StaticScreen::new(screen_image);

    let ctx = MatchContext::new(&state, &screen, None);
    let found = TemplateCorrelation.find(&ctx, "icon", Some(0.9)).unwrap();
    assert_eq!(found.center, (102, 72));
}

#[test]
fn test_template_larger_than_screen_is_rejected() {
    let state = state_with_template("huge", noise_image(80, 80, 1));
    let screen = StaticScreen::new(noise_image(40, 40, 2));
    let ctx = MatchContext::new(&state, &screen, None);

    assert!(matches!(
        TemplateCorrelation.locate(&ctx, "huge", 0.5),
        Err(StrategyError::TemplateTooLarge { .. })
    ));
    assert_eq!(TemplateCorrelation.find(&ctx, "huge", None), None);
}

#[test]
fn test_missing_template_file_returns_none() {
    let state = SharedState::new(AccuracyThresholds::default(), MatchMode::Performance);
    let screen = StaticScreen::new(noise_image(40, 40, 2));
    let ctx = MatchContext::new(&state, &screen, None);

    assert!(matches!(
        TemplateCorrelation.locate(&ctx, "/nonexistent/button.png", 0.8),
        Err(StrategyError::TemplateUnavailable { .. })
    ));
    assert_eq!(DirectLocate.find(&ctx, "/nonexistent/button.png", None), None);
}

#[test]
fn test_direct_locate_scores_one() {
    let template = noise_image(16, 16, 31);
    let mut screen_image = noise_image(100, 80, 32);
    image::imageops::replace(&mut screen_image, &template, 20, 10);
    let state = state_with_template("t", template);
    let screen = StaticScreen::new(screen_image);
    let ctx = MatchContext::new(&state, &screen, None);

    let found = DirectLocate.find(&ctx, "t", None).unwrap();
    assert_eq!(found.center, (28, 18));
    assert_eq!(found.score, 1.0);
    assert_eq!(found.strategy, "direct-locate");
}

fn feature_scene() -> (Arc<SharedState>, StaticScreen) {
    let template = noise_image(80, 80, 1234);
    let screen = screen_with(400, 300, 128, &template, 150, 100);
    (state_with_template("pattern", template), StaticScreen::new(screen))
}

fn assert_near(actual: (i32, i32), expected: (i32, i32)) {
    assert!(
        (actual.0 - expected.0).abs() <= 1 && (actual.1 - expected.1).abs() <= 1,
        "Expected center near {:?}, got {:?}",
        expected,
        actual
    );
}

#[test]
fn test_orb_locates_pasted_template() {
    let (state, screen) = feature_scene();
    let ctx = MatchContext::new(&state, &screen, None);

    let found = OrbFeatures::orb().find(&ctx, "pattern", None).unwrap();
    assert_near(found.center, (190, 140));
    assert!(found.score >= OrbFeatures::DEFAULT_MIN_MATCHES);
    assert_eq!(found.strategy, "orb-features");
}

#[test]
fn test_sift_locates_pasted_template() {
    let (state, screen) = feature_scene();
    let ctx = MatchContext::new(&state, &screen, None);

    let found = SiftFeatures::sift().find(&ctx, "pattern", None).unwrap();
    assert_near(found.center, (190, 140));
    assert_eq!(found.strategy, "sift-features");
}

#[test]
fn test_akaze_locates_pasted_template() {
    let (state, screen) = feature_scene();
    let ctx = MatchContext::new(&state, &screen, None);

    let akaze = AkazeFeatures::akaze();
    let template = state.templates.get("pattern").unwrap();
    let capture = screen.capture_gray().unwrap();
    let result = akaze.match_features(&template, &capture, 10.0).unwrap();

    assert_near(result.center, (190, 140));
    assert_eq!(result.score, result.good_matches as f64);
    assert_eq!(akaze.find(&ctx, "pattern", None).map(|c| c.center), Some(result.center));
}

#[test]
fn test_feature_strategy_rejects_flat_screen() {
    let state = state_with_template("pattern", noise_image(80, 80, 1234));
    let screen = StaticScreen::new(GrayImage::from_pixel(400, 300, Luma([128])));
    let ctx = MatchContext::new(&state, &screen, None);

    assert!(matches!(
        OrbFeatures::orb().locate(&ctx, "pattern", 15.0),
        Err(StrategyError::InsufficientFeatures { screen: 0, .. })
    ));
}

#[test]
fn test_feature_strategy_requires_min_matches() {
    let (state, screen) = feature_scene();
    let ctx = MatchContext::new(&state, &screen, None);

    assert!(matches!(
        SiftFeatures::sift().locate(&ctx, "pattern", 100_000.0),
        Err(StrategyError::NotEnoughMatches { .. })
    ));
}
