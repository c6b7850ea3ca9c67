//! Tests for macro recording, persistence and replay

use super::*;
use crate::platform::{
    ChannelListener, EventSink, InputAction, InputListener, ListenerHandle, LoggingInjector, PlatformError,
    PlatformResult,
};
use crate::state::CancellationFlag;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn key(time: f64, name: &str) -> MacroEvent {
    MacroEvent::new(
        time,
        MacroAction::KeyPress {
            key: name.to_string(),
        },
    )
}

fn once() -> PlayerConfig {
    PlayerConfig {
        max_loops: Some(1),
        ..PlayerConfig::default()
    }
}

fn offsets_ms(actions: &[(Instant, InputAction)], origin: Instant) -> Vec<i64> {
    actions
        .iter()
        .map(|(at, _)| at.duration_since(origin).as_millis() as i64)
        .collect()
}

#[test]
fn test_event_json_shape() {
    let event = key(0.25, "a");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json, serde_json::json!({"type": "key_press", "key": "a", "time": 0.25}));

    let click: MacroEvent = serde_json::from_str(
        r#"{"type": "mouse_click", "x": 10, "y": 20, "button": "left", "pressed": true, "time": 1.5}"#,
    )
    .unwrap();
    assert_eq!(
        click,
        MacroEvent::new(
            1.5,
            MacroAction::MouseClick {
                x: 10,
                y: 20,
                button: "left".to_string(),
                pressed: true
            }
        )
    );
}

#[test]
fn test_round_trip_then_replay_keeps_timing() {
    let recording = vec![
        key(0.0, "a"),
        MacroEvent::new(0.1, MacroAction::MouseMove { x: 5, y: 5 }),
        MacroEvent::new(0.25, MacroAction::MouseScroll { x: 5, y: 5, dx: 0, dy: -1 }),
        MacroEvent::new(
            0.3,
            MacroAction::KeyRelease {
                key: "a".to_string(),
            },
        ),
    ];
    let json = serde_json::to_string(&recording).unwrap();
    let restored: Vec<MacroEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, recording);

    let injector = LoggingInjector::new();
    let start = Instant::now();
    let report = play_macro(&restored, &injector, &CancellationFlag::new(), &once());

    assert_eq!(report.events_dispatched, 4);
    assert_eq!(report.loops_completed, 1);
    let actions = injector.actions();
    assert_eq!(actions.len(), 4);
    for (actual, expected) in offsets_ms(&actions, start).iter().zip([0i64, 100, 250, 300]) {
        assert!(
            (actual - expected).abs() <= 15,
            "Action at {actual}ms, expected {expected}ms ±15"
        );
    }
    assert_eq!(actions[1].1, InputAction::Move { x: 5, y: 5 });
}

#[test]
fn test_empty_recording_does_nothing() {
    let injector = LoggingInjector::new();
    let start = Instant::now();
    let report = play_macro(&[], &injector, &CancellationFlag::new(), &PlayerConfig::default());

    assert_eq!(report, PlaybackReport::default());
    assert_eq!(injector.action_count(), 0);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_cancel_mid_replay_stops_promptly() {
    let recording = vec![key(0.0, "a"), key(5.0, "b")];
    let injector = LoggingInjector::new();
    let cancel = CancellationFlag::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let start = Instant::now();
    let report = play_macro(&recording, &injector, &cancel, &PlayerConfig::default());
    canceller.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.events_dispatched, 1);
    assert_eq!(report.loops_completed, 0);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_unreachable_offset_waits_for_cancel() {
    let recording = vec![key(0.0, "a"), key(1e19, "b")];
    let injector = LoggingInjector::new();
    let cancel = CancellationFlag::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let report = play_macro(&recording, &injector, &cancel, &PlayerConfig::default());
    canceller.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.events_dispatched, 1);
    assert_eq!(injector.action_count(), 1);
}

#[test]
fn test_cancel_during_pause_starts_no_new_pass() {
    let recording = vec![key(0.0, "a")];
    let injector = LoggingInjector::new();
    let cancel = CancellationFlag::new();
    let remote = cancel.clone();
    let config = PlayerConfig {
        loop_pause: Duration::from_secs(2),
        ..PlayerConfig::default()
    };
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.cancel();
    });

    let report = play_macro(&recording, &injector, &cancel, &config);
    canceller.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.loops_completed, 1);
    assert_eq!(injector.action_count(), 1);
}

#[test]
fn test_loop_timing_restarts_after_pause() {
    let recording = vec![key(0.0, "a"), key(0.5, "b"), key(1.2, "c")];
    let injector = LoggingInjector::new();
    let config = PlayerConfig {
        max_loops: Some(2),
        ..PlayerConfig::default()
    };

    let start = Instant::now();
    let report = play_macro(&recording, &injector, &CancellationFlag::new(), &config);

    assert_eq!(report.loops_completed, 2);
    assert_eq!(report.events_dispatched, 6);
    let offsets = offsets_ms(&injector.actions(), start);
    for (actual, expected) in offsets.iter().zip([0i64, 500, 1200, 1700, 2200, 2900]) {
        assert!(
            (actual - expected).abs() <= 25,
            "Action at {actual}ms, expected {expected}ms"
        );
    }
}

#[test]
fn test_injector_errors_do_not_stop_playback() {
    let recording = vec![key(0.0, ""), key(0.01, "b")];
    let injector = LoggingInjector::new();
    let report = play_macro(&recording, &injector, &CancellationFlag::new(), &once());

    assert_eq!(report.events_dispatched, 2);
    assert_eq!(
        injector.actions().into_iter().map(|(_, a)| a).collect::<Vec<_>>(),
        vec![InputAction::KeyDown {
            key: "b".to_string()
        }]
    );
}

#[test]
fn test_recorder_captures_until_stopped() {
    let (listener, feed) = ChannelListener::new();
    let recorder = MacroRecorder::new();
    assert_eq!(recorder.state(), RecorderState::Idle);

    recorder.start(&listener).unwrap();
    assert!(recorder.is_recording());
    recorder.start(&listener).unwrap();

    feed.key_press("a");
    thread::sleep(Duration::from_millis(30));
    feed.mouse_click(10, 20, "left", true);
    thread::sleep(Duration::from_millis(30));
    feed.key_release("a");
    thread::sleep(Duration::from_millis(100));
    recorder.stop();

    feed.key_press("late");
    thread::sleep(Duration::from_millis(50));

    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
    assert_eq!(
        events[0].action,
        MacroAction::KeyPress {
            key: "a".to_string()
        }
    );
    assert!(events.iter().all(|e| e.action
        != MacroAction::KeyPress {
            key: "late".to_string()
        }));
    assert!(events[2].time >= 0.05);
}

#[test]
fn test_toggle_starts_fresh_session() {
    let (listener, feed) = ChannelListener::new();
    let recorder = MacroRecorder::new();

    assert_eq!(recorder.toggle(&listener).unwrap(), RecorderState::Recording);
    feed.key_press("first");
    thread::sleep(Duration::from_millis(100));
    assert_eq!(recorder.toggle(&listener).unwrap(), RecorderState::Idle);
    assert_eq!(recorder.events().len(), 1);

    // Stop on an idle recorder is a no-op.
    recorder.stop();
    assert_eq!(recorder.events().len(), 1);

    recorder.toggle(&listener).unwrap();
    assert!(recorder.events().is_empty());
    feed.mouse_move(1, 2);
    thread::sleep(Duration::from_millis(100));
    recorder.toggle(&listener).unwrap();

    assert_eq!(
        recorder.events().into_iter().map(|e| e.action).collect::<Vec<_>>(),
        vec![MacroAction::MouseMove { x: 1, y: 2 }]
    );
}

/// Listener whose callback is still busy when recording is stopped: it
/// signals once running, then takes `delay` before delivering its event.
struct SlowListener {
    running: Mutex<Sender<()>>,
    delay: Duration,
}

impl SlowListener {
    fn new(delay: Duration) -> (Self, Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                running: Mutex::new(tx),
                delay,
            },
            rx,
        )
    }
}

impl InputListener for SlowListener {
    fn spawn(&self, sink: Arc<dyn EventSink>) -> PlatformResult<ListenerHandle> {
        let running = self.running.lock().unwrap().clone();
        let delay = self.delay;
        let stop = Arc::new(AtomicBool::new(false));
        let thread = thread::spawn(move || {
            let _ = running.send(());
            thread::sleep(delay);
            sink.push(MacroAction::KeyPress {
                key: "slow".to_string(),
            });
        });
        Ok(ListenerHandle::new(stop, vec![thread]))
    }
}

struct BrokenListener;

impl InputListener for BrokenListener {
    fn spawn(&self, _sink: Arc<dyn EventSink>) -> PlatformResult<ListenerHandle> {
        Err(PlatformError::ListenerFailed {
            source: std::io::Error::other("no input device"),
        })
    }
}

#[test]
fn test_stop_waits_for_in_flight_callback() {
    let (listener, running) = SlowListener::new(Duration::from_millis(150));
    let recorder = MacroRecorder::new();
    recorder.start(&listener).unwrap();
    running.recv().unwrap();

    let stopping = Instant::now();
    recorder.stop();

    assert!(stopping.elapsed() >= Duration::from_millis(100));
    assert_eq!(
        recorder.events().into_iter().map(|e| e.action).collect::<Vec<_>>(),
        vec![MacroAction::KeyPress {
            key: "slow".to_string()
        }]
    );
}

#[test]
fn test_failed_start_keeps_previous_recording() {
    let (listener, feed) = ChannelListener::new();
    let recorder = MacroRecorder::new();
    recorder.start(&listener).unwrap();
    feed.key_press("kept");
    thread::sleep(Duration::from_millis(100));
    recorder.stop();
    assert_eq!(recorder.events().len(), 1);

    assert!(recorder.start(&BrokenListener).is_err());
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(recorder.events().len(), 1);
}
