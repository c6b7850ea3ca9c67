//! Headless platform implementations used by the CLI dry-run mode and tests.

use super::{EventSink, InputInjector, InputListener, ListenerHandle, PlatformError, PlatformResult, ScreenSource};
use crate::macros::MacroAction;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Interval at which listener threads check their stop flag.
const LISTENER_POLL: Duration = Duration::from_millis(10);

/// In-memory screen. Every capture returns a copy of the same raster.
#[derive(Debug)]
pub struct StaticScreen {
    image: GrayImage,
    captures: AtomicUsize,
}

impl StaticScreen {
    pub fn new(image: GrayImage) -> Self {
        Self {
            image,
            captures: AtomicUsize::new(0),
        }
    }

    /// Number of captures taken so far, including those made by
    /// `locate_on_screen`.
    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl ScreenSource for StaticScreen {
    fn capture_gray(&self) -> PlatformResult<GrayImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.image.clone())
    }

    fn screen_size(&self) -> PlatformResult<(u32, u32)> {
        Ok(self.image.dimensions())
    }
}

/// Screen backed by a screenshot file that is re-read on every capture, so
/// an external tool can keep replacing it.
#[derive(Debug, Clone)]
pub struct FileScreen {
    path: PathBuf,
}

impl FileScreen {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScreenSource for FileScreen {
    fn capture_gray(&self) -> PlatformResult<GrayImage> {
        let image = image::open(&self.path).map_err(|source| PlatformError::ScreenshotLoad {
            path: self.path.clone(),
            source,
        })?;
        Ok(image.to_luma8())
    }

    fn screen_size(&self) -> PlatformResult<(u32, u32)> {
        image::image_dimensions(&self.path).map_err(|source| PlatformError::ScreenshotLoad {
            path: self.path.clone(),
            source,
        })
    }
}

/// One action performed through `LoggingInjector`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    Move { x: i32, y: i32 },
    Click { x: i32, y: i32 },
    KeyDown { key: String },
    KeyUp { key: String },
    Button { x: i32, y: i32, button: String, pressed: bool },
    Scroll { x: i32, y: i32, dx: i32, dy: i32 },
}

/// Dry-run injector: logs every action and keeps it with its timestamp.
///
/// With the fail-safe enabled, touching the (0, 0) corner returns
/// `PlatformError::FailSafe` instead of acting.
#[derive(Debug, Default)]
pub struct LoggingInjector {
    actions: Mutex<Vec<(Instant, InputAction)>>,
    fail_safe: bool,
}

impl LoggingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fail_safe() -> Self {
        Self {
            fail_safe: true,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<(Instant, InputAction)> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn action_count(&self) -> usize {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn check_corner(&self, x: i32, y: i32) -> PlatformResult<()> {
        if self.fail_safe && x == 0 && y == 0 {
            return Err(PlatformError::FailSafe { x, y });
        }
        Ok(())
    }

    fn record(&self, action: InputAction) {
        log::debug!("🖱️ {:?}", action);
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), action));
    }
}

impl InputInjector for LoggingInjector {
    fn move_cursor(&self, x: i32, y: i32) -> PlatformResult<()> {
        self.check_corner(x, y)?;
        self.record(InputAction::Move { x, y });
        Ok(())
    }

    fn click_at(&self, x: i32, y: i32) -> PlatformResult<()> {
        self.check_corner(x, y)?;
        log::info!("👆 Click at ({x}, {y})");
        self.record(InputAction::Click { x, y });
        Ok(())
    }

    fn key_down(&self, key: &str) -> PlatformResult<()> {
        if key.is_empty() {
            return Err(PlatformError::InvalidKey {
                key: key.to_string(),
            });
        }
        self.record(InputAction::KeyDown {
            key: key.to_string(),
        });
        Ok(())
    }

    fn key_up(&self, key: &str) -> PlatformResult<()> {
        if key.is_empty() {
            return Err(PlatformError::InvalidKey {
                key: key.to_string(),
            });
        }
        self.record(InputAction::KeyUp {
            key: key.to_string(),
        });
        Ok(())
    }

    fn scroll_at(&self, x: i32, y: i32, dx: i32, dy: i32) -> PlatformResult<()> {
        self.record(InputAction::Scroll { x, y, dx, dy });
        Ok(())
    }

    fn press_button(&self, x: i32, y: i32, button: &str, pressed: bool) -> PlatformResult<()> {
        self.check_corner(x, y)?;
        self.record(InputAction::Button {
            x,
            y,
            button: button.to_string(),
            pressed,
        });
        Ok(())
    }
}

/// Sending half of a `ChannelListener`: feeds synthetic keyboard and mouse
/// events as if a user produced them.
#[derive(Debug, Clone)]
pub struct InputFeed {
    keyboard: Sender<MacroAction>,
    mouse: Sender<MacroAction>,
}

impl InputFeed {
    pub fn key_press(&self, key: &str) {
        self.send_keyboard(MacroAction::KeyPress {
            key: key.to_string(),
        });
    }

    pub fn key_release(&self, key: &str) {
        self.send_keyboard(MacroAction::KeyRelease {
            key: key.to_string(),
        });
    }

    pub fn mouse_move(&self, x: i32, y: i32) {
        self.send_mouse(MacroAction::MouseMove { x, y });
    }

    pub fn mouse_click(&self, x: i32, y: i32, button: &str, pressed: bool) {
        self.send_mouse(MacroAction::MouseClick {
            x,
            y,
            button: button.to_string(),
            pressed,
        });
    }

    pub fn mouse_scroll(&self, x: i32, y: i32, dx: i32, dy: i32) {
        self.send_mouse(MacroAction::MouseScroll { x, y, dx, dy });
    }

    fn send_keyboard(&self, action: MacroAction) {
        if self.keyboard.send(action).is_err() {
            log::warn!("Keyboard feed disconnected");
        }
    }

    fn send_mouse(&self, action: MacroAction) {
        if self.mouse.send(action).is_err() {
            log::warn!("Mouse feed disconnected");
        }
    }
}

/// Listener fed through in-process channels, one thread per source.
#[derive(Debug)]
pub struct ChannelListener {
    keyboard: Arc<Mutex<Receiver<MacroAction>>>,
    mouse: Arc<Mutex<Receiver<MacroAction>>>,
}

impl ChannelListener {
    pub fn new() -> (Self, InputFeed) {
        let (keyboard_tx, keyboard_rx) = mpsc::channel();
        let (mouse_tx, mouse_rx) = mpsc::channel();
        (
            Self {
                keyboard: Arc::new(Mutex::new(keyboard_rx)),
                mouse: Arc::new(Mutex::new(mouse_rx)),
            },
            InputFeed {
                keyboard: keyboard_tx,
                mouse: mouse_tx,
            },
        )
    }

    fn spawn_source(
        name: &str,
        source: Arc<Mutex<Receiver<MacroAction>>>,
        sink: Arc<dyn EventSink>,
        stop: Arc<AtomicBool>,
    ) -> PlatformResult<thread::JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let receiver = source.lock().unwrap_or_else(PoisonError::into_inner);
                while !stop.load(Ordering::SeqCst) {
                    match receiver.recv_timeout(LISTENER_POLL) {
                        Ok(action) => {
                            if !sink.push(action) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(handle)
    }
}

impl InputListener for ChannelListener {
    fn spawn(&self, sink: Arc<dyn EventSink>) -> PlatformResult<ListenerHandle> {
        // Events sent while no session was active belong to nobody.
        for source in [&self.keyboard, &self.mouse] {
            let receiver = source.lock().unwrap_or_else(PoisonError::into_inner);
            let stale = receiver.try_iter().count();
            if stale > 0 {
                log::debug!("Dropped {stale} stale input events");
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mut threads = Vec::with_capacity(2);
        for (name, source) in [("keyboard-listener", &self.keyboard), ("mouse-listener", &self.mouse)] {
            match Self::spawn_source(name, Arc::clone(source), Arc::clone(&sink), Arc::clone(&stop)) {
                Ok(thread) => threads.push(thread),
                Err(e) => {
                    // Dropping the handle stops the sources already started.
                    drop(ListenerHandle::new(stop, threads));
                    return Err(e);
                }
            }
        }
        Ok(ListenerHandle::new(stop, threads))
    }
}
