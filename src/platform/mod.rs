// Platform seam: screen capture, synthetic input and input observation.
// The core only talks to these traits; `stub` provides headless versions.

pub mod error;
pub mod stub;

pub use error::{PlatformError, PlatformResult};
pub use stub::{ChannelListener, FileScreen, InputAction, InputFeed, LoggingInjector, StaticScreen};

use crate::macros::MacroAction;
use crate::matching::correlation::best_correlation;
use image::GrayImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Source of full-screen grayscale captures.
pub trait ScreenSource: Send + Sync {
    fn capture_gray(&self) -> PlatformResult<GrayImage>;

    fn screen_size(&self) -> PlatformResult<(u32, u32)>;

    /// Find `template` on a fresh capture. Returns the center of the best
    /// location whose normalized correlation reaches `confidence`.
    fn locate_on_screen(
        &self,
        template: &GrayImage,
        confidence: f64,
    ) -> PlatformResult<Option<(i32, i32)>> {
        let screen = self.capture_gray()?;
        Ok(best_correlation(&screen, template)
            .filter(|hit| f64::from(hit.score) >= confidence)
            .map(|hit| hit.center(template.width(), template.height())))
    }
}

/// Synthetic pointer and keyboard input.
pub trait InputInjector: Send + Sync {
    fn move_cursor(&self, x: i32, y: i32) -> PlatformResult<()>;

    fn click_at(&self, x: i32, y: i32) -> PlatformResult<()>;

    fn key_down(&self, key: &str) -> PlatformResult<()>;

    fn key_up(&self, key: &str) -> PlatformResult<()>;

    fn scroll_at(&self, x: i32, y: i32, dx: i32, dy: i32) -> PlatformResult<()>;

    /// Replay a recorded button transition. Backends without separate
    /// press/release primitives click on press and ignore the release.
    fn press_button(&self, x: i32, y: i32, _button: &str, pressed: bool) -> PlatformResult<()> {
        if pressed { self.click_at(x, y) } else { Ok(()) }
    }
}

/// Receiver of observed input events. Returns `false` once the sink is
/// closed and no longer accepts events.
pub trait EventSink: Send + Sync {
    fn push(&self, action: MacroAction) -> bool;
}

/// Global input observer. `spawn` starts the keyboard and mouse sources,
/// each delivering into `sink` until the returned handle is stopped.
pub trait InputListener: Send + Sync {
    fn spawn(&self, sink: Arc<dyn EventSink>) -> PlatformResult<ListenerHandle>;
}

/// Running listener threads plus their shared stop flag.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn new(stop: Arc<AtomicBool>, threads: Vec<JoinHandle<()>>) -> Self {
        Self { stop, threads }
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst) && self.threads.iter().any(|t| !t.is_finished())
    }

    /// Signal every listener thread and wait for it to exit. Once this
    /// returns no callback is running.
    pub fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for thread in self.threads.drain(..) {
            let name = thread.thread().name().unwrap_or("listener").to_string();
            if thread.join().is_err() {
                log::error!("Input listener thread '{name}' panicked");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
