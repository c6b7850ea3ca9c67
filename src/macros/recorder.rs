//! Macro recording
//!
//! Each session owns a fresh capture buffer. Listener callbacks append under
//! the buffer lock and stamp the offset while holding it, so offsets never
//! decrease in append order. `stop` joins the listener threads before
//! closing the buffer.

use super::types::{MacroAction, MacroEvent, RecorderState};
use crate::platform::{EventSink, InputListener, ListenerHandle, PlatformResult};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Buffer of one recording session.
#[derive(Debug)]
struct Capture {
    started: Instant,
    events: Vec<MacroEvent>,
    active: bool,
}

/// Listener-facing sink that appends into the session buffer.
struct CaptureSink(Arc<Mutex<Capture>>);

impl EventSink for CaptureSink {
    fn push(&self, action: MacroAction) -> bool {
        let mut capture = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !capture.active {
            return false;
        }
        let time = capture.started.elapsed().as_secs_f64();
        capture.events.push(MacroEvent::new(time, action));
        true
    }
}

#[derive(Debug)]
struct Session {
    capture: Arc<Mutex<Capture>>,
    listener: ListenerHandle,
}

/// Records keyboard and mouse input into a macro.
#[derive(Debug, Default)]
pub struct MacroRecorder {
    session: Mutex<Option<Session>>,
    events: Mutex<Vec<MacroEvent>>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        if self.lock_session().is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Recording
    }

    /// Start a new recording. No-op when already recording.
    pub fn start(&self, listener: &dyn InputListener) -> PlatformResult<()> {
        let mut session = self.lock_session();
        if session.is_some() {
            log::debug!("Recording already in progress");
            return Ok(());
        }

        let capture = Arc::new(Mutex::new(Capture {
            started: Instant::now(),
            events: Vec::new(),
            active: true,
        }));
        // The previous recording survives a listener that fails to start.
        let listener = listener.spawn(Arc::new(CaptureSink(Arc::clone(&capture))))?;
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *session = Some(Session { capture, listener });
        log::info!("🔴 Recording started");
        Ok(())
    }

    /// Stop recording. No-op when idle. After this returns no further event
    /// is added to the recording.
    pub fn stop(&self) {
        let Some(mut session) = self.lock_session().take() else {
            return;
        };

        session.listener.stop_and_join();
        let events = {
            let mut capture = session.capture.lock().unwrap_or_else(PoisonError::into_inner);
            capture.active = false;
            std::mem::take(&mut capture.events)
        };
        log::info!("⏹️ Recording stopped, {} events captured", events.len());
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
    }

    /// Flip between recording and idle. Returns the new state.
    pub fn toggle(&self, listener: &dyn InputListener) -> PlatformResult<RecorderState> {
        if self.is_recording() {
            self.stop();
        } else {
            self.start(listener)?;
        }
        Ok(self.state())
    }

    /// Snapshot of the recording: the finished one when idle, the events
    /// captured so far while recording.
    pub fn events(&self) -> Vec<MacroEvent> {
        if let Some(session) = self.lock_session().as_ref() {
            return session
                .capture
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .events
                .clone();
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MacroRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
