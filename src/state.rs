// Shared runtime state
// One handle is created per process and passed by reference (Arc) to the
// dispatcher, the click gate, the recorder and the player.

use crate::config::{AccuracyThresholds, MatchMode};
use crate::engine::gate::DebounceState;
use crate::matching::template::TemplateCache;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// Number of lines the rolling match log keeps.
pub const MATCH_LOG_CAPACITY: usize = 15;

/// Cooperative stop signal. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Sleep until `deadline`, waking every `poll` to check the flag.
    ///
    /// Returns `false` as soon as cancellation is observed, `true` once the
    /// deadline has been reached.
    pub fn sleep_until(&self, deadline: Instant, poll: Duration) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(poll.min(deadline - now));
        }
    }

    /// Cancellable variant of `thread::sleep`. A duration too long to be
    /// represented as a deadline sleeps until cancelled.
    pub fn sleep(&self, duration: Duration, poll: Duration) -> bool {
        match Instant::now().checked_add(duration) {
            Some(deadline) => self.sleep_until(deadline, poll),
            None => {
                self.wait(poll);
                false
            }
        }
    }

    /// Block until the flag is set, checking every `poll`.
    pub fn wait(&self, poll: Duration) {
        while !self.is_cancelled() {
            thread::sleep(poll);
        }
    }
}

/// Bounded log of the latest match decisions, oldest evicted first.
#[derive(Debug)]
pub struct MatchLog {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl MatchLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.push_back(line.into());
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Copy of the current lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MatchLog {
    fn default() -> Self {
        Self::new(MATCH_LOG_CAPACITY)
    }
}

/// Process-wide runtime state shared by the matching engine and the macro engine.
#[derive(Debug, Default)]
pub struct SharedState {
    thresholds: RwLock<AccuracyThresholds>,
    mode: RwLock<MatchMode>,
    pub cancel: CancellationFlag,
    pub match_log: MatchLog,
    pub templates: TemplateCache,
    pub(crate) debounce: Mutex<DebounceState>,
}

impl SharedState {
    pub fn new(thresholds: AccuracyThresholds, mode: MatchMode) -> Arc<Self> {
        Arc::new(Self {
            thresholds: RwLock::new(thresholds),
            mode: RwLock::new(mode),
            ..Self::default()
        })
    }

    pub fn thresholds(&self) -> AccuracyThresholds {
        *self.thresholds.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_thresholds(&self, thresholds: AccuracyThresholds) {
        *self.thresholds.write().unwrap_or_else(PoisonError::into_inner) = thresholds;
    }

    pub fn mode(&self) -> MatchMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: MatchMode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    /// Copy of the last permitted click, for inspection.
    pub fn debounce_snapshot(&self) -> DebounceState {
        self.debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_log_evicts_oldest() {
        let log = MatchLog::default();
        for i in 0..20 {
            log.push(format!("line {i}"));
        }
        let lines = log.snapshot();
        assert_eq!(lines.len(), MATCH_LOG_CAPACITY);
        assert_eq!(lines.first().map(String::as_str), Some("line 5"));
        assert_eq!(lines.last().map(String::as_str), Some("line 19"));
    }

    #[test]
    fn test_cancellation_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn test_sleep_returns_early_when_cancelled() {
        let flag = CancellationFlag::new();
        let remote = flag.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let start = Instant::now();
        let completed = flag.sleep(Duration::from_secs(5), Duration::from_millis(1));
        canceller.join().unwrap();

        assert!(!completed, "Sleep should report cancellation");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_completes_without_cancellation() {
        let flag = CancellationFlag::new();
        let start = Instant::now();
        assert!(flag.sleep(Duration::from_millis(20), Duration::from_millis(1)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_unbounded_sleep_waits_for_cancellation() {
        let flag = CancellationFlag::new();
        let remote = flag.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(!flag.sleep(Duration::MAX, Duration::from_millis(1)));
        canceller.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_shared_state_thresholds_roundtrip() {
        let state = SharedState::new(AccuracyThresholds::default(), MatchMode::Performance);
        let mut thresholds = state.thresholds();
        thresholds.orb_features = 25.0;
        state.set_thresholds(thresholds);
        state.set_mode(MatchMode::Accuracy);

        assert_eq!(state.thresholds().orb_features, 25.0);
        assert_eq!(state.mode(), MatchMode::Accuracy);
    }
}
