//! Click debounce

use std::time::{Duration, Instant};

/// Clicks closer than this in time...
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
/// ...and in distance to the previous click are suppressed.
pub const DEBOUNCE_DISTANCE_PX: f64 = 20.0;

/// Last permitted click.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebounceState {
    pub last_coordinate: Option<(i32, i32)>,
    pub last_time: Option<Instant>,
}

impl DebounceState {
    /// Decide whether a click at `center` may happen at `now`. A permitted
    /// click becomes the new reference; a suppressed one leaves the state
    /// untouched.
    pub fn permit(&mut self, center: (i32, i32), now: Instant) -> bool {
        if let (Some(last), Some(at)) = (self.last_coordinate, self.last_time) {
            let elapsed = now.saturating_duration_since(at);
            let dx = f64::from(center.0 - last.0);
            let dy = f64::from(center.1 - last.1);
            let distance = (dx * dx + dy * dy).sqrt();
            if elapsed < DEBOUNCE_WINDOW && distance < DEBOUNCE_DISTANCE_PX {
                log::debug!(
                    "Debounced click at ({}, {}): {:.1}px from last, {:?} ago",
                    center.0,
                    center.1,
                    distance,
                    elapsed
                );
                return false;
            }
        }
        self.last_coordinate = Some(center);
        self.last_time = Some(now);
        true
    }
}
