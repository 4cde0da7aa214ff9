//! Pause-aware clock for the question currently on screen.

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock instant expressed in fractional seconds since the UNIX epoch.
pub type Timestamp = f64;

/// Source of the current time, swappable in tests.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        unix_now()
    }
}

/// Read the system time as fractional UNIX seconds.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// Start, pause and accumulated pause bookkeeping for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionClock {
    started_at: Option<Timestamp>,
    paused_at: Option<Timestamp>,
    paused_accumulated: f64,
}

impl QuestionClock {
    /// Rebuild a clock from persisted fields.
    pub fn restore(
        started_at: Option<Timestamp>,
        paused_at: Option<Timestamp>,
        paused_accumulated: f64,
    ) -> Self {
        Self {
            started_at,
            paused_at,
            paused_accumulated: paused_accumulated.max(0.0),
        }
    }

    /// Restart the clock for a freshly displayed question.
    pub fn start(&mut self, now: Timestamp) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.paused_accumulated = 0.0;
    }

    /// Forget everything, used when the session returns to idle.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Flip the pause flag and return the new paused state.
    ///
    /// Resuming folds the pause interval into the accumulated total.
    pub fn toggle_pause(&mut self, now: Timestamp) -> bool {
        match self.paused_at.take() {
            Some(paused_at) => {
                self.paused_accumulated += (now - paused_at).max(0.0);
                false
            }
            None => {
                self.paused_at = Some(now);
                true
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<Timestamp> {
        self.paused_at
    }

    pub fn paused_accumulated(&self) -> f64 {
        self.paused_accumulated
    }

    /// Unpaused seconds since the question started. Frozen while paused.
    pub fn elapsed(&self, now: Timestamp) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let ongoing_pause = self
            .paused_at
            .map(|paused_at| (now - paused_at).max(0.0))
            .unwrap_or(0.0);
        (now - started_at - self.paused_accumulated - ongoing_pause).max(0.0)
    }

    /// Seconds left before the answer window closes.
    pub fn remaining(&self, now: Timestamp, duration: u32) -> f64 {
        (f64::from(duration) - self.elapsed(now)).max(0.0)
    }

    /// Elapsed time attributed to an answer received at `received_at`, clamped to `[0, duration]`.
    pub fn answer_elapsed(&self, received_at: Timestamp, duration: u32) -> f64 {
        let started_at = self.started_at.unwrap_or(received_at);
        (received_at - started_at - self.paused_accumulated).clamp(0.0, f64::from(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_zero_before_start() {
        let clock = QuestionClock::default();
        assert_eq!(clock.elapsed(1_000.0), 0.0);
        assert_eq!(clock.remaining(1_000.0, 20), 20.0);
    }

    #[test]
    fn elapsed_excludes_completed_pauses() {
        let mut clock = QuestionClock::default();
        clock.start(100.0);
        assert!(clock.toggle_pause(105.0));
        assert!(!clock.toggle_pause(115.0));
        assert_eq!(clock.paused_accumulated(), 10.0);
        assert_eq!(clock.elapsed(120.0), 10.0);
    }

    #[test]
    fn elapsed_is_frozen_during_pause() {
        let mut clock = QuestionClock::default();
        clock.start(100.0);
        clock.toggle_pause(104.0);
        assert_eq!(clock.elapsed(104.0), 4.0);
        assert_eq!(clock.elapsed(200.0), 4.0);
        assert_eq!(clock.remaining(200.0, 30), 26.0);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let mut clock = QuestionClock::default();
        clock.start(0.0);
        assert_eq!(clock.remaining(500.0, 20), 0.0);
    }

    #[test]
    fn answer_elapsed_is_clamped_to_duration() {
        let mut clock = QuestionClock::default();
        clock.start(10.0);
        assert_eq!(clock.answer_elapsed(5.0, 20), 0.0);
        assert_eq!(clock.answer_elapsed(20.0, 20), 10.0);
        assert_eq!(clock.answer_elapsed(90.0, 20), 20.0);
    }

    #[test]
    fn start_resets_pause_bookkeeping() {
        let mut clock = QuestionClock::default();
        clock.start(0.0);
        clock.toggle_pause(1.0);
        clock.start(50.0);
        assert!(!clock.is_paused());
        assert_eq!(clock.paused_accumulated(), 0.0);
        assert_eq!(clock.elapsed(55.0), 5.0);
    }
}
