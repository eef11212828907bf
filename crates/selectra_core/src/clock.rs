//! Time sources and idle timers
//!
//! Components never read the wall clock directly. They hold a
//! [`SharedClock`] so tests can drive time with a [`ManualClock`]:
//!
//! ```rust
//! use selectra_core::clock::{Clock, IdleTimer, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let mut timer = IdleTimer::new(Duration::from_millis(500));
//!
//! timer.restart(clock.now());
//! clock.advance(Duration::from_millis(499));
//! assert!(!timer.has_elapsed(clock.now()));
//! clock.advance(Duration::from_millis(1));
//! assert!(timer.has_elapsed(clock.now()));
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// Shared handle to a clock
pub type SharedClock = Rc<dyn Clock>;

/// Clock backed by [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Shared handle to a fresh system clock
    pub fn shared() -> SharedClock {
        Rc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move time forward by whole milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Jump to an absolute time
    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }

    /// Shared handle backed by this clock
    pub fn shared(&self) -> SharedClock {
        Rc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Deadline that is pushed back on every activity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleTimer {
    timeout: Duration,
    deadline: Option<Duration>,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arm (or re-arm) the timer from `now`
    pub fn restart(&mut self, now: Duration) {
        self.deadline = Some(now + self.timeout);
    }

    /// Disarm the timer
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether an armed timer's deadline has passed
    pub fn has_elapsed(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let shared = clock.shared();
        clock.advance_ms(250);
        assert_eq!(shared.now(), Duration::from_millis(250));
        clock.set(Duration::from_secs(2));
        assert_eq!(shared.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_idle_timer_restart_pushes_deadline() {
        let clock = ManualClock::new();
        let mut timer = IdleTimer::new(Duration::from_millis(500));
        assert!(!timer.has_elapsed(clock.now()));

        timer.restart(clock.now());
        clock.advance_ms(400);
        timer.restart(clock.now());
        clock.advance_ms(400);
        assert!(!timer.has_elapsed(clock.now()));
        clock.advance_ms(100);
        assert!(timer.has_elapsed(clock.now()));

        timer.cancel();
        assert!(!timer.is_armed());
        assert!(!timer.has_elapsed(clock.now()));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
