use std::time::{Duration, Instant};

use crate::foundation::error::{FlatlandError, FlatlandResult};

/// Periodic driver for simulation ticks.
///
/// Cancellation is one-shot: after [`PeriodicTimer::cancel`], `poll` never
/// reports a firing again, including for a deadline that had already passed
/// when cancellation happened. The cancelled flag, not the caller, carries
/// the queued-but-stale-firing invariant.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    next_due: Instant,
    cancelled: bool,
}

impl PeriodicTimer {
    /// Arm a timer that first fires one `period` from now.
    pub fn new(period: Duration) -> FlatlandResult<Self> {
        Self::starting_at(period, Instant::now())
    }

    pub(crate) fn starting_at(period: Duration, now: Instant) -> FlatlandResult<Self> {
        if period.is_zero() {
            return Err(FlatlandError::validation("tick period must be non-zero"));
        }
        Ok(Self {
            period,
            next_due: now + period,
            cancelled: false,
        })
    }

    /// True when `now` has reached the deadline. A firing re-arms the timer at
    /// `now + period`; a late turn does not produce catch-up firings.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled || now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }

    /// Time left until the next firing; `None` once cancelled.
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        if self.cancelled {
            return None;
        }
        Some(self.next_due.saturating_duration_since(now))
    }

    /// Cancel the timer. Idempotent.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// True once [`PeriodicTimer::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn fires_only_once_the_deadline_is_reached() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::starting_at(PERIOD, start).unwrap();
        assert!(!timer.poll(start));
        assert!(!timer.poll(start + Duration::from_millis(99)));
        assert!(timer.poll(start + PERIOD));
    }

    #[test]
    fn firing_rearms_without_catch_up_bursts() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::starting_at(PERIOD, start).unwrap();
        // The turn arrives very late; exactly one firing results.
        let late = start + Duration::from_millis(1000);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.until_due(late), Some(PERIOD));
        assert!(timer.poll(late + PERIOD));
    }

    #[test]
    fn cancellation_suppresses_an_already_due_firing() {
        let start = Instant::now();
        let mut timer = PeriodicTimer::starting_at(PERIOD, start).unwrap();
        let due = start + PERIOD;
        timer.cancel();
        assert!(timer.is_cancelled());
        assert!(!timer.poll(due));
        assert_eq!(timer.until_due(due), None);

        // Idempotent.
        timer.cancel();
        assert!(!timer.poll(due + PERIOD));
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(PeriodicTimer::new(Duration::ZERO).is_err());
    }
}
