use std::time::{Duration, Instant};

/// Cancellable repeating task with a fixed interval.
///
/// The next firing is armed only when the previous run reports completion, so
/// runs never overlap and a slow run delays the following one instead of
/// queuing a backlog.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Arm the first firing one interval after `now`. Returns false if already active.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_active() {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    /// Stop future firings. Returns false if nothing was scheduled.
    pub fn cancel(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Time left until the next firing; `None` when inactive.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Re-arm after a run finished at `finished_at`. No-op if cancelled meanwhile.
    pub fn complete(&mut self, finished_at: Instant) {
        if let Some(due) = self.next_due.as_mut() {
            *due = finished_at + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_fires_after_interval() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(50 * MS);
        assert!(!sched.is_active());
        assert!(!sched.is_due(t0 + 100 * MS));

        assert!(sched.start(t0));
        assert!(!sched.start(t0 + 10 * MS));
        assert!(!sched.is_due(t0 + 49 * MS));
        assert!(sched.is_due(t0 + 50 * MS));
        assert_eq!(sched.time_until_due(t0 + 20 * MS), Some(30 * MS));
        assert_eq!(sched.time_until_due(t0 + 80 * MS), Some(Duration::ZERO));
    }

    #[test]
    fn test_rearms_from_completion_time() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(50 * MS);
        sched.start(t0);

        // A run that finished late pushes the next firing back.
        sched.complete(t0 + 120 * MS);
        assert!(!sched.is_due(t0 + 150 * MS));
        assert!(sched.is_due(t0 + 170 * MS));
    }

    #[test]
    fn test_cancel_stops_firing() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(10 * MS);
        sched.start(t0);
        assert!(sched.cancel());
        assert!(!sched.cancel());
        assert!(!sched.is_due(t0 + 1000 * MS));
        assert_eq!(sched.time_until_due(t0), None);

        // Completion after cancel must not re-arm.
        sched.complete(t0 + 20 * MS);
        assert!(!sched.is_active());
    }
}
