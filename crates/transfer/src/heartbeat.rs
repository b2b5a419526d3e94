use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval between activity notifications.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Callback invoked with the cumulative number of bytes consumed.
pub type ActivityCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Throttles an [`ActivityCallback`] while a body is streamed.
///
/// Long uploads use it to prove liveness to the caller; it never touches the
/// bytes themselves.
pub struct Heartbeat {
    callback: ActivityCallback,
    interval: Duration,
    last: Option<Instant>,
    finished: bool,
}

impl Heartbeat {
    /// Creates a heartbeat notifying at most every 500 ms.
    pub fn new(callback: ActivityCallback) -> Self {
        Self::with_interval(callback, DEFAULT_INTERVAL)
    }

    /// Creates a heartbeat with a custom notification interval.
    pub fn with_interval(callback: ActivityCallback, interval: Duration) -> Self {
        Self {
            callback,
            interval,
            last: None,
            finished: false,
        }
    }

    /// Records progress; notifies if the interval has elapsed.
    pub fn tick(&mut self, total: u64) {
        let due = self.last.is_none_or(|last| last.elapsed() >= self.interval);
        if due {
            self.last = Some(Instant::now());
            (self.callback)(total);
        }
    }

    /// Sends the final notification once, regardless of the interval.
    pub fn finish(&mut self, total: u64) {
        if !self.finished {
            self.finished = true;
            (self.callback)(total);
        }
    }
}
