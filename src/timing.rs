use std::time::{Duration, Instant};

/// Stopwatch that logs slow steps.
#[derive(Debug)]
pub struct WallClock {
    started: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Log `what` at debug level if at least `threshold_ms` elapsed since the
    /// last report, then restart the clock. Returns the elapsed time.
    pub fn report(&mut self, threshold_ms: u64, what: &str) -> Duration {
        let elapsed = self.started.elapsed();
        if elapsed >= Duration::from_millis(threshold_ms) {
            log::debug!("{} took {}ms", what, elapsed.as_millis());
        }
        self.started = Instant::now();
        elapsed
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::start()
    }
}
