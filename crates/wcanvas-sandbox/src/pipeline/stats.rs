//! Rolling generation latency, summarized into the log every few cycles.

use std::time::Duration;

/// Running totals for the cycles since the last summary.
#[derive(Debug, Default)]
pub(super) struct LatencyWindow {
    cycles: u32,
    total: Duration,
    slowest: Duration,
}

impl LatencyWindow {
    /// Add one cycle's duration.
    pub(super) fn record(&mut self, elapsed: Duration) {
        self.cycles += 1;
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
    }

    pub(super) fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Log the window at info level and start a new one.
    pub(super) fn flush(&mut self) {
        if self.cycles == 0 {
            return;
        }
        let mean = self.total / self.cycles;
        tracing::info!(
            cycles = self.cycles,
            mean_us = mean.as_micros() as u64,
            max_us = self.slowest.as_micros() as u64,
            "generation latency"
        );
        *self = Self::default();
    }

    #[cfg(test)]
    fn mean(&self) -> Option<Duration> {
        (self.cycles > 0).then(|| self.total / self.cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_tracks_mean_and_slowest() {
        let mut window = LatencyWindow::default();
        assert_eq!(window.mean(), None);

        window.record(Duration::from_micros(400));
        window.record(Duration::from_micros(800));
        window.record(Duration::from_micros(300));

        assert_eq!(window.cycles(), 3);
        assert_eq!(window.mean(), Some(Duration::from_micros(500)));
        assert_eq!(window.slowest, Duration::from_micros(800));
    }

    #[test]
    fn test_flush_starts_a_new_window() {
        let mut window = LatencyWindow::default();
        window.record(Duration::from_millis(2));
        window.flush();

        assert_eq!(window.cycles(), 0);
        assert_eq!(window.slowest, Duration::ZERO);

        // Flushing an empty window is a no-op
        window.flush();
        assert_eq!(window.cycles(), 0);
    }
}
