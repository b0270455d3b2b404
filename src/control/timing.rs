//! Control period bookkeeping

use std::time::Duration;
use tracing::{debug, info, warn};

/// What a single tick's duration meant for the loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingEvent {
    OnTime,
    Overrun { elapsed: Duration, consecutive: u32 },
    /// Consecutive overruns reached the degraded threshold
    DegradedOnset { consecutive: u32 },
    /// First on-time tick after a degraded stretch
    Recovered,
}

/// Tracks soft overruns of the control period
#[derive(Debug, Clone)]
pub struct OverrunMonitor {
    period: Duration,
    degraded_threshold: u32,
    consecutive: u32,
    total_overruns: u64,
    degraded: bool,
}

impl OverrunMonitor {
    pub fn new(period: Duration, degraded_threshold: u32) -> Self {
        OverrunMonitor {
            period,
            degraded_threshold: degraded_threshold.max(1),
            consecutive: 0,
            total_overruns: 0,
            degraded: false,
        }
    }

    /// Record the wall-clock duration of one tick
    pub fn record(&mut self, elapsed: Duration) -> TimingEvent {
        if elapsed <= self.period {
            self.consecutive = 0;
            if self.degraded {
                self.degraded = false;
                info!("Control loop back within its {:?} period", self.period);
                return TimingEvent::Recovered;
            }
            return TimingEvent::OnTime;
        }

        self.consecutive += 1;
        self.total_overruns += 1;
        debug!(
            "Tick overran the {:?} period: took {:?} ({} in a row)",
            self.period, elapsed, self.consecutive
        );

        if !self.degraded && self.consecutive >= self.degraded_threshold {
            self.degraded = true;
            warn!(
                "Control loop degraded: {} consecutive overruns of the {:?} period",
                self.consecutive, self.period
            );
            return TimingEvent::DegradedOnset {
                consecutive: self.consecutive,
            };
        }

        TimingEvent::Overrun {
            elapsed,
            consecutive: self.consecutive,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn total_overruns(&self) -> u64 {
        self.total_overruns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_after_threshold_and_recovery() {
        let period = Duration::from_millis(100);
        let mut monitor = OverrunMonitor::new(period, 3);
        let slow = Duration::from_millis(150);

        assert_eq!(monitor.record(Duration::from_millis(50)), TimingEvent::OnTime);
        assert!(matches!(monitor.record(slow), TimingEvent::Overrun { consecutive: 1, .. }));
        assert!(matches!(monitor.record(slow), TimingEvent::Overrun { consecutive: 2, .. }));
        assert_eq!(monitor.record(slow), TimingEvent::DegradedOnset { consecutive: 3 });
        assert!(monitor.is_degraded());
        assert!(matches!(monitor.record(slow), TimingEvent::Overrun { consecutive: 4, .. }));
        assert_eq!(monitor.record(period), TimingEvent::Recovered);
        assert!(!monitor.is_degraded());
        assert_eq!(monitor.total_overruns(), 4);
    }

    #[test]
    fn test_isolated_overruns_do_not_degrade() {
        let mut monitor = OverrunMonitor::new(Duration::from_millis(100), 2);
        for _ in 0..5 {
            monitor.record(Duration::from_millis(120));
            monitor.record(Duration::from_millis(10));
        }
        assert!(!monitor.is_degraded());
    }
}
