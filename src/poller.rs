use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Default status poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Faster polling than this loads the controller's web server more than the
/// control loop tolerates.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Fixed-period status trigger with at most one fetch in flight.
///
/// A tick that fires while the previous fetch is outstanding is dropped, not
/// queued, so snapshots are applied in request order.
#[derive(Debug)]
pub struct Poller {
    period: Duration,
    in_flight: bool,
    skipped: u64,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        let period = if period < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} is below the minimum, using {:?}",
                period, MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            period
        };
        Self {
            period,
            in_flight: false,
            skipped: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Ticks dropped because a fetch was still outstanding.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Timer driving the ticks. Late ticks are skipped rather than burst.
    pub fn timer(&self) -> Interval {
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// A tick fired. Returns true if the caller should issue a fetch.
    pub fn begin_tick(&mut self) -> bool {
        if self.in_flight {
            self.skipped += 1;
            debug!("Status fetch still outstanding, skipping tick");
            return false;
        }
        self.in_flight = true;
        true
    }

    /// The fetch started by the last accepted tick settled.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
