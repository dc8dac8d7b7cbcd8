//! The two timers that keep the status text fresh. Each timer is its own
//! task, and the [Scheduler] makes sure there's never more than one of
//! each running.

use crate::{
    display::{Event, RefreshReason},
    indicator::StatusIndicator,
    prayer::Prayer,
    util::countdown_text,
};
use log::{debug, info, trace};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// A running countdown to a single prayer
#[derive(Clone, Debug, PartialEq)]
pub struct Countdown {
    pub prayer: Prayer,
    pub city: String,
    pub target: Instant,
}

impl Countdown {
    pub fn new(prayer: Prayer, city: String, remaining: Duration) -> Self {
        Self {
            prayer,
            city,
            target: Instant::now() + remaining,
        }
    }

    /// Whole seconds left, or zero once the target has passed
    pub fn remaining_seconds(&self) -> u64 {
        self.target.saturating_duration_since(Instant::now()).as_secs()
    }
}

/// Owns the fast (countdown) tick and the hourly (refresh) tick
#[derive(Debug)]
pub struct Scheduler {
    countdown_interval: Duration,
    refresh_interval: Duration,
    fast: Option<JoinHandle<()>>,
    hourly: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub const COUNTDOWN_INTERVAL: Duration = Duration::from_millis(5000);
    pub const REFRESH_INTERVAL: Duration = Duration::from_millis(60 * 60 * 1000);

    pub fn new(countdown_interval: Duration, refresh_interval: Duration) -> Self {
        Self {
            countdown_interval,
            refresh_interval,
            fast: None,
            hourly: None,
        }
    }

    /// Start the hourly tick, which asks for a full refresh once per
    /// interval. The first tick is one interval from now, so callers should
    /// do their own initial refresh.
    pub fn start(&mut self, events: mpsc::UnboundedSender<Event>) {
        if let Some(handle) = self.hourly.take() {
            handle.abort();
        }
        let period = self.refresh_interval;
        info!("Refreshing every {period:?}");
        self.hourly = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                trace!("Hourly tick");
                if events.send(Event::Refresh(RefreshReason::Hourly)).is_err() {
                    break;
                }
            }
        }));
    }

    /// Replace the running countdown, if any, with a new one. The old task
    /// is aborted before the new one starts. On a current-thread runtime the
    /// old task can't be mid-tick while we're here, so it never renders
    /// again.
    pub fn restart(
        &mut self,
        countdown: Countdown,
        indicator: Arc<dyn StatusIndicator>,
    ) {
        self.stop_countdown();
        debug!(
            "Counting down {}s to {} in {}",
            countdown.remaining_seconds(),
            countdown.prayer,
            countdown.city
        );
        let period = self.countdown_interval;
        self.fast = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let remaining = countdown.remaining_seconds();
                trace!("Countdown tick, {remaining}s remaining");
                if remaining == 0 {
                    // The hourly refresh will pick up the next prayer
                    debug!("Reached {}", countdown.prayer);
                    break;
                }
                indicator.set_text(&countdown_text(
                    remaining,
                    countdown.prayer,
                    &countdown.city,
                ));
                indicator.show();
            }
        }));
    }

    pub fn stop_countdown(&mut self) {
        if let Some(handle) = self.fast.take() {
            handle.abort();
        }
    }

    /// Whether the countdown task is still going
    pub fn is_counting_down(&self) -> bool {
        self.fast.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel both timers
    pub fn stop(&mut self) {
        self.stop_countdown();
        if let Some(handle) = self.hourly.take() {
            handle.abort();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Self::COUNTDOWN_INTERVAL, Self::REFRESH_INTERVAL)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
