use crate::{
    calculation::PrayerCalculator,
    console::UserInterface,
    geocode::Geocoder,
    indicator::StatusIndicator,
    prayer::{next_prayer, PrayerData},
    scheduler::{Countdown, Scheduler},
    settings::SettingsStore,
    util::next_day_text,
};
use chrono::Utc;
use log::{debug, error, info};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time};

/// Something that the display loop needs to react to
#[derive(Debug)]
pub enum Event {
    /// Recalculate the next prayer from scratch
    Refresh(RefreshReason),
    /// Switch to a different city. If no name is given, the user is asked.
    ChangeCity(Option<String>),
    /// A refresh finished. `seq` orders refreshes by when they started.
    Refreshed {
        seq: u64,
        result: anyhow::Result<PrayerData>,
    },
    Shutdown,
}

/// Why a refresh was started. Just for logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RefreshReason {
    Startup,
    Hourly,
    CityChanged,
    Manual,
    /// A refresh landed right as a prayer came due
    PrayerDue,
}

/// The collaborators needed to get from "where is the user" to "what's the
/// next prayer". Shared with each refresh task.
pub struct Services {
    pub settings: SettingsStore,
    pub geocoder: Arc<dyn Geocoder>,
    pub calculator: Arc<dyn PrayerCalculator>,
    pub ui: Arc<dyn UserInterface>,
}

impl Services {
    /// Run the whole chain: settings/geocoder for coordinates, then the
    /// calculator for the schedule
    pub async fn next_prayer(&self) -> anyhow::Result<PrayerData> {
        let coordinates = self
            .settings
            .resolve(Arc::clone(&self.geocoder), self.ui.as_ref())
            .await;
        next_prayer(self.calculator.as_ref(), &coordinates, Utc::now())
    }

    pub async fn change_city(&self, city: Option<String>) -> bool {
        self.settings
            .change_city(Arc::clone(&self.geocoder), self.ui.as_ref(), city)
            .await
    }
}

/// Manage the status indicator. All state changes go through a single event
/// loop, while slow work (prompts, network, calculation) happens in spawned
/// tasks that report back with events.
pub struct CountdownDisplay {
    services: Arc<Services>,
    indicator: Arc<dyn StatusIndicator>,
    scheduler: Scheduler,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    /// Sequence number of the most recently started refresh
    started: u64,
    /// Sequence number of the newest refresh shown on the indicator
    applied: u64,
}

impl CountdownDisplay {
    pub const UNAVAILABLE: &'static str = "⚠️ Prayer Times Unavailable";
    /// How long to wait before looking again when a prayer is due now
    const DUE_RETRY: Duration = Duration::from_secs(1);

    pub fn new(
        services: Services,
        indicator: Arc<dyn StatusIndicator>,
        scheduler: Scheduler,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            services: Arc::new(services),
            indicator,
            scheduler,
            events_tx,
            events_rx,
            started: 0,
            applied: 0,
        }
    }

    /// Get a handle for sending events into the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events_tx.clone()
    }

    /// Run until shutdown. The first refresh happens immediately, rather
    /// than waiting an hour for the first tick.
    pub async fn run(mut self) {
        info!("Starting countdown display");
        self.refresh(RefreshReason::Startup);
        self.scheduler.start(self.events_tx.clone());

        // We hold a sender ourselves, so this only ends on Shutdown
        while let Some(event) = self.events_rx.recv().await {
            match event {
                Event::Refresh(reason) => self.refresh(reason),
                Event::ChangeCity(city) => self.change_city(city),
                Event::Refreshed { seq, result } => self.apply(seq, result),
                Event::Shutdown => break,
            }
        }
        self.shutdown();
    }

    /// Kick off a refresh in the background. The result comes back as
    /// [Event::Refreshed].
    fn refresh(&mut self, reason: RefreshReason) {
        self.started += 1;
        let seq = self.started;
        debug!("Starting refresh #{seq} ({reason:?})");
        let services = Arc::clone(&self.services);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = services.next_prayer().await;
            let _ = events.send(Event::Refreshed { seq, result });
        });
    }

    /// Change city in the background, then refresh if it worked
    fn change_city(&self, city: Option<String>) {
        let services = Arc::clone(&self.services);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            if services.change_city(city).await {
                let _ = events
                    .send(Event::Refresh(RefreshReason::CityChanged));
            }
        });
    }

    /// Put a refresh result on the indicator. Refreshes can finish out of
    /// order, so anything older than what's already shown gets dropped.
    fn apply(&mut self, seq: u64, result: anyhow::Result<PrayerData>) {
        if seq <= self.applied {
            debug!(
                "Dropping stale refresh #{seq}, already showing #{}",
                self.applied
            );
            return;
        }
        self.applied = seq;

        match result {
            Ok(PrayerData {
                name,
                remaining_seconds: Some(0),
                city,
            }) => {
                // Less than a second to go, so there's nothing to count
                // down. Look again once it has passed to get the one after.
                debug!("{name} in {city} is due now");
                self.scheduler.stop_countdown();
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    time::sleep(Self::DUE_RETRY).await;
                    let _ = events.send(Event::Refresh(RefreshReason::PrayerDue));
                });
            }
            Ok(PrayerData {
                name,
                remaining_seconds: Some(seconds),
                city,
            }) => {
                info!("Next prayer is {name} in {city}, {seconds}s away");
                self.scheduler.restart(
                    Countdown::new(name, city, Duration::from_secs(seconds)),
                    Arc::clone(&self.indicator),
                );
            }
            Ok(PrayerData {
                name,
                remaining_seconds: None,
                city,
            }) => {
                info!("Next prayer is tomorrow's {name} in {city}");
                self.scheduler.stop_countdown();
                self.indicator.set_text(&next_day_text(name, &city));
                self.indicator.show();
            }
            Err(err) => {
                error!("Prayer times unavailable: {err:?}");
                self.scheduler.stop_countdown();
                self.indicator.set_text(Self::UNAVAILABLE);
                self.indicator.show();
            }
        }
    }

    fn shutdown(&mut self) {
        info!("Shutting down");
        self.scheduler.stop();
        self.indicator.dispose();
    }
}
