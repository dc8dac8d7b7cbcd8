//! Status line countdown to the next Islamic prayer time. The city is
//! resolved to coordinates once and persisted, prayer times are calculated
//! locally, and a pair of timers keep the status text fresh.

pub mod calculation;
pub mod config;
pub mod console;
pub mod display;
pub mod geocode;
pub mod indicator;
pub mod prayer;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod util;

#[cfg(test)]
mod testing;
