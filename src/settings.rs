use crate::{
    console::{ask, InputBox, UserInterface},
    geocode::{resolve_or_fallback, Coordinates, Geocoder},
    store::KeyValueStore,
};
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The user's chosen city, and where it is. Sits on top of a generic
/// [KeyValueStore] so tests can swap in a memory store.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    /// Held while deciding where the user is, so overlapping refreshes on a
    /// fresh install don't each prompt for a city
    resolve_lock: Mutex<()>,
}

impl SettingsStore {
    const CITY_KEY: &'static str = "userCity";
    const COORDINATES_KEY: &'static str = "userCoordinates";

    const FIRST_RUN_INPUT: InputBox = InputBox {
        prompt: "Enter your city for prayer times",
        placeholder: "e.g., Makkah, London, New York",
    };
    const CHANGE_CITY_INPUT: InputBox = InputBox {
        prompt: "Enter a new city for prayer times",
        placeholder: "e.g., Makkah, London, New York",
    };

    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            resolve_lock: Mutex::new(()),
        }
    }

    /// Name of the saved city, if any
    pub fn city(&self) -> Option<String> {
        match self.store.get(Self::CITY_KEY)? {
            Value::String(city) if !city.trim().is_empty() => Some(city),
            _ => None,
        }
    }

    /// Saved coordinates. A corrupt record is treated as missing.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let value = self.store.get(Self::COORDINATES_KEY)?;
        match serde_json::from_value(value) {
            Ok(coordinates) => Some(coordinates),
            Err(err) => {
                warn!("Ignoring corrupt saved coordinates: {err}");
                None
            }
        }
    }

    pub fn save(
        &self,
        city: &str,
        coordinates: &Coordinates,
    ) -> anyhow::Result<()> {
        self.store.set(Self::CITY_KEY, Value::String(city.to_owned()))?;
        self.store
            .set(Self::COORDINATES_KEY, serde_json::to_value(coordinates)?)?;
        Ok(())
    }

    /// Save, logging failures instead of propagating them. Losing the
    /// setting means we'll just ask again next time.
    fn save_or_log(&self, coordinates: &Coordinates) {
        if let Err(err) = self.save(&coordinates.city, coordinates) {
            error!("Error saving city {}: {err:?}", coordinates.city);
        }
    }

    /// Figure out where the user is. A saved city is used as-is, without
    /// touching the network. With nothing saved, ask the user, then look up
    /// and save their answer. If they don't answer, use the fallback for
    /// now and ask again next time.
    pub async fn resolve(
        &self,
        geocoder: Arc<dyn Geocoder>,
        ui: &dyn UserInterface,
    ) -> Coordinates {
        let _guard = self.resolve_lock.lock().await;

        if let Some(city) = self.city() {
            return self.coordinates().unwrap_or_else(|| {
                warn!("City {city} is saved without coordinates");
                Coordinates::fallback()
            });
        }

        let Some(city) = ask(ui, Self::FIRST_RUN_INPUT).await else {
            warn!("No city provided");
            ui.show_warning("No city provided. Using Makkah as default.");
            return Coordinates::fallback();
        };
        let coordinates = resolve_or_fallback(geocoder, ui, &city).await;
        self.save_or_log(&coordinates);
        coordinates
    }

    /// Replace the saved city. If no name is given, the user is asked for
    /// one. Returns whether anything changed.
    pub async fn change_city(
        &self,
        geocoder: Arc<dyn Geocoder>,
        ui: &dyn UserInterface,
        city: Option<String>,
    ) -> bool {
        let city = match city {
            Some(city) => Some(city),
            None => ask(ui, Self::CHANGE_CITY_INPUT).await,
        };
        let Some(city) = city.filter(|city| !city.trim().is_empty()) else {
            info!("City change cancelled");
            return false;
        };

        let coordinates = resolve_or_fallback(geocoder, ui, &city).await;
        let _guard = self.resolve_lock.lock().await;
        self.save_or_log(&coordinates);
        info!("City changed to {coordinates:?}");
        ui.show_info(&format!("City updated to {city}"));
        true
    }
}
