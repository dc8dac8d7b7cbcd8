use crate::console::UserInterface;
use anyhow::{anyhow, bail, Context};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::task;

/// A named location on the globe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64, city: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            city: city.into(),
        }
    }

    /// Where we go when we don't know where the user is
    pub fn fallback() -> Self {
        Self::new(21.42251, 39.826168, "Makkah")
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Turns a city name into coordinates. This is allowed to block, callers
/// should go through [resolve] from async code.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, city: &str) -> anyhow::Result<Coordinates>;
}

/// Geocoder backed by the geocode.xyz API
#[derive(Debug)]
pub struct GeocodeXyz {
    base_url: String,
    agent: ureq::Agent,
}

impl GeocodeXyz {
    pub const DEFAULT_URL: &'static str = "https://geocode.xyz";
    const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Self::TIMEOUT)
            .user_agent(concat!("muezzin/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent,
        }
    }

    fn url(&self, city: &str) -> String {
        format!("{}/{}?json=1", self.base_url, urlencoding::encode(city))
    }
}

impl Default for GeocodeXyz {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

impl Geocoder for GeocodeXyz {
    fn geocode(&self, city: &str) -> anyhow::Result<Coordinates> {
        let url = self.url(city);
        info!("Fetching coordinates for `{city}`");
        // Non-2xx statuses come back as errors too
        let response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("Error fetching coordinates from {url}"))?;
        let body: GeocodeResponse = response
            .into_json()
            .context("Error parsing geocode response as JSON")?;
        body.into_coordinates(city)
    }
}

/// https://geocode.xyz/api
///
/// Everything comes back as strings. Fields that have no value are sometimes
/// returned as an empty object instead of being omitted, hence the [Value]s.
#[derive(Debug, Default, Deserialize)]
struct GeocodeResponse {
    latt: Option<Value>,
    longt: Option<Value>,
    #[serde(default)]
    standard: Option<Standard>,
}

#[derive(Debug, Default, Deserialize)]
struct Standard {
    city: Option<Value>,
}

impl GeocodeResponse {
    /// Pull coordinates out of the response. The geocoder's normalized city
    /// name wins over whatever the user typed.
    fn into_coordinates(self, input: &str) -> anyhow::Result<Coordinates> {
        let (Some(latitude), Some(longitude)) =
            (non_empty(self.latt.as_ref()), non_empty(self.longt.as_ref()))
        else {
            bail!("Incomplete coordinates data for `{input}`");
        };
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|err| anyhow!("Invalid coordinate `{value}`: {err}"))
        };
        let city = self
            .standard
            .and_then(|standard| non_empty(standard.city.as_ref()))
            .unwrap_or_else(|| input.trim().to_owned());

        let coordinates = Coordinates::new(
            parse(latitude.as_str())?,
            parse(longitude.as_str())?,
            city,
        );
        if !coordinates.is_valid() {
            bail!("Coordinates out of range: {coordinates:?}");
        }
        Ok(coordinates)
    }
}

/// Get a string field, treating empty strings and `{}` as missing
fn non_empty(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Run the geocoder on the blocking pool
pub async fn resolve(
    geocoder: Arc<dyn Geocoder>,
    city: String,
) -> anyhow::Result<Coordinates> {
    task::spawn_blocking(move || geocoder.geocode(&city))
        .await
        .context("Geocoding task panicked")?
}

/// Resolve a city, falling back to [Coordinates::fallback] if anything goes
/// wrong. The user typed the name, so they get told about failures.
pub async fn resolve_or_fallback(
    geocoder: Arc<dyn Geocoder>,
    ui: &dyn UserInterface,
    city: &str,
) -> Coordinates {
    match resolve(geocoder, city.to_owned()).await {
        Ok(coordinates) => {
            info!("Resolved `{city}` to {coordinates:?}");
            coordinates
        }
        Err(err) => {
            error!("Error resolving coordinates for `{city}`: {err:?}");
            ui.show_error(&format!(
                "Could not fetch coordinates for {city}. Using Makkah as default."
            ));
            Coordinates::fallback()
        }
    }
}
