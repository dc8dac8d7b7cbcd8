//! Prayer time calculation. Sun positions come from the `sunrise` crate,
//! which is good to about a minute. That's plenty for a countdown measured
//! in minutes.

use crate::{
    geocode::Coordinates,
    prayer::{select_next, PrayerTimes, Schedule},
};
use anyhow::{anyhow, bail};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use log::{debug, trace};
use serde::Deserialize;
use sunrise::{SolarDay, SolarEvent};

/// Something that can produce a day's prayer schedule for a location
pub trait PrayerCalculator: Send + Sync {
    fn calculate(
        &self,
        now: DateTime<Utc>,
        coordinates: &Coordinates,
    ) -> anyhow::Result<Schedule>;
}

/// Juristic conventions for the Fajr and Isha twilight angles
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Convention {
    MuslimWorldLeague,
    Isna,
    Egypt,
    Karachi,
    #[default]
    UmmAlQura,
}

/// How Isha is determined
#[derive(Copy, Clone, Debug, PartialEq)]
enum IshaRule {
    /// Sun depression below the horizon, in degrees
    Angle(f64),
    /// Fixed offset after Maghrib
    Minutes(i64),
}

impl Convention {
    pub fn name(self) -> &'static str {
        match self {
            Self::MuslimWorldLeague => "Muslim World League",
            Self::Isna => "Islamic Society of North America (ISNA)",
            Self::Egypt => "Egyptian General Authority of Survey",
            Self::Karachi => "University of Islamic Sciences, Karachi",
            Self::UmmAlQura => "Umm al-Qura University, Makkah",
        }
    }

    /// Sun depression at Fajr, in degrees
    fn fajr_angle(self) -> f64 {
        match self {
            Self::MuslimWorldLeague => 18.0,
            Self::Isna => 15.0,
            Self::Egypt => 19.5,
            Self::Karachi => 18.0,
            Self::UmmAlQura => 18.5,
        }
    }

    fn isha(self) -> IshaRule {
        match self {
            Self::MuslimWorldLeague => IshaRule::Angle(17.0),
            Self::Isna => IshaRule::Angle(15.0),
            Self::Egypt => IshaRule::Angle(17.5),
            Self::Karachi => IshaRule::Angle(18.0),
            // Umm al-Qura uses 120 minutes during Ramadan, which would need a
            // Hijri calendar
            Self::UmmAlQura => IshaRule::Minutes(90),
        }
    }
}

/// What to do when the sun never gets far enough below the horizon for Fajr
/// or Isha, which happens around midsummer from about 48° north or south.
/// Each rule caps the time between Fajr and sunrise (and between Maghrib and
/// Isha) at a share of the night.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighLatitudeRule {
    /// Half the night
    #[default]
    MiddleOfTheNight,
    /// A seventh of the night
    SeventhOfTheNight,
    /// A sixtieth of the night per degree of twilight angle
    TwilightAngle,
}

impl HighLatitudeRule {
    fn portion(self, angle: f64) -> f64 {
        match self {
            Self::MiddleOfTheNight => 1.0 / 2.0,
            Self::SeventhOfTheNight => 1.0 / 7.0,
            Self::TwilightAngle => angle / 60.0,
        }
    }
}

/// Calculates prayer times from the position of the sun
#[derive(Copy, Clone, Debug)]
pub struct Astronomical {
    convention: Convention,
    /// Hanafi Asr starts when shadows are twice an object's length, rather
    /// than equal to it
    hanafi_asr: bool,
    high_latitude_rule: HighLatitudeRule,
}

impl Astronomical {
    /// Apparent depression of the sun's center at sunrise/sunset. This is
    /// what `sunrise` uses for [SolarEvent::Sunrise].
    const HORIZON_ANGLE: f64 = 0.833;

    pub fn new(convention: Convention, hanafi_asr: bool) -> Self {
        Self {
            convention,
            hanafi_asr,
            high_latitude_rule: HighLatitudeRule::default(),
        }
    }

    pub fn with_high_latitude_rule(mut self, rule: HighLatitudeRule) -> Self {
        self.high_latitude_rule = rule;
        self
    }

    /// Calculate prayer times for a single local date. Fails only if the sun
    /// doesn't rise or set at all that day.
    pub fn day_times(
        &self,
        date: NaiveDate,
        coordinates: &Coordinates,
    ) -> anyhow::Result<PrayerTimes> {
        let location =
            sunrise::Coordinates::new(coordinates.latitude, coordinates.longitude)
                .ok_or_else(|| anyhow!("Invalid coordinates {coordinates:?}"))?;
        let day = Day {
            solar: SolarDay::new(location, date),
            noon: mean_noon(date, coordinates.longitude),
        };

        let (Some(sunrise), Some(maghrib)) = (
            day.event(SolarEvent::Sunrise),
            day.event(SolarEvent::Sunset),
        ) else {
            bail!(
                "The sun doesn't rise and set at latitude {:.4} on {date}",
                coordinates.latitude
            );
        };
        // Rise and set are symmetric around the transit
        let dhuhr = sunrise + (maghrib - sunrise) / 2;

        let shadow_factor = if self.hanafi_asr { 2.0 } else { 1.0 };
        let noon_zenith = 90.0 - day.noon_altitude();
        let asr_altitude = (1.0 / (shadow_factor + noon_zenith.to_radians().tan()))
            .atan()
            .to_degrees();
        let asr = day
            .event(crossing(asr_altitude, false))
            .ok_or_else(|| anyhow!("No Asr time on {date}"))?;

        let night = Duration::days(1) - (maghrib - sunrise);
        let portion = |angle: f64| {
            let share = self.high_latitude_rule.portion(angle);
            Duration::seconds((night.num_seconds() as f64 * share) as i64)
        };

        let fajr_angle = self.convention.fajr_angle();
        let earliest_fajr = sunrise - portion(fajr_angle);
        let fajr = match day.event(crossing(-fajr_angle, true)) {
            Some(fajr) if fajr >= earliest_fajr => fajr,
            _ => {
                debug!("Fajr on {date} capped at {earliest_fajr}");
                earliest_fajr
            }
        };
        let isha = match self.convention.isha() {
            IshaRule::Angle(angle) => {
                let latest_isha = maghrib + portion(angle);
                match day.event(crossing(-angle, false)) {
                    Some(isha) if isha <= latest_isha => isha,
                    _ => {
                        debug!("Isha on {date} capped at {latest_isha}");
                        latest_isha
                    }
                }
            }
            IshaRule::Minutes(minutes) => maghrib + Duration::minutes(minutes),
        };
        trace!(
            "Prayer times for {date}: fajr={fajr} sunrise={sunrise} \
            dhuhr={dhuhr} asr={asr} maghrib={maghrib} isha={isha}"
        );

        Ok(PrayerTimes {
            fajr,
            sunrise,
            dhuhr,
            asr,
            maghrib,
            isha,
        })
    }
}

impl Default for Astronomical {
    fn default() -> Self {
        Self::new(Convention::default(), false)
    }
}

impl PrayerCalculator for Astronomical {
    fn calculate(
        &self,
        now: DateTime<Utc>,
        coordinates: &Coordinates,
    ) -> anyhow::Result<Schedule> {
        if !coordinates.is_valid() {
            bail!("Invalid coordinates {coordinates:?}");
        }

        // The "day" is the one the location is in, which can differ from
        // the UTC date. Solar time is close enough for picking the date.
        let offset =
            Duration::seconds((coordinates.longitude * 240.0).round() as i64);
        let date = (now + offset).date_naive();
        let times = self.day_times(date, coordinates)?;
        let next_fajr = date.succ_opt().and_then(|tomorrow| {
            self.day_times(tomorrow, coordinates)
                .map_err(|err| debug!("No Fajr time for {tomorrow}: {err}"))
                .ok()
                .map(|times| times.fajr)
        });
        let next = select_next(&times, next_fajr, now);
        debug!(
            "Calculated {} prayer times for {} on {date}; next is {} in {:?}s",
            self.convention.name(),
            coordinates.city,
            next.prayer,
            next.remaining_seconds
        );

        Ok(Schedule {
            date,
            times,
            next_fajr,
            next,
        })
    }
}

/// One date at one place
struct Day {
    solar: SolarDay,
    /// Mean solar noon, close enough to tell real event times from misses
    noon: DateTime<Utc>,
}

impl Day {
    /// When an event happens, or `None` if the sun never gets there. For
    /// those `sunrise` hands back the Unix epoch, which is nowhere near noon.
    fn event(&self, event: SolarEvent) -> Option<DateTime<Utc>> {
        let time = self.solar.event_time(event);
        ((time - self.noon).num_hours().abs() < 24).then_some(time)
    }

    /// The sun's altitude at its highest, in degrees. `sunrise` only goes
    /// from altitude to time, so this searches for the highest altitude that
    /// the sun still reaches. Only call this once sunset is known to exist.
    fn noon_altitude(&self) -> f64 {
        let (mut reached, mut missed) = (-Astronomical::HORIZON_ANGLE, 90.0);
        for _ in 0..40 {
            let altitude = (reached + missed) / 2.0;
            if self.event(crossing(altitude, false)).is_some() {
                reached = altitude;
            } else {
                missed = altitude;
            }
        }
        reached
    }
}

/// The sun crossing `altitude` degrees, in the morning or the evening.
/// `sunrise` measures elevation downward from the horizon, like its dawn
/// angles, hence the flipped sign.
fn crossing(altitude: f64, morning: bool) -> SolarEvent {
    SolarEvent::Elevation {
        elevation: -altitude.to_radians(),
        morning,
    }
}

fn mean_noon(date: NaiveDate, longitude: f64) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) + Duration::hours(12)
        - Duration::seconds((longitude * 240.0).round() as i64)
}
