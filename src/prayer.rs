//! Prayer schedule types, and the logic to pick which prayer comes next

use crate::{calculation::PrayerCalculator, geocode::Coordinates};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// The five daily prayers, in the order they occur
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Self; 5] =
        [Self::Fajr, Self::Dhuhr, Self::Asr, Self::Maghrib, Self::Isha];

    pub fn name(self) -> &'static str {
        match self {
            Self::Fajr => "fajr",
            Self::Dhuhr => "dhuhr",
            Self::Asr => "asr",
            Self::Maghrib => "maghrib",
            Self::Isha => "isha",
        }
    }

    /// Name as shown in the status bar
    pub fn label(self) -> String {
        self.name().to_uppercase()
    }
}

impl Display for Prayer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Start time of each prayer on a single day. Sunrise isn't a prayer, but it
/// marks the end of the Fajr window so we keep it around.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrayerTimes {
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
}

impl PrayerTimes {
    pub fn time(&self, prayer: Prayer) -> DateTime<Utc> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }
}

/// The upcoming prayer. `remaining_seconds` is `None` when the next prayer
/// is tomorrow's Fajr and its time couldn't be calculated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NextPrayer {
    pub prayer: Prayer,
    pub remaining_seconds: Option<u64>,
}

/// A full day's schedule, as produced by a [PrayerCalculator]
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    /// Local solar date the times were calculated for
    pub date: NaiveDate,
    pub times: PrayerTimes,
    /// Fajr on the following day, if it could be calculated
    pub next_fajr: Option<DateTime<Utc>>,
    pub next: NextPrayer,
}

/// Everything needed to render the countdown. Rebuilt on every refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct PrayerData {
    pub name: Prayer,
    pub remaining_seconds: Option<u64>,
    pub city: String,
}

/// Find the first prayer that starts strictly after `now`. Once Isha has
/// passed, wrap around to the next day's Fajr.
pub fn select_next(
    times: &PrayerTimes,
    next_fajr: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> NextPrayer {
    let today = Prayer::ALL
        .into_iter()
        .map(|prayer| (prayer, times.time(prayer)))
        .find(|(_, time)| *time > now);

    match today {
        Some((prayer, time)) => NextPrayer {
            prayer,
            remaining_seconds: Some(seconds_between(now, time)),
        },
        None => NextPrayer {
            prayer: Prayer::Fajr,
            remaining_seconds: next_fajr
                .filter(|time| *time > now)
                .map(|time| seconds_between(now, time)),
        },
    }
}

/// Whole seconds from `from` until `to`, clamped at zero
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or_default()
}

/// Ask the calculator for the schedule at `coordinates` and pull out the
/// next prayer
pub fn next_prayer(
    calculator: &dyn PrayerCalculator,
    coordinates: &Coordinates,
    now: DateTime<Utc>,
) -> anyhow::Result<PrayerData> {
    let schedule = calculator
        .calculate(now, coordinates)
        .with_context(|| {
            format!("Error calculating prayer times for {}", coordinates.city)
        })?;
    Ok(PrayerData {
        name: schedule.next.prayer,
        remaining_seconds: schedule.next.remaining_seconds,
        city: coordinates.city.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{schedule, FakeCalculator};

    fn at(time: &str) -> DateTime<Utc> {
        format!("2024-05-24T{time}:00Z").parse().unwrap()
    }

    fn times() -> PrayerTimes {
        PrayerTimes {
            fajr: at("05:00"),
            sunrise: at("06:20"),
            dhuhr: at("12:15"),
            asr: at("15:30"),
            maghrib: at("18:00"),
            isha: at("19:30"),
        }
    }

    #[test]
    fn test_select_next_afternoon() {
        let next = select_next(&times(), None, at("16:00"));
        assert_eq!(
            next,
            NextPrayer {
                prayer: Prayer::Maghrib,
                remaining_seconds: Some(2 * 3600),
            }
        );
    }

    #[test]
    fn test_select_next_before_fajr() {
        let next = select_next(&times(), None, at("03:59"));
        assert_eq!(next.prayer, Prayer::Fajr);
        assert_eq!(next.remaining_seconds, Some(3600 + 60));
    }

    #[test]
    fn test_select_next_is_strict() {
        // A prayer starting right now is not "next"
        let next = select_next(&times(), None, at("12:15"));
        assert_eq!(next.prayer, Prayer::Asr);
    }

    #[test]
    fn test_select_next_after_isha() {
        let next_fajr = "2024-05-25T04:59:00Z".parse().unwrap();
        let next = select_next(&times(), Some(next_fajr), at("23:00"));
        assert_eq!(
            next,
            NextPrayer {
                prayer: Prayer::Fajr,
                remaining_seconds: Some(5 * 3600 + 59 * 60),
            }
        );

        // Without tomorrow's time, the countdown is unknown, not negative
        let next = select_next(&times(), None, at("23:00"));
        assert_eq!(
            next,
            NextPrayer {
                prayer: Prayer::Fajr,
                remaining_seconds: None,
            }
        );
    }

    #[test]
    fn test_next_prayer() {
        let calculator =
            FakeCalculator::new(Ok(schedule(Prayer::Asr, Some(600))));
        let coordinates = Coordinates::new(51.5, -0.12, "London");
        let data = next_prayer(&*calculator, &coordinates, Utc::now()).unwrap();
        assert_eq!(
            data,
            PrayerData {
                name: Prayer::Asr,
                remaining_seconds: Some(600),
                city: "London".into(),
            }
        );
    }

    #[test]
    fn test_next_prayer_error() {
        let calculator = FakeCalculator::new(Err("no data".into()));
        let coordinates = Coordinates::fallback();
        assert!(next_prayer(&*calculator, &coordinates, Utc::now()).is_err());
    }
}
