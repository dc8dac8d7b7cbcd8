use crate::prayer::Prayer;
use itertools::Itertools;

const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Text shown in place of a countdown when the next prayer is tomorrow's
/// Fajr but we don't know when exactly that is
pub const NEXT_DAY: &str = "Next day's first prayer";

/// Format a number of seconds as "X hours and Y minutes". Leftover seconds
/// are dropped, and zero components are skipped entirely, so anything under
/// a minute formats as an empty string. `None` means the remaining time is
/// unknown.
pub fn format_time_left(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return NEXT_DAY.to_owned();
    };
    let hours = seconds / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

    [(hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            if value == 1 {
                format!("{value} {unit}")
            } else {
                format!("{value} {unit}s")
            }
        })
        .join(" and ")
}

/// Status text for a running countdown
pub fn countdown_text(seconds: u64, prayer: Prayer, city: &str) -> String {
    format!(
        "{} until {} in {city}",
        format_time_left(Some(seconds)),
        prayer.label()
    )
}

/// Status text when the next prayer has no known start time
pub fn next_day_text(prayer: Prayer, city: &str) -> String {
    format!("{}: {} in {city}", format_time_left(None), prayer.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_left() {
        assert_eq!(format_time_left(Some(0)), "");
        assert_eq!(format_time_left(None), "Next day's first prayer");
        assert_eq!(format_time_left(Some(3661)), "1 hour and 1 minute");
        assert_eq!(format_time_left(Some(7200)), "2 hours");
        assert_eq!(format_time_left(Some(59)), "");
        assert_eq!(format_time_left(Some(60)), "1 minute");
        assert_eq!(format_time_left(Some(7380)), "2 hours and 3 minutes");
        assert_eq!(format_time_left(Some(3599)), "59 minutes");
    }

    #[test]
    fn test_countdown_text() {
        assert_eq!(
            countdown_text(5400, Prayer::Maghrib, "London"),
            "1 hour and 30 minutes until MAGHRIB in London"
        );
        assert_eq!(
            next_day_text(Prayer::Fajr, "Makkah"),
            "Next day's first prayer: FAJR in Makkah"
        );
    }
}
