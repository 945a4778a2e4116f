//! Time parsing for the scheduler and for post scheduling
//!
//! Two kinds of input are handled here:
//! - daily publish slots (`"10:00,16:00"`), parsed strictly into [`ScheduleTime`]s
//! - one-off post schedules given as durations (`"30m"`, `"in 2 hours"`) or
//!   natural language (`"tomorrow 9am"`)

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::{AutocastError, Result};

/// A daily wall-clock time at which the publish cycle fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// First instant strictly after `now` whose local time is this slot
    ///
    /// Local times skipped by a DST gap move to the next day that has them.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();

        for offset in 0..3 {
            let date = today + Duration::days(offset);
            if let Some(candidate) = tz.from_local_datetime(&date.and_time(self.0)).earliest() {
                if candidate > *now {
                    return candidate;
                }
            }
        }

        now.clone() + Duration::days(1)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ScheduleTime {
    type Err = AutocastError;

    /// Accepts `H:MM` or `HH:MM` with hour 0-23 and minute 0-59
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            AutocastError::InvalidInput(format!(
                "Invalid schedule time '{}': expected HH:MM (00:00-23:59)",
                s
            ))
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

        if !all_digits(hour) || hour.len() > 2 || !all_digits(minute) || minute.len() != 2 {
            return Err(invalid());
        }

        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).ok_or_else(invalid)
    }
}

/// Parse a comma-separated list of daily slots
///
/// # Errors
///
/// Returns `AutocastError::InvalidInput` for an empty list or any malformed
/// entry.
pub fn parse_schedule_times(input: &str) -> Result<Vec<ScheduleTime>> {
    let times = input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ScheduleTime>>>()?;

    if times.is_empty() {
        return Err(AutocastError::InvalidInput(
            "At least one schedule time is required".to_string(),
        ));
    }

    Ok(times)
}

/// Parse a one-off schedule expression relative to `now`
///
/// Durations are tried first (`"90m"`, `"in 1 hour"`), then natural language
/// and absolute dates through chrono-english.
///
/// # Errors
///
/// Returns `AutocastError::InvalidInput` if the expression is empty or
/// cannot be parsed.
pub fn parse_schedule(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AutocastError::InvalidInput(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    let duration_part = input.strip_prefix("in ").unwrap_or(input);
    if let Ok(duration) = humantime::parse_duration(duration_part) {
        let duration = Duration::from_std(duration)
            .map_err(|_| AutocastError::InvalidInput("Duration out of range".to_string()))?;
        return Ok(now + duration);
    }

    chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us).map_err(|e| {
        AutocastError::InvalidInput(format!("Could not parse schedule '{}': {}", input, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(h: u32, m: u32) -> ScheduleTime {
        ScheduleTime::new(h, m).unwrap()
    }

    #[test]
    fn test_parse_schedule_times_default() {
        let times = parse_schedule_times("10:00,16:00").unwrap();
        assert_eq!(times, vec![at(10, 0), at(16, 0)]);
    }

    #[test]
    fn test_parse_schedule_times_accepts_single_digit_hour_and_spaces() {
        let times = parse_schedule_times(" 9:05 , 23:59").unwrap();
        assert_eq!(times, vec![at(9, 5), at(23, 59)]);
        assert_eq!(times[0].to_string(), "09:05");
    }

    #[test]
    fn test_parse_schedule_times_rejects_malformed() {
        for bad in ["24:00", "10:60", "10", "10:0", "ab:cd", "-1:00", "100:00", "10:00:00"] {
            assert!(parse_schedule_times(bad).is_err(), "accepted {}", bad);
        }
        assert!(parse_schedule_times("").is_err());
        assert!(parse_schedule_times(" , ").is_err());
    }

    #[test]
    fn test_next_after_later_today() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();

        let next = at(10, 0).next_after(&now);
        assert_eq!(next, tz.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 16, 0, 0).unwrap();

        // Exactly at the slot counts as passed
        let next = at(16, 0).next_after(&now);
        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
        assert_eq!(next.time(), at(16, 0).time());
    }

    #[test]
    fn test_parse_schedule_durations() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(parse_schedule("30m", now).unwrap(), now + Duration::minutes(30));
        assert_eq!(parse_schedule("in 2h", now).unwrap(), now + Duration::hours(2));
        assert_eq!(parse_schedule("1day", now).unwrap(), now + Duration::days(1));
    }

    #[test]
    fn test_parse_schedule_natural_language() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let scheduled = parse_schedule("tomorrow", now).unwrap();
        let diff = (scheduled - now).num_hours();
        assert!((12..=36).contains(&diff), "Expected about a day, got {}h", diff);
    }

    #[test]
    fn test_parse_schedule_errors() {
        let now = Utc::now();
        assert!(parse_schedule("", now).is_err());
        assert!(parse_schedule("   ", now).is_err());
        assert!(parse_schedule("whenever you like", now).is_err());
    }
}
