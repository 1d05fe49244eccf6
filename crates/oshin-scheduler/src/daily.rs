//! Once-a-day trigger at a wall-clock time in a given zone.

use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use oshin_core::error::{OshinError, Result};
use oshin_core::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    pub time: NaiveTime,
    pub tz: Tz,
}

impl DailyTime {
    pub fn new(time: NaiveTime, tz: Tz) -> Self {
        Self { time, tz }
    }

    /// Parse `HH:MM` plus an IANA zone name.
    pub fn parse(time: &str, zone: &str) -> Result<Self> {
        Ok(Self {
            time: time::parse_time_of_day(time)?,
            tz: time::parse_timezone(zone)?,
        })
    }

    /// First trigger instant strictly after `now`.
    ///
    /// A trigger time that falls in a DST gap fires at the first valid
    /// instant after it.
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let today = now.with_timezone(&self.tz).date_naive();
        for offset in 0..=2 {
            let day = today
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| OshinError::Other(format!("no calendar day after {today}")))?;
            let candidate = time::resolve_local(&self.tz, day.and_time(self.time))?
                .with_timezone(&Utc);
            if candidate > now {
                return Ok(candidate);
            }
        }
        Err(OshinError::Other(format!(
            "cannot compute next run for {} {}",
            self.time, self.tz
        )))
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.time.format("%H:%M"), self.tz)
    }
}
