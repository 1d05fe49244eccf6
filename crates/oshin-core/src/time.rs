//! Time utilities: calendar boundaries and C-style date formatting.
//!
//! All digest computations happen in UTC. Other zones are only used for
//! display and for the scheduler's wall-clock trigger.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;

use crate::error::{OshinError, Result};
use crate::types::DigestWindow;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Resolve a zone-local wall-clock time. Ambiguous times take the earliest
/// instant; times inside a gap move forward to the first valid instant.
pub fn resolve_local<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> Result<DateTime<Z>> {
    let mut probe = local;
    // Real-world gaps are at most a few hours.
    for _ in 0..=16 {
        match zone.from_local_datetime(&probe) {
            LocalResult::Single(t) => return Ok(t),
            LocalResult::Ambiguous(earliest, _) => return Ok(earliest),
            LocalResult::None => probe += Duration::minutes(15),
        }
    }
    Err(OshinError::Other(format!(
        "local time {local} does not exist in this zone"
    )))
}

/// Truncate `t` to 00:00:00 of its calendar day in its own zone.
pub fn start_of_day<Z: TimeZone>(t: &DateTime<Z>) -> Result<DateTime<Z>> {
    let midnight = t.date_naive().and_time(NaiveTime::MIN);
    resolve_local(&t.timezone(), midnight)
}

/// `t` shifted back one calendar day, keeping the wall-clock time.
pub fn yesterday<Z: TimeZone>(t: &DateTime<Z>) -> Result<DateTime<Z>> {
    let date = t
        .date_naive()
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| OshinError::Other(format!("no calendar day before {}", t.date_naive())))?;
    resolve_local(&t.timezone(), date.and_time(t.time()))
}

/// `[midnight UTC of yesterday, now)`.
pub fn digest_window(now: DateTime<Utc>) -> Result<DigestWindow> {
    let start = start_of_day(&yesterday(&now)?)?;
    Ok(DigestWindow::new(start, now))
}

/// Parse a wall-clock time of day: `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| OshinError::config(format!("Invalid time of day '{s}': {e}")))
}

/// Look up an IANA zone name such as `Asia/Ho_Chi_Minh`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| OshinError::Timezone(name.to_string()))
}

/// Render `t` in the named zone. An unknown zone is an error rather than a
/// silently shifted timestamp.
pub fn format_in_zone(t: DateTime<Utc>, zone: &str, template: &str) -> Result<String> {
    let tz = parse_timezone(zone)?;
    Ok(strftime(&t.with_timezone(&tz), template))
}

/// Render `t` with a C `strftime` template.
///
/// Unsupported directives are copied through untranslated.
pub fn strftime<Z: TimeZone>(t: &DateTime<Z>, template: &str) -> String
where
    Z::Offset: std::fmt::Display,
{
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(directive) = chars.next() else {
            out.push('%');
            break;
        };
        match render_directive(t, directive) {
            Some(rendered) => out.push_str(&rendered),
            None => {
                out.push('%');
                out.push(directive);
            }
        }
    }
    out
}

fn render_directive<Z: TimeZone>(t: &DateTime<Z>, directive: char) -> Option<String>
where
    Z::Offset: std::fmt::Display,
{
    let weekday = WEEKDAYS[t.weekday().num_days_from_monday() as usize];
    let month = MONTHS[t.month0() as usize];
    let hour12 = match t.hour() % 12 {
        0 => 12,
        h => h,
    };
    let am_pm = if t.hour() < 12 { "AM" } else { "PM" };

    let rendered = match directive {
        'Y' => t.year().to_string(),
        'C' => format!("{:02}", t.year().div_euclid(100)),
        'y' => format!("{:02}", t.year().rem_euclid(100)),
        'm' => format!("{:02}", t.month()),
        'd' => format!("{:02}", t.day()),
        'e' => format!("{:>2}", t.day()),
        'H' => format!("{:02}", t.hour()),
        'k' => format!("{:>2}", t.hour()),
        'I' => format!("{hour12:02}"),
        'l' => format!("{hour12:>2}"),
        'M' => format!("{:02}", t.minute()),
        'S' => format!("{:02}", t.second()),
        'p' => am_pm.to_string(),
        'P' => am_pm.to_lowercase(),
        'a' => weekday[..3].to_string(),
        'A' => weekday.to_string(),
        'b' | 'h' => month[..3].to_string(),
        'B' => month.to_string(),
        'j' => format!("{:03}", t.ordinal()),
        'u' => t.weekday().number_from_monday().to_string(),
        'w' => t.weekday().num_days_from_sunday().to_string(),
        'U' => format!(
            "{:02}",
            (t.ordinal0() + 7 - t.weekday().num_days_from_sunday()) / 7
        ),
        'W' => format!(
            "{:02}",
            (t.ordinal0() + 7 - t.weekday().num_days_from_monday()) / 7
        ),
        'G' => t.iso_week().year().to_string(),
        'g' => format!("{:02}", t.iso_week().year().rem_euclid(100)),
        'V' => format!("{:02}", t.iso_week().week()),
        's' => t.timestamp().to_string(),
        'z' => {
            let secs = t.offset().fix().local_minus_utc();
            let sign = if secs < 0 { '-' } else { '+' };
            let secs = secs.abs();
            format!("{sign}{:02}{:02}", secs / 3600, secs % 3600 / 60)
        }
        'Z' => t.offset().to_string(),
        'F' => format!("{:04}-{:02}-{:02}", t.year(), t.month(), t.day()),
        'T' => format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
        'R' => format!("{:02}:{:02}", t.hour(), t.minute()),
        'r' => format!("{hour12:02}:{:02}:{:02} {am_pm}", t.minute(), t.second()),
        'D' => format!(
            "{:02}/{:02}/{:02}",
            t.month(),
            t.day(),
            t.year().rem_euclid(100)
        ),
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        '%' => "%".to_string(),
        _ => return None,
    };
    Some(rendered)
}
