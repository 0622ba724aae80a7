//! Time values and the clock that produces them.
//!
//! [`NormalizedTime`] is an immutable calendar snapshot whose authoritative
//! field is `epoch_seconds`; every other field is derived from it for one
//! particular zone view.  [`ClockComponent`] produces these snapshots in UTC
//! and in its configured POSIX time zone.

pub mod clock;
pub mod zone;

use core::cmp::Ordering;
use core::fmt::{self, Write};
use core::hash::{Hash, Hasher};

pub use clock::{ClockComponent, EpochSource};
pub use zone::TimeZone;

pub const SECS_PER_MINUTE: i64 = 60;
pub const SECS_PER_DAY: i64 = 86_400;

/// Years before this are treated as "clock not yet synchronized".
pub const MIN_VALID_YEAR: u16 = 2019;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
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

/// Monotonic millisecond counter, used for rate-limiting.
pub trait Uptime {
    fn uptime_ms(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════
//  NormalizedTime
// ═══════════════════════════════════════════════════════════════

/// Calendar time plus derived fields, decomposed for one zone view.
///
/// Comparison and equality look at `epoch_seconds` only, so a UTC value and
/// a zoned value for the same instant compare equal.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedTime {
    second: u8,
    minute: u8,
    hour: u8,
    day_of_week: u8,
    day_of_month: u8,
    day_of_year: u16,
    month: u8,
    year: u16,
    is_dst: bool,
    utc_offset: i32,
    epoch_seconds: i64,
}

impl NormalizedTime {
    /// Decompose `epoch_seconds` shifted by `utc_offset` seconds east of UTC.
    pub fn from_epoch(epoch_seconds: i64, utc_offset: i32, is_dst: bool) -> Self {
        let local = epoch_seconds.saturating_add(i64::from(utc_offset));
        let days = local.div_euclid(SECS_PER_DAY);
        let secs_of_day = local.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            second: (secs_of_day % 60) as u8,
            minute: ((secs_of_day / 60) % 60) as u8,
            hour: (secs_of_day / 3600) as u8,
            day_of_week: weekday_from_days(days) + 1,
            day_of_month: day,
            day_of_year: (days - days_from_civil(year, 1, 1) + 1) as u16,
            month,
            year: year.clamp(0, i64::from(u16::MAX)) as u16,
            is_dst,
            utc_offset,
            epoch_seconds,
        }
    }

    /// The UTC view of an instant.
    pub fn utc(epoch_seconds: i64) -> Self {
        Self::from_epoch(epoch_seconds, 0, false)
    }

    /// Placeholder returned before the clock has synchronized.
    pub fn unsynchronized() -> Self {
        Self::utc(0)
    }

    /// `true` once the year is plausible, i.e. the clock has been synced.
    pub fn is_valid(&self) -> bool {
        self.year >= MIN_VALID_YEAR
    }

    /// `true` when both values fall in the same local calendar minute.
    pub fn same_minute(&self, other: &Self) -> bool {
        self.year == other.year
            && self.month == other.month
            && self.day_of_month == other.day_of_month
            && self.hour == other.hour
            && self.minute == other.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// 1 = Sunday … 7 = Saturday.
    pub fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    pub fn day_of_month(&self) -> u8 {
        self.day_of_month
    }

    pub fn day_of_year(&self) -> u16 {
        self.day_of_year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn is_dst(&self) -> bool {
        self.is_dst
    }

    /// Seconds east of UTC used for this decomposition.
    pub fn utc_offset(&self) -> i32 {
        self.utc_offset
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.epoch_seconds
    }

    /// Format using a subset of C `strftime` conversions.
    ///
    /// Supported: `%Y %y %m %d %e %H %I %M %S %p %j %a %A %b %B %u %w %z %Z
    /// %s %F %T %%`.  `%Z` only renders the DST flag ("DST" or nothing).
    /// Unknown conversions are copied through unchanged.
    pub fn strftime(&self, format: &str) -> String {
        let mut out = String::with_capacity(format.len() + 16);
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let Some(spec) = chars.next() else {
                out.push('%');
                break;
            };
            // Writing to a String cannot fail.
            let _ = self.write_conversion(&mut out, spec);
        }
        out
    }

    fn write_conversion(&self, out: &mut String, spec: char) -> fmt::Result {
        let weekday = usize::from(self.day_of_week - 1);
        let month = usize::from(self.month - 1);
        match spec {
            'Y' => write!(out, "{}", self.year),
            'y' => write!(out, "{:02}", self.year % 100),
            'm' => write!(out, "{:02}", self.month),
            'd' => write!(out, "{:02}", self.day_of_month),
            'e' => write!(out, "{:2}", self.day_of_month),
            'H' => write!(out, "{:02}", self.hour),
            'I' => write!(out, "{:02}", (self.hour + 11) % 12 + 1),
            'M' => write!(out, "{:02}", self.minute),
            'S' => write!(out, "{:02}", self.second),
            'p' => out.write_str(if self.hour < 12 { "AM" } else { "PM" }),
            'j' => write!(out, "{:03}", self.day_of_year),
            'a' => out.write_str(&WEEKDAY_NAMES[weekday][..3]),
            'A' => out.write_str(WEEKDAY_NAMES[weekday]),
            'b' => out.write_str(&MONTH_NAMES[month][..3]),
            'B' => out.write_str(MONTH_NAMES[month]),
            'u' => write!(out, "{}", if self.day_of_week == 1 { 7 } else { self.day_of_week - 1 }),
            'w' => write!(out, "{}", self.day_of_week - 1),
            'z' => {
                let sign = if self.utc_offset < 0 { '-' } else { '+' };
                let abs = self.utc_offset.unsigned_abs();
                write!(out, "{sign}{:02}{:02}", abs / 3600, (abs / 60) % 60)
            }
            'Z' => out.write_str(if self.is_dst { "DST" } else { "" }),
            's' => write!(out, "{}", self.epoch_seconds),
            'F' => write!(out, "{}-{:02}-{:02}", self.year, self.month, self.day_of_month),
            'T' => write!(out, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second),
            '%' => out.write_char('%'),
            other => {
                out.write_char('%')?;
                out.write_char(other)
            }
        }
    }
}

impl PartialEq for NormalizedTime {
    fn eq(&self, other: &Self) -> bool {
        self.epoch_seconds == other.epoch_seconds
    }
}

impl Eq for NormalizedTime {}

impl PartialOrd for NormalizedTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_seconds.cmp(&other.epoch_seconds)
    }
}

impl Hash for NormalizedTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch_seconds.hash(state);
    }
}

impl fmt::Display for NormalizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day_of_month, self.hour, self.minute, self.second
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  Proleptic Gregorian calendar arithmetic
// ═══════════════════════════════════════════════════════════════

pub(crate) fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(crate) fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 for a civil date.
pub(crate) fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date `(year, month, day)` for days since 1970-01-01.
pub(crate) fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// 0 = Sunday.  1970-01-01 was a Thursday.
pub(crate) fn weekday_from_days(days: i64) -> u8 {
    (days + 4).rem_euclid(7) as u8
}
