//! POSIX TZ strings (the subset newlib understands).
//!
//! ```text
//! std offset [dst [offset] [,start[/time],end[/time]]]
//!
//! EST5EDT,M3.2.0,M11.1.0      US Eastern
//! CET-1CEST,M3.5.0,M10.5.0/3  Central Europe
//! <+0330>-3:30                fixed offset, quoted name
//! ```
//!
//! POSIX offsets are positive *west* of Greenwich; internally everything is
//! stored as seconds *east* of UTC.  Zone names and paths to zoneinfo files
//! are not supported.

use crate::error::TimeZoneError;
use crate::time::{days_from_civil, days_in_month, is_leap_year, weekday_from_days, NormalizedTime, SECS_PER_DAY};

const DEFAULT_TRANSITION_SECS: i32 = 2 * 3600;
const MAX_OFFSET_HOURS: u32 = 24;
const MAX_RULE_HOURS: u32 = 167;

/// Which day of the year a DST transition happens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleDate {
    /// `Jn`: 1..=365, February 29 never counted.
    JulianNoLeap(u16),
    /// `n`: 0..=365, February 29 counted.
    ZeroBased(u16),
    /// `Mm.w.d`: weekday `d` (0 = Sunday) of week `w` (5 = last) of month `m`.
    MonthWeekDay { month: u8, week: u8, weekday: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    date: RuleDate,
    /// Local wall-clock seconds after midnight.
    time: i32,
}

impl Transition {
    /// Zero-based day of `year` this transition falls on.
    fn day_index(&self, year: i64) -> i64 {
        match self.date {
            RuleDate::JulianNoLeap(n) => {
                let n = i64::from(n);
                if is_leap_year(year) && n >= 60 { n } else { n - 1 }
            }
            RuleDate::ZeroBased(n) => i64::from(n),
            RuleDate::MonthWeekDay { month, week, weekday } => {
                let first = days_from_civil(year, month, 1);
                let first_weekday = i64::from(weekday_from_days(first));
                let mut day = (i64::from(weekday) - first_weekday).rem_euclid(7)
                    + (i64::from(week) - 1) * 7;
                while day >= i64::from(days_in_month(year, month)) {
                    day -= 7;
                }
                first - days_from_civil(year, 1, 1) + day
            }
        }
    }

    /// UTC instant of the transition, given the offset in effect before it.
    fn instant(&self, year: i64, offset_before: i32) -> i64 {
        (days_from_civil(year, 1, 1) + self.day_index(year))
            .saturating_mul(SECS_PER_DAY)
            .saturating_add(i64::from(self.time))
            .saturating_sub(i64::from(offset_before))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DstRule {
    offset: i32,
    start: Transition,
    end: Transition,
}

/// A fixed offset plus an optional daylight-saving rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZone {
    std_offset: i32,
    dst: Option<DstRule>,
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimeZone {
    pub const fn utc() -> Self {
        Self {
            std_offset: 0,
            dst: None,
        }
    }

    /// Parse a POSIX TZ string.  An empty string means UTC.
    pub fn parse(spec: &str) -> Result<Self, TimeZoneError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::utc());
        }

        let mut cur = Cursor::new(spec);
        cur.name()?;
        let std_offset = -cur.hms(MAX_OFFSET_HOURS).ok_or(TimeZoneError::InvalidOffset)?;
        if cur.is_done() {
            return Ok(Self { std_offset, dst: None });
        }

        cur.name()?;
        let offset = if matches!(cur.peek(), Some(b'0'..=b'9' | b'+' | b'-')) {
            -cur.hms(MAX_OFFSET_HOURS).ok_or(TimeZoneError::InvalidOffset)?
        } else {
            std_offset + 3600
        };

        let (start, end) = if cur.eat(b',') {
            let start = cur.transition()?;
            if !cur.eat(b',') {
                return Err(TimeZoneError::InvalidRule);
            }
            (start, cur.transition()?)
        } else {
            // newlib falls back to the US rules when none are given.
            (
                Transition {
                    date: RuleDate::MonthWeekDay { month: 3, week: 2, weekday: 0 },
                    time: DEFAULT_TRANSITION_SECS,
                },
                Transition {
                    date: RuleDate::MonthWeekDay { month: 11, week: 1, weekday: 0 },
                    time: DEFAULT_TRANSITION_SECS,
                },
            )
        };

        if !cur.is_done() {
            return Err(TimeZoneError::TrailingInput);
        }
        Ok(Self {
            std_offset,
            dst: Some(DstRule { offset, start, end }),
        })
    }

    /// Seconds east of UTC outside daylight saving.
    pub fn std_offset(&self) -> i32 {
        self.std_offset
    }

    pub fn has_dst(&self) -> bool {
        self.dst.is_some()
    }

    /// Offset (seconds east of UTC) and DST flag in effect at `epoch`.
    pub fn offset_at(&self, epoch: i64) -> (i32, bool) {
        let Some(dst) = self.dst else {
            return (self.std_offset, false);
        };

        let local_days = epoch
            .saturating_add(i64::from(self.std_offset))
            .div_euclid(SECS_PER_DAY);
        let (year, _, _) = crate::time::civil_from_days(local_days);
        let start = dst.start.instant(year, self.std_offset);
        let end = dst.end.instant(year, dst.offset);

        let in_dst = if start < end {
            epoch >= start && epoch < end
        } else {
            // Southern hemisphere: DST spans the new year.
            !(epoch >= end && epoch < start)
        };
        if in_dst {
            (dst.offset, true)
        } else {
            (self.std_offset, false)
        }
    }

    /// Decompose `epoch` in this zone.
    pub fn local(&self, epoch: i64) -> NormalizedTime {
        let (offset, is_dst) = self.offset_at(epoch);
        NormalizedTime::from_epoch(epoch, offset, is_dst)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Parser
// ═══════════════════════════════════════════════════════════════

struct Cursor<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(s: &'s str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn is_done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Zone abbreviation: 3+ letters, or `<...>` quoted with 3+ characters.
    fn name(&mut self) -> Result<(), TimeZoneError> {
        let start = self.pos;
        if self.eat(b'<') {
            while matches!(self.peek(), Some(b) if b != b'>') {
                self.pos += 1;
            }
            let len = self.pos - start - 1;
            if !self.eat(b'>') || len < 3 {
                return Err(TimeZoneError::InvalidName);
            }
            return Ok(());
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos - start < 3 {
            return Err(TimeZoneError::InvalidName);
        }
        Ok(())
    }

    fn number(&mut self, max_digits: usize) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            if self.pos - start == max_digits {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    /// `[+|-]hh[:mm[:ss]]` in seconds, POSIX sign convention.
    fn hms(&mut self, max_hours: u32) -> Option<i32> {
        let negative = if self.eat(b'-') {
            true
        } else {
            self.eat(b'+');
            false
        };
        let hours = self.number(3).filter(|h| *h <= max_hours)?;
        let minutes = if self.eat(b':') { self.number(2).filter(|m| *m < 60)? } else { 0 };
        let seconds = if self.eat(b':') { self.number(2).filter(|s| *s < 60)? } else { 0 };
        let total = (hours * 3600 + minutes * 60 + seconds) as i32;
        Some(if negative { -total } else { total })
    }

    fn transition(&mut self) -> Result<Transition, TimeZoneError> {
        let date = match self.peek() {
            Some(b'J') => {
                self.pos += 1;
                let n = self.number(3).filter(|n| (1..=365).contains(n));
                RuleDate::JulianNoLeap(n.ok_or(TimeZoneError::InvalidRule)? as u16)
            }
            Some(b'M') => {
                self.pos += 1;
                let month = self.number(2).filter(|m| (1..=12).contains(m));
                let week = self.eat(b'.').then(|| self.number(1)).flatten().filter(|w| (1..=5).contains(w));
                let weekday = self.eat(b'.').then(|| self.number(1)).flatten().filter(|d| *d <= 6);
                match (month, week, weekday) {
                    (Some(month), Some(week), Some(weekday)) => RuleDate::MonthWeekDay {
                        month: month as u8,
                        week: week as u8,
                        weekday: weekday as u8,
                    },
                    _ => return Err(TimeZoneError::InvalidRule),
                }
            }
            Some(b'0'..=b'9') => {
                let n = self.number(3).filter(|n| *n <= 365);
                RuleDate::ZeroBased(n.ok_or(TimeZoneError::InvalidRule)? as u16)
            }
            _ => return Err(TimeZoneError::InvalidRule),
        };
        let time = if self.eat(b'/') {
            self.hms(MAX_RULE_HOURS).ok_or(TimeZoneError::InvalidRule)?
        } else {
            DEFAULT_TRANSITION_SECS
        };
        Ok(Transition { date, time })
    }
}
