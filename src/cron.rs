//! Cron trigger — time-driven automation.
//!
//! Six bit masks (second, minute, hour, day-of-month, month, day-of-week)
//! are compared against the clock once per tick.  An empty mask leaves its
//! field unconstrained.  Day-of-month and day-of-week must *both* match when
//! both are set; there is no classic-cron OR between them.
//!
//! ```text
//!   UNARMED ──(first valid time, no fire)──▶ ARMED
//!   ARMED ──tick──▶ walk every second in (last_check, now]
//!                   one local minute at a time, oldest first;
//!                   fire at most once per minute on a match
//! ```
//!
//! A minute fires when its minute-level fields match and any second the
//! walk covered in it is in the second mask, so a tick that lands on `:05`
//! still honours a `:00` schedule.  The minute the trigger armed in is
//! treated as already checked.

use core::cell::RefCell;

use log::{debug, info, warn};

use crate::automation::Trigger;
use crate::component::{Component, ComponentStatus};
use crate::error::{CronError, Result};
use crate::time::{ClockComponent, NormalizedTime, SECS_PER_MINUTE};

/// Default cap on minutes replayed after a stall or clock jump.
pub const DEFAULT_MAX_REPLAY_MINUTES: u32 = 24 * 60;

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

// ═══════════════════════════════════════════════════════════════
//  Field masks
// ═══════════════════════════════════════════════════════════════

/// Fixed-size bit set over the inclusive range `MIN..=MAX` (at most 64 bits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMask<const MIN: u8, const MAX: u8> {
    bits: u64,
}

pub type SecondMask = FieldMask<0, 60>;
pub type MinuteMask = FieldMask<0, 59>;
pub type HourMask = FieldMask<0, 23>;
pub type DayOfMonthMask = FieldMask<1, 31>;
pub type MonthMask = FieldMask<1, 12>;
pub type DayOfWeekMask = FieldMask<1, 7>;

impl<const MIN: u8, const MAX: u8> FieldMask<MIN, MAX> {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Set the bit for `value`.  Returns `false` if out of range.
    pub fn insert(&mut self, value: u8) -> bool {
        if !(MIN..=MAX).contains(&value) {
            return false;
        }
        self.bits |= 1 << value;
        true
    }

    pub fn contains(&self, value: u8) -> bool {
        value <= 63 && self.bits & (1 << value) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Empty masks match everything.
    pub fn matches(&self, value: u8) -> bool {
        self.is_empty() || self.contains(value)
    }

    /// Some value in `lo..=hi` matches.
    pub fn matches_any(&self, lo: u8, hi: u8) -> bool {
        if self.is_empty() {
            return true;
        }
        let hi = hi.min(63);
        if lo > hi {
            return false;
        }
        let window = (u64::MAX >> (63 - hi)) & (u64::MAX << lo);
        self.bits & window != 0
    }
}

// ═══════════════════════════════════════════════════════════════
//  Cron trigger
// ═══════════════════════════════════════════════════════════════

pub struct CronTrigger<'a> {
    clock: &'a RefCell<ClockComponent>,
    seconds: SecondMask,
    minutes: MinuteMask,
    hours: HourMask,
    days_of_month: DayOfMonthMask,
    months: MonthMask,
    days_of_week: DayOfWeekMask,
    last_check: Option<NormalizedTime>,
    /// Start (epoch) of the last local minute that fired or armed.
    settled_minute: Option<i64>,
    max_replay_minutes: u32,
    trigger: Trigger,
}

impl<'a> CronTrigger<'a> {
    pub fn new(clock: &'a RefCell<ClockComponent>) -> Self {
        Self {
            clock,
            seconds: SecondMask::empty(),
            minutes: MinuteMask::empty(),
            hours: HourMask::empty(),
            days_of_month: DayOfMonthMask::empty(),
            months: MonthMask::empty(),
            days_of_week: DayOfWeekMask::empty(),
            last_check: None,
            settled_minute: None,
            max_replay_minutes: DEFAULT_MAX_REPLAY_MINUTES,
            trigger: Trigger::new(),
        }
    }

    /// Build a trigger from a six-field expression
    /// (`second minute hour day-of-month month day-of-week`).
    pub fn from_expression(clock: &'a RefCell<ClockComponent>, expr: &str) -> Result<Self> {
        let mut cron = Self::new(clock);
        cron.parse_expression(expr)?;
        Ok(cron)
    }

    pub fn set_max_replay_minutes(&mut self, minutes: u32) {
        self.max_replay_minutes = minutes;
    }

    pub fn add_second(&mut self, second: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.seconds, "second", second)
    }

    pub fn add_minute(&mut self, minute: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.minutes, "minute", minute)
    }

    pub fn add_hour(&mut self, hour: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.hours, "hour", hour)
    }

    pub fn add_day_of_month(&mut self, day: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.days_of_month, "day-of-month", day)
    }

    pub fn add_month(&mut self, month: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.months, "month", month)
    }

    /// 1 = Sunday … 7 = Saturday.
    pub fn add_day_of_week(&mut self, day: u8) -> Result<()> {
        self.ensure_unarmed()?;
        insert_value(&mut self.days_of_week, "day-of-week", day)
    }

    /// Fill the masks from a six-field cron expression.
    ///
    /// Each field accepts `*`, `?`, single values, `a-b` ranges, `/step`
    /// and comma lists.  Months take `JAN`..`DEC`, days of week take
    /// `SUN`..`SAT` (1 = Sunday).  The masks are only replaced if the whole
    /// expression parses.
    pub fn parse_expression(&mut self, expr: &str) -> Result<()> {
        self.ensure_unarmed()?;
        let fields: heapless::Vec<&str, 6> = {
            let count = expr.split_whitespace().count();
            if count != 6 {
                return Err(CronError::FieldCount(count).into());
            }
            expr.split_whitespace().collect()
        };

        let seconds = parse_field(fields[0], "second", &[], 0)?;
        let minutes = parse_field(fields[1], "minute", &[], 0)?;
        let hours = parse_field(fields[2], "hour", &[], 0)?;
        let days_of_month = parse_field(fields[3], "day-of-month", &[], 0)?;
        let months = parse_field(fields[4], "month", &MONTH_NAMES, 1)?;
        let days_of_week = parse_field(fields[5], "day-of-week", &DAY_NAMES, 1)?;

        self.seconds = seconds;
        self.minutes = minutes;
        self.hours = hours;
        self.days_of_month = days_of_month;
        self.months = months;
        self.days_of_week = days_of_week;
        Ok(())
    }

    /// All six fields match `time`.
    pub fn matches(&self, time: &NormalizedTime) -> bool {
        self.seconds.matches(time.second()) && self.matches_minute(time)
    }

    /// Every field except the second matches `time`.
    fn matches_minute(&self, time: &NormalizedTime) -> bool {
        self.minutes.matches(time.minute())
            && self.hours.matches(time.hour())
            && self.days_of_month.matches(time.day_of_month())
            && self.months.matches(time.month())
            && self.days_of_week.matches(time.day_of_week())
    }

    pub fn is_armed(&self) -> bool {
        self.last_check.is_some()
    }

    pub fn last_check(&self) -> Option<NormalizedTime> {
        self.last_check
    }

    pub fn add_action(&mut self, action: impl FnMut() + 'static) {
        self.trigger.add_action(action);
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    fn ensure_unarmed(&self) -> Result<()> {
        if self.is_armed() {
            warn!("Cron: masks changed after arming, ignored");
            return Err(CronError::AlreadyArmed.into());
        }
        Ok(())
    }

    fn arm(&mut self, now: NormalizedTime) {
        self.last_check = Some(now);
        self.settled_minute = Some(minute_start(&now));
    }

    /// Check the seconds of one local minute starting at `time` and
    /// running through `last_second`.
    fn check_span(&mut self, time: &NormalizedTime, last_second: u8) {
        let start = minute_start(time);
        if self.settled_minute == Some(start) {
            return;
        }
        if self.matches_minute(time) && self.seconds.matches_any(time.second(), last_second) {
            debug!("Cron: firing for minute {}", time);
            self.settled_minute = Some(start);
            self.trigger.fire();
        }
    }
}

impl Component for CronTrigger<'_> {
    fn name(&self) -> &'static str {
        "cron"
    }

    fn tick(&mut self, _status: &mut ComponentStatus) {
        let clock_cell = self.clock;
        let Ok(clock) = clock_cell.try_borrow() else {
            return;
        };
        let now = clock.now();
        if !now.is_valid() {
            return;
        }

        let Some(last) = self.last_check else {
            debug!("Cron: armed at {}", now);
            self.arm(now);
            return;
        };
        if now < last {
            warn!("Cron: clock moved backwards ({} -> {}), re-arming", last, now);
            self.arm(now);
            return;
        }

        let mut from = last.epoch_seconds().saturating_add(1);
        let skipped = skipped_minutes(&last, &now);
        if skipped > i64::from(self.max_replay_minutes) {
            warn!(
                "Cron: {} minutes elapsed since {}, only checking {}",
                skipped, last, now
            );
            from = from.max(minute_start(&now));
        }
        for (time, last_second) in MinuteSpans::new(&clock, from, now.epoch_seconds()) {
            self.check_span(&time, last_second);
        }
        self.last_check = Some(now);
    }

    fn dump_config(&self) {
        info!(
            "Cron: masks s={} m={} h={} dom={} mon={} dow={} ({} actions)",
            self.seconds.len(),
            self.minutes.len(),
            self.hours.len(),
            self.days_of_month.len(),
            self.months.len(),
            self.days_of_week.len(),
            self.trigger.action_count()
        );
    }
}

/// Epoch of the local minute boundary at or before `time`.
fn minute_start(time: &NormalizedTime) -> i64 {
    time.epoch_seconds() - i64::from(time.second())
}

/// Whole local minutes strictly between the minutes of `last` and `now`.
fn skipped_minutes(last: &NormalizedTime, now: &NormalizedTime) -> i64 {
    let elapsed = minute_start(now).saturating_sub(minute_start(last));
    (elapsed.div_euclid(SECS_PER_MINUTE) - 1).max(0)
}

/// Splits the epoch range `next..=end` at local minute boundaries.
///
/// Yields the decomposed time at the start of each piece together with the
/// last second of that minute the piece reaches, oldest first.
struct MinuteSpans<'c> {
    clock: &'c ClockComponent,
    next: Option<i64>,
    end: i64,
}

impl<'c> MinuteSpans<'c> {
    fn new(clock: &'c ClockComponent, next: i64, end: i64) -> Self {
        Self {
            clock,
            next: Some(next),
            end,
        }
    }
}

impl Iterator for MinuteSpans<'_> {
    type Item = (NormalizedTime, u8);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.next.filter(|n| *n <= self.end)?;
        let time = self.clock.at(next);
        let span_end = self
            .end
            .min(minute_start(&time).saturating_add(SECS_PER_MINUTE - 1));
        let last_second = time.second() + (span_end - next) as u8;
        self.next = span_end.checked_add(1);
        Some((time, last_second))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Expression parsing
// ═══════════════════════════════════════════════════════════════

fn insert_value<const MIN: u8, const MAX: u8>(
    mask: &mut FieldMask<MIN, MAX>,
    field: &'static str,
    value: u8,
) -> Result<()> {
    if mask.insert(value) {
        Ok(())
    } else {
        Err(CronError::OutOfRange { field, value }.into())
    }
}

/// Parse one value: a number, or a name from `names` (index + `first`).
fn parse_value(text: &str, field: &'static str, names: &[&str], first: u8) -> Result<u8> {
    if let Ok(value) = text.parse::<u8>() {
        return Ok(value);
    }
    names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(text))
        .map(|idx| idx as u8 + first)
        .ok_or_else(|| CronError::InvalidField(field).into())
}

fn parse_field<const MIN: u8, const MAX: u8>(
    text: &str,
    field: &'static str,
    names: &[&str],
    first: u8,
) -> Result<FieldMask<MIN, MAX>> {
    let mut mask = FieldMask::empty();
    if text == "*" || text == "?" {
        return Ok(mask);
    }

    for part in text.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<u8>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or(CronError::InvalidField(field))?;
                (range, Some(step))
            }
            None => (part, None),
        };

        let (lo, hi) = if range == "*" || range == "?" {
            (MIN, MAX)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (
                parse_value(lo, field, names, first)?,
                parse_value(hi, field, names, first)?,
            )
        } else {
            let value = parse_value(range, field, names, first)?;
            // `a/n` means "from a, every n".
            (value, if step.is_some() { MAX } else { value })
        };
        if lo > hi {
            return Err(CronError::InvalidField(field).into());
        }

        for value in (lo..=hi).step_by(usize::from(step.unwrap_or(1))) {
            insert_value(&mut mask, field, value)?;
        }
    }
    Ok(mask)
}
