//! Clock component — the shared source of "now".
//!
//! Wraps an injected [`EpochSource`] (SNTP, an RTC chip, a simulated clock)
//! and decomposes its instant in UTC or in the configured [`TimeZone`].
//! One instance is built at startup and handed by shared reference to every
//! consumer; only configuration code calls [`ClockComponent::set_timezone`].

use log::{info, warn};

use crate::component::{setup_priority, Component, ComponentStatus};
use crate::error::{Result, TimeZoneError};
use crate::time::{NormalizedTime, TimeZone};

/// Maximum stored length of a TZ string.
pub const MAX_TZ_LEN: usize = 64;

/// External provider of the current UTC instant.
pub trait EpochSource {
    /// Start synchronization (e.g. launch the SNTP client).  Called once
    /// from the clock's setup.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Current UTC seconds since 1970, or `None` if not available yet.
    fn epoch(&self) -> Option<i64>;

    /// Setup priority of the clock wrapping this source.  Network sources
    /// override this to start after Wi-Fi.
    fn setup_priority(&self) -> f32 {
        setup_priority::HARDWARE
    }
}

pub struct ClockComponent {
    source: Box<dyn EpochSource>,
    zone: TimeZone,
    tz_spec: heapless::String<MAX_TZ_LEN>,
    synchronized: bool,
}

impl ClockComponent {
    /// Build a clock over `source` using the POSIX TZ string `tz`.
    pub fn new(source: Box<dyn EpochSource>, tz: &str) -> Result<Self> {
        let mut clock = Self {
            source,
            zone: TimeZone::utc(),
            tz_spec: heapless::String::new(),
            synchronized: false,
        };
        clock.set_timezone(tz)?;
        Ok(clock)
    }

    /// Replace the zone used by subsequent [`now`](Self::now) calls.
    ///
    /// On error the previous zone stays in effect.
    pub fn set_timezone(&mut self, tz: &str) -> Result<()> {
        let zone = TimeZone::parse(tz).inspect_err(|e| {
            warn!("Clock: rejected timezone '{}': {}", tz, e);
        })?;
        let mut spec = heapless::String::new();
        spec.push_str(tz.trim()).map_err(|()| TimeZoneError::TooLong)?;

        self.zone = zone;
        self.tz_spec = spec;
        info!("Clock: timezone set to '{}'", self.tz_spec);
        Ok(())
    }

    /// The TZ string currently in use.
    pub fn timezone(&self) -> &str {
        &self.tz_spec
    }

    pub fn zone(&self) -> &TimeZone {
        &self.zone
    }

    /// Current time in the configured zone.
    pub fn now(&self) -> NormalizedTime {
        self.source
            .epoch()
            .map_or_else(NormalizedTime::unsynchronized, |epoch| self.zone.local(epoch))
    }

    /// Current time with no zone or DST correction.
    pub fn utcnow(&self) -> NormalizedTime {
        self.source
            .epoch()
            .map_or_else(NormalizedTime::unsynchronized, NormalizedTime::utc)
    }

    /// Decompose an arbitrary instant in the configured zone.
    pub fn at(&self, epoch: i64) -> NormalizedTime {
        self.zone.local(epoch)
    }

    /// `true` once a valid time has been observed.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }
}

impl Component for ClockComponent {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn setup_priority(&self) -> f32 {
        self.source.setup_priority()
    }

    fn setup(&mut self, _status: &mut ComponentStatus) -> Result<()> {
        self.source.start()
    }

    fn tick(&mut self, _status: &mut ComponentStatus) {
        if self.synchronized {
            return;
        }
        let now = self.now();
        if now.is_valid() {
            self.synchronized = true;
            info!("Clock: synchronized, local time {}", now);
        }
    }

    fn dump_config(&self) {
        info!("Clock: timezone '{}'", self.tz_spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::ManualEpochSource;
    use crate::error::Error;

    fn clock(tz: &str) -> (ClockComponent, ManualEpochSource) {
        let source = ManualEpochSource::new();
        let clock = ClockComponent::new(Box::new(source.clone()), tz).unwrap();
        (clock, source)
    }

    #[test]
    fn unsynchronized_clock_reports_invalid_time() {
        let (clock, _source) = clock("UTC0");
        assert!(!clock.now().is_valid());
        assert!(!clock.utcnow().is_valid());
    }

    #[test]
    fn now_and_utcnow_share_epoch() {
        let (clock, source) = clock("CET-1CEST,M3.5.0,M10.5.0/3");
        source.set(1_721_001_600); // 2024-07-15 00:00 UTC

        let local = clock.now();
        let utc = clock.utcnow();
        assert_eq!(local.epoch_seconds(), utc.epoch_seconds());
        assert_eq!(local, utc);
        assert_eq!((utc.hour(), utc.is_dst()), (0, false));
        assert_eq!((local.hour(), local.is_dst()), (2, true));
    }

    #[test]
    fn set_timezone_keeps_old_zone_on_error() {
        let (mut clock, source) = clock("JST-9");
        source.set(1_721_001_600);
        let before = clock.now();
        let err = clock.set_timezone("not a zone").unwrap_err();
        assert!(matches!(err, Error::TimeZone(_)));
        assert_eq!(clock.timezone(), "JST-9");
        assert_eq!(clock.now().hour(), 9);

        clock.set_timezone("UTC0").unwrap();
        assert_eq!(clock.now().hour(), 0);
        // Earlier values are immutable snapshots.
        assert_eq!(before.hour(), 9);
    }

    #[test]
    fn tick_latches_synchronization() {
        let (mut clock, source) = clock("UTC0");
        let mut status = ComponentStatus::new("clock");
        clock.tick(&mut status);
        assert!(!clock.is_synchronized());

        source.set(1_721_001_600);
        clock.tick(&mut status);
        assert!(clock.is_synchronized());
    }

    #[test]
    fn overlong_timezone_is_rejected() {
        let (mut clock, _source) = clock("UTC0");
        let long = format!("<{}>0", "A".repeat(MAX_TZ_LEN));
        assert_eq!(
            clock.set_timezone(&long),
            Err(Error::TimeZone(TimeZoneError::TooLong))
        );
        assert_eq!(clock.timezone(), "UTC0");
    }

    #[test]
    fn setup_priority_follows_source() {
        struct NetworkSource;
        impl EpochSource for NetworkSource {
            fn epoch(&self) -> Option<i64> {
                None
            }
            fn setup_priority(&self) -> f32 {
                setup_priority::AFTER_WIFI
            }
        }

        let (local, _source) = clock("UTC0");
        assert_eq!(local.setup_priority(), setup_priority::HARDWARE);
        let networked = ClockComponent::new(Box::new(NetworkSource), "UTC0").unwrap();
        assert_eq!(networked.setup_priority(), setup_priority::AFTER_WIFI);
    }
}
