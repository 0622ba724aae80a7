//! Time adapters.
//!
//! - **`target_os = "espidf"`**: monotonic uptime from
//!   `esp_timer_get_time()` and wall-clock time from the ESP-IDF SNTP client.
//! - **`not(target_os = "espidf")`**: `std::time` for host-side simulation.
//! - **Manual sources** (all targets): shared cells the caller advances by
//!   hand; used by tests and replay tooling.

use std::cell::Cell;
use std::rc::Rc;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::component::setup_priority;
#[cfg(target_os = "espidf")]
use crate::error::Error;
use crate::error::Result;
use crate::time::{EpochSource, Uptime};

// ── Monotonic uptime ──────────────────────────────────────────

/// Uptime counter for the ESP32 platform.
pub struct Esp32Uptime {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32Uptime {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Uptime {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Uptime for Esp32Uptime {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

// ── Wall-clock epoch ──────────────────────────────────────────

/// Wall-clock source backed by the ESP-IDF SNTP client.
///
/// The system clock starts at 1970 after boot, so readings stay "invalid"
/// until the first SNTP response sets it.  Starts after Wi-Fi, which must
/// have brought up `esp_netif`.
#[cfg(target_os = "espidf")]
pub struct SntpEpochSource {
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
}

#[cfg(target_os = "espidf")]
impl SntpEpochSource {
    pub fn new() -> Self {
        Self { sntp: None }
    }
}

#[cfg(target_os = "espidf")]
impl EpochSource for SntpEpochSource {
    fn start(&mut self) -> Result<()> {
        let sntp = esp_idf_svc::sntp::EspSntp::new_default()
            .map_err(|_| Error::Setup("SNTP client start failed"))?;
        info!("SNTP: client started");
        self.sntp = Some(sntp);
        Ok(())
    }

    fn setup_priority(&self) -> f32 {
        setup_priority::AFTER_WIFI
    }

    fn epoch(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some(tv.tv_sec as i64)
    }
}

/// Host wall clock via `SystemTime`.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEpochSource;

#[cfg(not(target_os = "espidf"))]
impl EpochSource for SystemEpochSource {
    fn epoch(&self) -> Option<i64> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() as i64)
    }
}

// ── Manual sources ────────────────────────────────────────────

/// Epoch source whose instant is set by hand.  Clones share the instant.
#[derive(Debug, Default, Clone)]
pub struct ManualEpochSource {
    epoch: Rc<Cell<Option<i64>>>,
}

impl ManualEpochSource {
    /// Starts unsynchronized.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, epoch: i64) {
        self.epoch.set(Some(epoch));
    }

    /// Move the instant by `secs` (no-op while unsynchronized).
    pub fn advance(&self, secs: i64) {
        if let Some(epoch) = self.epoch.get() {
            self.epoch.set(Some(epoch + secs));
        }
    }

    /// Drop back to the unsynchronized state.
    pub fn clear(&self) {
        self.epoch.set(None);
    }
}

impl EpochSource for ManualEpochSource {
    fn epoch(&self) -> Option<i64> {
        self.epoch.get()
    }
}

/// Uptime counter advanced by hand.  Clones share the counter.
#[derive(Debug, Default, Clone)]
pub struct ManualUptime {
    ms: Rc<Cell<u64>>,
}

impl ManualUptime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.ms.set(ms);
    }
}

impl Uptime for ManualUptime {
    fn uptime_ms(&self) -> u64 {
        self.ms.get()
    }
}
