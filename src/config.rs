//! Node configuration parameters
//!
//! Tunables for the scheduler loop, Wi-Fi, the clock and the cron replay
//! window.
//! Loaded from JSON at boot or compiled in via `Default`.

use serde::{Deserialize, Serialize};

use crate::adapters::wifi::{self, MAX_PASSWORD_LEN, MAX_SSID_LEN};
use crate::cron::DEFAULT_MAX_REPLAY_MINUTES;
use crate::error::{Error, Result};
use crate::time::clock::MAX_TZ_LEN;
use crate::time::TimeZone;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Scheduler ---
    /// Delay between scheduler ticks (milliseconds)
    pub loop_interval_ms: u32,

    // --- Wi-Fi ---
    /// Access point to join; empty leaves the node offline
    pub wifi_ssid: heapless::String<MAX_SSID_LEN>,
    /// WPA2 passphrase; empty for an open network
    pub wifi_password: heapless::String<MAX_PASSWORD_LEN>,

    // --- Clock ---
    /// POSIX TZ string, e.g. `CET-1CEST,M3.5.0,M10.5.0/3`
    pub timezone: heapless::String<MAX_TZ_LEN>,

    // --- Polling ---
    /// Update interval for polling components without an explicit one
    pub default_update_interval_ms: u32,

    // --- Cron ---
    /// Longest stall (minutes) whose missed minutes are still replayed
    pub cron_max_replay_minutes: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut timezone = heapless::String::new();
        // "UTC0" always fits
        let _ = timezone.push_str("UTC0");
        Self {
            loop_interval_ms: 16, // ~60 Hz
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            timezone,
            default_update_interval_ms: 60_000, // 1/min
            cron_max_replay_minutes: DEFAULT_MAX_REPLAY_MINUTES,
        }
    }
}

impl NodeConfig {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.loop_interval_ms == 0 {
            return Err(Error::Config("loop_interval_ms must be non-zero"));
        }
        if self.default_update_interval_ms == 0 {
            return Err(Error::Config("default_update_interval_ms must be non-zero"));
        }
        if self.cron_max_replay_minutes == 0 {
            return Err(Error::Config("cron_max_replay_minutes must be non-zero"));
        }
        if !self.wifi_ssid.is_empty() {
            wifi::validate_credentials(&self.wifi_ssid, &self.wifi_password)?;
        }
        TimeZone::parse(&self.timezone)?;
        Ok(())
    }

    /// Parse a JSON document and validate it.  Missing fields take defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }
}
