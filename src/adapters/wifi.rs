//! Wi-Fi station-mode adapter.
//!
//! [`WifiComponent`] brings the network up during the setup pass and keeps
//! it up from `tick`.  The radio itself sits behind the [`Station`] port.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspStation`] drives `esp_idf_svc::wifi`.
//! - **all other targets**: callers supply their own [`Station`].
//!
//! ## Reconnection policy
//!
//! A failed or lost connection is retried after an exponential backoff
//! (2 s → 4 s → 8 s … capped at 60 s).  The component carries a warning
//! until the link is back.

use log::{info, warn};

use crate::component::{setup_priority, Component, ComponentStatus};
use crate::error::{Result, WifiError};
use crate::time::Uptime;

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

/// A radio that can join an access point.
pub trait Station {
    /// Join `ssid`.  Blocks until the interface is up or the attempt fails.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<()>;

    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

/// Check station credentials.  An empty password selects an open network.
pub fn validate_credentials(ssid: &str, password: &str) -> Result<()> {
    let printable = ssid.bytes().all(|b| (0x20..=0x7E).contains(&b));
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN || !printable {
        return Err(WifiError::InvalidSsid.into());
    }
    if !password.is_empty() && !(8..=MAX_PASSWORD_LEN).contains(&password.len()) {
        return Err(WifiError::InvalidPassword.into());
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Component
// ───────────────────────────────────────────────────────────────

pub struct WifiComponent<'a, S: Station> {
    station: S,
    ssid: heapless::String<MAX_SSID_LEN>,
    password: heapless::String<MAX_PASSWORD_LEN>,
    uptime: &'a dyn Uptime,
    state: WifiState,
    backoff_ms: u32,
    retry_at_ms: u64,
}

impl<'a, S: Station> WifiComponent<'a, S> {
    /// An empty `ssid` is accepted here; setup then fails with
    /// [`WifiError::NoCredentials`].
    pub fn new(station: S, ssid: &str, password: &str, uptime: &'a dyn Uptime) -> Result<Self> {
        if !ssid.is_empty() {
            validate_credentials(ssid, password)?;
        }
        let mut stored_ssid = heapless::String::new();
        stored_ssid
            .push_str(ssid)
            .map_err(|()| WifiError::InvalidSsid)?;
        let mut stored_password = heapless::String::new();
        stored_password
            .push_str(password)
            .map_err(|()| WifiError::InvalidPassword)?;

        Ok(Self {
            station,
            ssid: stored_ssid,
            password: stored_password,
            uptime,
            state: WifiState::Disconnected,
            backoff_ms: INITIAL_BACKOFF_MS,
            retry_at_ms: 0,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn attempt(&mut self, status: &mut ComponentStatus) {
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.station.connect(&self.ssid, &self.password) {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_ms = INITIAL_BACKOFF_MS;
                status.clear_warning();
                info!("WiFi: connected to '{}'", self.ssid);
            }
            Err(e) => {
                let attempt = match self.state {
                    WifiState::Reconnecting { attempt } => attempt + 1,
                    _ => 0,
                };
                self.state = WifiState::Reconnecting { attempt };
                self.retry_at_ms = self.uptime.uptime_ms() + u64::from(self.backoff_ms);
                warn!("WiFi: {} (attempt {}, retry in {} ms)", e, attempt, self.backoff_ms);
                self.backoff_ms = self.backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                status.set_warning();
            }
        }
    }
}

impl<S: Station> Component for WifiComponent<'_, S> {
    fn name(&self) -> &'static str {
        "wifi"
    }

    fn setup_priority(&self) -> f32 {
        setup_priority::WIFI
    }

    fn setup(&mut self, status: &mut ComponentStatus) -> Result<()> {
        if self.ssid.is_empty() {
            return Err(WifiError::NoCredentials.into());
        }
        self.attempt(status);
        Ok(())
    }

    fn tick(&mut self, status: &mut ComponentStatus) {
        match self.state {
            WifiState::Connected => {
                if !self.station.is_connected() {
                    warn!("WiFi: connection lost, reconnecting");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.retry_at_ms = self.uptime.uptime_ms();
                    status.set_warning();
                }
            }
            WifiState::Reconnecting { .. } => {
                if self.uptime.uptime_ms() >= self.retry_at_ms {
                    self.attempt(status);
                }
            }
            WifiState::Disconnected => {}
        }
    }

    fn dump_config(&self) {
        let auth = if self.password.is_empty() { "open" } else { "WPA2" };
        info!("WiFi: SSID '{}' ({})", self.ssid, auth);
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspStation;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    use super::Station;
    use crate::error::{Result, WifiError};

    /// Station backed by the ESP-IDF Wi-Fi driver.  Creating the driver
    /// brings up `esp_netif`, which SNTP needs as well.
    pub struct EspStation {
        wifi: BlockingWifi<EspWifi<'static>>,
    }

    impl EspStation {
        pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
            Self { wifi }
        }
    }

    impl Station for EspStation {
        fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
            let config = Configuration::Client(ClientConfiguration {
                ssid: ssid.try_into().map_err(|()| WifiError::InvalidSsid)?,
                password: password.try_into().map_err(|()| WifiError::InvalidPassword)?,
                auth_method: if password.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            });
            self.wifi
                .set_configuration(&config)
                .map_err(|_| WifiError::ConnectionFailed)?;
            if !self.wifi.is_started().unwrap_or(false) {
                self.wifi.start().map_err(|_| WifiError::ConnectionFailed)?;
            }
            self.wifi.connect().map_err(|_| WifiError::ConnectionFailed)?;
            self.wifi
                .wait_netif_up()
                .map_err(|_| WifiError::ConnectionFailed)?;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::ManualUptime;
    use crate::error::Error;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Scripted station: each `connect` pops the next outcome (success once
    /// the script runs out).  `link` is shared so tests can drop it.
    struct ScriptedStation {
        outcomes: VecDeque<bool>,
        link: Rc<Cell<bool>>,
        attempts: Rc<Cell<u32>>,
    }

    impl Station for ScriptedStation {
        fn connect(&mut self, _ssid: &str, _password: &str) -> Result<()> {
            self.attempts.set(self.attempts.get() + 1);
            let ok = self.outcomes.pop_front().unwrap_or(true);
            self.link.set(ok);
            if ok { Ok(()) } else { Err(WifiError::ConnectionFailed.into()) }
        }

        fn is_connected(&self) -> bool {
            self.link.get()
        }
    }

    fn station(outcomes: &[bool]) -> (ScriptedStation, Rc<Cell<bool>>, Rc<Cell<u32>>) {
        let link = Rc::new(Cell::new(false));
        let attempts = Rc::new(Cell::new(0));
        let s = ScriptedStation {
            outcomes: outcomes.iter().copied().collect(),
            link: Rc::clone(&link),
            attempts: Rc::clone(&attempts),
        };
        (s, link, attempts)
    }

    #[test]
    fn rejects_bad_credentials() {
        assert_eq!(
            validate_credentials("", "password123"),
            Err(Error::Wifi(WifiError::InvalidSsid))
        );
        assert_eq!(
            validate_credentials(&"x".repeat(33), ""),
            Err(Error::Wifi(WifiError::InvalidSsid))
        );
        assert_eq!(
            validate_credentials("HomeNet", "short"),
            Err(Error::Wifi(WifiError::InvalidPassword))
        );
        assert!(validate_credentials("OpenCafe", "").is_ok());
        assert!(validate_credentials("HomeNet", "mysecret8").is_ok());
    }

    #[test]
    fn setup_without_credentials_fails() {
        let uptime = ManualUptime::new();
        let (s, _, attempts) = station(&[]);
        let mut wifi = WifiComponent::new(s, "", "", &uptime).unwrap();
        let mut status = ComponentStatus::new("wifi");
        assert_eq!(
            wifi.setup(&mut status),
            Err(Error::Wifi(WifiError::NoCredentials))
        );
        assert_eq!(attempts.get(), 0);
    }

    #[test]
    fn connects_during_setup() {
        let uptime = ManualUptime::new();
        let (s, _, attempts) = station(&[true]);
        let mut wifi = WifiComponent::new(s, "HomeNet", "mysecret8", &uptime).unwrap();
        let mut status = ComponentStatus::new("wifi");
        wifi.setup(&mut status).unwrap();
        assert!(wifi.is_connected());
        assert!(!status.has_warning());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn failed_connect_retries_with_backoff() {
        let uptime = ManualUptime::new();
        let (s, _, attempts) = station(&[false, false, true]);
        let mut wifi = WifiComponent::new(s, "HomeNet", "", &uptime).unwrap();
        let mut status = ComponentStatus::new("wifi");

        wifi.setup(&mut status).unwrap();
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 0 });
        assert!(status.has_warning());

        uptime.advance(1_999);
        wifi.tick(&mut status);
        assert_eq!(attempts.get(), 1);

        uptime.advance(1);
        wifi.tick(&mut status);
        assert_eq!(attempts.get(), 2);
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 1 });

        // Backoff doubled to 4 s.
        uptime.advance(3_999);
        wifi.tick(&mut status);
        assert_eq!(attempts.get(), 2);
        uptime.advance(1);
        wifi.tick(&mut status);
        assert_eq!(attempts.get(), 3);
        assert!(wifi.is_connected());
        assert!(!status.has_warning());
    }

    #[test]
    fn lost_link_reconnects_on_next_tick() {
        let uptime = ManualUptime::new();
        let (s, link, attempts) = station(&[true]);
        let mut wifi = WifiComponent::new(s, "HomeNet", "mysecret8", &uptime).unwrap();
        let mut status = ComponentStatus::new("wifi");
        wifi.setup(&mut status).unwrap();

        link.set(false);
        wifi.tick(&mut status);
        assert!(status.has_warning());
        wifi.tick(&mut status);
        assert_eq!(attempts.get(), 2);
        assert!(wifi.is_connected());
        assert!(!status.has_warning());
    }
}
