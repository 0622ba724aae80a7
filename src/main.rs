//! HomeNode Firmware — Main Entry Point
//!
//! Single-threaded cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspStation   SntpEpochSource   Esp32Uptime   LogStateSink     │
//! │  (Station)    (EpochSource)     (Uptime)      (on_state)       │
//! │                                               I2cDriver        │
//! │                                               (embedded-hal)   │
//! │                                                                │
//! │  ──────────────── Component Trait Boundary ──────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  WifiComponent · ClockComponent · CronTrigger          │    │
//! │  │  Polling<Ina3221>                                      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (setup by priority, then round-robin ticks)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use core::cell::RefCell;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::hal::delay::{Delay, FreeRtos};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use homenode::adapters::log_sink::LogStateSink;
use homenode::adapters::time::{Esp32Uptime, SntpEpochSource};
use homenode::adapters::wifi::{EspStation, WifiComponent};
use homenode::config::NodeConfig;
use homenode::cron::CronTrigger;
use homenode::polling::Polling;
use homenode::scheduler::Scheduler;
use homenode::sensors::ina3221::{self, Channel, Ina3221};
use homenode::time::{ClockComponent, Uptime};

/// Optional JSON overrides baked in at build time.
const CONFIG_JSON: Option<&str> = option_env!("HOMENODE_CONFIG_JSON");

/// Nightly housekeeping at 03:00 local time.
const HOUSEKEEPING_CRON: &str = "0 0 3 * * *";

/// Leak a value to obtain the `'static` borrow the scheduler holds for the
/// lifetime of the firmware.
fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

fn load_config() -> NodeConfig {
    match CONFIG_JSON.map(|json| NodeConfig::from_json(json.as_bytes())) {
        Some(Ok(cfg)) => {
            info!("Config loaded from build environment");
            cfg
        }
        Some(Err(e)) => {
            warn!("Config rejected ({}), using defaults", e);
            NodeConfig::default()
        }
        None => NodeConfig::default(),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("╔══════════════════════════════════════╗");
    info!("║  HomeNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    let uptime: &'static dyn Uptime = leak(Esp32Uptime::new());
    let peripherals = Peripherals::take()?;

    // ── 3. Wi-Fi station (sets up before SNTP) ────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let radio = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    let wifi = leak(RefCell::new(WifiComponent::new(
        EspStation::new(radio),
        &config.wifi_ssid,
        &config.wifi_password,
        uptime,
    )?));

    // ── 4. Clock (SNTP starts once Wi-Fi has set up) ──────────
    let clock = leak(RefCell::new(ClockComponent::new(
        Box::new(SntpEpochSource::new()),
        &config.timezone,
    )?));

    // ── 5. Cron automation ────────────────────────────────────
    let mut cron = CronTrigger::from_expression(clock, HOUSEKEEPING_CRON)?;
    cron.set_max_replay_minutes(config.cron_max_replay_minutes);
    cron.add_action(|| info!("Housekeeping: nightly run"));
    let cron = leak(RefCell::new(cron));

    // ── 6. INA3221 power monitor on I2C0 ──────────────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;
    let mut monitor = Ina3221::new(i2c, Delay::new_default(), ina3221::DEFAULT_ADDRESS);
    LogStateSink::attach(monitor.make_bus_voltage_sensor(Channel::Ch1, "Supply Voltage"));
    LogStateSink::attach(monitor.make_current_sensor(Channel::Ch1, "Supply Current"));
    LogStateSink::attach(monitor.make_power_sensor(Channel::Ch1, "Supply Power"));
    let monitor = leak(RefCell::new(Polling::new(
        monitor,
        config.default_update_interval_ms,
        uptime,
    )));

    // ── 7. Scheduler ──────────────────────────────────────────
    let mut scheduler = Scheduler::new();
    scheduler.register(wifi)?;
    scheduler.register(clock)?;
    scheduler.register(cron)?;
    scheduler.register(monitor)?;
    scheduler.run_setup();

    if scheduler.failed_count() > 0 {
        warn!(
            "{} of {} components failed setup",
            scheduler.failed_count(),
            scheduler.len()
        );
    }
    info!("System ready. Entering main loop.");

    // ── 8. Main loop ──────────────────────────────────────────
    let mut last_status = scheduler.app_status();
    loop {
        scheduler.run_tick();

        let status = scheduler.app_status();
        if status != last_status {
            info!(
                "Status: error={} warning={}",
                status.has_error(),
                status.has_warning()
            );
            last_status = status;
        }

        FreeRtos::delay_ms(config.loop_interval_ms);
    }
}
