//! HomeNode firmware core.
//!
//! Component scheduling, polling, wall-clock time and cron automations for
//! a single-threaded MCU main loop.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod automation;
pub mod component;
pub mod config;
pub mod cron;
pub mod error;
pub mod polling;
pub mod scheduler;
pub mod time;

pub mod adapters;
pub mod sensors;

pub use error::{Error, Result};
