//! Adapters — concrete implementations of the core's port traits.
//!
//! | Adapter    | Implements          | Connects to                    |
//! |------------|---------------------|--------------------------------|
//! | `log_sink` | Sensor `on_state`   | Serial log output              |
//! | `time`     | EpochSource, Uptime | SNTP, ESP32 system timer, host |
//! | `wifi`     | Component (Station) | ESP-IDF Wi-Fi driver           |

pub mod log_sink;
pub mod time;
pub mod wifi;
