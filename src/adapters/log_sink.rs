//! Log-based state sink adapter.
//!
//! Forwards every value a [`Sensor`] publishes to the serial logger.
//! A network front-end would attach to the same `on_state` hook.

use log::info;

use crate::sensors::Sensor;

/// Adapter that logs every published sensor state to the serial console.
pub struct LogStateSink;

impl LogStateSink {
    /// Subscribe a logging listener to `sensor`.
    pub fn attach(sensor: &mut Sensor) {
        let name = sensor.name();
        let unit = sensor.unit();
        let decimals = usize::from(sensor.accuracy_decimals());
        sensor.on_state(move |value| {
            info!("STATE | {} = {:.*} {}", name, decimals, value, unit);
        });
    }
}
