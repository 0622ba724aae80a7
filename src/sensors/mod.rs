//! Sensor endpoints and bus drivers.
//!
//! A [`Sensor`] is the publish boundary between a driver and whatever
//! consumes readings (log sink, network front-end, automations).  Drivers
//! own their endpoints and call [`Sensor::publish_state`] from `update()`.

pub mod ina3221;

use log::debug;

type StateListener = Box<dyn FnMut(f32)>;

/// A named measurement endpoint.
pub struct Sensor {
    name: &'static str,
    unit: &'static str,
    accuracy_decimals: u8,
    state: Option<f32>,
    listeners: Vec<StateListener>,
}

impl Sensor {
    pub fn new(name: &'static str, unit: &'static str, accuracy_decimals: u8) -> Self {
        Self {
            name,
            unit,
            accuracy_decimals,
            state: None,
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn accuracy_decimals(&self) -> u8 {
        self.accuracy_decimals
    }

    /// Last published value, `None` before the first publish.
    pub fn state(&self) -> Option<f32> {
        self.state
    }

    /// Register a listener called with every published value.
    pub fn on_state(&mut self, listener: impl FnMut(f32) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish_state(&mut self, value: f32) {
        debug!(
            "'{}': {:.*} {}",
            self.name,
            usize::from(self.accuracy_decimals),
            value,
            self.unit
        );
        self.state = Some(value);
        for listener in &mut self.listeners {
            listener(value);
        }
    }
}

impl core::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
