//! INA3221 three-channel shunt and bus voltage monitor (I2C).
//!
//! Each channel can expose up to four endpoints: bus voltage, shunt voltage,
//! current and power.  Only channels with at least one endpoint are enabled
//! in the config register, and only the registers an endpoint needs are read.
//!
//! Address strapping: A0 = GND → 0x40, VS → 0x41, SDA → 0x42, SCL → 0x43.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::component::{setup_priority, ComponentStatus};
use crate::error::{BusError, Result};
use crate::polling::PollingComponent;
use crate::sensors::Sensor;

pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Shunt resistor fitted on the reference board.
pub const DEFAULT_SHUNT_OHMS: f32 = 0.1;

const REG_CONFIG: u8 = 0x00;

const CONFIG_RESET: u16 = 0x8000;
/// 1024-sample averaging.
const CONFIG_AVG_1024: u16 = 0b111 << 9;
/// 8.244 ms bus conversion.
const CONFIG_VBUS_CT_8MS: u16 = 0b111 << 6;
/// 8.244 ms shunt conversion.
const CONFIG_VSH_CT_8MS: u16 = 0b111 << 3;
/// Shunt and bus, continuous.
const CONFIG_MODE_CONTINUOUS: u16 = 0b111;

/// Bus register LSB is 8 mV in bits 15..3, i.e. 1 mV per raw count.
const BUS_VOLTS_PER_COUNT: f32 = 0.001;
/// Shunt register LSB is 40 µV in bits 15..3, i.e. 5 µV per raw count.
/// Scaling the unshifted word by 40 µV would read eight times high.
const SHUNT_VOLTS_PER_COUNT: f32 = 0.000_005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ch1,
    Ch2,
    Ch3,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Ch1, Self::Ch2, Self::Ch3];

    fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
            Self::Ch3 => 2,
        }
    }

    fn shunt_register(self) -> u8 {
        0x01 + 2 * self.index() as u8
    }

    fn bus_register(self) -> u8 {
        0x02 + 2 * self.index() as u8
    }

    fn enable_bit(self) -> u16 {
        0x4000 >> self.index()
    }
}

struct ChannelSensors {
    bus_voltage: Option<Sensor>,
    shunt_voltage: Option<Sensor>,
    current: Option<Sensor>,
    power: Option<Sensor>,
    shunt_ohms: f32,
}

impl Default for ChannelSensors {
    fn default() -> Self {
        Self {
            bus_voltage: None,
            shunt_voltage: None,
            current: None,
            power: None,
            shunt_ohms: DEFAULT_SHUNT_OHMS,
        }
    }
}

impl ChannelSensors {
    fn exists(&self) -> bool {
        self.bus_voltage.is_some()
            || self.shunt_voltage.is_some()
            || self.current.is_some()
            || self.power.is_some()
    }

    fn needs_bus(&self) -> bool {
        self.bus_voltage.is_some() || self.power.is_some()
    }

    fn needs_shunt(&self) -> bool {
        self.shunt_voltage.is_some() || self.current.is_some() || self.power.is_some()
    }
}

pub struct Ina3221<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    channels: [ChannelSensors; 3],
}

impl<I2C: I2c, D: DelayNs> Ina3221<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            channels: Default::default(),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_shunt_resistance(&mut self, channel: Channel, ohms: f32) {
        self.channels[channel.index()].shunt_ohms = ohms;
    }

    pub fn make_bus_voltage_sensor(&mut self, channel: Channel, name: &'static str) -> &mut Sensor {
        self.channels[channel.index()]
            .bus_voltage
            .insert(Sensor::new(name, "V", 2))
    }

    pub fn make_shunt_voltage_sensor(&mut self, channel: Channel, name: &'static str) -> &mut Sensor {
        self.channels[channel.index()]
            .shunt_voltage
            .insert(Sensor::new(name, "V", 2))
    }

    pub fn make_current_sensor(&mut self, channel: Channel, name: &'static str) -> &mut Sensor {
        self.channels[channel.index()]
            .current
            .insert(Sensor::new(name, "A", 2))
    }

    pub fn make_power_sensor(&mut self, channel: Channel, name: &'static str) -> &mut Sensor {
        self.channels[channel.index()]
            .power
            .insert(Sensor::new(name, "W", 2))
    }

    pub fn bus_voltage_sensor(&self, channel: Channel) -> Option<&Sensor> {
        self.channels[channel.index()].bus_voltage.as_ref()
    }

    pub fn shunt_voltage_sensor(&self, channel: Channel) -> Option<&Sensor> {
        self.channels[channel.index()].shunt_voltage.as_ref()
    }

    pub fn current_sensor(&self, channel: Channel) -> Option<&Sensor> {
        self.channels[channel.index()].current.as_ref()
    }

    pub fn power_sensor(&self, channel: Channel) -> Option<&Sensor> {
        self.channels[channel.index()].power.as_ref()
    }

    /// Config word written at setup: enabled channels plus fixed
    /// averaging, conversion time and mode.
    pub fn config_word(&self) -> u16 {
        Channel::ALL
            .iter()
            .filter(|ch| self.channels[ch.index()].exists())
            .fold(
                CONFIG_AVG_1024 | CONFIG_VBUS_CT_8MS | CONFIG_VSH_CT_8MS | CONFIG_MODE_CONTINUOUS,
                |word, ch| word | ch.enable_bit(),
            )
    }

    /// Give the bus back (e.g. to share it after a failed setup).
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<()> {
        let address = self.address;
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(address, &[register, hi, lo])
            .map_err(|_| BusError::WriteFailed { address, register })?;
        Ok(())
    }

    fn read_register(&mut self, register: u8) -> Result<i16> {
        let address = self.address;
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(address, &[register], &mut buf)
            .map_err(|_| BusError::ReadFailed { address, register })?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Read and publish one channel.
    fn update_channel(&mut self, channel: Channel) -> Result<()> {
        let idx = channel.index();
        if !self.channels[idx].exists() {
            return Ok(());
        }

        let mut bus_volts = f32::NAN;
        let mut current = f32::NAN;

        if self.channels[idx].needs_bus() {
            let raw = self.read_register(channel.bus_register())?;
            bus_volts = f32::from(raw) * BUS_VOLTS_PER_COUNT;
            if let Some(sensor) = self.channels[idx].bus_voltage.as_mut() {
                sensor.publish_state(bus_volts);
            }
        }

        if self.channels[idx].needs_shunt() {
            let raw = self.read_register(channel.shunt_register())?;
            let shunt_volts = f32::from(raw) * SHUNT_VOLTS_PER_COUNT;
            let sensors = &mut self.channels[idx];
            if let Some(sensor) = sensors.shunt_voltage.as_mut() {
                sensor.publish_state(shunt_volts);
            }
            current = shunt_volts / sensors.shunt_ohms;
            if let Some(sensor) = sensors.current.as_mut() {
                sensor.publish_state(current);
            }
        }

        if let Some(sensor) = self.channels[idx].power.as_mut() {
            sensor.publish_state(bus_volts * current);
        }
        Ok(())
    }
}

impl<I2C: I2c, D: DelayNs> PollingComponent for Ina3221<I2C, D> {
    fn name(&self) -> &'static str {
        "ina3221"
    }

    fn setup_priority(&self) -> f32 {
        setup_priority::HARDWARE_LATE
    }

    fn setup(&mut self, _status: &mut ComponentStatus) -> Result<()> {
        info!("INA3221: setting up at 0x{:02X}", self.address);
        self.write_register(REG_CONFIG, CONFIG_RESET)?;
        self.delay.delay_ms(1);
        self.write_register(REG_CONFIG, self.config_word())
    }

    fn update(&mut self, status: &mut ComponentStatus) {
        for channel in Channel::ALL {
            if let Err(e) = self.update_channel(channel) {
                warn!("INA3221: {}", e);
                status.set_warning();
                return;
            }
        }
        status.clear_warning();
    }

    fn dump_config(&self) {
        info!("INA3221: address 0x{:02X}", self.address);
        for channel in Channel::ALL {
            let sensors = &self.channels[channel.index()];
            if sensors.exists() {
                info!(
                    "INA3221: {:?} shunt {} ohm (bus={} shunt={} current={} power={})",
                    channel,
                    sensors.shunt_ohms,
                    sensors.bus_voltage.is_some(),
                    sensors.shunt_voltage.is_some(),
                    sensors.current.is_some(),
                    sensors.power.is_some(),
                );
            }
        }
    }
}
