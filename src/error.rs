//! Unified error types for the HomeNode firmware core.
//!
//! A single `Error` enum that every subsystem converts into, so component
//! setup, configuration and parsing all report failures the same way.
//! All variants are `Copy` so they can be stored in component records and
//! passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus transaction (I2C read/write) failed.
    Bus(BusError),
    /// Component registration was rejected.
    Registry(RegistryError),
    /// A POSIX TZ string could not be parsed.
    TimeZone(TimeZoneError),
    /// A cron mask or expression was rejected.
    Cron(CronError),
    /// Wi-Fi credentials were rejected or the station failed to connect.
    Wifi(WifiError),
    /// Component initialisation failed.
    Setup(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::TimeZone(e) => write!(f, "timezone: {e}"),
            Self::Cron(e) => write!(f, "cron: {e}"),
            Self::Wifi(e) => write!(f, "wifi: {e}"),
            Self::Setup(msg) => write!(f, "setup: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Register write was not acknowledged.
    WriteFailed { address: u8, register: u8 },
    /// Register read was not acknowledged or timed out.
    ReadFailed { address: u8, register: u8 },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { address, register } => {
                write!(f, "write to 0x{address:02X} reg 0x{register:02X} failed")
            }
            Self::ReadFailed { address, register } => {
                write!(f, "read from 0x{address:02X} reg 0x{register:02X} failed")
            }
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// All component slots are taken.
    Full,
    /// The same component instance was registered twice.
    Duplicate,
    /// Registration attempted after the setup pass ran.
    AfterSetup,
    /// Component is mutably borrowed elsewhere.
    Busy,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "component table full"),
            Self::Duplicate => write!(f, "component already registered"),
            Self::AfterSetup => write!(f, "registration after setup pass"),
            Self::Busy => write!(f, "component borrowed elsewhere"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Time zone errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneError {
    /// Zone abbreviation missing, too short, or unterminated `<...>`.
    InvalidName,
    /// UTC offset missing or out of range.
    InvalidOffset,
    /// DST transition rule malformed.
    InvalidRule,
    /// Unexpected characters after a complete zone description.
    TrailingInput,
    /// TZ string does not fit the fixed-capacity buffer.
    TooLong,
}

impl fmt::Display for TimeZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid zone name"),
            Self::InvalidOffset => write!(f, "invalid UTC offset"),
            Self::InvalidRule => write!(f, "invalid DST rule"),
            Self::TrailingInput => write!(f, "trailing characters"),
            Self::TooLong => write!(f, "TZ string too long"),
        }
    }
}

impl From<TimeZoneError> for Error {
    fn from(e: TimeZoneError) -> Self {
        Self::TimeZone(e)
    }
}

// ---------------------------------------------------------------------------
// Cron errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronError {
    /// Value outside the field's legal range.
    OutOfRange { field: &'static str, value: u8 },
    /// Field text could not be parsed.
    InvalidField(&'static str),
    /// Expression does not have exactly six fields.
    FieldCount(usize),
    /// Masks cannot change once the trigger has armed.
    AlreadyArmed,
}

impl fmt::Display for CronError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { field, value } => write!(f, "{field} value {value} out of range"),
            Self::InvalidField(field) => write!(f, "cannot parse {field} field"),
            Self::FieldCount(n) => write!(f, "expected 6 fields, got {n}"),
            Self::AlreadyArmed => write!(f, "trigger already armed"),
        }
    }
}

impl From<CronError> for Error {
    fn from(e: CronError) -> Self {
        Self::Cron(e)
    }
}

// ---------------------------------------------------------------------------
// Wi-Fi errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    /// SSID must be 1-32 printable ASCII bytes.
    InvalidSsid,
    /// Password must be empty (open network) or 8-64 bytes.
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid"),
            Self::InvalidPassword => write!(f, "password invalid"),
            Self::ConnectionFailed => write!(f, "connection failed"),
        }
    }
}

impl From<WifiError> for Error {
    fn from(e: WifiError) -> Self {
        Self::Wifi(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
