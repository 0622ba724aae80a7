//! Component boundary — the contract every driver plugs into.
//!
//! A component has a one-time [`setup`](Component::setup) phase and a
//! recurring [`tick`](Component::tick) phase.  The [`Scheduler`] owns one
//! [`ComponentStatus`] record per registered component and lends it to the
//! component on every call, which is the only way a component can mark
//! itself failed or raise a warning.
//!
//! [`Scheduler`]: crate::scheduler::Scheduler

use log::{error, info, warn};

use crate::error::Result;

/// Setup ordering keys.  Higher values run their setup first.
pub mod setup_priority {
    /// Bus/transport initialisers (I2C, SPI, UART).
    pub const BUS: f32 = 1000.0;
    /// GPIO expanders and other I/O providers.
    pub const IO: f32 = 900.0;
    /// Hardware drivers that talk directly to a bus.
    pub const HARDWARE: f32 = 800.0;
    /// Hardware that needs other hardware initialised first.
    pub const HARDWARE_LATE: f32 = 700.0;
    /// Components that only process data (the default).
    pub const DATA: f32 = 600.0;
    /// Components that consume data from other components.
    pub const PROCESSOR: f32 = 400.0;
    pub const WIFI: f32 = 250.0;
    pub const AFTER_WIFI: f32 = 200.0;
    pub const AFTER_CONNECTION: f32 = 100.0;
    pub const LATE: f32 = -100.0;
}

/// Lifecycle position of a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Registered, setup not yet run.
    Construction,
    /// Inside its setup call.
    Setup,
    /// Setup succeeded; receives ticks.
    Loop,
    /// Terminal.  Never called again.
    Failed,
}

/// Per-component status record owned by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct ComponentStatus {
    name: &'static str,
    state: ComponentState,
    warning: bool,
}

impl ComponentStatus {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ComponentState::Construction,
            warning: false,
        }
    }

    /// Mark the component as failed.  Sticky for the rest of the process.
    pub fn mark_failed(&mut self) {
        if self.state != ComponentState::Failed {
            error!("Component '{}' was marked as failed", self.name);
        }
        self.state = ComponentState::Failed;
    }

    /// Raise the advisory warning flag.
    pub fn set_warning(&mut self) {
        if !self.warning {
            warn!("Component '{}' set warning flag", self.name);
        }
        self.warning = true;
    }

    /// Clear the advisory warning flag.
    pub fn clear_warning(&mut self) {
        if self.warning {
            info!("Component '{}' cleared warning flag", self.name);
        }
        self.warning = false;
    }

    pub fn is_failed(&self) -> bool {
        self.state == ComponentState::Failed
    }

    pub fn has_warning(&self) -> bool {
        self.warning
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Scheduler-only transition; never leaves `Failed`.
    pub(crate) fn advance(&mut self, next: ComponentState) {
        if self.state != ComponentState::Failed {
            self.state = next;
        }
    }
}

/// A unit with an initialisation phase and a recurring per-tick phase.
pub trait Component {
    /// Short name used in log lines and status reports.
    fn name(&self) -> &'static str;

    /// Ordering key for the setup pass.
    fn setup_priority(&self) -> f32 {
        setup_priority::DATA
    }

    /// One-time initialisation.  Returning `Err` marks the component failed.
    fn setup(&mut self, _status: &mut ComponentStatus) -> Result<()> {
        Ok(())
    }

    /// Per-tick work.  Must run in bounded time.
    fn tick(&mut self, status: &mut ComponentStatus);

    /// Log the component's configuration once after a successful setup.
    fn dump_config(&self) {}
}
