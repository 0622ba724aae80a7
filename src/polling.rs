//! Rate-limited components.
//!
//! [`Polling`] wraps a [`PollingComponent`] and gates its `update()` behind
//! a minimum interval measured on an [`Uptime`] counter.  The wrapped handler
//! never runs twice inside one interval; if the scheduler's own cadence is
//! coarser it simply runs late.

use log::info;

use crate::component::{setup_priority, Component, ComponentStatus};
use crate::error::Result;
use crate::time::Uptime;

/// A component whose per-tick work is expensive and must be rate-limited.
pub trait PollingComponent {
    fn name(&self) -> &'static str;

    fn setup_priority(&self) -> f32 {
        setup_priority::DATA
    }

    fn setup(&mut self, _status: &mut ComponentStatus) -> Result<()> {
        Ok(())
    }

    /// Called at most once per configured interval.
    fn update(&mut self, status: &mut ComponentStatus);

    fn dump_config(&self) {}
}

pub struct Polling<'a, C> {
    inner: C,
    interval_ms: u32,
    /// `None` until the first update, which runs on the first tick.
    last_run_ms: Option<u64>,
    uptime: &'a dyn Uptime,
}

impl<'a, C: PollingComponent> Polling<'a, C> {
    pub fn new(inner: C, interval_ms: u32, uptime: &'a dyn Uptime) -> Self {
        Self {
            inner,
            interval_ms,
            last_run_ms: None,
            uptime,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: PollingComponent> Component for Polling<'_, C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn setup_priority(&self) -> f32 {
        self.inner.setup_priority()
    }

    fn setup(&mut self, status: &mut ComponentStatus) -> Result<()> {
        self.inner.setup(status)
    }

    fn tick(&mut self, status: &mut ComponentStatus) {
        let now = self.uptime.uptime_ms();
        if let Some(last) = self.last_run_ms {
            if now.saturating_sub(last) < u64::from(self.interval_ms) {
                return;
            }
        }
        self.last_run_ms = Some(now);
        self.inner.update(status);
    }

    fn dump_config(&self) {
        info!("{}: update interval {} ms", self.inner.name(), self.interval_ms);
        self.inner.dump_config();
    }
}
