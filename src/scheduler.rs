//! Cooperative component scheduler.
//!
//! Owns one registration record per component and drives two passes:
//! the one-time setup pass (priority order) and the per-tick loop pass
//! (registration order).  The scheduler does not own the components; it
//! holds shared `RefCell` references to instances that live for the whole
//! process, so other components (e.g. a cron trigger reading the clock)
//! can hold references to the same instances.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  register(c, priority)  ──▶  [ Entry { c, priority, status } ] │
//! │                                                              │
//! │  run_setup():  sort by priority desc (stable) ──▶ c.setup()   │
//! │                 Err / mark_failed ──▶ status = Failed         │
//! │                                                              │
//! │  run_tick():   for each entry in registration order           │
//! │                 status == Loop ──▶ c.tick(&mut status)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::ptr;

use heapless::Vec;
use log::{debug, error, info, warn};

use crate::component::{Component, ComponentState, ComponentStatus};
use crate::error::{RegistryError, Result};

// ═══════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════

/// Maximum number of registered components (stack-allocated).
pub const MAX_COMPONENTS: usize = 32;

/// Shared handle to a component that outlives the scheduler.
pub type ComponentRef<'a> = &'a RefCell<dyn Component + 'a>;

/// Index of a registered component, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Aggregated status bits for a status LED or health report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppStatus(u8);

impl AppStatus {
    pub const WARNING: u8 = 0b0000_0001;
    pub const ERROR: u8 = 0b0000_0010;

    pub fn has_error(self) -> bool {
        self.0 & Self::ERROR != 0
    }

    pub fn has_warning(self) -> bool {
        self.0 & Self::WARNING != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Internal bookkeeping for a registered component.
struct Entry<'a> {
    component: ComponentRef<'a>,
    priority: f32,
    status: ComponentStatus,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<'a> {
    entries: Vec<Entry<'a>, MAX_COMPONENTS>,
    setup_done: bool,
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            setup_done: false,
        }
    }

    /// Register a component at its own [`Component::setup_priority`].
    pub fn register(&mut self, component: ComponentRef<'a>) -> Result<ComponentId> {
        let priority = component
            .try_borrow()
            .map_err(|_| RegistryError::Busy)?
            .setup_priority();
        self.register_with_priority(component, priority)
    }

    /// Register a component with an explicit setup priority.
    pub fn register_with_priority(
        &mut self,
        component: ComponentRef<'a>,
        priority: f32,
    ) -> Result<ComponentId> {
        if self.setup_done {
            error!("Scheduler: registration after setup pass rejected");
            return Err(RegistryError::AfterSetup.into());
        }
        if self
            .entries
            .iter()
            .any(|e| ptr::addr_eq(ptr::from_ref(e.component), ptr::from_ref(component)))
        {
            error!("Scheduler: component registered twice");
            return Err(RegistryError::Duplicate.into());
        }

        let name = component
            .try_borrow()
            .map_err(|_| RegistryError::Busy)?
            .name();
        let id = ComponentId(self.entries.len());
        self.entries
            .push(Entry {
                component,
                priority,
                status: ComponentStatus::new(name),
            })
            .map_err(|_| RegistryError::Full)?;
        debug!("Scheduler: registered '{}' (priority {:.1}) as #{}", name, priority, id.0);
        Ok(id)
    }

    /// Run every component's setup exactly once, highest priority first.
    ///
    /// Ties keep registration order.  A component whose setup returns
    /// `Err` or calls `mark_failed` is never called again; the pass
    /// continues with the remaining components.
    pub fn run_setup(&mut self) {
        if self.setup_done {
            warn!("Scheduler: setup pass already ran");
            return;
        }
        self.setup_done = true;

        for idx in self.setup_order() {
            let entry = &mut self.entries[idx];
            let cell = entry.component;
            let name = entry.status.name();

            let Ok(mut component) = cell.try_borrow_mut() else {
                error!("Scheduler: '{}' is borrowed during setup", name);
                entry.status.mark_failed();
                continue;
            };

            info!("Scheduler: setting up '{}' (priority {:.1})", name, entry.priority);
            entry.status.advance(ComponentState::Setup);
            match component.setup(&mut entry.status) {
                Ok(()) if !entry.status.is_failed() => {
                    entry.status.advance(ComponentState::Loop);
                    component.dump_config();
                }
                Ok(()) => {}
                Err(e) => {
                    error!("Scheduler: setup of '{}' failed: {}", name, e);
                    entry.status.mark_failed();
                }
            }
        }

        info!(
            "Scheduler: setup complete, {} of {} components running",
            self.entries.len() - self.failed_count(),
            self.entries.len()
        );
    }

    /// Run one loop pass over all healthy components in registration order.
    ///
    /// A component that marks itself failed mid-tick finishes the current
    /// call; it is skipped from the next pass on.
    pub fn run_tick(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.status.state() != ComponentState::Loop {
                continue;
            }
            let cell = entry.component;
            match cell.try_borrow_mut() {
                Ok(mut component) => component.tick(&mut entry.status),
                Err(_) => warn!("Scheduler: '{}' busy, skipped this tick", entry.status.name()),
            }
        }
    }

    /// Status record of a registered component.
    pub fn status(&self, id: ComponentId) -> Option<&ComponentStatus> {
        self.entries.get(id.0).map(|e| &e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_failed()).count()
    }

    /// OR of every component's error/warning state.
    pub fn app_status(&self) -> AppStatus {
        let bits = self.entries.iter().fold(0, |acc, e| {
            let mut bits = acc;
            if e.status.is_failed() {
                bits |= AppStatus::ERROR;
            }
            if e.status.has_warning() {
                bits |= AppStatus::WARNING;
            }
            bits
        });
        AppStatus(bits)
    }

    /// Entry indices sorted by priority descending, registration order on ties.
    fn setup_order(&self) -> Vec<usize, MAX_COMPONENTS> {
        let mut order: Vec<usize, MAX_COMPONENTS> = (0..self.entries.len()).collect();
        order.sort_unstable_by(|&a, &b| {
            self.entries[b]
                .priority
                .total_cmp(&self.entries[a].priority)
                .then(a.cmp(&b))
        });
        order
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
