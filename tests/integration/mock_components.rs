//! Mock components for integration tests.
//!
//! Every call is appended to a shared journal so tests can assert on the
//! exact setup and tick order across components.

use std::cell::RefCell;
use std::rc::Rc;

use homenode::component::{Component, ComponentStatus};
use homenode::error::{Error, Result};

pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

// ── Setup behaviour ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetupOutcome {
    Ok,
    Err,
    MarkFailed,
}

// ── Recorder ──────────────────────────────────────────────────

pub struct Recorder {
    name: &'static str,
    priority: f32,
    outcome: SetupOutcome,
    /// Mark failed during this (1-based) tick, if set.
    fail_on_tick: Option<u32>,
    ticks: u32,
    journal: Journal,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new(name: &'static str, priority: f32, journal: &Journal) -> Self {
        Self {
            name,
            priority,
            outcome: SetupOutcome::Ok,
            fail_on_tick: None,
            ticks: 0,
            journal: Rc::clone(journal),
        }
    }

    pub fn with_outcome(mut self, outcome: SetupOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn failing_on_tick(mut self, tick: u32) -> Self {
        self.fail_on_tick = Some(tick);
        self
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

impl Component for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn setup_priority(&self) -> f32 {
        self.priority
    }

    fn setup(&mut self, status: &mut ComponentStatus) -> Result<()> {
        self.journal.borrow_mut().push(format!("setup:{}", self.name));
        match self.outcome {
            SetupOutcome::Ok => Ok(()),
            SetupOutcome::Err => Err(Error::Setup("mock setup error")),
            SetupOutcome::MarkFailed => {
                status.mark_failed();
                Ok(())
            }
        }
    }

    fn tick(&mut self, status: &mut ComponentStatus) {
        self.ticks += 1;
        self.journal.borrow_mut().push(format!("tick:{}", self.name));
        if self.fail_on_tick == Some(self.ticks) {
            status.mark_failed();
        }
    }
}

/// Journal entries with the given prefix, prefix stripped.
#[allow(dead_code)]
pub fn entries(journal: &Journal, prefix: &str) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter_map(|e| e.strip_prefix(prefix).map(str::to_owned))
        .collect()
}
