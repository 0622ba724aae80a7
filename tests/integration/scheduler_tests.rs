//! Integration tests for the scheduler's setup and loop passes.

use std::cell::RefCell;

use homenode::adapters::time::ManualEpochSource;
use homenode::component::{setup_priority, ComponentState};
use homenode::error::{Error, RegistryError};
use homenode::scheduler::{Scheduler, MAX_COMPONENTS};
use homenode::time::ClockComponent;

use crate::mock_components::{entries, journal, Recorder, SetupOutcome};

// ── Setup ordering ────────────────────────────────────────────

#[test]
fn setup_runs_by_priority_then_ticks_in_registration_order() {
    let log = journal();
    let wifi = RefCell::new(Recorder::new("wifi", setup_priority::WIFI, &log));
    let bus = RefCell::new(Recorder::new("i2c", setup_priority::BUS, &log));
    let late = RefCell::new(Recorder::new("web", setup_priority::LATE, &log));
    let data = RefCell::new(Recorder::new("filter", setup_priority::DATA, &log));

    let mut sched = Scheduler::new();
    for c in [&wifi, &bus, &late, &data] {
        sched.register(c).unwrap();
    }
    sched.run_setup();
    sched.run_tick();

    assert_eq!(entries(&log, "setup:"), ["i2c", "filter", "wifi", "web"]);
    assert_eq!(entries(&log, "tick:"), ["wifi", "i2c", "web", "filter"]);
}

#[test]
fn clock_sets_up_before_data_components() {
    let log = journal();
    let source = ManualEpochSource::new();
    let clock = RefCell::new(ClockComponent::new(Box::new(source), "UTC0").unwrap());
    let consumer = RefCell::new(Recorder::new("consumer", setup_priority::DATA, &log));
    let hw_late = RefCell::new(Recorder::new("sensor", setup_priority::HARDWARE_LATE, &log));

    let mut sched = Scheduler::new();
    sched.register(&consumer).unwrap();
    sched.register(&hw_late).unwrap();
    let clock_id = sched.register(&clock).unwrap();
    sched.run_setup();

    assert_eq!(entries(&log, "setup:"), ["sensor", "consumer"]);
    assert_eq!(
        sched.status(clock_id).map(|s| s.state()),
        Some(ComponentState::Loop)
    );
}

// ── Failure containment ───────────────────────────────────────

#[test]
fn failed_components_are_contained() {
    let log = journal();
    let a = RefCell::new(Recorder::new("a", 10.0, &log).with_outcome(SetupOutcome::Err));
    let b = RefCell::new(Recorder::new("b", 5.0, &log).with_outcome(SetupOutcome::MarkFailed));
    let c = RefCell::new(Recorder::new("c", 1.0, &log).failing_on_tick(2));
    let d = RefCell::new(Recorder::new("d", 0.0, &log));

    let mut sched = Scheduler::new();
    let ids: Vec<_> = [&a, &b, &c, &d]
        .into_iter()
        .map(|r| sched.register(r).unwrap())
        .collect();
    sched.run_setup();
    for _ in 0..5 {
        sched.run_tick();
    }

    assert_eq!(entries(&log, "setup:"), ["a", "b", "c", "d"]);
    assert_eq!(a.borrow().ticks(), 0);
    assert_eq!(b.borrow().ticks(), 0);
    assert_eq!(c.borrow().ticks(), 2);
    assert_eq!(d.borrow().ticks(), 5);

    let states: Vec<_> = ids.iter().map(|id| sched.status(*id).unwrap().state()).collect();
    assert_eq!(
        states,
        [
            ComponentState::Failed,
            ComponentState::Failed,
            ComponentState::Failed,
            ComponentState::Loop
        ]
    );
    assert_eq!(sched.failed_count(), 3);
    assert!(sched.app_status().has_error());
}

#[test]
fn setup_runs_exactly_once() {
    let log = journal();
    let a = RefCell::new(Recorder::new("a", 0.0, &log));
    let mut sched = Scheduler::new();
    sched.register(&a).unwrap();

    sched.run_tick();
    assert!(log.borrow().is_empty(), "no ticks before setup");

    sched.run_setup();
    sched.run_setup();
    assert_eq!(entries(&log, "setup:"), ["a"]);
}

// ── Registration limits ───────────────────────────────────────

#[test]
fn registration_errors() {
    let log = journal();
    let a = RefCell::new(Recorder::new("a", 0.0, &log));
    let late = RefCell::new(Recorder::new("late", 0.0, &log));

    let mut sched = Scheduler::new();
    sched.register(&a).unwrap();
    assert_eq!(
        sched.register(&a),
        Err(Error::Registry(RegistryError::Duplicate))
    );

    sched.run_setup();
    assert_eq!(
        sched.register(&late),
        Err(Error::Registry(RegistryError::AfterSetup))
    );
    assert_eq!(sched.len(), 1);
}

#[test]
fn capacity_is_bounded() {
    let log = journal();
    let parts: Vec<_> = (0..=MAX_COMPONENTS)
        .map(|_| RefCell::new(Recorder::new("n", 0.0, &log)))
        .collect();

    let mut sched = Scheduler::new();
    for part in &parts[..MAX_COMPONENTS] {
        sched.register(part).unwrap();
    }
    assert_eq!(
        sched.register(&parts[MAX_COMPONENTS]),
        Err(Error::Registry(RegistryError::Full))
    );
}
