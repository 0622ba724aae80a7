//! End-to-end tests: simulated epoch source → clock → cron → actions,
//! all driven through the scheduler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use homenode::adapters::time::ManualEpochSource;
use homenode::component::setup_priority;
use homenode::cron::CronTrigger;
use homenode::scheduler::Scheduler;
use homenode::time::ClockComponent;

use crate::mock_components::{journal, Recorder, SetupOutcome};

/// 2024-06-01 10:29:10 UTC.
const T_10_29_10: i64 = 1_717_237_750;
/// 2024-03-10 06:00 UTC = 01:00 EST, one hour before US spring-forward.
const SPRING_FORWARD_0600Z: i64 = 1_710_050_400;
/// 2024-11-03 04:00 UTC = 00:00 EDT, the night US clocks fall back.
const FALL_BACK_0400Z: i64 = 1_730_606_400;

fn clock(tz: &str) -> (RefCell<ClockComponent>, ManualEpochSource) {
    let source = ManualEpochSource::new();
    let clock = ClockComponent::new(Box::new(source.clone()), tz).unwrap();
    (RefCell::new(clock), source)
}

fn count_fires(cron: &mut CronTrigger<'_>) -> Rc<Cell<u32>> {
    let fired = Rc::new(Cell::new(0));
    let handle = Rc::clone(&fired);
    cron.add_action(move || handle.set(handle.get() + 1));
    fired
}

#[test]
fn hourly_half_past_fires_once_per_hour() {
    let (clock, source) = clock("UTC0");
    let mut cron = CronTrigger::new(&clock);
    cron.add_minute(30).unwrap();
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    // Several ticks per second for two hours.
    source.set(T_10_29_10);
    for _ in 0..(2 * 3600) {
        sched.run_tick();
        sched.run_tick();
        source.advance(1);
    }

    assert_eq!(fired.get(), 2);
    assert!(clock.borrow().is_synchronized());
}

#[test]
fn nothing_fires_until_the_clock_syncs() {
    let (clock, source) = clock("UTC0");
    let mut cron = CronTrigger::new(&clock);
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    for _ in 0..500 {
        sched.run_tick();
    }
    assert_eq!(fired.get(), 0);
    assert!(!cron.borrow().is_armed());

    source.set(T_10_29_10);
    sched.run_tick();
    assert!(cron.borrow().is_armed());
    assert_eq!(fired.get(), 0);
}

#[test]
fn stalled_loop_replays_every_missed_minute() {
    let (clock, source) = clock("UTC0");
    let mut cron = CronTrigger::new(&clock);
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    source.set(T_10_29_10);
    sched.run_tick();
    // 10:29:10 -> 10:34:10 without a tick: 10:30..10:33 replayed, then 10:34.
    source.advance(5 * 60);
    sched.run_tick();
    assert_eq!(fired.get(), 5);
}

#[test]
fn failed_neighbour_does_not_stop_cron() {
    let log = journal();
    let broken = RefCell::new(
        Recorder::new("broken", setup_priority::HARDWARE, &log).with_outcome(SetupOutcome::Err),
    );
    let (clock, source) = clock("UTC0");
    let mut cron = CronTrigger::new(&clock);
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&broken).unwrap();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    source.set(T_10_29_10);
    sched.run_tick();
    source.advance(60);
    sched.run_tick();

    assert_eq!(fired.get(), 1);
    assert_eq!(sched.failed_count(), 1);
}

#[test]
fn skipped_local_hour_never_fires() {
    let (clock, source) = clock("EST5EDT,M3.2.0,M11.1.0");
    let mut cron = CronTrigger::from_expression(&clock, "* 30 2 * * *").unwrap();
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    // The day before: 02:30 EST exists and fires.
    source.set(SPRING_FORWARD_0600Z - 86_400);
    for _ in 0..120 {
        sched.run_tick();
        source.advance(60);
    }
    assert_eq!(fired.get(), 1);

    // Spring-forward day: 01:59 EST is followed by 03:00 EDT.
    source.set(SPRING_FORWARD_0600Z);
    for _ in 0..120 {
        sched.run_tick();
        source.advance(60);
    }
    assert_eq!(fired.get(), 1);
}

#[test]
fn repeated_local_hour_fires_twice() {
    let (clock, source) = clock("EST5EDT,M3.2.0,M11.1.0");
    let mut cron = CronTrigger::from_expression(&clock, "* 30 1 * * *").unwrap();
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    // 00:00 EDT through 03:00 EST; 01:30 happens at 05:30Z and 06:30Z.
    source.set(FALL_BACK_0400Z);
    for _ in 0..(4 * 60) {
        sched.run_tick();
        source.advance(60);
    }
    assert_eq!(fired.get(), 2);
}

#[test]
fn timezone_change_moves_local_schedule() {
    let (clock, source) = clock("UTC0");
    let mut cron = CronTrigger::from_expression(&clock, "0 0 12 * * *").unwrap();
    let fired = count_fires(&mut cron);
    let cron = RefCell::new(cron);

    let mut sched = Scheduler::new();
    sched.register(&clock).unwrap();
    sched.register(&cron).unwrap();
    sched.run_setup();

    clock.borrow_mut().set_timezone("JST-9").unwrap();
    // 2024-06-01 02:59:00 UTC = 11:59 JST
    source.set(1_717_210_740);
    sched.run_tick();
    source.advance(60);
    sched.run_tick();
    assert_eq!(fired.get(), 1);
}
