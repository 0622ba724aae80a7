//! Integration tests for polling components driven by the scheduler.

use std::cell::RefCell;
use std::rc::Rc;

use homenode::adapters::time::ManualUptime;
use homenode::component::ComponentStatus;
use homenode::polling::{Polling, PollingComponent};
use homenode::scheduler::Scheduler;
use homenode::time::Uptime;

/// Records the uptime of every update.
struct Sampler {
    uptime: ManualUptime,
    runs: Rc<RefCell<Vec<u64>>>,
    warn_every: Option<usize>,
}

impl PollingComponent for Sampler {
    fn name(&self) -> &'static str {
        "sampler"
    }

    fn update(&mut self, status: &mut ComponentStatus) {
        let mut runs = self.runs.borrow_mut();
        runs.push(self.uptime.uptime_ms());
        match self.warn_every {
            Some(n) if runs.len() % n == 0 => status.set_warning(),
            _ => status.clear_warning(),
        }
    }
}

fn sampler(uptime: &ManualUptime) -> (Sampler, Rc<RefCell<Vec<u64>>>) {
    let runs = Rc::new(RefCell::new(Vec::new()));
    let s = Sampler {
        uptime: uptime.clone(),
        runs: Rc::clone(&runs),
        warn_every: None,
    };
    (s, runs)
}

#[test]
fn main_loop_cadence_gates_updates() {
    let uptime = ManualUptime::new();
    let (s, runs) = sampler(&uptime);
    let polled = RefCell::new(Polling::new(s, 1000, &uptime));

    let mut sched = Scheduler::new();
    sched.register(&polled).unwrap();
    sched.run_setup();

    // 16 ms main loop for five seconds.
    while uptime.uptime_ms() < 5000 {
        sched.run_tick();
        uptime.advance(16);
    }

    assert_eq!(*runs.borrow(), [0, 1008, 2016, 3024, 4032]);
}

#[test]
fn warnings_from_update_reach_app_status() {
    let uptime = ManualUptime::new();
    let (mut s, runs) = sampler(&uptime);
    s.warn_every = Some(2);
    let polled = RefCell::new(Polling::new(s, 100, &uptime));

    let mut sched = Scheduler::new();
    let id = sched.register(&polled).unwrap();
    sched.run_setup();

    sched.run_tick();
    assert!(!sched.app_status().has_warning());

    uptime.advance(100);
    sched.run_tick();
    assert!(sched.app_status().has_warning());
    assert!(!sched.status(id).unwrap().is_failed());

    uptime.advance(100);
    sched.run_tick();
    assert!(!sched.app_status().has_warning());
    assert_eq!(runs.borrow().len(), 3);
}
