//! Fuzz target: `CronTrigger::parse_expression`
//!
//! Parses arbitrary text as a six-field cron expression and, when accepted,
//! matches it against a fuzz-chosen instant.
//!
//! Invariants checked:
//! - No panics under any input
//! - A rejected expression leaves the trigger unarmed and unchanged
//!
//! cargo fuzz run fuzz_cron_expression

#![no_main]

use std::cell::RefCell;

use homenode::adapters::time::ManualEpochSource;
use homenode::cron::CronTrigger;
use homenode::time::{ClockComponent, NormalizedTime};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (epoch_bytes, expr) = data.split_at(4);
    let Ok(expr) = core::str::from_utf8(expr) else {
        return;
    };

    let Ok(clock) = ClockComponent::new(Box::new(ManualEpochSource::new()), "UTC0") else {
        return;
    };
    let clock = RefCell::new(clock);
    let mut cron = CronTrigger::new(&clock);

    let epoch = i64::from(u32::from_le_bytes([
        epoch_bytes[0],
        epoch_bytes[1],
        epoch_bytes[2],
        epoch_bytes[3],
    ]));
    let time = NormalizedTime::utc(epoch);
    let matched_before = cron.matches(&time);

    if cron.parse_expression(expr).is_err() {
        assert_eq!(cron.matches(&time), matched_before);
    } else {
        let _ = cron.matches(&time);
    }
    assert!(!cron.is_armed());
});
