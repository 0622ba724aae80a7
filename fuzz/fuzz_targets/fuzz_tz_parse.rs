//! Fuzz target: `TimeZone::parse` (POSIX TZ strings)
//!
//! Feeds arbitrary UTF-8 to the TZ parser and, for every zone it accepts,
//! decomposes a fuzz-chosen instant in that zone.
//!
//! Invariants checked:
//! - No panics under any input
//! - Accepted offsets stay within ±26 h
//! - `local(epoch)` keeps the instant and reports the offset `offset_at` chose
//!
//! cargo fuzz run fuzz_tz_parse

#![no_main]

use homenode::time::TimeZone;
use libfuzzer_sys::fuzz_target;

const MAX_OFFSET_SECS: i32 = 26 * 3600;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (epoch_bytes, spec) = data.split_at(4);
    let Ok(spec) = core::str::from_utf8(spec) else {
        return;
    };
    let Ok(zone) = TimeZone::parse(spec) else {
        return;
    };

    let epoch = i64::from(i32::from_le_bytes([
        epoch_bytes[0],
        epoch_bytes[1],
        epoch_bytes[2],
        epoch_bytes[3],
    ]));
    let (offset, is_dst) = zone.offset_at(epoch);
    assert!(offset.abs() <= MAX_OFFSET_SECS, "offset {offset} out of range");
    assert!(is_dst || offset == zone.std_offset());

    let local = zone.local(epoch);
    assert_eq!(local.epoch_seconds(), epoch);
    assert_eq!(local.utc_offset(), offset);
    assert_eq!(local.is_dst(), is_dst);
});
