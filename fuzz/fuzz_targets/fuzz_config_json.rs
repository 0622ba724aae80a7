//! Fuzz target: `NodeConfig::from_json`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted config passes `validate()` and survives a JSON round-trip
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use homenode::config::NodeConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = NodeConfig::from_json(data) else {
        return;
    };
    assert!(config.validate().is_ok());

    let json = serde_json::to_vec(&config).unwrap_or_default();
    assert_eq!(NodeConfig::from_json(&json), Ok(config));
});
