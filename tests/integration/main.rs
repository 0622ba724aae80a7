//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock components and simulated clocks.  All tests run on the
//! host (x86_64) with no real hardware required.

mod cron_flow_tests;
mod mock_components;
mod polling_tests;
mod scheduler_tests;
