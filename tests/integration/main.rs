//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the recording simulation adapters. All tests run on the host
//! with no real radio required.

mod command_flow_tests;
mod link_event_tests;
