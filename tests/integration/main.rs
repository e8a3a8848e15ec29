//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a full coordinator against
//! the recording mock network.  Everything runs on the host with no
//! devices required.

mod coordinator_tests;
mod exceptional_tests;
mod fallback_tests;
mod mock_net;
