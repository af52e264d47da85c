//! Utilities for testing the service as a whole.

pub mod logging;
pub mod metrics;
pub mod test_tools;
