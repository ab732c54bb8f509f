//! Infrastructure layer
//!
//! Logging setup and the static text the harness logs with.

pub mod log_messages;
pub mod logging;

pub use logging::{init_logging, init_logging_from, init_test_logging};
