//! Log message constants for the test harness
//!
//! Messages are static; the varying parts (scope ids, times, counts) travel as
//! structured `tracing` fields so they can be filtered on.

/// Scope lifecycle messages
pub mod scope {
    pub const BEGIN: &str = "Test scope started";
    pub const END: &str = "Test scope ended";
    pub const RUNNING_ASSERTIONS: &str = "Advancing clock and running pending assertions";
    pub const ASSERTION_REGISTERED: &str = "Assertion registered";
    pub const ASSERTION_FAILED: &str = "Assertion failed";
    pub const ENDED_WITH_FAILURES: &str = "Test scope ended with failing assertions";
    pub const ABANDONED_DURING_PANIC: &str =
        "Test scope dropped while panicking; pending assertions discarded";
    pub const ABANDONED_OUT_OF_ORDER: &str =
        "Test scope ended while a later scope was active; pending assertions discarded";
}

/// Assertion engine messages
pub mod assertions {
    pub const MISMATCH_DETAIL: &str = "Timeline mismatch";
    pub const SIDE_EFFECTS_SCHEDULED: &str = "Side effects scheduled from diagram";
}

/// Logging setup messages
pub mod logging {
    pub const SUBSCRIBER_ALREADY_SET: &str = "A global tracing subscriber is already installed";
}
