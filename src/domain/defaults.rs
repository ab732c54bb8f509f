//! Default values for the virtual clock and the marble grammar
//!
//! This module centralizes the constants used throughout the domain layer
//! so configuration defaults and documentation never drift apart.

/// Virtual clock defaults
pub mod scheduler {
    /// Ticks per diagram frame
    pub const UNIT_OF_TIME_TICKS: u64 = 10;

    /// Grid that recorded and expected times are truncated to before comparison
    pub const TIME_GRID_TICKS: u64 = 10;

    /// How long past its last expected event an expectation keeps observing
    pub const EXPECTATION_PADDING_TICKS: u64 = 1000;
}

/// Marble grammar tokens
pub mod grammar {
    /// One frame of silence
    pub const WAIT: char = '-';

    /// Completion of the sequence
    pub const COMPLETE: char = '|';

    /// Termination with the legend's error
    pub const ERROR: char = '#';

    /// Marks the preceding legend key as a side effect
    pub const EFFECT_MARKER: char = '!';

    /// Characters that can never be legend keys
    pub const RESERVED: [char; 4] = [WAIT, COMPLETE, ERROR, EFFECT_MARKER];
}

/// Logging defaults
pub mod logging {
    /// Filter used when `RUST_LOG` is not set
    pub const DEFAULT_FILTER: &str = "warn";
}
