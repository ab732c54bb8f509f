//! Property-based tests for the diagram compiler and the virtual clock
//!
//! Generators build diagrams and schedules at random; the properties check
//! the timing laws every marble test relies on.

mod marble_invariants;
mod scheduler_invariants;
