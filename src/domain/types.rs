//! Virtual-time domain types
//!
//! Newtypes for the quantities the clock, parser and assertion engine trade
//! in, so a frame width can never be passed where an instant is expected.

use crate::domain::defaults;
use derive_more::Display;
use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An instant on the virtual clock, or a span between two instants, in ticks
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    From,
    Into,
    Display
))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// Time zero, the start of every scope
    pub fn zero() -> Self {
        Self::new(0)
    }

    /// Sentinel for "never happens"
    pub fn never() -> Self {
        Self::new(u64::MAX)
    }

    pub fn is_never(self) -> bool {
        self.into_inner() == u64::MAX
    }

    pub fn ticks(self) -> u64 {
        self.into_inner()
    }

    pub fn saturating_add(self, other: VirtualTime) -> Self {
        Self::new(self.ticks().saturating_add(other.ticks()))
    }

    /// Round down to the start of the grid cell containing this instant
    pub fn truncate_to(self, grid: TimeGrid) -> Self {
        let ticks = self.ticks();
        Self::new(ticks - ticks % grid.ticks())
    }
}

/// Number of ticks each diagram frame occupies
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        TryFrom,
        AsRef,
        Display
    )
)]
pub struct UnitOfTime(u64);

impl UnitOfTime {
    /// Convert a wall-clock style duration, reading one tick as one millisecond
    pub fn from_duration(duration: Duration) -> Result<Self, UnitOfTimeError> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self::try_new(millis)
    }

    pub fn ticks(&self) -> u64 {
        *self.as_ref()
    }

    /// Time of the frame at `position`
    pub fn at(&self, position: usize) -> VirtualTime {
        let position = u64::try_from(position).unwrap_or(u64::MAX);
        VirtualTime::new(position.saturating_mul(self.ticks()))
    }
}

impl Default for UnitOfTime {
    fn default() -> Self {
        Self::try_new(defaults::scheduler::UNIT_OF_TIME_TICKS).expect("Default unit of time is valid")
    }
}

/// Granularity at which recorded and expected times are compared
///
/// Both sides are truncated to the grid before comparison, which absorbs the
/// small offsets scheduling order can introduce inside a frame.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        TryFrom,
        AsRef,
        Display
    )
)]
pub struct TimeGrid(u64);

impl TimeGrid {
    pub fn ticks(&self) -> u64 {
        *self.as_ref()
    }

    /// A grid of one tick, i.e. exact comparison
    pub fn exact() -> Self {
        Self::try_new(1).expect("One tick is a valid grid")
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::try_new(defaults::scheduler::TIME_GRID_TICKS).expect("Default time grid is valid")
    }
}

/// Identity of a test scope, unique per thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("scope-{_0}")]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}
