//! Marble diagram testing on a virtual clock
//!
//! Describe how a push-based sequence should behave over time with a compact
//! diagram such as `"-a-b-#"`, drive the sequence under test on a
//! deterministic virtual clock, and compare what it actually did against the
//! diagram.
//!
//! ```
//! use marbletest::prelude::*;
//!
//! let doubled = run_marble_test(ScopeOptions::default(), |scope| {
//!     let input: Legend<i32> = Legend::values([('a', 1), ('b', 2), ('c', 3)])?;
//!     let output: Legend<i32> = Legend::values([('a', 2), ('b', 4), ('c', 6)])?;
//!
//!     let source = scope.cold(&MarbleDiagram::new("---a--b--c-|", input)?);
//!     let sequence = source.observable().map(|value| value * 2);
//!
//!     scope.expect(&sequence, &MarbleDiagram::new("---a--b--c-|", output)?)
//! });
//!
//! assert!(doubled.is_ok());
//! ```

pub mod assertions;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod operators;
pub mod scheduler;
pub mod scope;

pub use error::{Error, Result};

/// The names most tests need
pub mod prelude {
    pub use crate::assertions::{ElementWise, FnComparer, SerializedEq, StructuralEq, ValueComparer};
    pub use crate::domain::{
        Legend, MarbleDiagram, Notification, Recorded, SequenceError, TimeGrid, TimedEvent,
        UnitOfTime, VirtualTime,
    };
    pub use crate::error::{Error, Result};
    pub use crate::operators::{
        begin_scope, cold, current_scope, expect, expect_side_effects, expect_with, hot, probe,
        schedule_side_effects,
    };
    pub use crate::scheduler::recorder::SideEffectProbe;
    pub use crate::scheduler::sequence::Observable;
    pub use crate::scheduler::{RunOptions, VirtualScheduler};
    pub use crate::scope::{run_marble_test, ScopeGuard, ScopeHandle, ScopeOptions};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_covers_a_basic_scenario() {
        let outcome = run_marble_test(ScopeOptions::default(), |scope| {
            let legend: Legend<char> = Legend::values([('a', 'a')])?;
            let source = scope.hot(&MarbleDiagram::new("-a|", legend.clone())?);
            scope.expect(&source.observable(), &MarbleDiagram::new("-a|", legend)?)
        });
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_package_metadata_claims_no_author_or_repository() {
        assert_eq!(env!("CARGO_PKG_AUTHORS"), "");
        assert_eq!(env!("CARGO_PKG_REPOSITORY"), "");
    }
}
