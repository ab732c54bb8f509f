//! Free functions acting on the current scope
//!
//! Shorthand for tests that open one scope and never pass its handle around:
//!
//! ```
//! use marbletest::prelude::*;
//!
//! let scope = begin_scope(ScopeOptions::default());
//! let legend: Legend<i32> = Legend::values([('a', 1), ('b', 2)])?;
//! let source = cold(&MarbleDiagram::new("-a-b|", legend.clone())?)?;
//! expect(&source.observable(), &MarbleDiagram::new("-a-b|", legend)?)?;
//! scope.end()?;
//! # Ok::<(), marbletest::Error>(())
//! ```

use crate::assertions::ValueComparer;
use crate::domain::diagram::MarbleDiagram;
use crate::error::Result;
use crate::scheduler::recorder::SideEffectProbe;
use crate::scheduler::sequence::Observable;
use crate::scheduler::sources::TestableObservable;
use std::fmt;

pub use crate::scope::{begin_scope, current_scope};

/// See [`ScopeHandle::cold`](crate::scope::ScopeHandle::cold)
pub fn cold<T, E>(diagram: &MarbleDiagram<T, E>) -> Result<TestableObservable<T, E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Ok(current_scope()?.cold(diagram))
}

/// See [`ScopeHandle::hot`](crate::scope::ScopeHandle::hot)
pub fn hot<T, E>(diagram: &MarbleDiagram<T, E>) -> Result<TestableObservable<T, E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Ok(current_scope()?.hot(diagram))
}

pub fn expect<T, E>(sequence: &Observable<T, E>, diagram: &MarbleDiagram<T, E>) -> Result<()>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
    E: Clone + PartialEq + fmt::Debug + 'static,
{
    current_scope()?.expect(sequence, diagram)
}

pub fn expect_with<T, E, C>(
    sequence: &Observable<T, E>,
    diagram: &MarbleDiagram<T, E>,
    comparer: C,
) -> Result<()>
where
    T: Clone + fmt::Debug + 'static,
    E: Clone + PartialEq + fmt::Debug + 'static,
    C: ValueComparer<T> + 'static,
{
    current_scope()?.expect_with(sequence, diagram, comparer)
}

pub fn schedule_side_effects<T: Clone, E: Clone>(diagram: &MarbleDiagram<T, E>) -> Result<()> {
    current_scope()?.schedule_side_effects(diagram)
}

pub fn expect_side_effects<T: Clone, E: Clone>(
    probe: &SideEffectProbe,
    diagram: &MarbleDiagram<T, E>,
) -> Result<()> {
    current_scope()?.expect_side_effects(probe, diagram)
}

/// A probe on the current scope's clock
pub fn probe() -> Result<SideEffectProbe> {
    Ok(current_scope()?.probe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::legend::Legend;
    use crate::error::Error;
    use crate::scope::ScopeOptions;

    #[test]
    fn test_operators_need_a_scope() {
        let diagram: MarbleDiagram<i32> = MarbleDiagram::plain("--|").unwrap();

        assert!(matches!(cold(&diagram), Err(Error::NoActiveScope)));
        assert!(matches!(hot(&diagram), Err(Error::NoActiveScope)));
        assert!(matches!(probe(), Err(Error::NoActiveScope)));
        assert!(matches!(
            schedule_side_effects(&diagram),
            Err(Error::NoActiveScope)
        ));
        assert!(matches!(
            expect(&Observable::empty(), &diagram),
            Err(Error::NoActiveScope)
        ));
    }

    #[test]
    fn test_operators_use_the_innermost_scope() {
        let outer = begin_scope(ScopeOptions::default());
        let inner = begin_scope(ScopeOptions::default());

        let legend: Legend<i32> = Legend::values([('x', 7)]).unwrap();
        let diagram = MarbleDiagram::new("-x|", legend).unwrap();
        let source = cold(&diagram).unwrap();
        expect(&source.observable(), &diagram).unwrap();

        assert_eq!(inner.pending_assertions(), 1);
        assert_eq!(outer.pending_assertions(), 0);

        inner.end().unwrap();
        outer.end().unwrap();
    }
}
