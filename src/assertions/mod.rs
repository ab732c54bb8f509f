//! Compare what a sequence did against what a diagram says it should do
//!
//! Times are compared after truncation to a [`TimeGrid`]; values go through a
//! pluggable [`ValueComparer`]; errors are compared with `PartialEq`.

pub mod comparer;

use crate::domain::diagram::SideEffectEvent;
use crate::domain::notification::{Notification, Recorded, TimedEvent};
use crate::domain::types::{TimeGrid, VirtualTime};
use crate::error::{Error, Result};
pub use comparer::{ComparerError, ElementWise, FnComparer, SerializedEq, StructuralEq, ValueComparer};
use std::fmt;

/// Equality of two timed events under a comparer and a time grid
pub fn events_equal<T, E, C>(
    expected: &TimedEvent<T, E>,
    actual: &TimedEvent<T, E>,
    comparer: &C,
    grid: TimeGrid,
) -> std::result::Result<bool, ComparerError>
where
    E: PartialEq,
    C: ValueComparer<T> + ?Sized,
{
    if expected.time.truncate_to(grid) != actual.time.truncate_to(grid) {
        return Ok(false);
    }

    match (&expected.value, &actual.value) {
        (Notification::Next(expected), Notification::Next(actual)) => {
            comparer.equals(expected, actual)
        }
        (Notification::Error(expected), Notification::Error(actual)) => Ok(expected == actual),
        (Notification::Completed, Notification::Completed) => Ok(true),
        _ => Ok(false),
    }
}

/// Fail on the first difference between the recorded and expected timelines
///
/// A length difference is reported before any pairwise comparison.
pub fn assert_events<T, E, C>(
    actual: &[TimedEvent<T, E>],
    expected: &[TimedEvent<T, E>],
    comparer: &C,
    grid: TimeGrid,
) -> Result<()>
where
    T: fmt::Debug,
    E: fmt::Debug + PartialEq,
    C: ValueComparer<T> + ?Sized,
{
    if actual.len() != expected.len() {
        return Err(Error::CountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    for (index, (expected, actual)) in expected.iter().zip(actual).enumerate() {
        if !events_equal(expected, actual, comparer, grid)? {
            return Err(Error::EventMismatch {
                index,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(())
}

/// One position where the two timelines disagree
///
/// `None` on either side means that timeline ran out first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub index: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = "<none>";
        write!(
            f,
            "#{}: expected {}, actual {}",
            self.index,
            self.expected.as_deref().unwrap_or(missing),
            self.actual.as_deref().unwrap_or(missing)
        )
    }
}

/// Every position where the timelines disagree, for diagnostics
pub fn collect_mismatches<T, E, C>(
    actual: &[TimedEvent<T, E>],
    expected: &[TimedEvent<T, E>],
    comparer: &C,
    grid: TimeGrid,
) -> std::result::Result<Vec<Mismatch>, ComparerError>
where
    T: fmt::Debug,
    E: fmt::Debug + PartialEq,
    C: ValueComparer<T> + ?Sized,
{
    let mut mismatches = Vec::new();

    for index in 0..expected.len().max(actual.len()) {
        let pair = (expected.get(index), actual.get(index));
        let differs = match pair {
            (Some(expected), Some(actual)) => !events_equal(expected, actual, comparer, grid)?,
            _ => true,
        };
        if differs {
            mismatches.push(Mismatch {
                index,
                expected: pair.0.map(ToString::to_string),
                actual: pair.1.map(ToString::to_string),
            });
        }
    }

    Ok(mismatches)
}

/// Compare side-effect invocation times against a diagram's effect timeline
pub fn assert_side_effects(
    invocations: &[VirtualTime],
    expected: &[SideEffectEvent],
    grid: TimeGrid,
) -> Result<()> {
    if invocations.len() != expected.len() {
        return Err(Error::CountMismatch {
            expected: expected.len(),
            actual: invocations.len(),
        });
    }

    for (index, (expected, actual)) in expected.iter().zip(invocations).enumerate() {
        if expected.time.truncate_to(grid) != actual.truncate_to(grid) {
            return Err(Error::EventMismatch {
                index,
                expected: Recorded::new(expected.time, "effect").to_string(),
                actual: Recorded::new(*actual, "effect").to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::legend::Effect;
    use crate::domain::notification::SequenceError;

    type Events = Vec<TimedEvent<i32>>;

    fn grid() -> TimeGrid {
        TimeGrid::default()
    }

    fn doubled() -> Events {
        vec![
            Recorded::at(30, Notification::Next(2)),
            Recorded::at(60, Notification::Next(4)),
            Recorded::at(90, Notification::Next(6)),
            Recorded::at(110, Notification::Completed),
        ]
    }

    #[test]
    fn test_identical_timelines_pass() {
        assert!(assert_events(&doubled(), &doubled(), &StructuralEq, grid()).is_ok());
    }

    #[test]
    fn test_count_mismatch_reports_both_counts() {
        let expected = doubled()[..3].to_vec();
        let actual = doubled()[..2].to_vec();

        match assert_events(&actual, &expected, &StructuralEq, grid()) {
            Err(Error::CountMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("expected a count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_event_mismatch_reports_first_index() {
        let mut actual = doubled();
        actual[1] = Recorded::at(60, Notification::Next(5));
        actual[2] = Recorded::at(90, Notification::Next(7));

        match assert_events(&actual, &doubled(), &StructuralEq, grid()) {
            Err(Error::EventMismatch {
                index,
                expected,
                actual,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, "Next(4)@60");
                assert_eq!(actual, "Next(5)@60");
            }
            other => panic!("expected an event mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_times_within_one_grid_cell_are_equal() {
        let expected: Events = vec![Recorded::at(101, Notification::Completed)];
        let close: Events = vec![Recorded::at(109, Notification::Completed)];
        let across: Events = vec![Recorded::at(99, Notification::Completed)];

        assert!(assert_events(&close, &expected, &StructuralEq, grid()).is_ok());
        assert!(assert_events(&across, &expected, &StructuralEq, grid()).is_err());
    }

    #[test]
    fn test_kinds_must_match() {
        let expected: Events = vec![Recorded::at(10, Notification::Completed)];
        let actual: Events = vec![Recorded::at(
            10,
            Notification::Error(SequenceError::new("boom")),
        )];

        assert!(matches!(
            assert_events(&actual, &expected, &StructuralEq, grid()),
            Err(Error::EventMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_errors_compare_by_value() {
        let boom: Events = vec![Recorded::at(
            10,
            Notification::Error(SequenceError::new("boom")),
        )];
        let bang: Events = vec![Recorded::at(
            10,
            Notification::Error(SequenceError::new("bang")),
        )];

        assert!(assert_events(&boom, &boom.clone(), &StructuralEq, grid()).is_ok());
        assert!(assert_events(&bang, &boom, &StructuralEq, grid()).is_err());
    }

    #[test]
    fn test_custom_comparer_is_used_for_values() {
        let expected: Events = vec![Recorded::at(10, Notification::Next(1))];
        let actual: Events = vec![Recorded::at(10, Notification::Next(-1))];
        let by_magnitude = FnComparer::new(|a: &i32, b: &i32| a.abs() == b.abs());

        assert!(assert_events(&actual, &expected, &by_magnitude, grid()).is_ok());
        assert!(assert_events(&actual, &expected, &StructuralEq, grid()).is_err());
    }

    #[test]
    fn test_comparer_errors_propagate() {
        #[derive(Debug)]
        struct Failing;
        impl ValueComparer<i32> for Failing {
            fn equals(&self, _: &i32, _: &i32) -> std::result::Result<bool, ComparerError> {
                Err(ComparerError::new("comparer exploded"))
            }
        }

        let events: Events = vec![Recorded::at(10, Notification::Next(1))];
        match assert_events(&events, &events, &Failing, grid()) {
            Err(Error::Comparer(error)) => assert_eq!(error.to_string(), "comparer exploded"),
            other => panic!("expected the comparer error, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_mismatches_reports_every_difference() {
        let mut actual = doubled();
        actual[0] = Recorded::at(30, Notification::Next(3));
        actual.pop();

        let mismatches = collect_mismatches(&actual, &doubled(), &StructuralEq, grid()).unwrap();

        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].index, 0);
        assert_eq!(mismatches[1].index, 3);
        assert_eq!(mismatches[1].actual, None);
        assert_eq!(
            mismatches[1].to_string(),
            "#3: expected Completed@110, actual <none>"
        );
    }

    #[test]
    fn test_side_effect_times_are_compared_on_the_grid() {
        let expected = vec![Recorded::at(20, Effect::new(|| {}))];

        assert!(assert_side_effects(&[VirtualTime::new(25)], &expected, grid()).is_ok());
        assert!(matches!(
            assert_side_effects(&[VirtualTime::new(30)], &expected, grid()),
            Err(Error::EventMismatch { index: 0, .. })
        ));
        assert!(matches!(
            assert_side_effects(&[], &expected, grid()),
            Err(Error::CountMismatch {
                expected: 1,
                actual: 0
            })
        ));
    }
}
