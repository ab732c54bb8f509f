//! Diagram round-trips and timing laws

use marbletest::prelude::*;
use proptest::prelude::*;

pub mod generators {
    use super::*;
    use proptest::collection::vec;

    /// Diagrams of waits and `a` marbles, optionally completed
    pub fn wait_and_emit_diagram() -> impl Strategy<Value = String> {
        (vec(prop_oneof![3 => Just('-'), 1 => Just('a')], 0..40), any::<bool>()).prop_map(
            |(frames, completes)| {
                let mut text: String = frames.into_iter().collect();
                if completes {
                    text.push('|');
                }
                text
            },
        )
    }

    pub fn unit_of_time() -> impl Strategy<Value = UnitOfTime> {
        (1u64..500).prop_map(|ticks| UnitOfTime::try_new(ticks).expect("non-zero"))
    }
}

fn single_value() -> Legend<u8> {
    Legend::values([('a', 7)]).expect("legend is valid")
}

proptest! {
    #[test]
    fn cold_source_round_trips_its_own_diagram(text in generators::wait_and_emit_diagram()) {
        let outcome = run_marble_test(ScopeOptions::default(), |scope| {
            let source = scope.cold(&MarbleDiagram::new(text.as_str(), single_value())?);
            scope.expect(&source.observable(), &MarbleDiagram::new(text.as_str(), single_value())?)
        });
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }

    #[test]
    fn event_times_are_position_times_unit(
        text in generators::wait_and_emit_diagram(),
        unit in generators::unit_of_time(),
    ) {
        let diagram = MarbleDiagram::new(text.as_str(), single_value()).expect("diagram is valid");
        let events = diagram.notifications(unit);

        let expected_times: Vec<VirtualTime> = text
            .chars()
            .enumerate()
            .filter(|(_, token)| *token != '-')
            .map(|(position, _)| unit.at(position))
            .collect();
        let times: Vec<VirtualTime> = events.iter().map(|event| event.time).collect();

        prop_assert_eq!(times, expected_times);
    }

    #[test]
    fn compiled_events_are_time_ordered(
        text in generators::wait_and_emit_diagram(),
        unit in generators::unit_of_time(),
    ) {
        let diagram = MarbleDiagram::new(text.as_str(), single_value()).expect("diagram is valid");
        let events = diagram.notifications(unit);

        prop_assert!(events.windows(2).all(|pair| pair[0].time < pair[1].time));
    }

    #[test]
    fn compilation_is_repeatable(text in generators::wait_and_emit_diagram()) {
        let diagram = MarbleDiagram::new(text.as_str(), single_value()).expect("diagram is valid");
        prop_assert_eq!(
            diagram.notifications(UnitOfTime::default()),
            diagram.notifications(UnitOfTime::default())
        );
    }

    #[test]
    fn effect_markers_do_not_shift_later_frames(prefix in 0usize..10, gap in 0usize..10) {
        let waits = |n: usize| "-".repeat(n);
        let plain = format!("{}x{}b|", waits(prefix), waits(gap));
        let marked = format!("{}x!{}b|", waits(prefix), waits(gap));

        let values: Legend<u8> = Legend::values([('x', 1), ('b', 2)]).expect("legend is valid");
        let effects: Legend<u8> = Legend::builder()
            .effect('x', || {})
            .value('b', 2)
            .build()
            .expect("legend is valid");

        let plain = MarbleDiagram::new(plain, values).expect("diagram is valid");
        let marked = MarbleDiagram::new(marked, effects).expect("diagram is valid");
        let unit = UnitOfTime::default();

        let plain_events = plain.notifications(unit);
        let marked = marked.compile(unit);

        prop_assert_eq!(&plain_events[1..], marked.events.as_slice());
        prop_assert_eq!(marked.effects.len(), 1);
        prop_assert_eq!(marked.effects[0].time, plain_events[0].time);
    }

    #[test]
    fn grid_truncation_never_moves_forward(ticks in any::<u64>(), grid in 1u64..1000) {
        let grid = TimeGrid::try_new(grid).expect("non-zero");
        let time = VirtualTime::new(ticks);
        let truncated = time.truncate_to(grid);

        prop_assert!(truncated <= time);
        prop_assert!(time.ticks() - truncated.ticks() < grid.ticks());
        prop_assert_eq!(truncated.ticks() % grid.ticks(), 0);
    }
}
