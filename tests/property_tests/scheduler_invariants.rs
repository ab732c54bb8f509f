//! Ordering laws of the virtual clock

use marbletest::prelude::*;
use proptest::collection::vec;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

proptest! {
    #[test]
    fn actions_run_in_time_then_scheduling_order(dues in vec(0u64..50, 0..200)) {
        let scheduler = VirtualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (sequence, due) in dues.iter().copied().enumerate() {
            let log = Rc::clone(&log);
            let clock = scheduler.clone();
            scheduler.schedule_at(VirtualTime::new(due), move || {
                log.borrow_mut().push((clock.now().ticks(), sequence));
            });
        }
        scheduler.run_until_idle();

        let mut expected: Vec<(u64, usize)> = dues
            .iter()
            .copied()
            .enumerate()
            .map(|(sequence, due)| (due, sequence))
            .collect();
        expected.sort();

        prop_assert_eq!(log.borrow().clone(), expected);
        prop_assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn clock_never_moves_backwards(dues in vec(0u64..1000, 1..100), stop in 0u64..1000) {
        let scheduler = VirtualScheduler::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for due in dues {
            let seen = Rc::clone(&seen);
            let clock = scheduler.clone();
            scheduler.schedule_at(VirtualTime::new(due), move || seen.borrow_mut().push(clock.now()));
        }

        scheduler.advance_to(VirtualTime::new(stop));
        prop_assert_eq!(scheduler.now(), VirtualTime::new(stop));
        prop_assert!(seen.borrow().iter().all(|time| time.ticks() <= stop));

        scheduler.run_until_idle();
        let seen = seen.borrow();
        prop_assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn cold_subscription_offset_shifts_every_event(offset in 0u64..10_000) {
        let legend: Legend<u8> = Legend::values([('a', 1), ('b', 2)]).expect("legend is valid");
        let diagram = MarbleDiagram::new("-a--b-|", legend).expect("diagram is valid");
        let events = diagram.notifications(UnitOfTime::default());

        let scheduler = VirtualScheduler::new();
        let source = scheduler.create_cold(events.clone());
        let observable = source.observable();
        let recorded = scheduler.start(
            move || observable,
            RunOptions {
                subscribe_at: VirtualTime::new(offset),
                ..RunOptions::default()
            },
        );

        let shifted: Vec<TimedEvent<u8>> = events
            .into_iter()
            .map(|event| Recorded::new(VirtualTime::new(event.time.ticks() + offset), event.value))
            .collect();
        prop_assert_eq!(recorded, shifted);
    }
}
