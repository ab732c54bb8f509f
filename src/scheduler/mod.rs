//! Deterministic single-threaded virtual clock
//!
//! Actions are queued by due time and run in strictly increasing time order;
//! actions due at the same instant run in the order they were scheduled.
//! Nothing here consults the wall clock, so identical inputs always produce
//! identical runs.

pub mod recorder;
pub mod sequence;
pub mod sources;

use crate::domain::notification::TimedEvent;
use crate::domain::types::VirtualTime;
use recorder::{RecordedObservation, Recorder};
use sequence::{Observable, Subscription};
use sources::TestableObservable;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

type Action = Box<dyn FnOnce()>;

struct ScheduledAction {
    due: VirtualTime,
    sequence: u64,
    action: Action,
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest, then first-scheduled, action
impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct SchedulerState {
    now: VirtualTime,
    next_sequence: u64,
    queue: BinaryHeap<ScheduledAction>,
    dispatched: u64,
}

/// Handle to a virtual clock and its queue of pending actions
///
/// Clones share the same clock.
#[derive(Clone)]
pub struct VirtualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

/// When [`VirtualScheduler::start`] subscribes, unsubscribes and stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub subscribe_at: VirtualTime,
    pub dispose_at: VirtualTime,
    pub end: VirtualTime,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            subscribe_at: VirtualTime::zero(),
            dispose_at: VirtualTime::never(),
            end: VirtualTime::never(),
        }
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                now: VirtualTime::zero(),
                next_sequence: 0,
                queue: BinaryHeap::new(),
                dispatched: 0,
            })),
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.state.borrow().now
    }

    /// Number of actions waiting to run
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Number of actions run so far
    pub fn dispatched(&self) -> u64 {
        self.state.borrow().dispatched
    }

    /// Queue `action` to run when the clock reaches `due`
    ///
    /// A due time already in the past is treated as "now": the action runs on
    /// the next dispatch, after anything scheduled before it.
    pub fn schedule_at(&self, due: VirtualTime, action: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        let due = due.max(state.now);
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(ScheduledAction {
            due,
            sequence,
            action: Box::new(action),
        });
    }

    pub fn schedule_after(&self, delay: VirtualTime, action: impl FnOnce() + 'static) {
        let due = self.now().saturating_add(delay);
        self.schedule_at(due, action);
    }

    /// Pop the next action due no later than `limit`, moving the clock to it
    fn next_due(&self, limit: VirtualTime) -> Option<ScheduledAction> {
        let mut state = self.state.borrow_mut();
        if state.queue.peek().is_none_or(|next| next.due > limit) {
            return None;
        }
        let next = state.queue.pop()?;
        state.now = state.now.max(next.due);
        state.dispatched += 1;
        Some(next)
    }

    fn dispatch(&self, limit: VirtualTime) {
        // The borrow is released before the action runs so it can schedule more
        while let Some(next) = self.next_due(limit) {
            trace!(due = %next.due, sequence = next.sequence, "dispatching virtual action");
            (next.action)();
        }
    }

    /// Run everything due up to and including `target`, then park the clock there
    pub fn advance_to(&self, target: VirtualTime) {
        self.dispatch(target);
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
    }

    pub fn advance_by(&self, delta: VirtualTime) {
        self.advance_to(self.now().saturating_add(delta));
    }

    /// Run until the queue is empty, leaving the clock at the last action's time
    pub fn run_until_idle(&self) {
        self.dispatch(VirtualTime::never());
    }

    /// A source whose timeline restarts at every subscription
    pub fn create_cold<T, E>(&self, events: Vec<TimedEvent<T, E>>) -> TestableObservable<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        sources::cold(self, events)
    }

    /// A source whose timeline is absolute; late subscribers miss earlier events
    pub fn create_hot<T, E>(&self, events: Vec<TimedEvent<T, E>>) -> TestableObservable<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        sources::hot(self, events)
    }

    /// Subscribe to the sequence `factory` builds and record what it emits
    ///
    /// The factory runs at `subscribe_at`, the subscription is disposed at
    /// `dispose_at` and the clock is driven to `end`.
    pub fn start<T, E, F>(&self, factory: F, options: RunOptions) -> RecordedObservation<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        F: FnOnce() -> Observable<T, E> + 'static,
    {
        let recorder = Recorder::new(self.clone());
        let subscription: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        {
            let recorder = recorder.clone();
            let subscription = Rc::clone(&subscription);
            self.schedule_at(options.subscribe_at, move || {
                let sequence = factory();
                let handle = sequence.subscribe(recorder.observer());
                *subscription.borrow_mut() = Some(handle);
            });
        }

        if !options.dispose_at.is_never() {
            let recorder = recorder.clone();
            self.schedule_at(options.dispose_at, move || {
                recorder.detach();
                let handle = subscription.borrow_mut().take();
                if let Some(handle) = handle {
                    handle.dispose();
                }
            });
        }

        if options.end.is_never() {
            self.run_until_idle();
        } else {
            self.advance_to(options.end);
        }

        recorder.messages()
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VirtualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .field("dispatched", &state.dispatched)
            .finish()
    }
}
