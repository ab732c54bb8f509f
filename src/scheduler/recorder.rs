//! Capture what a sequence actually did, stamped with virtual time

use super::sequence::Observable;
use super::VirtualScheduler;
use crate::domain::notification::{Notification, Recorded, SequenceError, TimedEvent};
use crate::domain::types::VirtualTime;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Everything one subscription delivered, in delivery order
pub type RecordedObservation<T, E = SequenceError> = Vec<TimedEvent<T, E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Listening,
    /// An error or completion arrived
    Terminated,
    /// The subscription was disposed
    Detached,
}

/// Observer that appends every notification with the clock's current time
///
/// Recording stops for good after a terminal notification or on detach.
pub struct Recorder<T, E = SequenceError> {
    scheduler: VirtualScheduler,
    messages: Rc<RefCell<RecordedObservation<T, E>>>,
    state: Rc<Cell<RecorderState>>,
}

impl<T, E> Clone for Recorder<T, E> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            messages: Rc::clone(&self.messages),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static, E: 'static> Recorder<T, E> {
    pub fn new(scheduler: VirtualScheduler) -> Self {
        Self {
            scheduler,
            messages: Rc::new(RefCell::new(Vec::new())),
            state: Rc::new(Cell::new(RecorderState::Listening)),
        }
    }

    /// A callback to subscribe with
    pub fn observer(&self) -> impl Fn(Notification<T, E>) + 'static {
        let recorder = self.clone();
        move |notification| recorder.on_notification(notification)
    }

    fn on_notification(&self, notification: Notification<T, E>) {
        if self.state.get() != RecorderState::Listening {
            return;
        }
        if notification.is_terminal() {
            self.state.set(RecorderState::Terminated);
        }
        let time = self.scheduler.now();
        self.messages
            .borrow_mut()
            .push(Recorded::new(time, notification));
    }

    /// Stop recording, keeping what was captured so far
    pub fn detach(&self) {
        if self.state.get() == RecorderState::Listening {
            self.state.set(RecorderState::Detached);
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state.get()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl<T: Clone, E: Clone> Recorder<T, E> {
    pub fn messages(&self) -> RecordedObservation<T, E> {
        self.messages.borrow().clone()
    }
}

/// Subscribe to `sequence` now and run the clock until nothing is pending
pub fn record<T, E>(
    sequence: &Observable<T, E>,
    scheduler: &VirtualScheduler,
) -> RecordedObservation<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let recorder = Recorder::new(scheduler.clone());
    let subscription = sequence.subscribe(recorder.observer());
    scheduler.run_until_idle();
    recorder.detach();
    subscription.dispose();
    recorder.messages()
}

/// Records the virtual times at which its callback is invoked
///
/// Hand [`callback`](Self::callback) to the code under test wherever it takes
/// a notification hook, then compare the invocation times against a
/// diagram's side-effect timeline.
#[derive(Clone)]
pub struct SideEffectProbe {
    scheduler: VirtualScheduler,
    invocations: Rc<RefCell<Vec<VirtualTime>>>,
}

impl SideEffectProbe {
    pub fn new(scheduler: VirtualScheduler) -> Self {
        Self {
            scheduler,
            invocations: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> impl Fn() + 'static {
        let probe = self.clone();
        move || {
            let now = probe.scheduler.now();
            probe.invocations.borrow_mut().push(now);
        }
    }

    pub fn invocations(&self) -> Vec<VirtualTime> {
        self.invocations.borrow().clone()
    }
}
