//! Cold and hot test sources built from timed events
//!
//! Both kinds keep a log of who subscribed when, so a test can assert not
//! only what a sequence emitted but also when its upstream was attached and
//! released.

use super::sequence::{Observable, Observer, Subscription};
use super::VirtualScheduler;
use crate::domain::notification::{SequenceError, TimedEvent};
use crate::domain::types::VirtualTime;
use derive_more::Display;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// When a subscription to a test source started and ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub subscribed: VirtualTime,
    pub unsubscribed: Option<VirtualTime>,
}

impl SubscriptionRecord {
    pub fn new(subscribed: VirtualTime, unsubscribed: Option<VirtualTime>) -> Self {
        Self {
            subscribed,
            unsubscribed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Temperature {
    #[display("cold")]
    Cold,
    #[display("hot")]
    Hot,
}

type SubscriptionLog = Rc<RefCell<Vec<SubscriptionRecord>>>;

/// A source replaying a fixed timeline, with its subscription log
pub struct TestableObservable<T, E = SequenceError> {
    observable: Observable<T, E>,
    events: Rc<[TimedEvent<T, E>]>,
    subscriptions: SubscriptionLog,
    temperature: Temperature,
}

impl<T, E> Clone for TestableObservable<T, E> {
    fn clone(&self) -> Self {
        Self {
            observable: self.observable.clone(),
            events: Rc::clone(&self.events),
            subscriptions: Rc::clone(&self.subscriptions),
            temperature: self.temperature,
        }
    }
}

impl<T, E> TestableObservable<T, E> {
    /// The sequence itself, to subscribe to or transform
    pub fn observable(&self) -> Observable<T, E> {
        self.observable.clone()
    }

    /// The timeline this source replays
    pub fn events(&self) -> &[TimedEvent<T, E>] {
        &self.events
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
        self.subscriptions.borrow().clone()
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }
}

impl<T, E> From<TestableObservable<T, E>> for Observable<T, E> {
    fn from(source: TestableObservable<T, E>) -> Self {
        source.observable
    }
}

/// Open a log entry now and return the teardown that closes it
fn log_subscription(
    scheduler: &VirtualScheduler,
    log: &SubscriptionLog,
) -> (VirtualTime, impl FnOnce() + 'static) {
    let subscribed = scheduler.now();
    let index = {
        let mut entries = log.borrow_mut();
        entries.push(SubscriptionRecord::new(subscribed, None));
        entries.len() - 1
    };

    let scheduler = scheduler.clone();
    let log = Rc::clone(log);
    let close = move || {
        if let Some(entry) = log.borrow_mut().get_mut(index) {
            entry.unsubscribed = Some(scheduler.now());
        }
    };

    (subscribed, close)
}

pub(crate) fn cold<T, E>(
    scheduler: &VirtualScheduler,
    events: Vec<TimedEvent<T, E>>,
) -> TestableObservable<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let events: Rc<[TimedEvent<T, E>]> = events.into();
    let subscriptions: SubscriptionLog = Rc::new(RefCell::new(Vec::new()));

    let observable = {
        let scheduler = scheduler.clone();
        let events = Rc::clone(&events);
        let log = Rc::clone(&subscriptions);

        Observable::create(move |observer: Observer<T, E>| {
            let (subscribed, close) = log_subscription(&scheduler, &log);
            let subscription = Subscription::new(close);

            for event in events.iter() {
                let observer = Rc::clone(&observer);
                let subscription = subscription.clone();
                let notification = event.value.clone();
                scheduler.schedule_at(subscribed.saturating_add(event.time), move || {
                    if subscription.is_active() {
                        observer(notification);
                    }
                });
            }

            subscription
        })
    };

    TestableObservable {
        observable,
        events,
        subscriptions,
        temperature: Temperature::Cold,
    }
}

struct HotObservers<T, E> {
    next_id: Cell<u64>,
    observers: RefCell<Vec<(u64, Observer<T, E>)>>,
}

impl<T, E> HotObservers<T, E> {
    fn is_attached(&self, id: u64) -> bool {
        self.observers.borrow().iter().any(|(other, _)| *other == id)
    }

    fn snapshot(&self) -> Vec<(u64, Observer<T, E>)> {
        self.observers.borrow().clone()
    }
}

pub(crate) fn hot<T, E>(
    scheduler: &VirtualScheduler,
    events: Vec<TimedEvent<T, E>>,
) -> TestableObservable<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let events: Rc<[TimedEvent<T, E>]> = events.into();
    let subscriptions: SubscriptionLog = Rc::new(RefCell::new(Vec::new()));
    let attached = Rc::new(HotObservers {
        next_id: Cell::new(0),
        observers: RefCell::new(Vec::new()),
    });

    // The timeline runs whether or not anyone is listening; its past is gone
    let now = scheduler.now();
    for event in events.iter().filter(|event| event.time >= now) {
        let attached = Rc::clone(&attached);
        let notification = event.value.clone();
        scheduler.schedule_at(event.time, move || {
            for (id, observer) in attached.snapshot() {
                // An earlier observer may have detached a later one
                if attached.is_attached(id) {
                    observer(notification.clone());
                }
            }
        });
    }

    let observable = {
        let scheduler = scheduler.clone();
        let log = Rc::clone(&subscriptions);

        Observable::create(move |observer: Observer<T, E>| {
            let (_, close) = log_subscription(&scheduler, &log);
            let id = attached.next_id.get();
            attached.next_id.set(id + 1);
            attached.observers.borrow_mut().push((id, observer));

            let attached = Rc::clone(&attached);
            Subscription::new(move || {
                attached.observers.borrow_mut().retain(|(other, _)| *other != id);
                close();
            })
        })
    };

    TestableObservable {
        observable,
        events,
        subscriptions,
        temperature: Temperature::Hot,
    }
}
