//! Minimal push-based sequences
//!
//! Just enough of an observable model to build test sources, subscribe
//! recorders and apply the transforms a sequence under test is made of.
//! Everything is single-threaded and driven by the virtual scheduler.

use crate::domain::notification::{Notification, SequenceError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Receives every notification a sequence pushes
pub type Observer<T, E = SequenceError> = Rc<dyn Fn(Notification<T, E>)>;

struct SubscriptionInner {
    active: Cell<bool>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Handle to an active subscription; disposing it stops deliveries
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// A subscription that runs `teardown` once, on first disposal
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                active: Cell::new(true),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription with nothing to tear down
    pub fn empty() -> Self {
        Self::new(|| {})
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Idempotent
    pub fn dispose(&self) {
        if !self.inner.active.replace(false) {
            return;
        }
        let teardown = self.inner.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

type SubscribeFn<T, E> = dyn Fn(Observer<T, E>) -> Subscription;

/// A lazily subscribed push sequence
pub struct Observable<T, E = SequenceError> {
    subscribe: Rc<SubscribeFn<T, E>>,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            subscribe: Rc::clone(&self.subscribe),
        }
    }
}

impl<T, E> fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Observable")
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Build a sequence from its subscribe behavior
    pub fn create(subscribe: impl Fn(Observer<T, E>) -> Subscription + 'static) -> Self {
        Self {
            subscribe: Rc::new(subscribe),
        }
    }

    /// A sequence that completes as soon as it is subscribed
    pub fn empty() -> Self {
        Self::create(|observer| {
            observer(Notification::Completed);
            Subscription::empty()
        })
    }

    /// A sequence that never notifies
    pub fn never() -> Self {
        Self::create(|_| Subscription::empty())
    }

    pub fn subscribe(&self, observer: impl Fn(Notification<T, E>) + 'static) -> Subscription {
        (self.subscribe)(Rc::new(observer))
    }

    pub fn map<U: 'static>(&self, transform: impl Fn(T) -> U + 'static) -> Observable<U, E> {
        let source = self.clone();
        let transform = Rc::new(transform);
        Observable::create(move |observer: Observer<U, E>| {
            let transform = Rc::clone(&transform);
            source.subscribe(move |notification| observer(notification.map(&*transform)))
        })
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        let source = self.clone();
        let predicate = Rc::new(predicate);
        Observable::create(move |observer: Observer<T, E>| {
            let predicate = Rc::clone(&predicate);
            source.subscribe(move |notification| {
                if let Notification::Next(value) = &notification {
                    if !predicate(value) {
                        return;
                    }
                }
                observer(notification);
            })
        })
    }

    /// Invoke `action` for every notification before passing it on
    pub fn inspect(&self, action: impl Fn(&Notification<T, E>) + 'static) -> Self {
        let source = self.clone();
        let action = Rc::new(action);
        Observable::create(move |observer: Observer<T, E>| {
            let action = Rc::clone(&action);
            source.subscribe(move |notification| {
                action(&notification);
                observer(notification);
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + 'static>(
        observable: &Observable<T>,
    ) -> (Rc<RefCell<Vec<Notification<T>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = observable.subscribe(move |n| sink.borrow_mut().push(n));
        (seen, subscription)
    }

    fn one_two_three() -> Observable<i32> {
        Observable::create(|observer: Observer<i32>| {
            for value in 1..=3 {
                observer(Notification::Next(value));
            }
            observer(Notification::Completed);
            Subscription::empty()
        })
    }

    #[test]
    fn test_map_transforms_values() {
        let (seen, _) = collect(&one_two_three().map(|v| v * 2));
        assert_eq!(
            *seen.borrow(),
            vec![
                Notification::Next(2),
                Notification::Next(4),
                Notification::Next(6),
                Notification::Completed
            ]
        );
    }

    #[test]
    fn test_filter_drops_values_but_keeps_terminals() {
        let (seen, _) = collect(&one_two_three().filter(|v| v % 2 == 1));
        assert_eq!(
            *seen.borrow(),
            vec![
                Notification::Next(1),
                Notification::Next(3),
                Notification::Completed
            ]
        );
    }

    #[test]
    fn test_inspect_sees_every_notification() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let (seen, _) = collect(&one_two_three().inspect(move |_| counter.set(counter.get() + 1)));

        assert_eq!(count.get(), 4);
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn test_dispose_runs_teardown_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));

        assert!(subscription.is_active());
        subscription.dispose();
        subscription.clone().dispose();

        assert!(!subscription.is_active());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_empty_and_never() {
        let (completed, _) = collect(&Observable::<i32>::empty());
        assert_eq!(*completed.borrow(), vec![Notification::Completed]);

        let (silent, _) = collect(&Observable::<i32>::never());
        assert!(silent.borrow().is_empty());
    }
}
