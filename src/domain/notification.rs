//! Notifications and their virtual timestamps
//!
//! A push-based sequence delivers any number of values followed by at most
//! one terminal notification. `Recorded` pairs whatever happened with the
//! virtual instant it happened at.

use crate::domain::types::VirtualTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a sequence delivered to its observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification<T, E = SequenceError> {
    Next(T),
    Error(E),
    Completed,
}

/// The kind of a [`Notification`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum NotificationKind {
    #[display("next")]
    Next,
    #[display("error")]
    Error,
    #[display("completed")]
    Completed,
}

impl<T, E> Notification<T, E> {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Next(_) => NotificationKind::Next,
            Notification::Error(_) => NotificationKind::Error,
            Notification::Completed => NotificationKind::Completed,
        }
    }

    /// Errors and completions end the sequence
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    /// Transform the carried value, leaving terminals untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Notification<U, E> {
        match self {
            Notification::Next(value) => Notification::Next(f(value)),
            Notification::Error(error) => Notification::Error(error),
            Notification::Completed => Notification::Completed,
        }
    }
}

/// A value stamped with the virtual time at which it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded<V> {
    pub time: VirtualTime,
    pub value: V,
}

impl<V> Recorded<V> {
    pub fn new(time: VirtualTime, value: V) -> Self {
        Self { time, value }
    }

    /// Shorthand for a raw tick count
    pub fn at(ticks: u64, value: V) -> Self {
        Self::new(VirtualTime::new(ticks), value)
    }
}

impl<V: fmt::Debug> fmt::Display for Recorded<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.value, self.time)
    }
}

/// A notification at a virtual instant
pub type TimedEvent<T, E = SequenceError> = Recorded<Notification<T, E>>;

/// Default error payload for sequences whose tests don't need a richer type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct SequenceError {
    message: String,
}

impl SequenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type IntNotification = Notification<i32>;

    #[test]
    fn test_terminal_kinds() {
        let next: IntNotification = Notification::Next(1);
        let completed: IntNotification = Notification::Completed;
        let error: IntNotification = Notification::Error(SequenceError::new("boom"));

        assert!(!next.is_terminal());
        assert!(completed.is_terminal());
        assert!(error.is_terminal());
    }

    #[test]
    fn test_map_preserves_terminals() {
        let value: IntNotification = Notification::Next(21);
        let doubled: IntNotification = value.map(|v| v * 2);
        assert_eq!(doubled, Notification::Next(42));

        let error: IntNotification = Notification::Error(SequenceError::new("boom"));
        assert_eq!(error.map(|v| v * 2).kind(), NotificationKind::Error);
    }

    #[test]
    fn test_recorded_display() {
        let event: TimedEvent<i32> = Recorded::at(30, Notification::Next(1));
        assert_eq!(event.to_string(), "Next(1)@30");
        assert_eq!(NotificationKind::Completed.to_string(), "completed");
    }
}
