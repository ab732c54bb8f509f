//! Legends bind diagram characters to what they emit
//!
//! Each key maps to exactly one slot: a value of the sequence's element type,
//! an error, or a side-effect callable. Keys are case-insensitive and the
//! grammar's own tokens can never be keys.

use crate::domain::defaults::grammar;
use crate::domain::notification::SequenceError;
use derive_more::Display;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A case-folded diagram character
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{_0}")]
pub struct LegendKey(char);

impl LegendKey {
    pub fn parse(key: char) -> Result<Self, LegendError> {
        if grammar::RESERVED.contains(&key) {
            return Err(LegendError::ReservedKey(key));
        }
        Ok(Self(fold(key)))
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

/// Lowercase `key` when its lowercase form is a single char
///
/// Characters whose lowercase mapping expands to several chars (such as
/// 'İ') are kept as written, so they only match themselves.
fn fold(key: char) -> char {
    let mut lower = key.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => key,
    }
}

/// A zero-argument callable fired at a diagram position marked with `!`
#[derive(Clone)]
pub struct Effect(Rc<dyn Fn()>);

impl Effect {
    pub fn new(action: impl Fn() + 'static) -> Self {
        Self(Rc::new(action))
    }

    pub fn invoke(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Effect")
    }
}

/// What a legend key stands for
#[derive(Debug, Clone)]
pub enum LegendEntry<T, E = SequenceError> {
    Value(T),
    Error(E),
    Effect(Effect),
}

impl<T, E> LegendEntry<T, E> {
    pub fn slot(&self) -> Slot {
        match self {
            LegendEntry::Value(_) => Slot::Value,
            LegendEntry::Error(_) => Slot::Error,
            LegendEntry::Effect(_) => Slot::Effect,
        }
    }
}

/// The semantic slot a legend entry occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Slot {
    #[display("a value")]
    Value,
    #[display("an error")]
    Error,
    #[display("a side effect")]
    Effect,
}

/// Legend/diagram pairings that can never compile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegendError {
    #[error("'{0}' is a marble token and cannot be used as a legend key")]
    ReservedKey(char),

    #[error("legend key '{0}' is bound more than once")]
    DuplicateKey(LegendKey),

    #[error("legend binds errors to both '{first}' and '{second}', so '#' is ambiguous")]
    AmbiguousError { first: LegendKey, second: LegendKey },

    #[error("'#' at column {column} needs an error in the legend, but none is bound")]
    MissingError { column: usize },

    #[error("no legend entry for '{key}' at column {column}")]
    UnresolvedKey { key: char, column: usize },

    #[error("legend key '{key}' is bound to {bound} but column {column} uses it as {used}")]
    SlotMismatch {
        key: LegendKey,
        column: usize,
        bound: Slot,
        used: Slot,
    },

    #[error("'!' at column {column} does not follow a legend key")]
    StrayEffectMarker { column: usize },
}

/// Typed mapping from diagram characters to emissions
#[derive(Debug, Clone)]
pub struct Legend<T, E = SequenceError> {
    entries: BTreeMap<LegendKey, LegendEntry<T, E>>,
    error_key: Option<LegendKey>,
}

impl<T, E> Legend<T, E> {
    /// A legend with no keys, for diagrams made only of grammar tokens
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            error_key: None,
        }
    }

    pub fn builder() -> LegendBuilder<T, E> {
        LegendBuilder::default()
    }

    /// Build a legend holding only values
    pub fn values(pairs: impl IntoIterator<Item = (char, T)>) -> Result<Self, LegendError> {
        pairs
            .into_iter()
            .fold(Self::builder(), |builder, (key, value)| {
                builder.value(key, value)
            })
            .build()
    }

    /// Case-insensitive lookup; reserved tokens never match
    pub fn get(&self, key: char) -> Option<&LegendEntry<T, E>> {
        LegendKey::parse(key)
            .ok()
            .and_then(|key| self.entries.get(&key))
    }

    /// The sole error entry, used by `#`
    pub fn error(&self) -> Option<&E> {
        self.error_key
            .and_then(|key| self.entries.get(&key))
            .and_then(|entry| match entry {
                LegendEntry::Error(error) => Some(error),
                _ => None,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = LegendKey> + '_ {
        self.entries.keys().copied()
    }
}

impl<T, E> Default for Legend<T, E> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Collects legend entries and validates them together on [`build`](Self::build)
pub struct LegendBuilder<T, E = SequenceError> {
    entries: Vec<(char, LegendEntry<T, E>)>,
}

impl<T, E> Default for LegendBuilder<T, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T, E> LegendBuilder<T, E> {
    pub fn value(mut self, key: char, value: T) -> Self {
        self.entries.push((key, LegendEntry::Value(value)));
        self
    }

    pub fn error(mut self, key: char, error: E) -> Self {
        self.entries.push((key, LegendEntry::Error(error)));
        self
    }

    pub fn effect(mut self, key: char, action: impl Fn() + 'static) -> Self {
        self.entries
            .push((key, LegendEntry::Effect(Effect::new(action))));
        self
    }

    /// Validate keys and the error slot
    ///
    /// Fails on reserved or duplicate keys (compared case-insensitively) and
    /// when more than one error is bound.
    pub fn build(self) -> Result<Legend<T, E>, LegendError> {
        let mut legend = Legend::empty();

        for (raw, entry) in self.entries {
            let key = LegendKey::parse(raw)?;
            if legend.entries.contains_key(&key) {
                return Err(LegendError::DuplicateKey(key));
            }
            if let LegendEntry::Error(_) = entry {
                if let Some(first) = legend.error_key {
                    return Err(LegendError::AmbiguousError { first, second: key });
                }
                legend.error_key = Some(key);
            }
            legend.entries.insert(key, entry);
        }

        Ok(legend)
    }
}
