//! Marble diagram grammar and compilation
//!
//! A diagram is read left to right, one frame per character:
//!
//! - `-` waits one frame
//! - `|` completes the sequence
//! - `#` fails with the legend's error
//! - any other character emits what the legend binds to it
//! - `!` directly after a legend key turns that key into a side effect; it
//!   takes no frame of its own
//!
//! An event's time is its frame position multiplied by the unit of time.
//! Notifications and side effects are resolved from the same frame scan, so
//! the two timelines always agree with each other and with the text.

use crate::domain::defaults::grammar;
use crate::domain::legend::{Effect, Legend, LegendEntry, LegendError, LegendKey, Slot};
use crate::domain::notification::{Notification, Recorded, SequenceError, TimedEvent};
use crate::domain::types::UnitOfTime;
use tracing::trace;

/// One token of the grammar, before legend resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Wait,
    Complete,
    Error,
    Emit(char),
    Effect(char),
}

/// A frame with where it sits in time and in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedFrame {
    /// Frame index; multiplied by the unit of time to get the event time
    pub position: usize,
    /// Character index in the diagram, for error reporting
    pub column: usize,
    pub frame: Frame,
}

/// Split a diagram into positioned frames
pub fn tokenize(diagram: &str) -> Result<Vec<PositionedFrame>, LegendError> {
    let mut frames = Vec::with_capacity(diagram.len());
    let mut chars = diagram.chars().enumerate().peekable();
    let mut position = 0;

    while let Some((column, token)) = chars.next() {
        let frame = match token {
            grammar::WAIT => Frame::Wait,
            grammar::COMPLETE => Frame::Complete,
            grammar::ERROR => Frame::Error,
            grammar::EFFECT_MARKER => return Err(LegendError::StrayEffectMarker { column }),
            key => match chars.peek() {
                Some((_, grammar::EFFECT_MARKER)) => {
                    chars.next();
                    Frame::Effect(key)
                }
                _ => Frame::Emit(key),
            },
        };

        frames.push(PositionedFrame {
            position,
            column,
            frame,
        });
        position += 1;
    }

    Ok(frames)
}

#[derive(Debug, Clone)]
enum Resolved<T, E> {
    Notify(Notification<T, E>),
    Effect(Effect),
}

/// An immutable diagram paired with its legend
///
/// The pairing is validated when the diagram is constructed; compiling it
/// afterwards cannot fail and may be repeated for any unit of time.
#[derive(Debug, Clone)]
pub struct MarbleDiagram<T, E = SequenceError> {
    source: String,
    legend: Legend<T, E>,
    frames: Vec<(usize, Resolved<T, E>)>,
}

/// Timed notifications and side effects derived from one diagram
#[derive(Debug, Clone)]
pub struct CompiledDiagram<T, E = SequenceError> {
    pub events: Vec<TimedEvent<T, E>>,
    pub effects: Vec<SideEffectEvent>,
}

/// A side effect due at a virtual instant
pub type SideEffectEvent = Recorded<Effect>;

impl<T: Clone, E: Clone> MarbleDiagram<T, E> {
    pub fn new(diagram: impl Into<String>, legend: Legend<T, E>) -> Result<Self, LegendError> {
        let source = diagram.into();
        let frames = tokenize(&source)?
            .into_iter()
            .filter_map(|frame| resolve(&legend, frame).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        trace!(diagram = %source, frames = frames.len(), "resolved marble diagram");

        Ok(Self {
            source,
            legend,
            frames,
        })
    }

    /// A diagram with an empty legend, e.g. `"---|"`
    pub fn plain(diagram: impl Into<String>) -> Result<Self, LegendError> {
        Self::new(diagram, Legend::empty())
    }

    pub fn compile(&self, unit: UnitOfTime) -> CompiledDiagram<T, E> {
        let mut events = Vec::new();
        let mut effects = Vec::new();

        for (position, resolved) in &self.frames {
            let time = unit.at(*position);
            match resolved {
                Resolved::Notify(notification) => {
                    events.push(Recorded::new(time, notification.clone()))
                }
                Resolved::Effect(effect) => effects.push(Recorded::new(time, effect.clone())),
            }
        }

        CompiledDiagram { events, effects }
    }

    /// Only the notification timeline
    pub fn notifications(&self, unit: UnitOfTime) -> Vec<TimedEvent<T, E>> {
        self.compile(unit).events
    }

    /// Only the side-effect timeline
    pub fn side_effects(&self, unit: UnitOfTime) -> Vec<SideEffectEvent> {
        self.compile(unit).effects
    }
}

impl<T, E> MarbleDiagram<T, E> {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn legend(&self) -> &Legend<T, E> {
        &self.legend
    }
}

fn resolve<T: Clone, E: Clone>(
    legend: &Legend<T, E>,
    positioned: PositionedFrame,
) -> Result<Option<(usize, Resolved<T, E>)>, LegendError> {
    let PositionedFrame {
        position,
        column,
        frame,
    } = positioned;

    let resolved = match frame {
        Frame::Wait => return Ok(None),
        Frame::Complete => Resolved::Notify(Notification::Completed),
        Frame::Error => {
            let error = legend
                .error()
                .ok_or(LegendError::MissingError { column })?;
            Resolved::Notify(Notification::Error(error.clone()))
        }
        Frame::Emit(key) => match lookup(legend, key, column)? {
            LegendEntry::Value(value) => Resolved::Notify(Notification::Next(value.clone())),
            LegendEntry::Error(error) => Resolved::Notify(Notification::Error(error.clone())),
            LegendEntry::Effect(_) => {
                return Err(slot_mismatch(key, column, Slot::Effect, Slot::Value))
            }
        },
        Frame::Effect(key) => match lookup(legend, key, column)? {
            LegendEntry::Effect(effect) => Resolved::Effect(effect.clone()),
            entry => return Err(slot_mismatch(key, column, entry.slot(), Slot::Effect)),
        },
    };

    Ok(Some((position, resolved)))
}

fn lookup<T, E>(
    legend: &Legend<T, E>,
    key: char,
    column: usize,
) -> Result<&LegendEntry<T, E>, LegendError> {
    legend
        .get(key)
        .ok_or(LegendError::UnresolvedKey { key, column })
}

fn slot_mismatch(key: char, column: usize, bound: Slot, used: Slot) -> LegendError {
    match LegendKey::parse(key) {
        Ok(key) => LegendError::SlotMismatch {
            key,
            column,
            bound,
            used,
        },
        Err(error) => error,
    }
}
