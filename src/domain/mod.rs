//! Domain types for marble testing
//!
//! Time, notifications, legends and diagrams. Nothing in here knows about the
//! scheduler; the diagram compiler is a pure function of its inputs.

pub mod defaults;
pub mod diagram;
pub mod legend;
pub mod notification;
pub mod types;

pub use diagram::{CompiledDiagram, MarbleDiagram, SideEffectEvent};
pub use legend::{Effect, Legend, LegendBuilder, LegendEntry, LegendError, LegendKey};
pub use notification::{Notification, NotificationKind, Recorded, SequenceError, TimedEvent};
pub use types::{ScopeId, TimeGrid, UnitOfTime, VirtualTime};
