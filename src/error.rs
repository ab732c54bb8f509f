use crate::assertions::ComparerError;
use crate::domain::legend::LegendError;
use crate::domain::types::ScopeId;
use thiserror::Error;

/// Marble testing error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Malformed legend: {0}")]
    MalformedLegend(#[from] LegendError),

    #[error("No test scheduler scope is active on this thread")]
    NoActiveScope,

    #[error("Cannot end {attempted} while {innermost} is still active")]
    UnbalancedScope {
        attempted: ScopeId,
        innermost: ScopeId,
    },

    #[error("{0} is no longer accepting assertions")]
    ScopeClosed(ScopeId),

    #[error("Expected {expected} notifications but {actual} were recorded")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Notification at index {index} differs: expected {expected}, actual {actual}")]
    EventMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Comparer(#[from] ComparerError),
}

impl Error {
    pub fn invalid_setting(name: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSetting(format!("{name}: {reason}"))
    }

    /// Whether this is a test failure rather than a misuse of the harness
    pub fn is_assertion_failure(&self) -> bool {
        matches!(
            self,
            Self::CountMismatch { .. } | Self::EventMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
