//! Replay interpreter and session management.
//!
//! The interpreter drives the phase state machine over a compiled log-item
//! stream, one item at a time. Because execution is fully deterministic,
//! rewinding is a reset plus a forward replay; there are no state deltas.

pub mod interpreter;
pub mod session;

pub use interpreter::{Interpreter, StepOutcome};
pub use session::{ProvidedInfo, SessionManager, SessionView};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::game::Faction;
use crate::notation::ParseError;

/// What kind of setup information a [`MissingInfo`] signal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInfoKind {
    /// A player's initial bonus-card selection before round 1.
    InitialBonusCard,
    /// A bonus-card reselection missing from a pass row.
    PassBonusCard,
}

/// A recoverable signal: replay stopped at a well-defined point because
/// externally supplied setup data is needed. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingInfo {
    /// What is missing.
    pub kind: MissingInfoKind,
    /// The round replay stopped in.
    pub round: u32,
    /// The players whose selection is missing at the stop point.
    pub players: Vec<Faction>,
    /// For pass-time signals: every remaining missing reselection in the
    /// rest of the log, keyed by round, so a caller can supply them all
    /// at once.
    pub remaining: BTreeMap<u32, Vec<Faction>>,
}

/// A fatal replay failure, reported with the index of the failing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The log itself failed to parse.
    Parse(ParseError),
    /// A turn line failed to compile, at the given item index.
    Compile {
        /// Index of the failing item.
        index: usize,
        /// The classification failure.
        source: ParseError,
    },
    /// An action failed its legality check during execution.
    Action {
        /// Index of the failing item.
        index: usize,
        /// The source line, for context.
        line: String,
        /// The rule violation.
        source: EngineError,
    },
    /// A game id that has no session.
    UnknownSession(String),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Parse(source) => write!(f, "log parse failed: {source}"),
            ReplayError::Compile { index, source } => {
                write!(f, "compile failed at item {index}: {source}")
            }
            ReplayError::Action {
                index,
                line,
                source,
            } => {
                write!(f, "action failed at item {index} ({line:?}): {source}")
            }
            ReplayError::UnknownSession(id) => write!(f, "no replay session for game {id:?}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Parse(source) | ReplayError::Compile { source, .. } => Some(source),
            ReplayError::Action { source, .. } => Some(source),
            ReplayError::UnknownSession(_) => None,
        }
    }
}

impl From<ParseError> for ReplayError {
    fn from(source: ParseError) -> Self {
        ReplayError::Parse(source)
    }
}
