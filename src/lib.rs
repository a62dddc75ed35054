// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! tmreplay: a deterministic replay engine for Terra Mystica game logs.
//!
//! This crate provides:
//! - An action-notation compiler that turns dense per-turn log lines
//!   into ordered, typed action components
//! - A rule engine covering the board, resources, progression tracks,
//!   and tile economies
//! - A replay interpreter that re-simulates a full game from its log,
//!   with support for resuming after missing setup data is supplied
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Session Manager              │
//! ├─────────────────────────────────────┤
//! │      Replay Interpreter             │
//! ├─────────────────────────────────────┤
//! │  Notation Compiler │ Rule Engine    │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod game;
pub mod notation;
pub mod replay;

pub use error::{EngineError, EngineResult};

// Re-export key types at the crate root for convenience
pub use game::{Action, Faction, GameState, Hex, Phase, Terrain};
pub use notation::{parse_log, ParseError};
pub use replay::{Interpreter, MissingInfo, ReplayError, SessionManager, StepOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_reexports_are_usable() {
        let state = GameState::new();
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(Faction::Engineers.home_terrain(), Terrain::Mountain);
    }
}
