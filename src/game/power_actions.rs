//! The six shared power actions, each usable once per round.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// One of the six power actions on the shared board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PowerAction {
    /// 3 power: build a bridge.
    Bridge,
    /// 3 power: gain one priest.
    Priest,
    /// 4 power: gain two workers.
    Workers,
    /// 4 power: gain seven coins.
    Coins,
    /// 4 power: one free spade.
    Spade1,
    /// 6 power: two free spades.
    Spade2,
}

impl PowerAction {
    /// Parse an `ACTn` log code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<PowerAction> {
        match code.to_ascii_uppercase().as_str() {
            "ACT1" => Some(PowerAction::Bridge),
            "ACT2" => Some(PowerAction::Priest),
            "ACT3" => Some(PowerAction::Workers),
            "ACT4" => Some(PowerAction::Coins),
            "ACT5" => Some(PowerAction::Spade1),
            "ACT6" => Some(PowerAction::Spade2),
            _ => None,
        }
    }

    /// Energy spent from bowl 3 to take the action.
    #[must_use]
    pub const fn power_cost(self) -> u32 {
        match self {
            PowerAction::Bridge | PowerAction::Priest => 3,
            PowerAction::Workers | PowerAction::Coins | PowerAction::Spade1 => 4,
            PowerAction::Spade2 => 6,
        }
    }

    /// Free spades granted, if this is a spade action.
    #[must_use]
    pub const fn free_spades(self) -> u32 {
        match self {
            PowerAction::Spade1 => 1,
            PowerAction::Spade2 => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            PowerAction::Bridge => "ACT1",
            PowerAction::Priest => "ACT2",
            PowerAction::Workers => "ACT3",
            PowerAction::Coins => "ACT4",
            PowerAction::Spade1 => "ACT5",
            PowerAction::Spade2 => "ACT6",
        };
        f.write_str(code)
    }
}

/// Per-round used/available state of the shared board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PowerActionBoard {
    used: BTreeSet<PowerAction>,
}

impl PowerActionBoard {
    /// Whether the action is still available this round.
    #[must_use]
    pub fn is_available(&self, action: PowerAction) -> bool {
        !self.used.contains(&action)
    }

    /// Claim the action for this round.
    ///
    /// # Errors
    ///
    /// Returns an error if it was already taken.
    pub fn claim(&mut self, action: PowerAction) -> EngineResult<()> {
        if !self.used.insert(action) {
            return Err(EngineError::PowerActionTaken(action));
        }
        Ok(())
    }

    /// Free all actions for a new round.
    pub fn reset(&mut self) {
        self.used.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_costs() {
        assert_eq!(PowerAction::from_code("ACT6"), Some(PowerAction::Spade2));
        assert_eq!(PowerAction::from_code("act4"), Some(PowerAction::Coins));
        assert_eq!(PowerAction::from_code("ACT9"), None);
        assert_eq!(PowerAction::Spade2.power_cost(), 6);
        assert_eq!(PowerAction::Spade2.free_spades(), 2);
        assert_eq!(PowerAction::Coins.free_spades(), 0);
    }

    #[test]
    fn test_claim_once_per_round() {
        let mut board = PowerActionBoard::default();
        board.claim(PowerAction::Coins).expect("first claim");
        assert!(matches!(
            board.claim(PowerAction::Coins),
            Err(EngineError::PowerActionTaken(_))
        ));
        board.reset();
        assert!(board.is_available(PowerAction::Coins));
    }
}
