//! Error types shared by the rule engine.

use std::fmt;

use crate::game::{BonusCard, Faction, FavorTile, Hex, PowerAction, Terrain, TownTile};

/// A rule-violation failure raised while validating or executing an action.
///
/// These are fatal during strict replay: the interpreter wraps them with the
/// index of the offending log item and aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The named player does not exist in this game.
    UnknownPlayer(Faction),
    /// A wallet or power-bowl spend exceeded what the player holds.
    InsufficientResources {
        /// What the action tried to spend.
        needed: String,
        /// What the player actually holds.
        held: String,
    },
    /// The cell is not part of the board.
    NoSuchCell(Hex),
    /// The cell already carries a building.
    CellOccupied(Hex),
    /// The cell has no building where one was required.
    CellEmpty(Hex),
    /// The building on the cell belongs to someone else.
    NotOwnBuilding(Hex),
    /// The requested building upgrade path does not exist.
    InvalidUpgrade {
        /// Building currently on the cell.
        from: &'static str,
        /// Requested target building.
        to: &'static str,
    },
    /// The target cell is not reachable from the player's buildings.
    NotAdjacent(Hex),
    /// Terrain-related failure (river cell, wrong home terrain).
    BadTerrain {
        /// The offending cell.
        cell: Hex,
        /// The terrain found there.
        terrain: Terrain,
    },
    /// A shared power action was already taken this round.
    PowerActionTaken(PowerAction),
    /// The favor-tile pool has run out of this tile.
    FavorTileExhausted(FavorTile),
    /// The player already holds this favor tile.
    FavorTileHeld(FavorTile),
    /// No favor-tile selection is owed to the player.
    NoFavorOwed,
    /// The town-tile pool has run out of this tile.
    TownTileExhausted(TownTile),
    /// No settlement formation is pending for the player.
    NoTownPending,
    /// The bonus card is not part of this game's roster or is held.
    BonusCardUnavailable(BonusCard),
    /// The player already passed this round.
    AlreadyPassed(Faction),
    /// A progression track is already at its limit.
    TrackAtLimit(&'static str),
    /// An accept/decline referenced a reward offer that does not exist.
    NoPendingOffer(Faction),
    /// A bridge cannot be built between the two cells.
    InvalidBridge(Hex, Hex),
    /// The faction cannot perform this action at all.
    NotAllowedForFaction {
        /// The acting faction.
        faction: Faction,
        /// What was attempted.
        what: &'static str,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownPlayer(faction) => write!(f, "unknown player: {faction}"),
            EngineError::InsufficientResources { needed, held } => {
                write!(f, "insufficient resources: need {needed}, have {held}")
            }
            EngineError::NoSuchCell(hex) => write!(f, "cell {hex} is not on the board"),
            EngineError::CellOccupied(hex) => write!(f, "cell {hex} already has a building"),
            EngineError::CellEmpty(hex) => write!(f, "cell {hex} has no building"),
            EngineError::NotOwnBuilding(hex) => {
                write!(f, "building at {hex} belongs to another player")
            }
            EngineError::InvalidUpgrade { from, to } => {
                write!(f, "cannot upgrade {from} to {to}")
            }
            EngineError::NotAdjacent(hex) => {
                write!(f, "cell {hex} is not adjacent to any of the player's buildings")
            }
            EngineError::BadTerrain { cell, terrain } => {
                write!(f, "cell {cell} has unusable terrain {terrain}")
            }
            EngineError::PowerActionTaken(action) => {
                write!(f, "power action {action} already taken this round")
            }
            EngineError::FavorTileExhausted(tile) => {
                write!(f, "favor tile {tile} is exhausted")
            }
            EngineError::FavorTileHeld(tile) => {
                write!(f, "player already holds favor tile {tile}")
            }
            EngineError::NoFavorOwed => write!(f, "no favor-tile selection is owed"),
            EngineError::TownTileExhausted(tile) => {
                write!(f, "town tile {tile} is exhausted")
            }
            EngineError::NoTownPending => write!(f, "no settlement formation is pending"),
            EngineError::BonusCardUnavailable(card) => {
                write!(f, "bonus card {card} is not available")
            }
            EngineError::AlreadyPassed(faction) => {
                write!(f, "{faction} has already passed this round")
            }
            EngineError::TrackAtLimit(track) => write!(f, "{track} is already at its limit"),
            EngineError::NoPendingOffer(faction) => {
                write!(f, "no pending reward offer for {faction}")
            }
            EngineError::InvalidBridge(a, b) => {
                write!(f, "no legal bridge between {a} and {b}")
            }
            EngineError::NotAllowedForFaction { faction, what } => {
                write!(f, "{faction} cannot {what}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for rule-engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
