//! Rule engine for the territory game: board, factions, resources,
//! progression tracks, tile economies, and the primitive action set.

pub mod actions;
pub mod board;
pub mod cult;
pub mod faction;
pub mod power_actions;
pub mod resources;
pub mod scoring;
pub mod state;
pub mod tiles;

pub use actions::{Action, CultStepSource};
pub use board::{Board, Building, Cell, Hex, Piece, Reach, Terrain};
pub use cult::{CultBoard, CultTrack, ALL_TRACKS};
pub use faction::{building_income, BuildingCounts, Faction, ALL_FACTIONS};
pub use power_actions::{PowerAction, PowerActionBoard};
pub use resources::{Cost, Income, PowerBowls, Wallet, PRIEST_CAP};
pub use scoring::{Deed, ScoreBreakdown, ScoringState, ScoringTile};
pub use state::{FreeSpades, GameState, LeechOffer, Phase, Player, LAST_ROUND};
pub use tiles::{BonusCard, BonusCardPool, FavorPool, FavorTile, TownPool, TownTile};
