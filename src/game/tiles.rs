//! The three limited tile economies: favor tiles, town tiles, bonus cards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::cult::CultTrack;
use crate::game::resources::Income;
use crate::game::Faction;

/// One of the twelve favor tiles, by log code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FavorTile {
    /// +3 fire.
    Fav1,
    /// +3 water.
    Fav2,
    /// +3 earth.
    Fav3,
    /// +3 air.
    Fav4,
    /// +2 fire; settlements form at power 6 instead of 7.
    Fav5,
    /// +2 water; once-per-round free cult step.
    Fav6,
    /// +2 earth; income +1 worker +1 power.
    Fav7,
    /// +2 air; income +4 power.
    Fav8,
    /// +1 fire; income +3 coins.
    Fav9,
    /// +1 water; +3 points per dwelling-to-trading-house upgrade.
    Fav10,
    /// +1 earth; +2 points per new dwelling.
    Fav11,
    /// +1 air; pass points by trading-house count.
    Fav12,
}

/// All favor tiles in code order.
pub const ALL_FAVOR_TILES: [FavorTile; 12] = [
    FavorTile::Fav1,
    FavorTile::Fav2,
    FavorTile::Fav3,
    FavorTile::Fav4,
    FavorTile::Fav5,
    FavorTile::Fav6,
    FavorTile::Fav7,
    FavorTile::Fav8,
    FavorTile::Fav9,
    FavorTile::Fav10,
    FavorTile::Fav11,
    FavorTile::Fav12,
];

impl FavorTile {
    /// Parse a code like `FAV11` (with or without the `+` sigil).
    #[must_use]
    pub fn from_code(code: &str) -> Option<FavorTile> {
        let code = code.trim_start_matches('+');
        let number: usize = code
            .strip_prefix("FAV")
            .or_else(|| code.strip_prefix("fav"))?
            .parse()
            .ok()?;
        ALL_FAVOR_TILES.get(number.checked_sub(1)?).copied()
    }

    /// The `FAVn` log code.
    #[must_use]
    pub fn code(self) -> String {
        format!("FAV{}", self as u32 + 1)
    }

    /// The track and step count granted on taking the tile.
    #[must_use]
    pub const fn cult_grant(self) -> (CultTrack, u32) {
        match self {
            FavorTile::Fav1 => (CultTrack::Fire, 3),
            FavorTile::Fav2 => (CultTrack::Water, 3),
            FavorTile::Fav3 => (CultTrack::Earth, 3),
            FavorTile::Fav4 => (CultTrack::Air, 3),
            FavorTile::Fav5 => (CultTrack::Fire, 2),
            FavorTile::Fav6 => (CultTrack::Water, 2),
            FavorTile::Fav7 => (CultTrack::Earth, 2),
            FavorTile::Fav8 => (CultTrack::Air, 2),
            FavorTile::Fav9 => (CultTrack::Fire, 1),
            FavorTile::Fav10 => (CultTrack::Water, 1),
            FavorTile::Fav11 => (CultTrack::Earth, 1),
            FavorTile::Fav12 => (CultTrack::Air, 1),
        }
    }

    /// Copies of this tile in the shared pool.
    #[must_use]
    pub const fn supply(self) -> u32 {
        match self {
            FavorTile::Fav1 | FavorTile::Fav2 | FavorTile::Fav3 | FavorTile::Fav4 => 1,
            _ => 3,
        }
    }

    /// Recurring income granted while held.
    #[must_use]
    pub const fn income(self) -> Income {
        match self {
            FavorTile::Fav7 => Income {
                coins: 0,
                workers: 1,
                priests: 0,
                power: 1,
            },
            FavorTile::Fav8 => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 4,
            },
            FavorTile::Fav9 => Income {
                coins: 3,
                workers: 0,
                priests: 0,
                power: 0,
            },
            _ => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 0,
            },
        }
    }

    /// Pass points for `FAV12` by trading-house count.
    #[must_use]
    pub const fn pass_vp_for_trading_houses(count: u32) -> i32 {
        match count {
            0 => 0,
            1 => 2,
            2 | 3 => 3,
            _ => 4,
        }
    }
}

impl fmt::Display for FavorTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FAV{}", *self as u32 + 1)
    }
}

/// The shared favor-tile pool. Tiles are consumed, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavorPool {
    remaining: BTreeMap<FavorTile, u32>,
}

impl Default for FavorPool {
    fn default() -> Self {
        Self::new()
    }
}

impl FavorPool {
    /// A full pool.
    #[must_use]
    pub fn new() -> Self {
        let remaining = ALL_FAVOR_TILES.iter().map(|&t| (t, t.supply())).collect();
        Self { remaining }
    }

    /// Copies of a tile still available.
    #[must_use]
    pub fn remaining(&self, tile: FavorTile) -> u32 {
        self.remaining.get(&tile).copied().unwrap_or(0)
    }

    /// Remove one copy from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile ran out.
    pub fn take(&mut self, tile: FavorTile) -> EngineResult<()> {
        let left = self.remaining.entry(tile).or_insert(0);
        if *left == 0 {
            return Err(EngineError::FavorTileExhausted(tile));
        }
        *left -= 1;
        Ok(())
    }
}

/// One of the eight settlement (town) tiles, by log code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TownTile {
    /// 5 points, 6 coins.
    Tw1,
    /// 7 points, 2 workers.
    Tw2,
    /// 9 points, 1 priest.
    Tw3,
    /// 6 points, 8 power.
    Tw4,
    /// 8 points, one step on every track.
    Tw5,
    /// 2 points, two steps on every track.
    Tw6,
    /// 4 points, sea-access (or carpet range) advance.
    Tw7,
    /// 11 points.
    Tw8,
}

/// All town tiles in code order.
pub const ALL_TOWN_TILES: [TownTile; 8] = [
    TownTile::Tw1,
    TownTile::Tw2,
    TownTile::Tw3,
    TownTile::Tw4,
    TownTile::Tw5,
    TownTile::Tw6,
    TownTile::Tw7,
    TownTile::Tw8,
];

impl TownTile {
    /// Parse a code like `TW5` (with or without the `+` sigil).
    #[must_use]
    pub fn from_code(code: &str) -> Option<TownTile> {
        let code = code.trim_start_matches('+');
        let number: usize = code
            .strip_prefix("TW")
            .or_else(|| code.strip_prefix("tw"))?
            .parse()
            .ok()?;
        ALL_TOWN_TILES.get(number.checked_sub(1)?).copied()
    }

    /// Victory points printed on the tile.
    #[must_use]
    pub const fn vp(self) -> i32 {
        match self {
            TownTile::Tw1 => 5,
            TownTile::Tw2 => 7,
            TownTile::Tw3 => 9,
            TownTile::Tw4 => 6,
            TownTile::Tw5 => 8,
            TownTile::Tw6 => 2,
            TownTile::Tw7 => 4,
            TownTile::Tw8 => 11,
        }
    }

    /// One-time resource grant on taking the tile.
    #[must_use]
    pub const fn grant(self) -> Income {
        match self {
            TownTile::Tw1 => Income {
                coins: 6,
                workers: 0,
                priests: 0,
                power: 0,
            },
            TownTile::Tw2 => Income {
                coins: 0,
                workers: 2,
                priests: 0,
                power: 0,
            },
            TownTile::Tw3 => Income {
                coins: 0,
                workers: 0,
                priests: 1,
                power: 0,
            },
            TownTile::Tw4 => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 8,
            },
            _ => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 0,
            },
        }
    }

    /// Steps granted on every track on taking the tile.
    #[must_use]
    pub const fn cult_steps(self) -> u32 {
        match self {
            TownTile::Tw5 => 1,
            TownTile::Tw6 => 2,
            _ => 0,
        }
    }

    /// Settlement keys granted (needed to crown a progression track).
    #[must_use]
    pub const fn keys(self) -> u32 {
        match self {
            TownTile::Tw6 => 2,
            _ => 1,
        }
    }

    /// Copies of this tile in the shared pool.
    #[must_use]
    pub const fn supply(self) -> u32 {
        match self {
            TownTile::Tw6 | TownTile::Tw7 | TownTile::Tw8 => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for TownTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TW{}", *self as u32 + 1)
    }
}

/// The shared town-tile pool. Tiles are consumed, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TownPool {
    remaining: BTreeMap<TownTile, u32>,
}

impl Default for TownPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TownPool {
    /// A full pool.
    #[must_use]
    pub fn new() -> Self {
        let remaining = ALL_TOWN_TILES.iter().map(|&t| (t, t.supply())).collect();
        Self { remaining }
    }

    /// Copies of a tile still available.
    #[must_use]
    pub fn remaining(&self, tile: TownTile) -> u32 {
        self.remaining.get(&tile).copied().unwrap_or(0)
    }

    /// Remove one copy from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile ran out.
    pub fn take(&mut self, tile: TownTile) -> EngineResult<()> {
        let left = self.remaining.entry(tile).or_insert(0);
        if *left == 0 {
            return Err(EngineError::TownTileExhausted(tile));
        }
        *left -= 1;
        Ok(())
    }
}

/// One of the ten bonus cards, by log code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum BonusCard {
    /// +2 coins; once per round a free spade.
    Bon1,
    /// +4 coins; once per round a free cult step.
    Bon2,
    /// +6 coins.
    Bon3,
    /// +3 power; +1 sea access for the round.
    Bon4,
    /// +1 worker, +3 power.
    Bon5,
    /// +2 workers; pass points for stronghold and sanctuary.
    Bon6,
    /// +1 worker; pass points per trading house.
    Bon7,
    /// +1 priest.
    Bon8,
    /// +2 coins; pass points per dwelling.
    Bon9,
    /// +3 power; pass points per sea-access level.
    Bon10,
}

/// All bonus cards in code order.
pub const ALL_BONUS_CARDS: [BonusCard; 10] = [
    BonusCard::Bon1,
    BonusCard::Bon2,
    BonusCard::Bon3,
    BonusCard::Bon4,
    BonusCard::Bon5,
    BonusCard::Bon6,
    BonusCard::Bon7,
    BonusCard::Bon8,
    BonusCard::Bon9,
    BonusCard::Bon10,
];

impl BonusCard {
    /// Parse a code like `BON7`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<BonusCard> {
        let number: usize = code
            .to_ascii_uppercase()
            .strip_prefix("BON")?
            .parse()
            .ok()?;
        ALL_BONUS_CARDS.get(number.checked_sub(1)?).copied()
    }

    /// Recurring income granted while held.
    #[must_use]
    pub const fn income(self) -> Income {
        let (coins, workers, priests, power) = match self {
            BonusCard::Bon1 | BonusCard::Bon9 => (2, 0, 0, 0),
            BonusCard::Bon2 => (4, 0, 0, 0),
            BonusCard::Bon3 => (6, 0, 0, 0),
            BonusCard::Bon4 | BonusCard::Bon10 => (0, 0, 0, 3),
            BonusCard::Bon5 => (0, 1, 0, 3),
            BonusCard::Bon6 => (0, 2, 0, 0),
            BonusCard::Bon7 => (0, 1, 0, 0),
            BonusCard::Bon8 => (0, 0, 1, 0),
        };
        Income {
            coins,
            workers,
            priests,
            power,
        }
    }

    /// Temporary sea-access bonus while held (`BON4`).
    #[must_use]
    pub const fn shipping_bonus(self) -> u32 {
        match self {
            BonusCard::Bon4 => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for BonusCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BON{}", *self as u32 + 1)
    }
}

/// The rotating bonus-card pool: the game's roster, coin accrual on
/// unselected cards, and the card each player currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BonusCardPool {
    available: BTreeMap<BonusCard, u32>,
    held: BTreeMap<Faction, BonusCard>,
}

impl BonusCardPool {
    /// Configure the game's roster; all cards start with zero coins.
    pub fn set_roster(&mut self, cards: &[BonusCard]) {
        self.available = cards.iter().map(|&c| (c, 0)).collect();
        self.held.clear();
    }

    /// Whether a card sits unselected in the pool.
    #[must_use]
    pub fn is_available(&self, card: BonusCard) -> bool {
        self.available.contains_key(&card)
    }

    /// The card a player currently holds.
    #[must_use]
    pub fn held_by(&self, faction: Faction) -> Option<BonusCard> {
        self.held.get(&faction).copied()
    }

    /// Take a card from the pool, returning the previously held card to
    /// the pool and paying out coins accrued on the taken card.
    ///
    /// # Errors
    ///
    /// Returns an error if the card is not in the pool.
    pub fn take(&mut self, faction: Faction, card: BonusCard) -> EngineResult<u32> {
        let Some(coins) = self.available.remove(&card) else {
            return Err(EngineError::BonusCardUnavailable(card));
        };
        if let Some(returned) = self.held.insert(faction, card) {
            self.available.insert(returned, 0);
        }
        Ok(coins)
    }

    /// Add one coin to every unselected card (round cleanup).
    pub fn accrue_coins(&mut self) {
        for coins in self.available.values_mut() {
            *coins += 1;
        }
    }

    /// Cards still in the pool, with accrued coins.
    #[must_use]
    pub fn available(&self) -> &BTreeMap<BonusCard, u32> {
        &self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favor_codes_round_trip() {
        for tile in ALL_FAVOR_TILES {
            assert_eq!(FavorTile::from_code(&tile.code()), Some(tile));
        }
        assert_eq!(FavorTile::from_code("+FAV11"), Some(FavorTile::Fav11));
        assert_eq!(FavorTile::from_code("FAV13"), None);
    }

    #[test]
    fn test_favor_pool_consumes() {
        let mut pool = FavorPool::new();
        assert_eq!(pool.remaining(FavorTile::Fav1), 1);
        pool.take(FavorTile::Fav1).expect("one copy");
        assert!(matches!(
            pool.take(FavorTile::Fav1),
            Err(EngineError::FavorTileExhausted(_))
        ));
        assert_eq!(pool.remaining(FavorTile::Fav11), 3);
    }

    #[test]
    fn test_town_tile_codes_and_effects() {
        assert_eq!(TownTile::from_code("+TW5"), Some(TownTile::Tw5));
        assert_eq!(TownTile::Tw5.vp(), 8);
        assert_eq!(TownTile::Tw5.cult_steps(), 1);
        assert_eq!(TownTile::Tw6.keys(), 2);
        assert_eq!(TownTile::Tw3.grant().priests, 1);
    }

    #[test]
    fn test_bonus_card_take_returns_previous() {
        let mut pool = BonusCardPool::default();
        pool.set_roster(&[BonusCard::Bon1, BonusCard::Bon7, BonusCard::Bon9]);

        assert_eq!(pool.take(Faction::Engineers, BonusCard::Bon7), Ok(0));
        assert!(!pool.is_available(BonusCard::Bon7));

        pool.accrue_coins();
        pool.accrue_coins();
        // BON1 accrued two coins while unselected.
        assert_eq!(pool.take(Faction::Engineers, BonusCard::Bon1), Ok(2));
        // The returned BON7 is available again, with zero coins.
        assert!(pool.is_available(BonusCard::Bon7));
        assert_eq!(pool.available()[&BonusCard::Bon7], 0);
    }

    #[test]
    fn test_bonus_card_unavailable() {
        let mut pool = BonusCardPool::default();
        pool.set_roster(&[BonusCard::Bon3]);
        assert!(matches!(
            pool.take(Faction::Witches, BonusCard::Bon5),
            Err(EngineError::BonusCardUnavailable(_))
        ));
    }
}
