//! The fourteen factions as one closed capability enum.
//!
//! Every faction-specific rule the replay needs is answered by a method on
//! [`Faction`]; dispatch is always a `match` on the variant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::board::{Reach, Terrain};
use crate::game::resources::{Cost, Income, Wallet};

/// A playable faction. The variant doubles as the player identity during
/// replay, because log rows are keyed by faction name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Swamp; converts victory points and coins both ways.
    Alchemists,
    /// Forest; stronghold unlocks a cult-step special action.
    Auren,
    /// Wasteland; takes two favor tiles per temple and a double turn.
    ChaosMagicians,
    /// Plains; gains cult steps when opponents accept energy offers.
    Cultists,
    /// Swamp; pays priests for spades and ordains workers into priests.
    Darklings,
    /// Mountain; tunnels across one cell, never ships.
    Dwarves,
    /// Mountain; cheap buildings and worker-priced bridges.
    Engineers,
    /// Desert; carpet flight instead of shipping.
    Fakirs,
    /// Wasteland; every transform costs exactly two spades.
    Giants,
    /// Plains; one bonus point per spade.
    Halflings,
    /// Lake; starts afloat with shipping one and may skip a river for towns.
    Mermaids,
    /// Desert; stronghold unlocks the sandstorm transform.
    Nomads,
    /// Lake; swarm economy with expensive, worker-hungry buildings.
    Swarmlings,
    /// Forest; stronghold unlocks the ride onto any forest cell.
    Witches,
}

/// All factions in declaration order.
pub const ALL_FACTIONS: [Faction; 14] = [
    Faction::Alchemists,
    Faction::Auren,
    Faction::ChaosMagicians,
    Faction::Cultists,
    Faction::Darklings,
    Faction::Dwarves,
    Faction::Engineers,
    Faction::Fakirs,
    Faction::Giants,
    Faction::Halflings,
    Faction::Mermaids,
    Faction::Nomads,
    Faction::Swarmlings,
    Faction::Witches,
];

impl Faction {
    /// The lowercase name used in log rows.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Faction::Alchemists => "alchemists",
            Faction::Auren => "auren",
            Faction::ChaosMagicians => "chaosmagicians",
            Faction::Cultists => "cultists",
            Faction::Darklings => "darklings",
            Faction::Dwarves => "dwarves",
            Faction::Engineers => "engineers",
            Faction::Fakirs => "fakirs",
            Faction::Giants => "giants",
            Faction::Halflings => "halflings",
            Faction::Mermaids => "mermaids",
            Faction::Nomads => "nomads",
            Faction::Swarmlings => "swarmlings",
            Faction::Witches => "witches",
        }
    }

    /// Parse a faction from a log name (case-insensitive, separators ignored).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Faction> {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ALL_FACTIONS.into_iter().find(|f| f.name() == folded)
    }

    /// The faction's home terrain.
    #[must_use]
    pub const fn home_terrain(self) -> Terrain {
        match self {
            Faction::Alchemists | Faction::Darklings => Terrain::Swamp,
            Faction::Auren | Faction::Witches => Terrain::Forest,
            Faction::ChaosMagicians | Faction::Giants => Terrain::Wasteland,
            Faction::Cultists | Faction::Halflings => Terrain::Plains,
            Faction::Dwarves | Faction::Engineers => Terrain::Mountain,
            Faction::Fakirs | Faction::Nomads => Terrain::Desert,
            Faction::Mermaids | Faction::Swarmlings => Terrain::Lake,
        }
    }

    /// The wallet a player of this faction starts with.
    #[must_use]
    pub const fn starting_wallet(self) -> Wallet {
        match self {
            Faction::Engineers => Wallet::new(10, 2, 0, 3, 9),
            Faction::Halflings => Wallet::new(15, 3, 0, 3, 9),
            Faction::Mermaids => Wallet::new(15, 3, 0, 3, 9),
            Faction::Swarmlings => Wallet::new(20, 8, 0, 3, 9),
            Faction::Fakirs => Wallet::new(15, 3, 1, 7, 5),
            Faction::Darklings => Wallet::new(15, 1, 1, 5, 7),
            Faction::ChaosMagicians => Wallet::new(15, 4, 0, 5, 7),
            Faction::Nomads => Wallet::new(15, 2, 0, 5, 7),
            _ => Wallet::new(15, 3, 0, 5, 7),
        }
    }

    /// Starting cult positions as `[fire, water, earth, air]`.
    #[must_use]
    pub const fn starting_cults(self) -> [u32; 4] {
        match self {
            Faction::Alchemists => [1, 1, 0, 0],
            Faction::Auren => [0, 1, 0, 1],
            Faction::ChaosMagicians => [2, 0, 0, 0],
            Faction::Cultists => [1, 0, 1, 0],
            Faction::Darklings => [0, 1, 1, 0],
            Faction::Dwarves => [0, 0, 2, 0],
            Faction::Engineers => [0, 0, 0, 0],
            Faction::Fakirs | Faction::Giants => [1, 0, 0, 1],
            Faction::Halflings => [0, 0, 1, 1],
            Faction::Mermaids => [0, 2, 0, 0],
            Faction::Nomads => [1, 0, 1, 0],
            Faction::Swarmlings => [1, 1, 1, 1],
            Faction::Witches => [0, 0, 0, 2],
        }
    }

    /// Shipping level at game start (Mermaids start afloat).
    #[must_use]
    pub const fn starting_shipping(self) -> u32 {
        match self {
            Faction::Mermaids => 1,
            _ => 0,
        }
    }

    /// Cost of a new dwelling.
    #[must_use]
    pub const fn dwelling_cost(self) -> Cost {
        match self {
            Faction::Engineers => Cost::cw(1, 1),
            Faction::Swarmlings => Cost::cw(3, 2),
            _ => Cost::cw(2, 1),
        }
    }

    /// Cost of upgrading to a trading house, before the opponent-adjacency
    /// coin discount.
    #[must_use]
    pub const fn trading_house_cost(self) -> Cost {
        match self {
            Faction::Engineers => Cost::cw(4, 1),
            Faction::Swarmlings => Cost::cw(8, 3),
            _ => Cost::cw(6, 2),
        }
    }

    /// Cost of upgrading to a temple.
    #[must_use]
    pub const fn temple_cost(self) -> Cost {
        match self {
            Faction::Engineers => Cost::cw(4, 1),
            Faction::Swarmlings => Cost::cw(7, 3),
            _ => Cost::cw(5, 2),
        }
    }

    /// Cost of upgrading to the sanctuary.
    #[must_use]
    pub const fn sanctuary_cost(self) -> Cost {
        match self {
            Faction::Auren | Faction::Cultists | Faction::Mermaids => Cost::cw(8, 4),
            Faction::ChaosMagicians => Cost::cw(4, 4),
            Faction::Darklings => Cost::cw(10, 4),
            Faction::Engineers => Cost::cw(6, 3),
            Faction::Swarmlings => Cost::cw(8, 5),
            _ => Cost::cw(6, 4),
        }
    }

    /// Cost of upgrading to the stronghold.
    #[must_use]
    pub const fn stronghold_cost(self) -> Cost {
        match self {
            Faction::ChaosMagicians => Cost::cw(4, 4),
            Faction::Cultists | Faction::Halflings | Faction::Nomads => Cost::cw(8, 4),
            Faction::Engineers => Cost::cw(6, 3),
            Faction::Fakirs => Cost::cw(10, 4),
            Faction::Swarmlings => Cost::cw(8, 5),
            _ => Cost::cw(6, 4),
        }
    }

    /// Workers owed per spade at the given excavation level.
    #[must_use]
    pub const fn workers_per_spade(self, digging_level: u32) -> u32 {
        let base = 3u32.saturating_sub(digging_level);
        if base == 0 { 1 } else { base }
    }

    /// Spades actually consumed to cover a wheel distance (Giants always
    /// dig exactly two).
    #[must_use]
    pub const fn terraform_spades(self, distance: u32) -> u32 {
        match self {
            Faction::Giants if distance > 0 => 2,
            _ => distance,
        }
    }

    /// Whether spades are paid in priests rather than workers.
    #[must_use]
    pub const fn pays_priests_for_spades(self) -> bool {
        matches!(self, Faction::Darklings)
    }

    /// Victory points granted per spade paid for.
    #[must_use]
    pub const fn vp_per_spade(self) -> i32 {
        match self {
            Faction::Halflings => 1,
            Faction::Darklings => 2,
            _ => 0,
        }
    }

    /// Energy granted per spade once the stronghold stands (Alchemists).
    #[must_use]
    pub const fn power_per_spade_after_stronghold(self) -> u32 {
        match self {
            Faction::Alchemists => 2,
            _ => 0,
        }
    }

    /// Whether the sea-access track exists for this faction.
    #[must_use]
    pub const fn can_advance_shipping(self) -> bool {
        !matches!(self, Faction::Dwarves | Faction::Fakirs)
    }

    /// Highest reachable sea-access level.
    #[must_use]
    pub const fn max_shipping(self) -> u32 {
        match self {
            Faction::Mermaids => 5,
            Faction::Dwarves | Faction::Fakirs => 0,
            _ => 3,
        }
    }

    /// Cost of one sea-access advance.
    #[must_use]
    pub const fn shipping_cost(self) -> Cost {
        Cost {
            coins: 4,
            workers: 0,
            priests: 1,
            power: 0,
        }
    }

    /// Highest reachable excavation level.
    #[must_use]
    pub const fn max_digging(self) -> u32 {
        match self {
            Faction::Darklings | Faction::Dwarves => 0,
            Faction::Fakirs => 1,
            _ => 2,
        }
    }

    /// Cost of one excavation advance.
    #[must_use]
    pub const fn digging_cost(self) -> Cost {
        match self {
            Faction::Halflings => Cost {
                coins: 1,
                workers: 2,
                priests: 1,
                power: 0,
            },
            _ => Cost {
                coins: 5,
                workers: 2,
                priests: 1,
                power: 0,
            },
        }
    }

    /// Favor tiles owed when a temple or sanctuary is raised.
    #[must_use]
    pub const fn favor_tiles_per_build(self) -> u32 {
        match self {
            Faction::ChaosMagicians => 2,
            _ => 1,
        }
    }

    /// Fixed income independent of buildings.
    #[must_use]
    pub const fn base_income(self) -> Income {
        match self {
            Faction::Engineers => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 0,
            },
            Faction::Swarmlings => Income {
                coins: 0,
                workers: 2,
                priests: 0,
                power: 0,
            },
            _ => Income {
                coins: 0,
                workers: 1,
                priests: 0,
                power: 0,
            },
        }
    }

    /// Stronghold row income.
    #[must_use]
    pub const fn stronghold_income(self) -> Income {
        match self {
            Faction::Alchemists => Income {
                coins: 6,
                workers: 0,
                priests: 0,
                power: 0,
            },
            Faction::ChaosMagicians => Income {
                coins: 0,
                workers: 2,
                priests: 0,
                power: 0,
            },
            _ => Income {
                coins: 0,
                workers: 0,
                priests: 0,
                power: 2,
            },
        }
    }

    /// Reach used when clustering buildings for final area scoring.
    #[must_use]
    pub const fn area_reach(self, shipping: u32, has_stronghold: bool) -> Reach {
        match self {
            Faction::Fakirs => {
                // Carpet flight skips one cell, two with the stronghold.
                let range = if has_stronghold { 3 } else { 2 };
                Reach::Range(range)
            }
            Faction::Dwarves => Reach::Range(2),
            _ => Reach::Shipping(shipping),
        }
    }

    /// Whether a single river cell may be skipped when forming settlements.
    #[must_use]
    pub const fn town_river_skip(self) -> bool {
        matches!(self, Faction::Mermaids)
    }

    /// Victory points granted on founding a settlement (Witches).
    #[must_use]
    pub const fn town_founding_vp(self) -> i32 {
        match self {
            Faction::Witches => 5,
            _ => 0,
        }
    }

    /// Workers granted on founding a settlement (Swarmlings).
    #[must_use]
    pub const fn town_founding_workers(self) -> u32 {
        match self {
            Faction::Swarmlings => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Income from buildings standing on the board.
///
/// Counts are capped at the physical supply (8 dwellings of which the
/// eighth earns nothing, 4 trading houses, 3 temples, 1 each of the rest).
#[must_use]
pub fn building_income(faction: Faction, counts: &BuildingCounts) -> Income {
    let mut income = Income::default();

    income.workers += counts.dwellings.min(7);

    const TH_COINS: [u32; 4] = [2, 2, 3, 4];
    const TH_POWER: [u32; 4] = [1, 1, 2, 2];
    #[allow(clippy::cast_possible_truncation)]
    let th = counts.trading_houses.min(4) as usize;
    income.coins += TH_COINS[..th].iter().sum::<u32>();
    income.power += TH_POWER[..th].iter().sum::<u32>();

    income.priests += counts.temples.min(3);
    if counts.sanctuaries > 0 {
        income.priests += 1;
    }
    if counts.strongholds > 0 {
        income = income.plus(faction.stronghold_income());
    }
    income
}

/// Building tallies used by income computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildingCounts {
    /// Number of dwellings on the board.
    pub dwellings: u32,
    /// Number of trading houses on the board.
    pub trading_houses: u32,
    /// Number of temples on the board.
    pub temples: u32,
    /// Number of sanctuaries on the board.
    pub sanctuaries: u32,
    /// Number of strongholds on the board.
    pub strongholds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_names_round_trip() {
        for faction in ALL_FACTIONS {
            assert_eq!(Faction::from_name(faction.name()), Some(faction));
        }
        assert_eq!(Faction::from_name("Chaos Magicians"), Some(Faction::ChaosMagicians));
        assert_eq!(Faction::from_name("nobody"), None);
    }

    #[test]
    fn test_giants_always_two_spades() {
        assert_eq!(Faction::Giants.terraform_spades(1), 2);
        assert_eq!(Faction::Giants.terraform_spades(3), 2);
        assert_eq!(Faction::Giants.terraform_spades(0), 0);
        assert_eq!(Faction::Witches.terraform_spades(3), 3);
    }

    #[test]
    fn test_workers_per_spade_floor() {
        assert_eq!(Faction::Auren.workers_per_spade(0), 3);
        assert_eq!(Faction::Auren.workers_per_spade(2), 1);
        assert_eq!(Faction::Auren.workers_per_spade(5), 1);
    }

    #[test]
    fn test_shipping_limits() {
        assert!(!Faction::Dwarves.can_advance_shipping());
        assert!(!Faction::Fakirs.can_advance_shipping());
        assert_eq!(Faction::Mermaids.max_shipping(), 5);
        assert_eq!(Faction::Mermaids.starting_shipping(), 1);
        assert_eq!(Faction::Engineers.max_shipping(), 3);
    }

    #[test]
    fn test_trading_house_income_table() {
        let counts = BuildingCounts {
            trading_houses: 3,
            ..BuildingCounts::default()
        };
        let income = building_income(Faction::Engineers, &counts);
        assert_eq!(income.coins, 7);
        assert_eq!(income.power, 4);
    }

    #[test]
    fn test_stronghold_income_overrides() {
        let counts = BuildingCounts {
            strongholds: 1,
            ..BuildingCounts::default()
        };
        assert_eq!(building_income(Faction::Alchemists, &counts).coins, 6);
        assert_eq!(building_income(Faction::Witches, &counts).power, 2);
        assert_eq!(building_income(Faction::ChaosMagicians, &counts).workers, 2);
    }
}
