//! Round scoring tiles and the final-score breakdown.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::cult::CultTrack;
use crate::game::Faction;

/// A deed rewarded by the active scoring tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deed {
    /// Building a dwelling.
    Dwelling,
    /// Upgrading to a trading house.
    TradingHouse,
    /// Upgrading to a stronghold or sanctuary.
    BigBuilding,
    /// Upgrading to a temple.
    Temple,
    /// Paying for a spade (or receiving one from a power action).
    Spade,
    /// Founding a settlement.
    Town,
}

/// The end-of-round reward granted per crossed cult threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultReward {
    /// Coins per threshold.
    Coins(u32),
    /// Workers per threshold.
    Workers(u32),
    /// Priests per threshold.
    Priests(u32),
    /// Energy per threshold.
    Power(u32),
    /// Free spades per threshold (pending entitlements, unscored).
    Spades(u32),
    /// Coins per priest sent to a track this round (the `SCORE9` rule).
    CoinsPerPriestSent(u32),
}

/// One of the nine scoring tiles, by log code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ScoringTile {
    /// 2 per spade; 1 earth step → 1 coin.
    Score1,
    /// 5 per town; 4 earth → 1 spade.
    Score2,
    /// 2 per dwelling; 4 water → 1 priest.
    Score3,
    /// 5 per stronghold/sanctuary; 2 fire → 1 worker.
    Score4,
    /// 2 per dwelling; 4 fire → 4 power.
    Score5,
    /// 3 per trading house; 4 water → 1 spade.
    Score6,
    /// 5 per stronghold/sanctuary; 2 air → 1 worker.
    Score7,
    /// 3 per trading house; 4 air → 1 spade.
    Score8,
    /// 4 per temple; 2 coins per priest sent.
    Score9,
}

/// All scoring tiles in code order.
pub const ALL_SCORING_TILES: [ScoringTile; 9] = [
    ScoringTile::Score1,
    ScoringTile::Score2,
    ScoringTile::Score3,
    ScoringTile::Score4,
    ScoringTile::Score5,
    ScoringTile::Score6,
    ScoringTile::Score7,
    ScoringTile::Score8,
    ScoringTile::Score9,
];

impl ScoringTile {
    /// Parse a `SCOREn` log code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<ScoringTile> {
        let number: usize = code
            .to_ascii_uppercase()
            .strip_prefix("SCORE")?
            .parse()
            .ok()?;
        ALL_SCORING_TILES.get(number.checked_sub(1)?).copied()
    }

    /// The deed this tile rewards during the round.
    #[must_use]
    pub const fn deed(self) -> Deed {
        match self {
            ScoringTile::Score1 => Deed::Spade,
            ScoringTile::Score2 => Deed::Town,
            ScoringTile::Score3 | ScoringTile::Score5 => Deed::Dwelling,
            ScoringTile::Score4 | ScoringTile::Score7 => Deed::BigBuilding,
            ScoringTile::Score6 | ScoringTile::Score8 => Deed::TradingHouse,
            ScoringTile::Score9 => Deed::Temple,
        }
    }

    /// Points granted per rewarded deed.
    #[must_use]
    pub const fn deed_vp(self) -> i32 {
        match self {
            ScoringTile::Score1 | ScoringTile::Score3 | ScoringTile::Score5 => 2,
            ScoringTile::Score6 | ScoringTile::Score8 => 3,
            ScoringTile::Score9 => 4,
            ScoringTile::Score2 | ScoringTile::Score4 | ScoringTile::Score7 => 5,
        }
    }

    /// The cult track whose positions pay the end-of-round reward.
    /// `None` for the priest-counting tile.
    #[must_use]
    pub const fn cult_track(self) -> Option<CultTrack> {
        match self {
            ScoringTile::Score1 | ScoringTile::Score2 => Some(CultTrack::Earth),
            ScoringTile::Score3 | ScoringTile::Score6 => Some(CultTrack::Water),
            ScoringTile::Score4 | ScoringTile::Score5 => Some(CultTrack::Fire),
            ScoringTile::Score7 | ScoringTile::Score8 => Some(CultTrack::Air),
            ScoringTile::Score9 => None,
        }
    }

    /// Track positions per reward (zero for the priest-counting tile).
    #[must_use]
    pub const fn threshold(self) -> u32 {
        match self {
            ScoringTile::Score1 => 1,
            ScoringTile::Score4 | ScoringTile::Score7 => 2,
            ScoringTile::Score9 => 0,
            _ => 4,
        }
    }

    /// The reward paid per crossed threshold (or per priest sent).
    #[must_use]
    pub const fn reward(self) -> CultReward {
        match self {
            ScoringTile::Score1 => CultReward::Coins(1),
            ScoringTile::Score2 | ScoringTile::Score6 | ScoringTile::Score8 => {
                CultReward::Spades(1)
            }
            ScoringTile::Score3 => CultReward::Priests(1),
            ScoringTile::Score4 | ScoringTile::Score7 => CultReward::Workers(1),
            ScoringTile::Score5 => CultReward::Power(4),
            ScoringTile::Score9 => CultReward::CoinsPerPriestSent(2),
        }
    }
}

impl fmt::Display for ScoringTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SCORE{}", *self as u32 + 1)
    }
}

/// The six active tiles plus per-round priest bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoringState {
    /// One tile per round, index = round - 1. May be shorter when the log
    /// header is incomplete.
    pub tiles: Vec<ScoringTile>,
    priests_sent: BTreeMap<Faction, u32>,
}

impl ScoringState {
    /// The tile active in the given round (1-based).
    #[must_use]
    pub fn tile_for_round(&self, round: u32) -> Option<ScoringTile> {
        let index = usize::try_from(round.checked_sub(1)?).ok()?;
        self.tiles.get(index).copied()
    }

    /// Points the active tile grants for one deed in the given round.
    #[must_use]
    pub fn deed_vp(&self, round: u32, deed: Deed) -> i32 {
        match self.tile_for_round(round) {
            Some(tile) if tile.deed() == deed => tile.deed_vp(),
            _ => 0,
        }
    }

    /// Record one priest sent to a track (for the `SCORE9` reward).
    pub fn record_priest_sent(&mut self, faction: Faction) {
        *self.priests_sent.entry(faction).or_insert(0) += 1;
    }

    /// Priests sent this round, consumed and reset.
    pub fn drain_priests_sent(&mut self) -> BTreeMap<Faction, u32> {
        std::mem::take(&mut self.priests_sent)
    }
}

/// A player's immutable final-score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Points accumulated during play.
    pub base_vp: i32,
    /// Points from the largest connected building area.
    pub area_vp: i32,
    /// Points from cult-track majorities.
    pub cult_vp: i32,
    /// Points from converting leftover resources.
    pub resource_vp: i32,
    /// Grand total.
    pub total_vp: i32,
    /// Size of the largest connected area (tiebreak diagnostics).
    pub largest_area: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_tile_codes() {
        assert_eq!(ScoringTile::from_code("SCORE5"), Some(ScoringTile::Score5));
        assert_eq!(ScoringTile::from_code("score2"), Some(ScoringTile::Score2));
        assert_eq!(ScoringTile::from_code("SCORE10"), None);
    }

    #[test]
    fn test_deed_vp_only_for_matching_deed() {
        let scoring = ScoringState {
            tiles: vec![ScoringTile::Score1, ScoringTile::Score3],
            ..ScoringState::default()
        };
        assert_eq!(scoring.deed_vp(1, Deed::Spade), 2);
        assert_eq!(scoring.deed_vp(1, Deed::Dwelling), 0);
        assert_eq!(scoring.deed_vp(2, Deed::Dwelling), 2);
        assert_eq!(scoring.deed_vp(7, Deed::Dwelling), 0);
    }

    #[test]
    fn test_priests_sent_drain_resets() {
        let mut scoring = ScoringState::default();
        scoring.record_priest_sent(Faction::Cultists);
        scoring.record_priest_sent(Faction::Cultists);
        let drained = scoring.drain_priests_sent();
        assert_eq!(drained[&Faction::Cultists], 2);
        assert!(scoring.drain_priests_sent().is_empty());
    }
}
