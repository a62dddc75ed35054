//! The four progression tracks (cults) with milestone rewards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::Faction;

/// One of the four progression tracks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CultTrack {
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Earth.
    Earth,
    /// Air.
    Air,
}

/// All tracks in board order.
pub const ALL_TRACKS: [CultTrack; 4] = [
    CultTrack::Fire,
    CultTrack::Water,
    CultTrack::Earth,
    CultTrack::Air,
];

impl CultTrack {
    /// The uppercase name used in log rows.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CultTrack::Fire => "FIRE",
            CultTrack::Water => "WATER",
            CultTrack::Earth => "EARTH",
            CultTrack::Air => "AIR",
        }
    }

    /// Parse a track from a log word (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<CultTrack> {
        match name.to_ascii_uppercase().as_str() {
            "FIRE" => Some(CultTrack::Fire),
            "WATER" => Some(CultTrack::Water),
            "EARTH" => Some(CultTrack::Earth),
            "AIR" => Some(CultTrack::Air),
            _ => None,
        }
    }
}

impl fmt::Display for CultTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Highest position on a track.
pub const TRACK_TOP: u32 = 10;

/// Milestone positions paying bonus energy, with the energy paid.
const MILESTONES: [(u32, u32); 4] = [(3, 1), (5, 2), (7, 2), (10, 3)];

/// Result of advancing on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Advance {
    /// Steps actually taken (may be fewer than requested).
    pub steps: u32,
    /// Bonus energy earned from newly crossed milestones.
    pub power: u32,
}

/// Result of sending a priest onto a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriestPlacement {
    /// Steps the placement grants.
    pub steps: u32,
    /// Whether the priest stays parked on the track (counts against the
    /// seven-priest ownership cap) rather than returning to the supply.
    pub parked: bool,
}

/// Shared state of all four tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CultBoard {
    positions: BTreeMap<(Faction, CultTrack), u32>,
    claimed: BTreeSet<(Faction, CultTrack, u32)>,
    summit: BTreeMap<CultTrack, Faction>,
    /// Remaining priest action-space values per track; each track starts
    /// with one 3-step space and three 2-step spaces.
    spaces: BTreeMap<CultTrack, Vec<u32>>,
    parked: BTreeMap<Faction, u32>,
}

impl Default for CultBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl CultBoard {
    /// A fresh board with every action space free.
    #[must_use]
    pub fn new() -> Self {
        let mut spaces = BTreeMap::new();
        for track in ALL_TRACKS {
            spaces.insert(track, vec![3, 2, 2, 2]);
        }
        Self {
            positions: BTreeMap::new(),
            claimed: BTreeSet::new(),
            summit: BTreeMap::new(),
            spaces,
            parked: BTreeMap::new(),
        }
    }

    /// Register a player at the faction's starting positions.
    pub fn init_player(&mut self, faction: Faction) {
        let [fire, water, earth, air] = faction.starting_cults();
        self.positions.insert((faction, CultTrack::Fire), fire);
        self.positions.insert((faction, CultTrack::Water), water);
        self.positions.insert((faction, CultTrack::Earth), earth);
        self.positions.insert((faction, CultTrack::Air), air);
    }

    /// Current position of a player on a track.
    #[must_use]
    pub fn position(&self, faction: Faction, track: CultTrack) -> u32 {
        self.positions.get(&(faction, track)).copied().unwrap_or(0)
    }

    /// Priests a player has permanently parked on action spaces.
    #[must_use]
    pub fn parked_priests(&self, faction: Faction) -> u32 {
        self.parked.get(&faction).copied().unwrap_or(0)
    }

    /// Advance a player up to `steps` on a track.
    ///
    /// Position 10 holds a single player per track and requires a
    /// settlement key (`has_key`); without one the advance stops at 9.
    /// Returns the steps actually taken and the milestone energy earned.
    pub fn advance(
        &mut self,
        faction: Faction,
        track: CultTrack,
        steps: u32,
        has_key: bool,
    ) -> Advance {
        if steps == 0 {
            return Advance::default();
        }
        let from = self.position(faction, track);
        let mut to = (from + steps).min(TRACK_TOP);

        if to == TRACK_TOP && from < TRACK_TOP {
            let blocked = self
                .summit
                .get(&track)
                .is_some_and(|&occupant| occupant != faction);
            if blocked || !has_key {
                to = TRACK_TOP - 1;
            }
        }
        if to <= from {
            return Advance::default();
        }

        self.positions.insert((faction, track), to);
        if to == TRACK_TOP {
            self.summit.insert(track, faction);
        }

        let mut power = 0;
        for (position, bonus) in MILESTONES {
            if from < position && to >= position && self.claimed.insert((faction, track, position))
            {
                power += bonus;
            }
        }
        Advance {
            steps: to - from,
            power,
        }
    }

    /// Send a priest to a track: it lands on the largest free action space
    /// (3 steps, then 2), else is sacrificed for a single step.
    #[must_use = "the caller must apply the granted steps"]
    pub fn take_priest_space(&mut self, faction: Faction, track: CultTrack) -> PriestPlacement {
        let spaces = self.spaces.entry(track).or_default();
        if let Some(idx) = spaces.iter().position(|&v| v == 3) {
            spaces.remove(idx);
            *self.parked.entry(faction).or_insert(0) += 1;
            return PriestPlacement { steps: 3, parked: true };
        }
        if let Some(idx) = spaces.iter().position(|&v| v == 2) {
            spaces.remove(idx);
            *self.parked.entry(faction).or_insert(0) += 1;
            return PriestPlacement { steps: 2, parked: true };
        }
        PriestPlacement {
            steps: 1,
            parked: false,
        }
    }

    /// End-game majority bonuses: 8/4/2 points per track for the top three
    /// positions, ties splitting the pooled points rounded down.
    #[must_use]
    pub fn end_game_scores(&self, players: &[Faction]) -> BTreeMap<Faction, i32> {
        let mut scores: BTreeMap<Faction, i32> = BTreeMap::new();
        for track in ALL_TRACKS {
            let mut standings: Vec<(u32, Faction)> = players
                .iter()
                .map(|&f| (self.position(f, track), f))
                .filter(|&(pos, _)| pos > 0)
                .collect();
            standings.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let awards = [8i32, 4, 2];
            let mut rank = 0usize;
            let mut i = 0usize;
            while i < standings.len() && rank < awards.len() {
                let position = standings[i].0;
                let tied: Vec<Faction> = standings[i..]
                    .iter()
                    .take_while(|&&(pos, _)| pos == position)
                    .map(|&(_, f)| f)
                    .collect();
                let pooled: i32 = awards[rank..(rank + tied.len()).min(awards.len())]
                    .iter()
                    .sum();
                #[allow(clippy::cast_possible_wrap)]
                let each = pooled / tied.len() as i32;
                for f in &tied {
                    *scores.entry(*f).or_insert(0) += each;
                }
                i += tied.len();
                rank += tied.len();
            }
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_grants_milestone_power_once() {
        let mut board = CultBoard::new();
        board.init_player(Faction::Engineers);

        let advance = board.advance(Faction::Engineers, CultTrack::Fire, 4, false);
        assert_eq!(advance.steps, 4);
        assert_eq!(advance.power, 1); // crossed 3

        let advance = board.advance(Faction::Engineers, CultTrack::Fire, 3, false);
        assert_eq!(advance.steps, 3);
        assert_eq!(advance.power, 4); // crossed 5 and 7
    }

    #[test]
    fn test_summit_needs_key() {
        let mut board = CultBoard::new();
        board.init_player(Faction::Witches);
        board.advance(Faction::Witches, CultTrack::Air, 7, false); // 2 -> 9

        let advance = board.advance(Faction::Witches, CultTrack::Air, 1, false);
        assert_eq!(advance.steps, 0);
        assert_eq!(board.position(Faction::Witches, CultTrack::Air), 9);

        let advance = board.advance(Faction::Witches, CultTrack::Air, 1, true);
        assert_eq!(advance.steps, 1);
        assert_eq!(advance.power, 3);
    }

    #[test]
    fn test_summit_holds_one_player() {
        let mut board = CultBoard::new();
        board.init_player(Faction::Witches);
        board.init_player(Faction::Auren);
        board.advance(Faction::Witches, CultTrack::Air, 8, true);
        assert_eq!(board.position(Faction::Witches, CultTrack::Air), 10);

        board.advance(Faction::Auren, CultTrack::Air, 9, true);
        assert_eq!(board.position(Faction::Auren, CultTrack::Air), 9);
    }

    #[test]
    fn test_priest_spaces_shrink() {
        let mut board = CultBoard::new();
        board.init_player(Faction::Cultists);

        let p = board.take_priest_space(Faction::Cultists, CultTrack::Earth);
        assert_eq!((p.steps, p.parked), (3, true));
        for _ in 0..3 {
            let p = board.take_priest_space(Faction::Cultists, CultTrack::Earth);
            assert_eq!((p.steps, p.parked), (2, true));
        }
        let p = board.take_priest_space(Faction::Cultists, CultTrack::Earth);
        assert_eq!((p.steps, p.parked), (1, false));
        assert_eq!(board.parked_priests(Faction::Cultists), 4);
    }

    #[test]
    fn test_end_game_scores_split_ties() {
        let mut board = CultBoard::new();
        let players = [Faction::Engineers, Faction::Witches, Faction::Cultists];
        for f in players {
            board.init_player(f);
        }
        // Fire: engineers and witches tie at 6, cultists reach 4.
        board.advance(Faction::Engineers, CultTrack::Fire, 6, false);
        board.advance(Faction::Witches, CultTrack::Fire, 6, false);
        board.advance(Faction::Cultists, CultTrack::Fire, 3, false);
        let scores = board.end_game_scores(&players);
        // Fire pays (8+4)/2 = 6 to each tied leader and 2 to third place.
        // Witches alone on Air (+8), cultists alone on Earth (+8).
        assert_eq!(scores[&Faction::Engineers], 6);
        assert_eq!(scores[&Faction::Witches], 6 + 8);
        assert_eq!(scores[&Faction::Cultists], 2 + 8);
    }
}
