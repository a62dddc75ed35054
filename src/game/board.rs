//! Hex board: coordinates, terrain wheel, buildings, bridges, adjacency.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::game::Faction;

/// An axial coordinate on the pointy-top hex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hex {
    /// Column (axial q).
    pub q: i32,
    /// Row (axial r).
    pub r: i32,
}

/// The six axial direction vectors for pointy-top hexagons.
const DIRECTIONS: [Hex; 6] = [
    Hex { q: 1, r: 0 },
    Hex { q: 1, r: -1 },
    Hex { q: 0, r: -1 },
    Hex { q: -1, r: 0 },
    Hex { q: -1, r: 1 },
    Hex { q: 0, r: 1 },
];

impl Hex {
    /// Create a new axial coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Component-wise sum.
    #[must_use]
    pub const fn add(self, other: Hex) -> Hex {
        Hex::new(self.q + other.q, self.r + other.r)
    }

    /// All six neighbouring coordinates.
    #[must_use]
    pub fn neighbors(self) -> [Hex; 6] {
        let mut out = [Hex::new(0, 0); 6];
        for (slot, dir) in out.iter_mut().zip(DIRECTIONS) {
            *slot = self.add(dir);
        }
        out
    }

    /// Hex distance in axial coordinates.
    #[must_use]
    pub const fn distance(self, other: Hex) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = ((self.q + self.r) - (other.q + other.r)).unsigned_abs();
        (dq + dr + ds) / 2
    }

    /// Whether the two coordinates share an edge.
    #[must_use]
    pub const fn touches(self, other: Hex) -> bool {
        self.distance(other) == 1
    }

    /// Rotate around the origin by `k` sixths of a full turn.
    #[must_use]
    pub const fn rotated(self, k: usize) -> Hex {
        let mut x = self.q;
        let mut z = self.r;
        let mut y = -x - z;
        let mut i = 0;
        while i < k % 6 {
            let (nx, ny, nz) = (-z, -x, -y);
            x = nx;
            y = ny;
            z = nz;
            i += 1;
        }
        Hex::new(x, z)
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

/// One of the seven land terrain types, or river.
///
/// The land terrains sit on a circular wheel; transforming between two of
/// them costs their circular distance in spades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terrain {
    /// Brown.
    Plains,
    /// Black.
    Swamp,
    /// Blue.
    Lake,
    /// Green.
    Forest,
    /// Gray.
    Mountain,
    /// Red.
    Wasteland,
    /// Yellow.
    Desert,
    /// Navigable water; cannot be built on or transformed.
    River,
}

/// Wheel order used for spade-distance computation.
const WHEEL: [Terrain; 7] = [
    Terrain::Plains,
    Terrain::Swamp,
    Terrain::Lake,
    Terrain::Forest,
    Terrain::Mountain,
    Terrain::Wasteland,
    Terrain::Desert,
];

impl Terrain {
    /// Spade cost between two land terrains (shorter way around the wheel).
    ///
    /// Returns `None` if either side is river.
    #[must_use]
    pub fn wheel_distance(self, other: Terrain) -> Option<u32> {
        let from = WHEEL.iter().position(|&t| t == self)?;
        let to = WHEEL.iter().position(|&t| t == other)?;
        let forward = (to + WHEEL.len() - from) % WHEEL.len();
        let backward = (from + WHEEL.len() - to) % WHEEL.len();
        #[allow(clippy::cast_possible_truncation)]
        Some(forward.min(backward) as u32)
    }

    /// Parse a log color word ("gray", "black", …) or a terrain name.
    #[must_use]
    pub fn from_log_word(word: &str) -> Option<Terrain> {
        match word.to_ascii_lowercase().as_str() {
            "brown" | "plains" => Some(Terrain::Plains),
            "black" | "swamp" => Some(Terrain::Swamp),
            "blue" | "lake" => Some(Terrain::Lake),
            "green" | "forest" => Some(Terrain::Forest),
            "gray" | "grey" | "mountain" => Some(Terrain::Mountain),
            "red" | "wasteland" => Some(Terrain::Wasteland),
            "yellow" | "desert" => Some(Terrain::Desert),
            _ => None,
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Terrain::Plains => "plains",
            Terrain::Swamp => "swamp",
            Terrain::Lake => "lake",
            Terrain::Forest => "forest",
            Terrain::Mountain => "mountain",
            Terrain::Wasteland => "wasteland",
            Terrain::Desert => "desert",
            Terrain::River => "river",
        };
        f.write_str(text)
    }
}

/// The five building types, ordered by upgrade tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Building {
    /// The basic structure every chain starts from.
    Dwelling,
    /// First upgrade; doubles as the fork point to stronghold.
    TradingHouse,
    /// Cult-oriented upgrade from a trading house.
    Temple,
    /// Single large cult building, upgraded from a temple.
    Sanctuary,
    /// Single faction keep, upgraded from a trading house.
    Stronghold,
}

impl Building {
    /// Energy value counted by reward offers and settlement formation.
    #[must_use]
    pub const fn power_value(self) -> u32 {
        match self {
            Building::Dwelling => 1,
            Building::TradingHouse | Building::Temple => 2,
            Building::Sanctuary | Building::Stronghold => 3,
        }
    }

    /// Two-letter code used in the log dialect.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Building::Dwelling => "D",
            Building::TradingHouse => "TP",
            Building::Temple => "TE",
            Building::Sanctuary => "SA",
            Building::Stronghold => "SH",
        }
    }

    /// Parse the log code ("D", "TP", "TE", "SA", "SH").
    #[must_use]
    pub fn from_code(code: &str) -> Option<Building> {
        match code.to_ascii_uppercase().as_str() {
            "D" => Some(Building::Dwelling),
            "TP" => Some(Building::TradingHouse),
            "TE" => Some(Building::Temple),
            "SA" => Some(Building::Sanctuary),
            "SH" => Some(Building::Stronghold),
            _ => None,
        }
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Building::Dwelling => "dwelling",
            Building::TradingHouse => "trading house",
            Building::Temple => "temple",
            Building::Sanctuary => "sanctuary",
            Building::Stronghold => "stronghold",
        };
        f.write_str(text)
    }
}

/// A building standing on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// Building type.
    pub kind: Building,
    /// Owning player.
    pub owner: Faction,
}

/// One board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Current terrain.
    pub terrain: Terrain,
    /// Building on the cell, if any.
    pub building: Option<Piece>,
}

/// How far a player's buildings reach when clustering cells together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    /// Edge/bridge adjacency plus river navigation up to the given level.
    Shipping(u32),
    /// Plain hex distance up to the given radius (carpet flight, tunnelling).
    Range(u32),
}

/// Base-map rows: starting axial column and one terrain code per cell.
/// Codes: P plains, S swamp, L lake, F forest, M mountain, W wasteland,
/// D desert, R river.
const BASE_ROWS: [(i32, &str); 9] = [
    (0, "PMFLDWPSWFLWS"),
    (0, "DRRPSRRDSRRD"),
    (-1, "RRSRMRFRFRMRR"),
    (-1, "FLDRRWLRWRWP"),
    (-2, "SPWLSPMDRRFSL"),
    (-2, "MFRRDFRRRPMP"),
    (-3, "RRRMRWRFRDSLD"),
    (-3, "DLPRRRLSRMPM"),
    (-4, "WSMLWFDPMRLFW"),
];

const fn terrain_code(code: u8) -> Terrain {
    match code {
        b'P' => Terrain::Plains,
        b'S' => Terrain::Swamp,
        b'L' => Terrain::Lake,
        b'F' => Terrain::Forest,
        b'M' => Terrain::Mountain,
        b'W' => Terrain::Wasteland,
        b'D' => Terrain::Desert,
        _ => Terrain::River,
    }
}

/// The game board: cells plus built bridges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: BTreeMap<Hex, Cell>,
    bridges: BTreeSet<(Hex, Hex)>,
}

impl Default for Board {
    fn default() -> Self {
        Self::base_game()
    }
}

impl Board {
    /// The standard base-game board: 9 rows alternating 13/12 cells.
    #[must_use]
    pub fn base_game() -> Self {
        let mut cells = BTreeMap::new();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        for (r, (start_q, codes)) in BASE_ROWS.iter().enumerate() {
            for (i, code) in codes.bytes().enumerate() {
                let hex = Hex::new(start_q + i as i32, r as i32);
                cells.insert(
                    hex,
                    Cell {
                        terrain: terrain_code(code),
                        building: None,
                    },
                );
            }
        }
        Self {
            cells,
            bridges: BTreeSet::new(),
        }
    }

    /// Cell at the given coordinate.
    #[must_use]
    pub fn cell(&self, hex: Hex) -> Option<&Cell> {
        self.cells.get(&hex)
    }

    /// Mutable cell at the given coordinate.
    #[must_use]
    pub fn cell_mut(&mut self, hex: Hex) -> Option<&mut Cell> {
        self.cells.get_mut(&hex)
    }

    /// Iterate over all cells in deterministic coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (Hex, &Cell)> {
        self.cells.iter().map(|(&h, c)| (h, c))
    }

    /// All cells carrying a building of the given player, in order.
    pub fn buildings_of(&self, owner: Faction) -> impl Iterator<Item = (Hex, Piece)> + '_ {
        self.iter()
            .filter_map(move |(h, c)| c.building.filter(|p| p.owner == owner).map(|p| (h, p)))
    }

    /// Whether the coordinate exists on the board.
    #[must_use]
    pub fn contains(&self, hex: Hex) -> bool {
        self.cells.contains_key(&hex)
    }

    /// Whether the cell is river.
    #[must_use]
    pub fn is_river(&self, hex: Hex) -> bool {
        self.cell(hex).is_some_and(|c| c.terrain == Terrain::River)
    }

    /// Whether a bridge connects the two cells.
    #[must_use]
    pub fn has_bridge(&self, a: Hex, b: Hex) -> bool {
        self.bridges.contains(&bridge_key(a, b))
    }

    /// All built bridges, endpoint-normalized.
    #[must_use]
    pub fn bridges(&self) -> &BTreeSet<(Hex, Hex)> {
        &self.bridges
    }

    /// Build a bridge between two land cells across a river edge.
    ///
    /// The offset between the endpoints must be one of the six distance-2
    /// bridge vectors, and both cells along the crossed edge must be river.
    ///
    /// # Errors
    ///
    /// Returns an error for off-board endpoints, river endpoints, invalid
    /// geometry, or a duplicate bridge.
    pub fn build_bridge(&mut self, a: Hex, b: Hex) -> EngineResult<()> {
        if !self.contains(a) || !self.contains(b) {
            return Err(EngineError::InvalidBridge(a, b));
        }
        if self.is_river(a) || self.is_river(b) {
            return Err(EngineError::InvalidBridge(a, b));
        }
        if !self.valid_bridge_geometry(a, b) {
            return Err(EngineError::InvalidBridge(a, b));
        }
        if !self.bridges.insert(bridge_key(a, b)) {
            return Err(EngineError::InvalidBridge(a, b));
        }
        Ok(())
    }

    fn valid_bridge_geometry(&self, a: Hex, b: Hex) -> bool {
        let delta = Hex::new(b.q - a.q, b.r - a.r);
        let target = Hex::new(1, -2);
        let mid_a = Hex::new(0, -1);
        let mid_b = Hex::new(1, -1);
        (0..6).any(|rot| {
            delta == target.rotated(rot)
                && self.is_river(a.add(mid_a.rotated(rot)))
                && self.is_river(a.add(mid_b.rotated(rot)))
        })
    }

    /// Direct adjacency: shared edge or a built bridge.
    #[must_use]
    pub fn directly_adjacent(&self, a: Hex, b: Hex) -> bool {
        a.touches(b) || self.has_bridge(a, b)
    }

    /// Indirect adjacency: reachable over river cells with the given
    /// shipping level. Directly adjacent cells are not indirect.
    #[must_use]
    pub fn indirectly_adjacent(&self, a: Hex, b: Hex, shipping: u32) -> bool {
        if shipping == 0 || self.directly_adjacent(a, b) || self.is_river(a) || self.is_river(b) {
            return false;
        }

        let mut visited: BTreeSet<Hex> = BTreeSet::new();
        let mut frontier: Vec<Hex> = a
            .neighbors()
            .into_iter()
            .filter(|&n| self.is_river(n))
            .collect();
        visited.extend(frontier.iter().copied());

        for step in 1..=shipping {
            if frontier.iter().any(|river| river.touches(b)) {
                return true;
            }
            if step == shipping {
                break;
            }
            let mut next = Vec::new();
            for river in &frontier {
                for n in river.neighbors() {
                    if self.is_river(n) && visited.insert(n) {
                        next.push(n);
                    }
                }
            }
            frontier = next;
        }
        false
    }

    /// Neighbours reachable by direct adjacency, including bridge ends.
    #[must_use]
    pub fn direct_neighbors(&self, hex: Hex) -> Vec<Hex> {
        let mut out: Vec<Hex> = hex
            .neighbors()
            .into_iter()
            .filter(|&n| self.contains(n))
            .collect();
        for &(a, b) in &self.bridges {
            if a == hex {
                out.push(b);
            } else if b == hex {
                out.push(a);
            }
        }
        out
    }

    /// Transform a cell's terrain. The cell must exist, be land, and be empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is missing, river, or occupied.
    pub fn transform(&mut self, hex: Hex, to: Terrain) -> EngineResult<()> {
        let cell = self.cells.get_mut(&hex).ok_or(EngineError::NoSuchCell(hex))?;
        if cell.terrain == Terrain::River {
            return Err(EngineError::BadTerrain {
                cell: hex,
                terrain: Terrain::River,
            });
        }
        if cell.building.is_some() {
            return Err(EngineError::CellOccupied(hex));
        }
        cell.terrain = to;
        Ok(())
    }

    /// Place a building on an empty land cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is missing, river, or occupied.
    pub fn place(&mut self, hex: Hex, piece: Piece) -> EngineResult<()> {
        let cell = self.cells.get_mut(&hex).ok_or(EngineError::NoSuchCell(hex))?;
        if cell.terrain == Terrain::River {
            return Err(EngineError::BadTerrain {
                cell: hex,
                terrain: Terrain::River,
            });
        }
        if cell.building.is_some() {
            return Err(EngineError::CellOccupied(hex));
        }
        cell.building = Some(piece);
        Ok(())
    }

    /// The connected cluster of the player's buildings containing `start`,
    /// using direct adjacency (edges and bridges). Used for settlement
    /// formation. With `river_skip`, a single river cell may be stepped
    /// over (the Mermaids rule).
    #[must_use]
    pub fn building_cluster(&self, start: Hex, owner: Faction, river_skip: bool) -> Vec<Hex> {
        let mut visited = BTreeSet::new();
        let mut cluster = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(hex) = queue.pop_front() {
            if !visited.insert(hex) {
                continue;
            }
            let owned = self
                .cell(hex)
                .and_then(|c| c.building)
                .is_some_and(|p| p.owner == owner);
            if !owned {
                continue;
            }
            cluster.push(hex);
            for n in self.direct_neighbors(hex) {
                queue.push_back(n);
                if river_skip && self.is_river(n) {
                    for beyond in n.neighbors() {
                        if self.contains(beyond) && !self.is_river(beyond) {
                            queue.push_back(beyond);
                        }
                    }
                }
            }
        }
        cluster
    }

    /// Size of the player's largest connected building area under the given
    /// reach. Used for end-game area scoring.
    #[must_use]
    pub fn largest_connected_area(&self, owner: Faction, reach: Reach) -> u32 {
        let mut visited: BTreeSet<Hex> = BTreeSet::new();
        let mut best = 0u32;

        let starts: Vec<Hex> = self.buildings_of(owner).map(|(h, _)| h).collect();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            let mut size = 0u32;
            let mut queue = VecDeque::from([start]);
            while let Some(hex) = queue.pop_front() {
                if !visited.insert(hex) {
                    continue;
                }
                let owned = self
                    .cell(hex)
                    .and_then(|c| c.building)
                    .is_some_and(|p| p.owner == owner);
                if !owned {
                    continue;
                }
                size += 1;
                match reach {
                    Reach::Range(radius) => {
                        for (other, _) in self.buildings_of(owner) {
                            if !visited.contains(&other) && hex.distance(other) <= radius {
                                queue.push_back(other);
                            }
                        }
                    }
                    Reach::Shipping(level) => {
                        for n in self.direct_neighbors(hex) {
                            queue.push_back(n);
                        }
                        if level > 0 {
                            for (other, _) in self.buildings_of(owner) {
                                if !visited.contains(&other)
                                    && self.indirectly_adjacent(hex, other, level)
                                {
                                    queue.push_back(other);
                                }
                            }
                        }
                    }
                }
            }
            best = best.max(size);
        }
        best
    }
}

fn bridge_key(a: Hex, b: Hex) -> (Hex, Hex) {
    if a <= b { (a, b) } else { (b, a) }
}
