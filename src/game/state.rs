//! The mutable game aggregate: players, pools, offers, entitlements.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{EngineError, EngineResult};
use crate::game::board::{Board, Building, Hex};
use crate::game::cult::{CultBoard, ALL_TRACKS};
use crate::game::faction::{building_income, BuildingCounts, Faction};
use crate::game::power_actions::PowerActionBoard;
use crate::game::resources::{Income, Wallet};
use crate::game::scoring::{CultReward, Deed, ScoreBreakdown, ScoringState};
use crate::game::tiles::{BonusCardPool, FavorPool, FavorTile, TownPool, TownTile};

/// Phases of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial dwellings and bonus-card picks.
    Setup,
    /// Start-of-round income.
    Income,
    /// Player turns.
    Action,
    /// End-of-round bookkeeping.
    Cleanup,
    /// Final scoring done; state is frozen.
    End,
}

/// Number of rounds in a game.
pub const LAST_ROUND: u32 = 6;

/// One player's private state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// The faction, doubling as the player's identity.
    pub faction: Faction,
    /// Display name from the log header.
    pub name: String,
    /// Victory points.
    pub vp: i32,
    /// Wallet and energy pool.
    pub wallet: Wallet,
    /// Sea-access level.
    pub shipping: u32,
    /// Excavation level.
    pub digging: u32,
    /// Settlement keys held.
    pub keys: u32,
    /// Favor tiles held (each at most once).
    pub favor_tiles: Vec<FavorTile>,
    /// Settlement tiles held.
    pub town_tiles: Vec<TownTile>,
    /// Whether the player passed this round.
    pub passed: bool,
    /// Whether the once-per-round favor cult step was used.
    pub favor_action_used: bool,
    /// Whether the once-per-round bonus-card action was used.
    pub bonus_action_used: bool,
    /// Whether the once-per-round stronghold action was used.
    pub stronghold_action_used: bool,
}

impl Player {
    fn new(faction: Faction, name: String) -> Self {
        Self {
            faction,
            name,
            vp: 20,
            wallet: faction.starting_wallet(),
            shipping: faction.starting_shipping(),
            digging: 0,
            keys: 0,
            favor_tiles: Vec::new(),
            town_tiles: Vec::new(),
            passed: false,
            favor_action_used: false,
            bonus_action_used: false,
            stronghold_action_used: false,
        }
    }

    /// Whether the player holds a favor tile.
    #[must_use]
    pub fn has_favor(&self, tile: FavorTile) -> bool {
        self.favor_tiles.contains(&tile)
    }

    /// The energy total a settlement must reach for this player.
    #[must_use]
    pub fn town_threshold(&self) -> u32 {
        if self.has_favor(FavorTile::Fav5) { 6 } else { 7 }
    }
}

/// An open reward offer: energy in exchange for victory points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeechOffer {
    /// Energy offered.
    pub amount: u32,
    /// Points forfeited on acceptance.
    pub vp_cost: i32,
    /// The player whose building created the offer.
    pub from: Faction,
}

/// Free terraform credits a player holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FreeSpades {
    /// Credits that already earned scoring-tile points when granted
    /// (power actions, the spade bonus card).
    pub scored: u32,
    /// Credits from round-reward milestones; these never score.
    pub unscored: u32,
}

impl FreeSpades {
    /// Total credits available.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.scored + self.unscored
    }
}

/// A formed settlement candidate awaiting its tile selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTown {
    /// The connected cells forming the settlement.
    pub cells: Vec<Hex>,
}

/// Bookkeeping for the Cultists' reward when their building triggers
/// offers: a cult step if anyone accepts, one energy if everyone declines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CultistsWatch {
    open: u32,
    accepted: u32,
}

/// The complete game state, owned by exactly one interpreter.
#[derive(Debug, Clone)]
pub struct GameState {
    /// The board.
    pub board: Board,
    /// Players in seating order.
    pub players: Vec<Player>,
    /// Current round, 0 during setup.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    /// Turn order for the current round.
    pub turn_order: Vec<Faction>,
    /// Factions in the order they passed this round.
    pub pass_order: Vec<Faction>,
    /// The four progression tracks.
    pub cults: CultBoard,
    /// Shared favor-tile pool.
    pub favor_pool: FavorPool,
    /// Shared settlement-tile pool.
    pub town_pool: TownPool,
    /// Bonus-card roster and holdings.
    pub bonus_cards: BonusCardPool,
    /// The six shared power actions.
    pub power_actions: PowerActionBoard,
    /// Round scoring tiles.
    pub scoring: ScoringState,
    /// Final-score snapshot, set once at game end.
    pub final_scores: Option<BTreeMap<Faction, ScoreBreakdown>>,
    leech_offers: BTreeMap<Faction, VecDeque<LeechOffer>>,
    free_spades: BTreeMap<Faction, FreeSpades>,
    favors_owed: BTreeMap<Faction, u32>,
    pending_towns: BTreeMap<Faction, Vec<PendingTown>>,
    town_cells: BTreeSet<Hex>,
    cultists_watch: BTreeMap<Faction, CultistsWatch>,
    cult_choices_owed: BTreeMap<Faction, u32>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A fresh setup-phase state on the base board.
    #[must_use]
    pub fn new() -> Self {
        Self {
            board: Board::base_game(),
            players: Vec::new(),
            round: 0,
            phase: Phase::Setup,
            turn_order: Vec::new(),
            pass_order: Vec::new(),
            cults: CultBoard::new(),
            favor_pool: FavorPool::new(),
            town_pool: TownPool::new(),
            bonus_cards: BonusCardPool::default(),
            power_actions: PowerActionBoard::default(),
            scoring: ScoringState::default(),
            final_scores: None,
            leech_offers: BTreeMap::new(),
            free_spades: BTreeMap::new(),
            favors_owed: BTreeMap::new(),
            pending_towns: BTreeMap::new(),
            town_cells: BTreeSet::new(),
            cultists_watch: BTreeMap::new(),
            cult_choices_owed: BTreeMap::new(),
        }
    }

    /// Register a player. Starting positions come from the faction board.
    ///
    /// # Errors
    ///
    /// Returns an error if the faction is already seated.
    pub fn add_player(&mut self, faction: Faction, name: &str) -> EngineResult<()> {
        if self.player(faction).is_some() {
            return Err(EngineError::UnknownPlayer(faction));
        }
        self.cults.init_player(faction);
        self.players.push(Player::new(faction, name.to_owned()));
        Ok(())
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, faction: Faction) -> Option<&Player> {
        self.players.iter().find(|p| p.faction == faction)
    }

    /// Look up a player mutably.
    #[must_use]
    pub fn player_mut(&mut self, faction: Faction) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.faction == faction)
    }

    /// Look up a player or fail.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPlayer`] if the faction is not seated.
    pub fn require_player(&self, faction: Faction) -> EngineResult<&Player> {
        self.player(faction).ok_or(EngineError::UnknownPlayer(faction))
    }

    /// Look up a player mutably or fail.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPlayer`] if the faction is not seated.
    pub fn require_player_mut(&mut self, faction: Faction) -> EngineResult<&mut Player> {
        self.player_mut(faction)
            .ok_or(EngineError::UnknownPlayer(faction))
    }

    /// Tally the player's buildings on the board.
    #[must_use]
    pub fn building_counts(&self, faction: Faction) -> BuildingCounts {
        let mut counts = BuildingCounts::default();
        for (_, piece) in self.board.buildings_of(faction) {
            match piece.kind {
                Building::Dwelling => counts.dwellings += 1,
                Building::TradingHouse => counts.trading_houses += 1,
                Building::Temple => counts.temples += 1,
                Building::Sanctuary => counts.sanctuaries += 1,
                Building::Stronghold => counts.strongholds += 1,
            }
        }
        counts
    }

    /// Whether the player's stronghold stands.
    #[must_use]
    pub fn has_stronghold(&self, faction: Faction) -> bool {
        self.building_counts(faction).strongholds > 0
    }

    /// Sea-access level including a held `BON4` bonus.
    #[must_use]
    pub fn effective_shipping(&self, faction: Faction) -> u32 {
        let base = self.player(faction).map_or(0, |p| p.shipping);
        let bonus = self.bonus_cards.held_by(faction).map_or(0, |c| c.shipping_bonus());
        base + bonus
    }

    /// Whether the cell can be reached from the player's buildings
    /// (directly, over a bridge, or by river navigation). A player with no
    /// buildings reaches everywhere (initial placement).
    #[must_use]
    pub fn reachable(&self, faction: Faction, target: Hex) -> bool {
        let shipping = self.effective_shipping(faction);
        let mut any = false;
        for (hex, _) in self.board.buildings_of(faction) {
            any = true;
            if self.board.directly_adjacent(target, hex)
                || self.board.indirectly_adjacent(target, hex, shipping)
            {
                return true;
            }
        }
        !any
    }

    // ----- reward offers -----

    /// Create reward offers for every opponent adjacent to a new or
    /// upgraded building. `power_delta` is the energy value the event adds.
    pub fn trigger_leech(&mut self, built: Hex, builder: Faction, power_delta: u32) {
        if power_delta == 0 {
            return;
        }
        let mut per_opponent: BTreeMap<Faction, u32> = BTreeMap::new();
        for neighbor in built.neighbors() {
            if let Some(piece) = self.board.cell(neighbor).and_then(|c| c.building) {
                if piece.owner != builder {
                    *per_opponent.entry(piece.owner).or_insert(0) +=
                        piece.kind.power_value();
                }
            }
        }

        let mut created = 0u32;
        for (opponent, total) in per_opponent {
            let capacity = self
                .player(opponent)
                .map_or(0, |p| p.wallet.power.capacity());
            let amount = total.min(capacity);
            if amount == 0 {
                continue;
            }
            #[allow(clippy::cast_possible_wrap)]
            let vp_cost = amount as i32 - 1;
            self.leech_offers.entry(opponent).or_default().push_back(LeechOffer {
                amount,
                vp_cost,
                from: builder,
            });
            created += 1;
        }

        if builder == Faction::Cultists && created > 0 {
            let watch = self.cultists_watch.entry(builder).or_default();
            watch.open += created;
        }
    }

    /// Open offers for a player, oldest first.
    #[must_use]
    pub fn offers_for(&self, faction: Faction) -> Vec<LeechOffer> {
        self.leech_offers
            .get(&faction)
            .map_or_else(Vec::new, |q| q.iter().copied().collect())
    }

    /// Accept the oldest offer matching the optional source and amount.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoPendingOffer`] when nothing matches.
    pub fn accept_offer(
        &mut self,
        faction: Faction,
        source: Option<Faction>,
        amount: Option<u32>,
    ) -> EngineResult<()> {
        let offer = self.pop_offer(faction, source, amount)?;
        let parked = self.cults.parked_priests(faction);
        let player = self.require_player_mut(faction)?;
        player.wallet.gain(
            Income {
                power: offer.amount,
                ..Income::default()
            },
            parked,
        );
        player.vp -= offer.vp_cost;
        self.resolve_cultists_watch(offer.from, true);
        Ok(())
    }

    /// Decline the oldest offer matching the optional source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoPendingOffer`] when nothing matches.
    pub fn decline_offer(&mut self, faction: Faction, source: Option<Faction>) -> EngineResult<()> {
        let offer = self.pop_offer(faction, source, None)?;
        self.resolve_cultists_watch(offer.from, false);
        Ok(())
    }

    fn pop_offer(
        &mut self,
        faction: Faction,
        source: Option<Faction>,
        amount: Option<u32>,
    ) -> EngineResult<LeechOffer> {
        let queue = self
            .leech_offers
            .get_mut(&faction)
            .ok_or(EngineError::NoPendingOffer(faction))?;
        let index = queue
            .iter()
            .position(|offer| {
                source.is_none_or(|s| offer.from == s)
                    && amount.is_none_or(|a| offer.amount == a)
            })
            // An explicit amount that no offer matches still binds by source.
            .or_else(|| queue.iter().position(|o| source.is_none_or(|s| o.from == s)))
            .ok_or(EngineError::NoPendingOffer(faction))?;
        queue.remove(index).ok_or(EngineError::NoPendingOffer(faction))
    }

    fn resolve_cultists_watch(&mut self, builder: Faction, accepted: bool) {
        let Some(watch) = self.cultists_watch.get_mut(&builder) else {
            return;
        };
        watch.open -= 1;
        if accepted {
            watch.accepted += 1;
        }
        if watch.open > 0 {
            return;
        }
        let watch = self
            .cultists_watch
            .remove(&builder)
            .unwrap_or_default();
        if watch.accepted > 0 {
            *self.cult_choices_owed.entry(builder).or_insert(0) += 1;
        } else if let Some(player) = self.player_mut(builder) {
            player.wallet.power.gain(1);
        }
    }

    /// Cult steps the Cultists may still claim from resolved offers.
    #[must_use]
    pub fn cult_choices_owed(&self, faction: Faction) -> u32 {
        self.cult_choices_owed.get(&faction).copied().unwrap_or(0)
    }

    /// Consume one owed cult step, if any.
    pub fn take_cult_choice(&mut self, faction: Faction) -> bool {
        match self.cult_choices_owed.get_mut(&faction) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    // ----- free terraform credits -----

    /// The player's free-spade credits.
    #[must_use]
    pub fn free_spades(&self, faction: Faction) -> FreeSpades {
        self.free_spades.get(&faction).copied().unwrap_or_default()
    }

    /// Grant free-spade credits. `scored` marks credits whose scoring-tile
    /// points were already awarded at grant time.
    pub fn grant_spades(&mut self, faction: Faction, count: u32, scored: bool) {
        let entry = self.free_spades.entry(faction).or_default();
        if scored {
            entry.scored += count;
        } else {
            entry.unscored += count;
        }
    }

    /// Consume up to `needed` credits and return how many were used.
    pub fn consume_spades(&mut self, faction: Faction, needed: u32) -> u32 {
        let Some(entry) = self.free_spades.get_mut(&faction) else {
            return 0;
        };
        let from_unscored = needed.min(entry.unscored);
        entry.unscored -= from_unscored;
        let from_scored = (needed - from_unscored).min(entry.scored);
        entry.scored -= from_scored;
        if entry.total() == 0 {
            self.free_spades.remove(&faction);
        }
        from_unscored + from_scored
    }

    /// Drop every unscored (round-reward) credit; they lapse when the
    /// action phase begins.
    pub fn lapse_unscored_spades(&mut self) {
        for entry in self.free_spades.values_mut() {
            entry.unscored = 0;
        }
        self.free_spades.retain(|_, e| e.total() > 0);
    }

    // ----- favor-tile obligations -----

    /// Favor-tile selections currently owed to the player.
    #[must_use]
    pub fn favors_owed(&self, faction: Faction) -> u32 {
        self.favors_owed.get(&faction).copied().unwrap_or(0)
    }

    /// Owe the player additional favor-tile selections.
    pub fn owe_favors(&mut self, faction: Faction, count: u32) {
        *self.favors_owed.entry(faction).or_insert(0) += count;
    }

    /// Take a favor tile against an owed selection: removes it from the
    /// pool, stores it, and applies its immediate cult grant.
    ///
    /// # Errors
    ///
    /// Fails when no selection is owed, the pool ran dry, or the player
    /// already holds the tile.
    pub fn take_favor_tile(&mut self, faction: Faction, tile: FavorTile) -> EngineResult<()> {
        let owed = self.favors_owed.entry(faction).or_insert(0);
        if *owed == 0 {
            return Err(EngineError::NoFavorOwed);
        }
        if self.require_player(faction)?.has_favor(tile) {
            return Err(EngineError::FavorTileHeld(tile));
        }
        self.favor_pool.take(tile)?;
        *self.favors_owed.entry(faction).or_insert(0) -= 1;

        let player = self.require_player_mut(faction)?;
        player.favor_tiles.push(tile);
        let has_key = player.keys > 0;
        let (track, steps) = tile.cult_grant();
        let advance = self.cults.advance(faction, track, steps, has_key);
        if advance.power > 0 {
            let parked = self.cults.parked_priests(faction);
            self.require_player_mut(faction)?.wallet.gain(
                Income {
                    power: advance.power,
                    ..Income::default()
                },
                parked,
            );
        }
        Ok(())
    }

    // ----- settlement formation -----

    /// Check whether placing or upgrading at `origin` completed a
    /// settlement, and queue it for tile selection if so.
    pub fn check_town_formation(&mut self, faction: Faction, origin: Hex) {
        let Some(player) = self.player(faction) else {
            return;
        };
        let threshold = player.town_threshold();
        let river_skip = faction.town_river_skip();
        let cluster = self.board.building_cluster(origin, faction, river_skip);

        if cluster.len() < 4 {
            return;
        }
        if cluster.iter().any(|c| self.town_cells.contains(c)) {
            return;
        }
        let power: u32 = cluster
            .iter()
            .filter_map(|&c| self.board.cell(c).and_then(|cell| cell.building))
            .map(|p| p.kind.power_value())
            .sum();
        if power < threshold {
            return;
        }
        self.pending_towns
            .entry(faction)
            .or_default()
            .push(PendingTown { cells: cluster });
    }

    /// Settlement candidates waiting for a tile selection.
    #[must_use]
    pub fn pending_towns(&self, faction: Faction) -> usize {
        self.pending_towns.get(&faction).map_or(0, Vec::len)
    }

    /// Resolve the oldest pending settlement with the chosen tile.
    ///
    /// # Errors
    ///
    /// Fails when nothing is pending or the tile pool ran dry.
    pub fn select_town_tile(&mut self, faction: Faction, tile: TownTile) -> EngineResult<()> {
        if self.pending_towns(faction) == 0 {
            return Err(EngineError::NoTownPending);
        }
        self.town_pool.take(tile)?;
        let town = self
            .pending_towns
            .get_mut(&faction)
            .ok_or(EngineError::NoTownPending)?
            .remove(0);
        self.town_cells.extend(town.cells.iter().copied());

        let round = self.round;
        let deed_vp = self.scoring.deed_vp(round, Deed::Town);
        let parked = self.cults.parked_priests(faction);
        let player = self.require_player_mut(faction)?;
        player.town_tiles.push(tile);
        player.keys += tile.keys();
        player.vp += tile.vp() + deed_vp + faction.town_founding_vp();
        let mut grant = tile.grant();
        grant.workers += faction.town_founding_workers();
        player.wallet.gain(grant, parked);

        let steps = tile.cult_steps();
        if steps > 0 {
            let mut power = 0;
            for track in ALL_TRACKS {
                let has_key = self.require_player(faction)?.keys > 0;
                power += self.cults.advance(faction, track, steps, has_key).power;
            }
            if power > 0 {
                let parked = self.cults.parked_priests(faction);
                self.require_player_mut(faction)?.wallet.gain(
                    Income {
                        power,
                        ..Income::default()
                    },
                    parked,
                );
            }
        }
        Ok(())
    }

    // ----- scoring hooks -----

    /// Award the active scoring tile's points for a deed.
    pub fn award_deed_vp(&mut self, faction: Faction, deed: Deed) {
        let vp = self.scoring.deed_vp(self.round, deed);
        if vp != 0 {
            if let Some(player) = self.player_mut(faction) {
                player.vp += vp;
            }
        }
    }

    /// Apply the end-of-round cult rewards for `round`'s scoring tile.
    /// Called at the start of the following round's income step.
    pub fn apply_cult_rewards(&mut self, round: u32) {
        let Some(tile) = self.scoring.tile_for_round(round) else {
            return;
        };

        if let CultReward::CoinsPerPriestSent(rate) = tile.reward() {
            let sent = self.scoring.drain_priests_sent();
            for (faction, count) in sent {
                if let Some(player) = self.player_mut(faction) {
                    player.wallet.coins += count * rate;
                }
            }
            return;
        }

        let Some(track) = tile.cult_track() else {
            return;
        };
        let threshold = tile.threshold();
        if threshold == 0 {
            return;
        }
        let factions: Vec<Faction> = self.players.iter().map(|p| p.faction).collect();
        for faction in factions {
            let crossings = self.cults.position(faction, track) / threshold;
            if crossings == 0 {
                continue;
            }
            let parked = self.cults.parked_priests(faction);
            match tile.reward() {
                CultReward::Coins(n) => {
                    if let Some(p) = self.player_mut(faction) {
                        p.wallet.coins += crossings * n;
                    }
                }
                CultReward::Workers(n) => {
                    if let Some(p) = self.player_mut(faction) {
                        p.wallet.workers += crossings * n;
                    }
                }
                CultReward::Priests(n) => {
                    if let Some(p) = self.player_mut(faction) {
                        p.wallet.gain(
                            Income {
                                priests: crossings * n,
                                ..Income::default()
                            },
                            parked,
                        );
                    }
                }
                CultReward::Power(n) => {
                    if let Some(p) = self.player_mut(faction) {
                        p.wallet.power.gain(crossings * n);
                    }
                }
                CultReward::Spades(n) => {
                    self.grant_spades(faction, crossings * n, false);
                }
                CultReward::CoinsPerPriestSent(_) => {}
            }
        }
    }

    // ----- round flow -----

    /// Income for one player from all sources.
    #[must_use]
    pub fn income_for(&self, faction: Faction) -> Income {
        let Some(player) = self.player(faction) else {
            return Income::default();
        };
        let mut income = faction.base_income();
        income = income.plus(building_income(faction, &self.building_counts(faction)));
        for tile in &player.favor_tiles {
            income = income.plus(tile.income());
        }
        if let Some(card) = self.bonus_cards.held_by(faction) {
            income = income.plus(card.income());
        }
        income
    }

    /// Grant income to every player.
    pub fn grant_income(&mut self) {
        let factions: Vec<Faction> = self.players.iter().map(|p| p.faction).collect();
        for faction in factions {
            let income = self.income_for(faction);
            let parked = self.cults.parked_priests(faction);
            if let Some(player) = self.player_mut(faction) {
                player.wallet.gain(income, parked);
            }
        }
    }

    /// Begin a round: set the number, adopt the turn order, reset
    /// per-round flags. The phase becomes [`Phase::Income`]; income itself
    /// is granted later by the interpreter.
    pub fn start_round(&mut self, round: u32, turn_order: &[Faction]) {
        self.round = round;
        self.phase = Phase::Income;
        if !turn_order.is_empty() {
            self.turn_order = turn_order.to_vec();
        } else if !self.pass_order.is_empty() {
            self.turn_order.clone_from(&self.pass_order);
        }
        self.pass_order.clear();
        self.power_actions.reset();
        self.leech_offers.clear();
        self.cultists_watch.clear();
        // Priests sent count per round; the deferred reward for the prior
        // round was already applied by the caller.
        let _ = self.scoring.drain_priests_sent();
        for player in &mut self.players {
            player.passed = false;
            player.favor_action_used = false;
            player.bonus_action_used = false;
            player.stronghold_action_used = false;
        }
    }

    /// Enter the action phase; leftover round-reward spades lapse here.
    pub fn start_action_phase(&mut self) {
        self.lapse_unscored_spades();
        self.phase = Phase::Action;
    }

    /// Whether every seated player has passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.passed)
    }

    /// End-of-round cleanup. In the final round this runs final scoring
    /// instead and freezes the state.
    pub fn cleanup(&mut self) {
        if self.round >= LAST_ROUND {
            self.finish();
            return;
        }
        self.phase = Phase::Cleanup;
        self.bonus_cards.accrue_coins();
    }

    fn finish(&mut self) {
        if self.final_scores.is_some() {
            return;
        }
        self.phase = Phase::End;
        let scores = self.compute_final_scores();
        for (faction, score) in &scores {
            if let Some(player) = self.player_mut(*faction) {
                player.vp = score.total_vp;
            }
        }
        self.final_scores = Some(scores);
    }

    /// The final-score breakdown for every player.
    #[must_use]
    pub fn compute_final_scores(&self) -> BTreeMap<Faction, ScoreBreakdown> {
        let factions: Vec<Faction> = self.players.iter().map(|p| p.faction).collect();

        let mut areas: BTreeMap<Faction, u32> = BTreeMap::new();
        for &faction in &factions {
            let player = match self.player(faction) {
                Some(p) => p,
                None => continue,
            };
            let reach = faction.area_reach(player.shipping, self.has_stronghold(faction));
            areas.insert(faction, self.board.largest_connected_area(faction, reach));
        }

        // 18/12/6 for the three largest areas, ties splitting the pooled
        // points rounded down.
        let mut area_vp: BTreeMap<Faction, i32> = BTreeMap::new();
        let mut standings: Vec<(u32, Faction)> =
            areas.iter().map(|(&f, &a)| (a, f)).filter(|&(a, _)| a > 0).collect();
        standings.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let awards = [18i32, 12, 6];
        let mut rank = 0usize;
        let mut i = 0usize;
        while i < standings.len() && rank < awards.len() {
            let size = standings[i].0;
            let tied: Vec<Faction> = standings[i..]
                .iter()
                .take_while(|&&(a, _)| a == size)
                .map(|&(_, f)| f)
                .collect();
            let pooled: i32 = awards[rank..(rank + tied.len()).min(awards.len())].iter().sum();
            #[allow(clippy::cast_possible_wrap)]
            let each = pooled / tied.len() as i32;
            for f in &tied {
                area_vp.insert(*f, each);
            }
            i += tied.len();
            rank += tied.len();
        }

        let cult_vp = self.cults.end_game_scores(&factions);

        let mut scores = BTreeMap::new();
        for &faction in &factions {
            let player = match self.player(faction) {
                Some(p) => p,
                None => continue,
            };
            let wallet = player.wallet;
            let coins = wallet.coins + wallet.power.bowl3 + wallet.power.bowl2 / 2;
            let coins_per_vp = if faction == Faction::Alchemists { 2 } else { 3 };
            #[allow(clippy::cast_possible_wrap)]
            let resource_vp = (coins / coins_per_vp + wallet.workers + wallet.priests) as i32;

            let base_vp = player.vp;
            let area = area_vp.get(&faction).copied().unwrap_or(0);
            let cult = cult_vp.get(&faction).copied().unwrap_or(0);
            scores.insert(
                faction,
                ScoreBreakdown {
                    base_vp,
                    area_vp: area,
                    cult_vp: cult,
                    resource_vp,
                    total_vp: base_vp + area + cult + resource_vp,
                    largest_area: areas.get(&faction).copied().unwrap_or(0),
                },
            );
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Building, Piece};

    fn two_player_state() -> GameState {
        let mut state = GameState::new();
        state.add_player(Faction::Engineers, "alice").expect("seat");
        state.add_player(Faction::Witches, "bob").expect("seat");
        state
    }

    #[test]
    fn test_add_player_rejects_duplicates() {
        let mut state = two_player_state();
        assert!(state.add_player(Faction::Engineers, "again").is_err());
    }

    #[test]
    fn test_leech_offer_capped_by_capacity() {
        let mut state = two_player_state();
        // Witches dwelling next to the engineers' build site.
        state
            .board
            .place(
                Hex::new(1, 0),
                Piece {
                    kind: Building::Stronghold,
                    owner: Faction::Witches,
                },
            )
            .expect("place");
        // Drain the witches' lower bowls down to a capacity of 2.
        let witches = state.player_mut(Faction::Witches).expect("seated");
        witches.wallet.power = crate::game::resources::PowerBowls::new(1, 1, 0);

        state.trigger_leech(Hex::new(0, 0), Faction::Engineers, 1);
        let offers = state.offers_for(Faction::Witches);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].amount, 2); // stronghold worth 3, capacity 2
        assert_eq!(offers[0].vp_cost, 1);
    }

    #[test]
    fn test_accept_offer_trades_vp_for_power() {
        let mut state = two_player_state();
        state
            .board
            .place(
                Hex::new(1, 0),
                Piece {
                    kind: Building::Dwelling,
                    owner: Faction::Witches,
                },
            )
            .expect("place");
        state.trigger_leech(Hex::new(0, 0), Faction::Engineers, 1);

        state
            .accept_offer(Faction::Witches, Some(Faction::Engineers), None)
            .expect("offer open");
        let witches = state.player(Faction::Witches).expect("seated");
        assert_eq!(witches.vp, 20); // 1 power costs 0 VP
        assert!(state.offers_for(Faction::Witches).is_empty());
        assert!(state
            .accept_offer(Faction::Witches, None, None)
            .is_err());
    }

    #[test]
    fn test_free_spade_credits_consume_unscored_first() {
        let mut state = two_player_state();
        state.grant_spades(Faction::Engineers, 2, true);
        state.grant_spades(Faction::Engineers, 1, false);
        assert_eq!(state.consume_spades(Faction::Engineers, 2), 2);
        let left = state.free_spades(Faction::Engineers);
        assert_eq!(left.scored, 1);
        assert_eq!(left.unscored, 0);
    }

    #[test]
    fn test_unscored_spades_lapse_at_action_phase() {
        let mut state = two_player_state();
        state.grant_spades(Faction::Engineers, 2, false);
        state.start_action_phase();
        assert_eq!(state.free_spades(Faction::Engineers).total(), 0);
        assert_eq!(state.phase, Phase::Action);
    }

    #[test]
    fn test_favor_tile_requires_obligation() {
        let mut state = two_player_state();
        assert!(matches!(
            state.take_favor_tile(Faction::Engineers, FavorTile::Fav11),
            Err(EngineError::NoFavorOwed)
        ));
        state.owe_favors(Faction::Engineers, 1);
        state
            .take_favor_tile(Faction::Engineers, FavorTile::Fav11)
            .expect("owed");
        let player = state.player(Faction::Engineers).expect("seated");
        assert!(player.has_favor(FavorTile::Fav11));
        assert_eq!(state.cults.position(Faction::Engineers, crate::game::cult::CultTrack::Earth), 1);
    }

    #[test]
    fn test_town_formation_and_tile_selection() {
        let mut state = two_player_state();
        let owner = Faction::Engineers;
        // Four connected buildings totalling 7 power on row 0.
        let cells = [Hex::new(4, 0), Hex::new(5, 0), Hex::new(6, 0), Hex::new(7, 0)];
        for (i, &hex) in cells.iter().enumerate() {
            let kind = if i == 0 { Building::Sanctuary } else { Building::Dwelling };
            // Sanctuary 3 + dwelling 1+1+1 = 6 < 7; upgrade one later.
            state.board.place(hex, Piece { kind, owner }).expect("place");
        }
        state.check_town_formation(owner, Hex::new(4, 0));
        assert_eq!(state.pending_towns(owner), 0);

        // Upgrade one dwelling to a trading house: 3+2+1+1 = 7.
        state.board.cell_mut(Hex::new(5, 0)).expect("cell").building = Some(Piece {
            kind: Building::TradingHouse,
            owner,
        });
        state.check_town_formation(owner, Hex::new(5, 0));
        assert_eq!(state.pending_towns(owner), 1);

        let vp_before = state.player(owner).expect("seated").vp;
        state.select_town_tile(owner, TownTile::Tw2).expect("pending town");
        let player = state.player(owner).expect("seated");
        assert_eq!(player.vp, vp_before + 7);
        assert_eq!(player.keys, 1);
        assert_eq!(player.wallet.workers, Faction::Engineers.starting_wallet().workers + 2);
        // The same cluster cannot form a second settlement.
        state.check_town_formation(owner, Hex::new(5, 0));
        assert_eq!(state.pending_towns(owner), 0);
    }

    #[test]
    fn test_income_includes_buildings_and_tiles() {
        let mut state = two_player_state();
        let owner = Faction::Engineers;
        state
            .board
            .place(
                Hex::new(4, 0),
                Piece {
                    kind: Building::Dwelling,
                    owner,
                },
            )
            .expect("place");
        let income = state.income_for(owner);
        // Engineers have no base income; one dwelling pays one worker.
        assert_eq!(income.workers, 1);
        assert_eq!(income.coins, 0);
    }

    #[test]
    fn test_cult_reward_spades_are_unscored() {
        let mut state = two_player_state();
        state.scoring.tiles = vec![crate::game::scoring::ScoringTile::Score6];
        state.round = 1;
        // Engineers reach water 4 -> one spade credit.
        state.cults.advance(Faction::Engineers, crate::game::cult::CultTrack::Water, 4, false);
        state.apply_cult_rewards(1);
        let credits = state.free_spades(Faction::Engineers);
        assert_eq!(credits.unscored, 1);
        assert_eq!(credits.scored, 0);
    }

    #[test]
    fn test_final_scores_area_and_resources() {
        let mut state = two_player_state();
        state.round = 6;
        let owner = Faction::Engineers;
        for hex in [Hex::new(4, 0), Hex::new(5, 0)] {
            state
                .board
                .place(
                    hex,
                    Piece {
                        kind: Building::Dwelling,
                        owner,
                    },
                )
                .expect("place");
        }
        state.cleanup();
        assert_eq!(state.phase, Phase::End);
        let scores = state.final_scores.as_ref().expect("scored once");
        let engineers = scores[&owner];
        assert_eq!(engineers.largest_area, 2);
        assert_eq!(engineers.area_vp, 18);
        // Engineers wallet: 10C + bowls 3/9 -> 10 + 0 + 4 = 14 coins -> 4 VP,
        // plus 2 workers.
        assert_eq!(engineers.resource_vp, 4 + 2);
        // Witches hold the second-largest area (none) -> 0.
        assert_eq!(scores[&Faction::Witches].area_vp, 0);
        assert_eq!(engineers.total_vp, engineers.base_vp + 18 + engineers.cult_vp + 6);
    }
}
