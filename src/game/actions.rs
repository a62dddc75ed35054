//! The closed set of primitive actions, each validated and executed
//! against the game state.

use crate::error::{EngineError, EngineResult};
use crate::game::board::{Building, Hex, Piece, Terrain};
use crate::game::cult::CultTrack;
use crate::game::power_actions::PowerAction;
use crate::game::resources::{Cost, Income};
use crate::game::scoring::Deed;
use crate::game::state::{GameState, Phase};
use crate::game::tiles::{BonusCard, FavorTile, TownTile};
use crate::game::Faction;

/// Where a free cult step came from (they share one shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CultStepSource {
    /// The Auren stronghold: two steps, once per round.
    AurenStronghold,
    /// The `FAV6` favor tile: one step, once per round.
    FavorTile,
    /// The `BON2` bonus card: one step, once per round.
    BonusCard,
}

/// A primitive replayable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Place a free dwelling during setup.
    SetupDwelling {
        /// Acting player.
        faction: Faction,
        /// Target cell (must be home terrain).
        hex: Hex,
    },
    /// Take a bonus card outside of passing (initial selection).
    SelectBonusCard {
        /// Acting player.
        faction: Faction,
        /// The card taken.
        card: BonusCard,
    },
    /// Terraform a cell to home terrain (if needed) and build a dwelling.
    Build {
        /// Acting player.
        faction: Faction,
        /// Target cell.
        hex: Hex,
    },
    /// Terraform a cell without building.
    Transform {
        /// Acting player.
        faction: Faction,
        /// Target cell.
        hex: Hex,
        /// Target terrain; home terrain when absent.
        to: Option<Terrain>,
    },
    /// Upgrade an existing building.
    Upgrade {
        /// Acting player.
        faction: Faction,
        /// Cell with the player's building.
        hex: Hex,
        /// The new building.
        to: Building,
    },
    /// Send a priest to a progression track.
    SendPriest {
        /// Acting player.
        faction: Faction,
        /// Target track.
        track: CultTrack,
    },
    /// Advance the sea-access track.
    AdvanceShipping {
        /// Acting player.
        faction: Faction,
    },
    /// Advance the excavation track.
    AdvanceDigging {
        /// Acting player.
        faction: Faction,
    },
    /// Pass, optionally reselecting a bonus card.
    Pass {
        /// Acting player.
        faction: Faction,
        /// The card taken for next round (absent only in the final round).
        card: Option<BonusCard>,
    },
    /// Take one of the shared power actions.
    Power {
        /// Acting player.
        faction: Faction,
        /// Which action.
        action: PowerAction,
        /// Bridge endpoints, required for the bridge action.
        bridge: Option<(Hex, Hex)>,
    },
    /// Accept the oldest matching reward offer.
    AcceptLeech {
        /// Acting player.
        faction: Faction,
        /// Declared energy amount, if the log named one.
        amount: Option<u32>,
        /// Declared source player, if the log named one.
        from: Option<Faction>,
    },
    /// Decline the oldest matching reward offer.
    DeclineLeech {
        /// Acting player.
        faction: Faction,
        /// Declared source player, if the log named one.
        from: Option<Faction>,
    },
    /// Take an owed favor tile.
    SelectFavor {
        /// Acting player.
        faction: Faction,
        /// The tile taken.
        tile: FavorTile,
    },
    /// Resolve a pending settlement with a tile.
    SelectTown {
        /// Acting player.
        faction: Faction,
        /// The tile taken.
        tile: TownTile,
    },
    /// A free cult step from a stronghold, favor tile, or bonus card.
    CultStep {
        /// Acting player.
        faction: Faction,
        /// Chosen track.
        track: CultTrack,
        /// Which once-per-round entitlement is spent.
        source: CultStepSource,
    },
    /// A standalone logged track advance consuming a reward-offer
    /// entitlement (the Cultists' bonus); a no-op otherwise.
    CultReaction {
        /// Acting player.
        faction: Faction,
        /// Chosen track.
        track: CultTrack,
    },
    /// Witches' ride: a free dwelling on any empty forest cell.
    WitchesRide {
        /// Acting player.
        faction: Faction,
        /// Target forest cell.
        hex: Hex,
    },
    /// Nomads' sandstorm: freely transform an adjacent cell to home
    /// terrain.
    Sandstorm {
        /// Acting player.
        faction: Faction,
        /// Target cell.
        hex: Hex,
    },
    /// Swarmlings' stronghold: upgrade a dwelling to a trading house at
    /// no cost.
    SwarmlingsUpgrade {
        /// Acting player.
        faction: Faction,
        /// Cell with the dwelling.
        hex: Hex,
    },
    /// Darklings' ordination: trade workers for priests one-for-one.
    Ordination {
        /// Acting player.
        faction: Faction,
        /// Workers converted (at most three).
        workers: u32,
    },
    /// Engineers' bridge built for workers.
    EngineersBridge {
        /// Acting player.
        faction: Faction,
        /// First endpoint.
        a: Hex,
        /// Second endpoint.
        b: Hex,
    },
}

impl Action {
    /// The acting player.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        match *self {
            Action::SetupDwelling { faction, .. }
            | Action::SelectBonusCard { faction, .. }
            | Action::Build { faction, .. }
            | Action::Transform { faction, .. }
            | Action::Upgrade { faction, .. }
            | Action::SendPriest { faction, .. }
            | Action::AdvanceShipping { faction }
            | Action::AdvanceDigging { faction }
            | Action::Pass { faction, .. }
            | Action::Power { faction, .. }
            | Action::AcceptLeech { faction, .. }
            | Action::DeclineLeech { faction, .. }
            | Action::SelectFavor { faction, .. }
            | Action::SelectTown { faction, .. }
            | Action::CultStep { faction, .. }
            | Action::CultReaction { faction, .. }
            | Action::WitchesRide { faction, .. }
            | Action::Sandstorm { faction, .. }
            | Action::SwarmlingsUpgrade { faction, .. }
            | Action::Ordination { faction, .. }
            | Action::EngineersBridge { faction, .. } => faction,
        }
    }

    /// Check the action's preconditions without mutating state.
    ///
    /// # Errors
    ///
    /// Returns the rule violation that would make [`Action::execute`] fail.
    pub fn validate(&self, state: &GameState) -> EngineResult<()> {
        let faction = self.faction();
        state.require_player(faction)?;
        match *self {
            Action::SetupDwelling { hex, .. } => {
                let cell = state.board.cell(hex).ok_or(EngineError::NoSuchCell(hex))?;
                if cell.building.is_some() {
                    return Err(EngineError::CellOccupied(hex));
                }
                if cell.terrain != faction.home_terrain() {
                    return Err(EngineError::BadTerrain {
                        cell: hex,
                        terrain: cell.terrain,
                    });
                }
                Ok(())
            }
            Action::Build { hex, .. } => {
                let cell = state.board.cell(hex).ok_or(EngineError::NoSuchCell(hex))?;
                if cell.building.is_some() {
                    return Err(EngineError::CellOccupied(hex));
                }
                if cell.terrain == Terrain::River {
                    return Err(EngineError::BadTerrain {
                        cell: hex,
                        terrain: Terrain::River,
                    });
                }
                if state.phase != Phase::Setup && !state.reachable(faction, hex) {
                    return Err(EngineError::NotAdjacent(hex));
                }
                Ok(())
            }
            Action::Transform { hex, .. } => {
                let cell = state.board.cell(hex).ok_or(EngineError::NoSuchCell(hex))?;
                if cell.building.is_some() {
                    return Err(EngineError::CellOccupied(hex));
                }
                if cell.terrain == Terrain::River {
                    return Err(EngineError::BadTerrain {
                        cell: hex,
                        terrain: Terrain::River,
                    });
                }
                if !state.reachable(faction, hex) {
                    return Err(EngineError::NotAdjacent(hex));
                }
                Ok(())
            }
            Action::Upgrade { hex, to, .. } => {
                let piece = state
                    .board
                    .cell(hex)
                    .ok_or(EngineError::NoSuchCell(hex))?
                    .building
                    .ok_or(EngineError::CellEmpty(hex))?;
                if piece.owner != faction {
                    return Err(EngineError::NotOwnBuilding(hex));
                }
                upgrade_path_ok(piece.kind, to)
            }
            Action::Pass { .. } => {
                if state.require_player(faction)?.passed {
                    return Err(EngineError::AlreadyPassed(faction));
                }
                Ok(())
            }
            Action::Power { action, bridge, .. } => {
                if !state.power_actions.is_available(action) {
                    return Err(EngineError::PowerActionTaken(action));
                }
                if action == PowerAction::Bridge && bridge.is_none() {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "take the bridge action without endpoints",
                    });
                }
                Ok(())
            }
            Action::WitchesRide { hex, .. } => {
                if faction != Faction::Witches {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ride to a forest cell",
                    });
                }
                let cell = state.board.cell(hex).ok_or(EngineError::NoSuchCell(hex))?;
                if cell.building.is_some() {
                    return Err(EngineError::CellOccupied(hex));
                }
                if cell.terrain != Terrain::Forest {
                    return Err(EngineError::BadTerrain {
                        cell: hex,
                        terrain: cell.terrain,
                    });
                }
                Ok(())
            }
            Action::Ordination { workers, .. } => {
                if faction != Faction::Darklings {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ordain workers into priests",
                    });
                }
                if workers > 3 {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ordain more than three workers",
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Apply the action to the state.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation encountered; the state may be
    /// partially modified only on paths that already consumed resources
    /// legally (the interpreter treats any error as fatal).
    #[allow(clippy::too_many_lines)]
    pub fn execute(&self, state: &mut GameState) -> EngineResult<()> {
        self.validate(state)?;
        match *self {
            Action::SetupDwelling { faction, hex } => {
                state.board.place(
                    hex,
                    Piece {
                        kind: Building::Dwelling,
                        owner: faction,
                    },
                )?;
                Ok(())
            }
            Action::SelectBonusCard { faction, card } => {
                let coins = state.bonus_cards.take(faction, card)?;
                state.require_player_mut(faction)?.wallet.coins += coins;
                Ok(())
            }
            Action::Build { faction, hex } => {
                let home = faction.home_terrain();
                let current = state
                    .board
                    .cell(hex)
                    .ok_or(EngineError::NoSuchCell(hex))?
                    .terrain;
                let distance = current
                    .wheel_distance(home)
                    .ok_or(EngineError::BadTerrain {
                        cell: hex,
                        terrain: current,
                    })?;
                pay_spades_and_transform(state, faction, hex, home, distance)?;
                place_dwelling(state, faction, hex)
            }
            Action::Transform { faction, hex, to } => {
                let target = to.unwrap_or_else(|| faction.home_terrain());
                let current = state
                    .board
                    .cell(hex)
                    .ok_or(EngineError::NoSuchCell(hex))?
                    .terrain;
                let distance = current
                    .wheel_distance(target)
                    .ok_or(EngineError::BadTerrain {
                        cell: hex,
                        terrain: current,
                    })?;
                if distance == 0 {
                    return Ok(());
                }
                pay_spades_and_transform(state, faction, hex, target, distance)
            }
            Action::Upgrade { faction, hex, to } => execute_upgrade(state, faction, hex, to),
            Action::SendPriest { faction, track } => {
                let player = state.require_player_mut(faction)?;
                if player.wallet.priests == 0 {
                    return Err(EngineError::InsufficientResources {
                        needed: "1 priest".to_owned(),
                        held: "0".to_owned(),
                    });
                }
                player.wallet.priests -= 1;
                let placement = state.cults.take_priest_space(faction, track);
                advance_with_power(state, faction, track, placement.steps)?;
                state.scoring.record_priest_sent(faction);
                Ok(())
            }
            Action::AdvanceShipping { faction } => {
                if !faction.can_advance_shipping() {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "advance sea access",
                    });
                }
                let max = faction.max_shipping();
                let player = state.require_player_mut(faction)?;
                if player.shipping >= max {
                    return Err(EngineError::TrackAtLimit("sea access"));
                }
                player.wallet.spend(faction.shipping_cost())?;
                player.shipping += 1;
                #[allow(clippy::cast_possible_wrap)]
                {
                    player.vp += player.shipping as i32 + 1;
                }
                Ok(())
            }
            Action::AdvanceDigging { faction } => {
                let max = faction.max_digging();
                let player = state.require_player_mut(faction)?;
                if player.digging >= max {
                    return Err(EngineError::TrackAtLimit("excavation"));
                }
                player.wallet.spend(faction.digging_cost())?;
                player.digging += 1;
                player.vp += 6;
                Ok(())
            }
            Action::Pass { faction, card } => execute_pass(state, faction, card),
            Action::Power {
                faction,
                action,
                bridge,
            } => execute_power(state, faction, action, bridge),
            Action::AcceptLeech {
                faction,
                amount,
                from,
            } => match state.accept_offer(faction, from, amount) {
                Err(EngineError::NoPendingOffer(_))
                    if state
                        .player(faction)
                        .is_some_and(|p| p.wallet.power.capacity() == 0) =>
                {
                    // A gain of zero is indistinguishable from a decline;
                    // tolerate the stale row.
                    Ok(())
                }
                other => other,
            },
            Action::DeclineLeech { faction, from } => {
                match state.decline_offer(faction, from) {
                    Err(EngineError::NoPendingOffer(_)) => {
                        let bowls = state.require_player(faction)?.wallet.power;
                        if bowls.bowl1 == 0 && bowls.bowl2 == 0 {
                            Ok(())
                        } else {
                            Err(EngineError::NoPendingOffer(faction))
                        }
                    }
                    other => other,
                }
            }
            Action::SelectFavor { faction, tile } => state.take_favor_tile(faction, tile),
            Action::SelectTown { faction, tile } => state.select_town_tile(faction, tile),
            Action::CultStep {
                faction,
                track,
                source,
            } => execute_cult_step(state, faction, track, source),
            Action::CultReaction { faction, track } => {
                if state.take_cult_choice(faction) {
                    advance_with_power(state, faction, track, 1)?;
                }
                Ok(())
            }
            Action::WitchesRide { faction, hex } => {
                let player = state.require_player_mut(faction)?;
                if player.stronghold_action_used {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ride twice in one round",
                    });
                }
                if !state.has_stronghold(faction) {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ride without a stronghold",
                    });
                }
                state.require_player_mut(faction)?.stronghold_action_used = true;
                place_dwelling_free(state, faction, hex)
            }
            Action::Sandstorm { faction, hex } => {
                if faction != Faction::Nomads {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "raise a sandstorm",
                    });
                }
                if !state.has_stronghold(faction) {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "raise a sandstorm without a stronghold",
                    });
                }
                let player = state.require_player_mut(faction)?;
                if player.stronghold_action_used {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "raise two sandstorms in one round",
                    });
                }
                player.stronghold_action_used = true;
                // Sandstorm reaches only directly adjacent cells.
                let adjacent = state
                    .board
                    .buildings_of(faction)
                    .any(|(own, _)| state.board.directly_adjacent(own, hex));
                if !adjacent {
                    return Err(EngineError::NotAdjacent(hex));
                }
                state.board.transform(hex, faction.home_terrain())
            }
            Action::SwarmlingsUpgrade { faction, hex } => {
                if faction != Faction::Swarmlings {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "upgrade for free",
                    });
                }
                if !state.has_stronghold(faction) {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "upgrade for free without a stronghold",
                    });
                }
                let player = state.require_player_mut(faction)?;
                if player.stronghold_action_used {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "use the free upgrade twice in one round",
                    });
                }
                player.stronghold_action_used = true;
                upgrade_piece(state, faction, hex, Building::TradingHouse)
            }
            Action::Ordination { faction, workers } => {
                if !state.has_stronghold(faction) {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "ordain without a stronghold",
                    });
                }
                let parked = state.cults.parked_priests(faction);
                let player = state.require_player_mut(faction)?;
                if player.wallet.workers < workers {
                    return Err(EngineError::InsufficientResources {
                        needed: format!("{workers} workers"),
                        held: format!("{}", player.wallet.workers),
                    });
                }
                player.wallet.workers -= workers;
                player.wallet.gain(
                    Income {
                        priests: workers,
                        ..Income::default()
                    },
                    parked,
                );
                Ok(())
            }
            Action::EngineersBridge { faction, a, b } => {
                if faction != Faction::Engineers {
                    return Err(EngineError::NotAllowedForFaction {
                        faction,
                        what: "build a bridge for workers",
                    });
                }
                state
                    .require_player_mut(faction)?
                    .wallet
                    .spend(Cost::cw(0, 2))?;
                state.board.build_bridge(a, b)
            }
        }
    }
}

fn upgrade_path_ok(from: Building, to: Building) -> EngineResult<()> {
    let ok = matches!(
        (from, to),
        (Building::Dwelling, Building::TradingHouse)
            | (Building::TradingHouse, Building::Temple | Building::Stronghold)
            | (Building::Temple, Building::Sanctuary)
    );
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidUpgrade {
            from: from.code(),
            to: to.code(),
        })
    }
}

/// Consume free-spade credits, pay for the remainder, and transform.
fn pay_spades_and_transform(
    state: &mut GameState,
    faction: Faction,
    hex: Hex,
    target: Terrain,
    distance: u32,
) -> EngineResult<()> {
    if distance == 0 {
        return Ok(());
    }
    let spades = faction.terraform_spades(distance);
    let free = state.consume_spades(faction, spades);
    let paid = spades - free;

    if paid > 0 {
        let digging = state.require_player(faction)?.digging;
        let cost = if faction.pays_priests_for_spades() {
            Cost {
                priests: paid,
                ..Cost::default()
            }
        } else {
            Cost::cw(0, paid * faction.workers_per_spade(digging))
        };
        state.require_player_mut(faction)?.wallet.spend(cost)?;

        for _ in 0..paid {
            state.award_deed_vp(faction, Deed::Spade);
        }
        let bonus_vp = faction.vp_per_spade();
        if bonus_vp != 0 {
            #[allow(clippy::cast_possible_wrap)]
            {
                state.require_player_mut(faction)?.vp += bonus_vp * paid as i32;
            }
        }
        if state.has_stronghold(faction) {
            let power = faction.power_per_spade_after_stronghold() * paid;
            if power > 0 {
                state.require_player_mut(faction)?.wallet.power.gain(power);
            }
        }
    }

    state.board.transform(hex, target)
}

/// Pay for and place a dwelling, with all side effects.
fn place_dwelling(state: &mut GameState, faction: Faction, hex: Hex) -> EngineResult<()> {
    state
        .require_player_mut(faction)?
        .wallet
        .spend(faction.dwelling_cost())?;
    place_dwelling_free(state, faction, hex)
}

/// Place a dwelling without paying (setup, Witches' ride), with scoring,
/// reward offers, and settlement checks.
fn place_dwelling_free(state: &mut GameState, faction: Faction, hex: Hex) -> EngineResult<()> {
    state.board.place(
        hex,
        Piece {
            kind: Building::Dwelling,
            owner: faction,
        },
    )?;
    state.award_deed_vp(faction, Deed::Dwelling);
    if state.require_player(faction)?.has_favor(FavorTile::Fav11) {
        state.require_player_mut(faction)?.vp += 2;
    }
    state.trigger_leech(hex, faction, Building::Dwelling.power_value());
    state.check_town_formation(faction, hex);
    Ok(())
}

fn execute_upgrade(
    state: &mut GameState,
    faction: Faction,
    hex: Hex,
    to: Building,
) -> EngineResult<()> {
    let mut cost = match to {
        Building::TradingHouse => {
            let mut cost = faction.trading_house_cost();
            let next_to_opponent = hex.neighbors().iter().any(|&n| {
                state
                    .board
                    .cell(n)
                    .and_then(|c| c.building)
                    .is_some_and(|p| p.owner != faction)
            });
            if next_to_opponent {
                cost.coins /= 2;
            }
            cost
        }
        Building::Temple => faction.temple_cost(),
        Building::Sanctuary => faction.sanctuary_cost(),
        Building::Stronghold => faction.stronghold_cost(),
        Building::Dwelling => {
            return Err(EngineError::InvalidUpgrade {
                from: Building::Dwelling.code(),
                to: to.code(),
            })
        }
    };
    // Bridges count for the neighbour discount too; plain edge adjacency
    // already covered above.
    if to == Building::TradingHouse && cost.coins == faction.trading_house_cost().coins {
        let discounted = state.board.bridges().iter().any(|&(a, b)| {
            let other = if a == hex {
                Some(b)
            } else if b == hex {
                Some(a)
            } else {
                None
            };
            other
                .and_then(|o| state.board.cell(o))
                .and_then(|c| c.building)
                .is_some_and(|p| p.owner != faction)
        });
        if discounted {
            cost.coins /= 2;
        }
    }

    state.require_player_mut(faction)?.wallet.spend(cost)?;
    upgrade_piece(state, faction, hex, to)
}

/// Swap the building on the cell, then apply scoring, favor hooks,
/// reward offers, stronghold effects, and settlement checks.
fn upgrade_piece(
    state: &mut GameState,
    faction: Faction,
    hex: Hex,
    to: Building,
) -> EngineResult<()> {
    let piece = state
        .board
        .cell(hex)
        .ok_or(EngineError::NoSuchCell(hex))?
        .building
        .ok_or(EngineError::CellEmpty(hex))?;
    if piece.owner != faction {
        return Err(EngineError::NotOwnBuilding(hex));
    }
    upgrade_path_ok(piece.kind, to)?;

    let old_power = piece.kind.power_value();
    state
        .board
        .cell_mut(hex)
        .ok_or(EngineError::NoSuchCell(hex))?
        .building = Some(Piece {
        kind: to,
        owner: faction,
    });

    match to {
        Building::TradingHouse => {
            state.award_deed_vp(faction, Deed::TradingHouse);
            if state.require_player(faction)?.has_favor(FavorTile::Fav10) {
                state.require_player_mut(faction)?.vp += 3;
            }
        }
        Building::Temple => {
            state.award_deed_vp(faction, Deed::Temple);
            state.owe_favors(faction, faction.favor_tiles_per_build());
        }
        Building::Sanctuary => {
            state.award_deed_vp(faction, Deed::BigBuilding);
            state.owe_favors(faction, faction.favor_tiles_per_build());
        }
        Building::Stronghold => {
            state.award_deed_vp(faction, Deed::BigBuilding);
            apply_stronghold_effects(state, faction)?;
        }
        Building::Dwelling => {}
    }

    let delta = to.power_value().saturating_sub(old_power);
    state.trigger_leech(hex, faction, delta);
    state.check_town_formation(faction, hex);
    Ok(())
}

/// One-time effects when a faction's stronghold is raised.
fn apply_stronghold_effects(state: &mut GameState, faction: Faction) -> EngineResult<()> {
    match faction {
        Faction::Alchemists => {
            state.require_player_mut(faction)?.wallet.power.gain(12);
        }
        Faction::Cultists => {
            state.require_player_mut(faction)?.vp += 7;
        }
        Faction::Mermaids => {
            let max = faction.max_shipping();
            let player = state.require_player_mut(faction)?;
            if player.shipping < max {
                player.shipping += 1;
                #[allow(clippy::cast_possible_wrap)]
                {
                    player.vp += player.shipping as i32 + 1;
                }
            }
        }
        Faction::Auren => {
            state.owe_favors(faction, 1);
        }
        _ => {}
    }
    Ok(())
}

fn execute_pass(
    state: &mut GameState,
    faction: Faction,
    card: Option<BonusCard>,
) -> EngineResult<()> {
    let counts = state.building_counts(faction);
    let held = state.bonus_cards.held_by(faction);
    let shipping = state.require_player(faction)?.shipping;

    let mut vp = 0i32;
    if let Some(held) = held {
        #[allow(clippy::cast_possible_wrap)]
        match held {
            BonusCard::Bon6 => {
                vp += 4 * (counts.strongholds.min(1) + counts.sanctuaries.min(1)) as i32;
            }
            BonusCard::Bon7 => vp += 2 * counts.trading_houses as i32,
            BonusCard::Bon9 => vp += counts.dwellings as i32,
            BonusCard::Bon10 => {
                if faction.can_advance_shipping() {
                    vp += 3 * shipping as i32;
                }
            }
            _ => {}
        }
    }
    if state.require_player(faction)?.has_favor(FavorTile::Fav12) {
        vp += FavorTile::pass_vp_for_trading_houses(counts.trading_houses);
    }
    if faction == Faction::Engineers && counts.strongholds > 0 {
        let own_bridges = state
            .board
            .bridges()
            .iter()
            .filter(|&&(a, b)| {
                let owns = |h: Hex| {
                    state
                        .board
                        .cell(h)
                        .and_then(|c| c.building)
                        .is_some_and(|p| p.owner == faction)
                };
                owns(a) && owns(b)
            })
            .count();
        #[allow(clippy::cast_possible_wrap)]
        {
            vp += 3 * own_bridges as i32;
        }
    }

    if let Some(card) = card {
        let coins = state.bonus_cards.take(faction, card)?;
        state.require_player_mut(faction)?.wallet.coins += coins;
    }

    let player = state.require_player_mut(faction)?;
    player.vp += vp;
    player.passed = true;
    state.pass_order.push(faction);
    Ok(())
}

fn execute_power(
    state: &mut GameState,
    faction: Faction,
    action: PowerAction,
    bridge: Option<(Hex, Hex)>,
) -> EngineResult<()> {
    state
        .require_player_mut(faction)?
        .wallet
        .power
        .spend(action.power_cost())?;
    state.power_actions.claim(action)?;

    match action {
        PowerAction::Bridge => {
            let (a, b) = bridge.ok_or(EngineError::NotAllowedForFaction {
                faction,
                what: "take the bridge action without endpoints",
            })?;
            state.board.build_bridge(a, b)?;
        }
        PowerAction::Priest => {
            let parked = state.cults.parked_priests(faction);
            state.require_player_mut(faction)?.wallet.gain(
                Income {
                    priests: 1,
                    ..Income::default()
                },
                parked,
            );
        }
        PowerAction::Workers => {
            state.require_player_mut(faction)?.wallet.workers += 2;
        }
        PowerAction::Coins => {
            state.require_player_mut(faction)?.wallet.coins += 7;
        }
        PowerAction::Spade1 | PowerAction::Spade2 => {
            grant_scored_spades(state, faction, action.free_spades())?;
        }
    }
    Ok(())
}

/// Grant free spades that count toward the active scoring tile; the
/// points and faction spade bonuses are booked at grant time.
pub(crate) fn grant_scored_spades(
    state: &mut GameState,
    faction: Faction,
    count: u32,
) -> EngineResult<()> {
    state.grant_spades(faction, count, true);
    if faction == Faction::Darklings {
        // Darklings book their spade bonuses when priests are paid.
        return Ok(());
    }
    for _ in 0..count {
        state.award_deed_vp(faction, Deed::Spade);
    }
    let bonus_vp = faction.vp_per_spade();
    if bonus_vp != 0 {
        #[allow(clippy::cast_possible_wrap)]
        {
            state.require_player_mut(faction)?.vp += bonus_vp * count as i32;
        }
    }
    if state.has_stronghold(faction) {
        let power = faction.power_per_spade_after_stronghold() * count;
        if power > 0 {
            state.require_player_mut(faction)?.wallet.power.gain(power);
        }
    }
    Ok(())
}

fn execute_cult_step(
    state: &mut GameState,
    faction: Faction,
    track: CultTrack,
    source: CultStepSource,
) -> EngineResult<()> {
    let steps = match source {
        CultStepSource::AurenStronghold => {
            if faction != Faction::Auren || !state.has_stronghold(faction) {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the stronghold cult step",
                });
            }
            let player = state.require_player_mut(faction)?;
            if player.stronghold_action_used {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the stronghold cult step twice in one round",
                });
            }
            player.stronghold_action_used = true;
            2
        }
        CultStepSource::FavorTile => {
            let player = state.require_player_mut(faction)?;
            if !player.has_favor(FavorTile::Fav6) {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the favor cult step without the tile",
                });
            }
            if player.favor_action_used {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the favor cult step twice in one round",
                });
            }
            player.favor_action_used = true;
            1
        }
        CultStepSource::BonusCard => {
            if state.bonus_cards.held_by(faction) != Some(BonusCard::Bon2) {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the bonus-card cult step without the card",
                });
            }
            let player = state.require_player_mut(faction)?;
            if player.bonus_action_used {
                return Err(EngineError::NotAllowedForFaction {
                    faction,
                    what: "use the bonus-card cult step twice in one round",
                });
            }
            player.bonus_action_used = true;
            1
        }
    };
    advance_with_power(state, faction, track, steps)
}

/// Advance on a track and bank any milestone energy.
fn advance_with_power(
    state: &mut GameState,
    faction: Faction,
    track: CultTrack,
    steps: u32,
) -> EngineResult<()> {
    let has_key = state.require_player(faction)?.keys > 0;
    let advance = state.cults.advance(faction, track, steps, has_key);
    if advance.power > 0 {
        state
            .require_player_mut(faction)?
            .wallet
            .power
            .gain(advance.power);
    }
    Ok(())
}
