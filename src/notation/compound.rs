//! Component classifier and compound assembler.
//!
//! One raw turn line becomes an ordered list of typed components. The
//! classifier tries a fixed priority order per token; the assembler
//! threads burn amounts, power-action modifiers, and buffered auxiliary
//! selections across the whole line.

use crate::error::{EngineError, EngineResult};
use crate::game::actions::{grant_scored_spades, Action, CultStepSource};
use crate::game::{
    BonusCard, CultTrack, Faction, FavorTile, GameState, Hex, PowerAction, Terrain, TownTile,
};
use crate::notation::coords::parse_coord;
use crate::notation::tokenizer::tokenize;
use crate::notation::ParseError;

/// A resource conversion; amounts are the conversion's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Energy to coins, 1:1.
    PowerToCoins(u32),
    /// Energy to workers, 3:1.
    PowerToWorkers(u32),
    /// Energy to priests, 5:1.
    PowerToPriests(u32),
    /// Priests to workers, 1:1.
    PriestsToWorkers(u32),
    /// Workers to coins, 1:1.
    WorkersToCoins(u32),
}

/// What granted the free spades of a [`Component::FreeSpadeGrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpadeGrant {
    /// One of the two spade power actions.
    Power(PowerAction),
    /// The `BON1` bonus-card special action.
    BonusCard,
    /// The Giants' stronghold (two spades, once per round).
    GiantsStronghold,
}

/// A modifier attached to a main action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// A non-spade power action resolved before the main action.
    Power {
        /// The power action.
        action: PowerAction,
        /// Energy burned immediately before paying for it.
        burn: u32,
    },
}

/// An auxiliary tile selection riding on a main action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auxiliary {
    /// A favor-tile selection (`+FAVn`).
    Favor(FavorTile),
    /// A settlement-tile selection (`+TWn`).
    Town(TownTile),
}

/// One typed piece of a compound turn line, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Burn energy from bowl 2 into bowl 3.
    Burn(u32),
    /// A wallet conversion.
    Conversion(Conversion),
    /// The Darklings' worker-to-priest ordination.
    Ordination {
        /// Workers converted.
        workers: u32,
    },
    /// A free-spade entitlement granted before it is needed.
    FreeSpadeGrant {
        /// The source of the spades.
        grant: SpadeGrant,
        /// Energy burned immediately before the grant.
        burn: u32,
    },
    /// A primitive main action with its modifiers.
    Main {
        /// The action.
        action: Action,
        /// Modifiers resolved before it.
        modifiers: Vec<Modifier>,
    },
    /// A buffered auxiliary selection, emitted after its main action.
    Auxiliary(Auxiliary),
    /// A terraform with no building, on a cell no later build targets.
    TerraformOnly {
        /// Target cell.
        hex: Hex,
        /// Explicit target terrain; home terrain when absent.
        to: Option<Terrain>,
    },
}

impl Component {
    /// Execute the component for the acting player.
    ///
    /// # Errors
    ///
    /// Propagates any rule violation from the underlying action.
    pub fn execute(&self, state: &mut GameState, faction: Faction) -> EngineResult<()> {
        match self {
            Component::Burn(amount) => {
                state.require_player_mut(faction)?.wallet.power.burn(*amount)
            }
            Component::Conversion(conversion) => {
                let parked = state.cults.parked_priests(faction);
                let wallet = &mut state.require_player_mut(faction)?.wallet;
                match *conversion {
                    Conversion::PowerToCoins(n) => wallet.convert_power_to_coins(n),
                    Conversion::PowerToWorkers(n) => wallet.convert_power_to_workers(n),
                    Conversion::PowerToPriests(n) => wallet.convert_power_to_priests(n, parked),
                    Conversion::PriestsToWorkers(n) => wallet.convert_priests_to_workers(n),
                    Conversion::WorkersToCoins(n) => wallet.convert_workers_to_coins(n),
                }
            }
            Component::Ordination { workers } => Action::Ordination {
                faction,
                workers: *workers,
            }
            .execute(state),
            Component::FreeSpadeGrant { grant, burn } => {
                if *burn > 0 {
                    state.require_player_mut(faction)?.wallet.power.burn(*burn)?;
                }
                match grant {
                    SpadeGrant::Power(action) => Action::Power {
                        faction,
                        action: *action,
                        bridge: None,
                    }
                    .execute(state),
                    SpadeGrant::BonusCard => {
                        if state.bonus_cards.held_by(faction) != Some(BonusCard::Bon1) {
                            return Err(EngineError::NotAllowedForFaction {
                                faction,
                                what: "use the bonus-card spade without the card",
                            });
                        }
                        let player = state.require_player_mut(faction)?;
                        if player.bonus_action_used {
                            return Err(EngineError::NotAllowedForFaction {
                                faction,
                                what: "use the bonus-card spade twice in one round",
                            });
                        }
                        player.bonus_action_used = true;
                        grant_scored_spades(state, faction, 1)
                    }
                    SpadeGrant::GiantsStronghold => {
                        if faction != Faction::Giants || !state.has_stronghold(faction) {
                            return Err(EngineError::NotAllowedForFaction {
                                faction,
                                what: "use the stronghold spades",
                            });
                        }
                        let player = state.require_player_mut(faction)?;
                        if player.stronghold_action_used {
                            return Err(EngineError::NotAllowedForFaction {
                                faction,
                                what: "use the stronghold spades twice in one round",
                            });
                        }
                        player.stronghold_action_used = true;
                        grant_scored_spades(state, faction, 2)
                    }
                }
            }
            Component::Main { action, modifiers } => {
                for modifier in modifiers {
                    let Modifier::Power { action, burn } = modifier;
                    if *burn > 0 {
                        state.require_player_mut(faction)?.wallet.power.burn(*burn)?;
                    }
                    Action::Power {
                        faction,
                        action: *action,
                        bridge: None,
                    }
                    .execute(state)?;
                }
                action.execute(state)
            }
            Component::Auxiliary(Auxiliary::Favor(tile)) => Action::SelectFavor {
                faction,
                tile: *tile,
            }
            .execute(state),
            Component::Auxiliary(Auxiliary::Town(tile)) => Action::SelectTown {
                faction,
                tile: *tile,
            }
            .execute(state),
            Component::TerraformOnly { hex, to } => Action::Transform {
                faction,
                hex: *hex,
                to: *to,
            }
            .execute(state),
        }
    }
}

/// Compile one raw turn line into its ordered component sequence.
///
/// The game state is consulted for context-sensitive decisions only (the
/// pending free-spade entitlement check); it is never mutated.
///
/// # Errors
///
/// Returns [`ParseError::UnknownToken`] for a token no classifier
/// matches, and coordinate errors for malformed cells.
#[allow(clippy::too_many_lines)]
pub fn compile_line(
    faction: Faction,
    line: &str,
    state: &GameState,
) -> Result<Vec<Component>, ParseError> {
    let tokens = tokenize(line);
    let mut out: Vec<Component> = Vec::new();
    let mut pending_burn = 0u32;
    let mut pending_mod: Option<Modifier> = None;
    let mut aux_buffer: Vec<Auxiliary> = Vec::new();

    let unknown = |token: &str| ParseError::UnknownToken {
        token: token.to_owned(),
        line: line.to_owned(),
    };

    let mut i = 0usize;
    while i < tokens.len() {
        let token = tokens[i].as_str();

        // 1. Burn: held until a conversion or power action consumes it.
        if let Some(rest) = token.strip_prefix("burn ") {
            pending_burn = rest.trim().parse().map_err(|_| unknown(token))?;
            i += 1;
            continue;
        }

        // 2. The Darklings' ordination masquerades as a conversion.
        if faction == Faction::Darklings {
            if let Some(workers) = parse_ordination(token) {
                out.push(Component::Ordination { workers });
                i += 1;
                continue;
            }
        }

        // 3. Generic conversions. Held auxiliaries describe the previous
        // action and are flushed first; a pending burn precedes the
        // conversion that needed it.
        if let Some(conversion) = parse_conversion(token) {
            out.extend(aux_buffer.drain(..).map(Component::Auxiliary));
            if pending_burn > 0 {
                out.push(Component::Burn(pending_burn));
                pending_burn = 0;
            }
            out.push(Component::Conversion(conversion));
            i += 1;
            continue;
        }

        // 4. Auxiliary selections are buffered until their main action.
        if let Some(aux) = parse_auxiliary(token) {
            aux_buffer.push(aux);
            i += 1;
            continue;
        }

        // 5. Action-prefixed tokens.
        if let Some(code) = token.strip_prefix("action ") {
            let code = code.trim().to_ascii_uppercase();
            let consumed = classify_action_code(
                faction,
                &code,
                &tokens,
                i,
                &mut pending_burn,
                &mut pending_mod,
                &mut out,
            )
            .map_err(|()| unknown(token))?;
            if pending_mod.is_none()
                && matches!(
                    out.last(),
                    Some(Component::Main { .. } | Component::FreeSpadeGrant { .. })
                )
            {
                out.extend(aux_buffer.drain(..).map(Component::Auxiliary));
            }
            i += 1 + consumed;
            continue;
        }

        // 6. A bare track sigil documents an already-resolved reward and
        // is dropped.
        if let Some(rest) = token.strip_prefix('+') {
            let name = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            if CultTrack::from_name(name.trim()).is_some() {
                i += 1;
                continue;
            }
        }

        // "dig n" documents spades paid by the tokens around it.
        if let Some(rest) = token.strip_prefix("dig ") {
            if rest.trim().parse::<u32>().is_ok() {
                i += 1;
                continue;
            }
        }

        // 7a. Terraform: suppressed when a later build targets the same
        // cell; otherwise a component (or entitlement use) of its own.
        if let Some(rest) = token.strip_prefix("transform ") {
            let mut fields = rest.split_whitespace();
            let coord = fields.next().ok_or_else(|| unknown(token))?;
            let hex = parse_coord(coord)?;
            let to = match (fields.next(), fields.next()) {
                (Some("to"), Some(word)) => {
                    Some(Terrain::from_log_word(word).ok_or_else(|| unknown(token))?)
                }
                _ => None,
            };
            if later_build_targets(&tokens, i + 1, coord) {
                i += 1;
                continue;
            }
            if state.free_spades(faction).total() > 0 {
                out.push(Component::Main {
                    action: Action::Transform { faction, hex, to },
                    modifiers: Vec::new(),
                });
            } else {
                out.push(Component::TerraformOnly { hex, to });
            }
            out.extend(aux_buffer.drain(..).map(Component::Auxiliary));
            i += 1;
            continue;
        }

        // 7b. Remaining main actions.
        if let Some(action) = parse_main_token(faction, token, line, state)? {
            let modifiers: Vec<Modifier> = pending_mod.take().into_iter().collect();
            if modifiers.is_empty() && pending_burn > 0 {
                out.push(Component::Burn(pending_burn));
                pending_burn = 0;
            }
            out.push(Component::Main { action, modifiers });
            out.extend(aux_buffer.drain(..).map(Component::Auxiliary));
            i += 1;
            continue;
        }

        // 8. Nothing matched: fatal.
        return Err(unknown(token));
    }

    out.extend(aux_buffer.drain(..).map(Component::Auxiliary));
    if pending_burn > 0 {
        out.push(Component::Burn(pending_burn));
    }
    Ok(out)
}

/// Classify an `action <CODE>` token. Returns how many extra tokens were
/// consumed; `Err(())` marks an unknown or malformed code.
#[allow(clippy::too_many_lines)]
fn classify_action_code(
    faction: Faction,
    code: &str,
    tokens: &[String],
    index: usize,
    pending_burn: &mut u32,
    pending_mod: &mut Option<Modifier>,
    out: &mut Vec<Component>,
) -> Result<usize, ()> {
    let next = tokens.get(index + 1).map(String::as_str);

    if code == "BON1" {
        out.push(Component::FreeSpadeGrant {
            grant: SpadeGrant::BonusCard,
            burn: 0,
        });
        return Ok(0);
    }
    if code == "BON2" || code == "FAV6" {
        let track = next
            .and_then(|t| t.strip_prefix('+'))
            .map(|t| t.trim_start_matches(|c: char| c.is_ascii_digit()).trim())
            .and_then(CultTrack::from_name)
            .ok_or(())?;
        let source = if code == "BON2" {
            CultStepSource::BonusCard
        } else {
            CultStepSource::FavorTile
        };
        out.push(Component::Main {
            action: Action::CultStep {
                faction,
                track,
                source,
            },
            modifiers: Vec::new(),
        });
        return Ok(1);
    }

    match code {
        "ACTW" => {
            let hex = next
                .and_then(|t| t.strip_prefix("build "))
                .and_then(|c| parse_coord(c.trim()).ok())
                .ok_or(())?;
            out.push(Component::Main {
                action: Action::WitchesRide { faction, hex },
                modifiers: Vec::new(),
            });
            Ok(1)
        }
        "ACTA" => {
            let track = next
                .and_then(|t| t.strip_prefix('+'))
                .map(|t| t.trim_start_matches(|c: char| c.is_ascii_digit()).trim())
                .and_then(CultTrack::from_name)
                .ok_or(())?;
            out.push(Component::Main {
                action: Action::CultStep {
                    faction,
                    track,
                    source: CultStepSource::AurenStronghold,
                },
                modifiers: Vec::new(),
            });
            Ok(1)
        }
        "ACTN" => {
            let hex = next
                .and_then(|t| t.strip_prefix("transform "))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|c| parse_coord(c).ok())
                .ok_or(())?;
            out.push(Component::Main {
                action: Action::Sandstorm { faction, hex },
                modifiers: Vec::new(),
            });
            Ok(1)
        }
        "ACTS" => {
            let hex = next
                .and_then(|t| t.strip_prefix("upgrade "))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|c| parse_coord(c).ok())
                .ok_or(())?;
            out.push(Component::Main {
                action: Action::SwarmlingsUpgrade { faction, hex },
                modifiers: Vec::new(),
            });
            Ok(1)
        }
        "ACTG" => {
            out.push(Component::FreeSpadeGrant {
                grant: SpadeGrant::GiantsStronghold,
                burn: std::mem::take(pending_burn),
            });
            Ok(0)
        }
        "ACTE" => {
            let (a, b) = next.and_then(parse_bridge_token).ok_or(())?;
            out.push(Component::Main {
                action: Action::EngineersBridge { faction, a, b },
                modifiers: Vec::new(),
            });
            Ok(1)
        }
        _ => {
            let action = PowerAction::from_code(code).ok_or(())?;
            if action.free_spades() > 0 {
                // Spade actions always execute standalone so the
                // entitlement exists before any transform needs it.
                out.push(Component::FreeSpadeGrant {
                    grant: SpadeGrant::Power(action),
                    burn: std::mem::take(pending_burn),
                });
                return Ok(0);
            }
            if action == PowerAction::Bridge {
                let (a, b) = next.and_then(parse_bridge_token).ok_or(())?;
                if *pending_burn > 0 {
                    out.push(Component::Burn(std::mem::take(pending_burn)));
                }
                out.push(Component::Main {
                    action: Action::Power {
                        faction,
                        action,
                        bridge: Some((a, b)),
                    },
                    modifiers: Vec::new(),
                });
                return Ok(1);
            }
            if next.is_some_and(is_main_action_token) {
                *pending_mod = Some(Modifier::Power {
                    action,
                    burn: std::mem::take(pending_burn),
                });
                return Ok(0);
            }
            if *pending_burn > 0 {
                out.push(Component::Burn(std::mem::take(pending_burn)));
            }
            out.push(Component::Main {
                action: Action::Power {
                    faction,
                    action,
                    bridge: None,
                },
                modifiers: Vec::new(),
            });
            Ok(0)
        }
    }
}

fn parse_auxiliary(token: &str) -> Option<Auxiliary> {
    let upper = token.to_ascii_uppercase();
    if upper.starts_with("+FAV") {
        return FavorTile::from_code(token).map(Auxiliary::Favor);
    }
    if upper.starts_with("+TW") {
        return TownTile::from_code(token).map(Auxiliary::Town);
    }
    None
}

fn parse_bridge_token(token: &str) -> Option<(Hex, Hex)> {
    let rest = token
        .strip_prefix("bridge ")
        .or_else(|| token.strip_prefix("Bridge "))?;
    let (a, b) = rest.trim().split_once(':')?;
    Some((parse_coord(a.trim()).ok()?, parse_coord(b.trim()).ok()?))
}

/// Whether a later `build` token targets the given coordinate text.
fn later_build_targets(tokens: &[String], from: usize, coord: &str) -> bool {
    tokens[from..].iter().any(|t| {
        t.strip_prefix("build ")
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|c| c.eq_ignore_ascii_case(coord))
    })
}

fn is_main_action_token(token: &str) -> bool {
    token.starts_with("build ")
        || token.starts_with("upgrade ")
        || token.starts_with("transform ")
        || token.starts_with("dig ")
        || token.starts_with("pass")
        || token.starts_with("Pass")
        || token.starts_with("send p to")
        || token.starts_with("advance ship")
        || token.starts_with("advance dig")
}

/// Parse the main-action tokens that map one-to-one onto primitives.
fn parse_main_token(
    faction: Faction,
    token: &str,
    line: &str,
    state: &GameState,
) -> Result<Option<Action>, ParseError> {
    let unknown = || ParseError::UnknownToken {
        token: token.to_owned(),
        line: line.to_owned(),
    };

    if let Some(rest) = token.strip_prefix("build ") {
        let coord = rest.split_whitespace().next().ok_or_else(unknown)?;
        let hex = parse_coord(coord)?;
        let action = if state.phase == crate::game::Phase::Setup {
            Action::SetupDwelling { faction, hex }
        } else {
            Action::Build { faction, hex }
        };
        return Ok(Some(action));
    }
    if let Some(rest) = token.strip_prefix("upgrade ") {
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() >= 3 && fields[1] == "to" {
            let hex = parse_coord(fields[0])?;
            let to = crate::game::Building::from_code(fields[2]).ok_or_else(unknown)?;
            return Ok(Some(Action::Upgrade { faction, hex, to }));
        }
        return Err(unknown());
    }
    if let Some(rest) = token.strip_prefix("send p to ") {
        let track = rest
            .split_whitespace()
            .next()
            .and_then(CultTrack::from_name)
            .ok_or_else(unknown)?;
        return Ok(Some(Action::SendPriest { faction, track }));
    }
    if token.starts_with("advance ship") {
        return Ok(Some(Action::AdvanceShipping { faction }));
    }
    if token.starts_with("advance dig") {
        return Ok(Some(Action::AdvanceDigging { faction }));
    }
    if token == "pass" || token == "Pass" {
        return Ok(Some(Action::Pass {
            faction,
            card: None,
        }));
    }
    if let Some(rest) = token.strip_prefix("pass ").or_else(|| token.strip_prefix("Pass ")) {
        let card = BonusCard::from_code(rest.trim()).ok_or_else(unknown)?;
        return Ok(Some(Action::Pass {
            faction,
            card: Some(card),
        }));
    }
    Ok(None)
}

fn parse_ordination(token: &str) -> Option<u32> {
    let rest = token.strip_prefix("convert ")?;
    let (from, to) = rest.split_once(" to ")?;
    let (workers, from_unit) = split_amount(from.trim())?;
    let (priests, to_unit) = split_amount(to.trim())?;
    if from_unit.eq_ignore_ascii_case("w") && to_unit.eq_ignore_ascii_case("p") && workers == priests
    {
        Some(workers)
    } else {
        None
    }
}

fn parse_conversion(token: &str) -> Option<Conversion> {
    let rest = token.strip_prefix("convert ")?;
    let (from, to) = rest.split_once(" to ")?;
    let (_, from_unit) = split_amount(from.trim())?;
    let (to_amount, to_unit) = split_amount(to.trim())?;
    match (
        from_unit.to_ascii_lowercase().as_str(),
        to_unit.to_ascii_lowercase().as_str(),
    ) {
        ("pw", "c") => Some(Conversion::PowerToCoins(to_amount)),
        ("pw", "w") => Some(Conversion::PowerToWorkers(to_amount)),
        ("pw", "p") => Some(Conversion::PowerToPriests(to_amount)),
        ("p", "w") => Some(Conversion::PriestsToWorkers(to_amount)),
        ("w", "c") => Some(Conversion::WorkersToCoins(to_amount)),
        _ => None,
    }
}

/// Split `"3PW"` into `(3, "PW")`.
fn split_amount(text: &str) -> Option<(u32, &str)> {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (number, unit) = text.split_at(digits);
    let amount = number.parse().ok()?;
    if unit.is_empty() {
        return None;
    }
    Some((amount, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameState, Phase};

    fn action_state() -> GameState {
        let mut state = GameState::new();
        state.add_player(Faction::Engineers, "a").expect("seat");
        state.add_player(Faction::Darklings, "b").expect("seat");
        state.phase = Phase::Action;
        state.round = 1;
        state
    }

    #[test]
    fn test_convert_then_pass_is_two_components() {
        let state = action_state();
        let parts =
            compile_line(Faction::Engineers, "convert 1PW to 1C. pass BON7", &state).expect("ok");
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Component::Conversion(Conversion::PowerToCoins(1))));
        assert!(matches!(
            parts[1],
            Component::Main {
                action: Action::Pass { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_double_convert_upgrade_town_is_four_components() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "convert 2PW to 2C. convert 1W to 1C. upgrade F2 to TP. +TW5",
            &state,
        )
        .expect("ok");
        assert_eq!(parts.len(), 4);
        assert!(matches!(parts[0], Component::Conversion(Conversion::PowerToCoins(2))));
        assert!(matches!(parts[1], Component::Conversion(Conversion::WorkersToCoins(1))));
        assert!(matches!(
            parts[2],
            Component::Main {
                action: Action::Upgrade { .. },
                ..
            }
        ));
        assert!(matches!(parts[3], Component::Auxiliary(Auxiliary::Town(TownTile::Tw5))));
    }

    #[test]
    fn test_burn_flushes_before_consuming_conversion() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "burn 1. convert 1PW to 1C. convert 3W to 3C. advance ship",
            &state,
        )
        .expect("ok");
        assert_eq!(parts.len(), 4);
        assert!(matches!(parts[0], Component::Burn(1)));
        assert!(matches!(parts[1], Component::Conversion(Conversion::PowerToCoins(1))));
        assert!(matches!(parts[2], Component::Conversion(Conversion::WorkersToCoins(3))));
        assert!(matches!(
            parts[3],
            Component::Main {
                action: Action::AdvanceShipping { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_conversion_between_actions_flushes_auxiliaries_first() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "upgrade F2 to TE. +FAV11. convert 1PW to 1C",
            &state,
        )
        .expect("ok");
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], Component::Main { .. }));
        assert!(matches!(parts[1], Component::Auxiliary(Auxiliary::Favor(FavorTile::Fav11))));
        assert!(matches!(parts[2], Component::Conversion(_)));
    }

    #[test]
    fn test_upgrade_favor_is_main_then_auxiliary() {
        let state = action_state();
        let parts =
            compile_line(Faction::Engineers, "upgrade F5 to TE. +FAV11", &state).expect("ok");
        assert_eq!(parts.len(), 2);
        assert!(matches!(
            parts[0],
            Component::Main {
                action: Action::Upgrade { .. },
                ..
            }
        ));
        assert!(matches!(parts[1], Component::Auxiliary(Auxiliary::Favor(FavorTile::Fav11))));
    }

    #[test]
    fn test_spade_action_precedes_distant_build() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "burn 2. action ACT6. transform E5 to gray. build E7",
            &state,
        )
        .expect("ok");
        // Grant first (with the burn), then the transform, then the build.
        assert_eq!(parts.len(), 3);
        assert!(matches!(
            parts[0],
            Component::FreeSpadeGrant {
                grant: SpadeGrant::Power(PowerAction::Spade2),
                burn: 2,
            }
        ));
        assert!(matches!(parts[1], Component::TerraformOnly { .. }));
        assert!(matches!(
            parts[2],
            Component::Main {
                action: Action::Build { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_transform_suppressed_when_build_targets_same_cell() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "action ACT5. transform E7 to gray. build E7",
            &state,
        )
        .expect("ok");
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Component::FreeSpadeGrant { .. }));
        assert!(matches!(
            parts[1],
            Component::Main {
                action: Action::Build { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_non_spade_action_becomes_modifier() {
        let state = action_state();
        let parts = compile_line(Faction::Engineers, "action ACT3. build E7", &state).expect("ok");
        assert_eq!(parts.len(), 1);
        let Component::Main { action, modifiers } = &parts[0] else {
            panic!("expected a main action");
        };
        assert!(matches!(action, Action::Build { .. }));
        assert_eq!(
            modifiers,
            &[Modifier::Power {
                action: PowerAction::Workers,
                burn: 0,
            }]
        );
    }

    #[test]
    fn test_standalone_power_action() {
        let state = action_state();
        let parts = compile_line(Faction::Engineers, "burn 3. action ACT4", &state).expect("ok");
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], Component::Burn(3)));
        assert!(matches!(
            parts[1],
            Component::Main {
                action: Action::Power {
                    action: PowerAction::Coins,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn test_bridge_action_takes_endpoints() {
        let state = action_state();
        let parts =
            compile_line(Faction::Engineers, "action ACT1. bridge E7:D6", &state).expect("ok");
        assert_eq!(parts.len(), 1);
        assert!(matches!(
            parts[0],
            Component::Main {
                action: Action::Power {
                    action: PowerAction::Bridge,
                    bridge: Some(_),
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn test_ordination_is_faction_gated() {
        let state = action_state();
        let parts =
            compile_line(Faction::Darklings, "convert 3W to 3P", &state).expect("darklings");
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0], Component::Ordination { workers: 3 }));

        let err = compile_line(Faction::Engineers, "convert 3W to 3P", &state);
        assert!(matches!(err, Err(ParseError::UnknownToken { .. })));
    }

    #[test]
    fn test_informational_track_sigil_is_dropped() {
        let state = action_state();
        let parts = compile_line(Faction::Engineers, "+FIRE", &state).expect("ok");
        assert!(parts.is_empty());
    }

    #[test]
    fn test_conversions_only_line_is_legal() {
        let state = action_state();
        let parts = compile_line(
            Faction::Engineers,
            "convert 1PW to 1C. convert 1PW to 1C",
            &state,
        )
        .expect("ok");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_unknown_token_is_fatal_with_context() {
        let state = action_state();
        let err = compile_line(Faction::Engineers, "frobnicate E7", &state);
        let Err(ParseError::UnknownToken { token, line }) = err else {
            panic!("expected an unknown-token error");
        };
        assert_eq!(token, "frobnicate E7");
        assert!(line.contains("frobnicate"));
    }

    #[test]
    fn test_entitlement_turns_transform_into_main_action() {
        let mut state = action_state();
        let parts = compile_line(Faction::Engineers, "transform E5 to gray", &state).expect("ok");
        assert!(matches!(parts[0], Component::TerraformOnly { .. }));

        state.grant_spades(Faction::Engineers, 1, true);
        let parts = compile_line(Faction::Engineers, "transform E5 to gray", &state).expect("ok");
        assert!(matches!(
            parts[0],
            Component::Main {
                action: Action::Transform { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_leech_prefix_is_stripped_before_classification() {
        let state = action_state();
        let parts =
            compile_line(Faction::Engineers, "2 3  upgrade F5 to TP", &state).expect("ok");
        assert_eq!(parts.len(), 1);
        assert!(matches!(
            parts[0],
            Component::Main {
                action: Action::Upgrade { .. },
                ..
            }
        ));
    }
}
