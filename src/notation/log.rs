//! The normalized line-oriented log dialect and its item stream.
//!
//! A log is a settings header followed by round headers and per-turn
//! rows. Both source dialects are converted into this form before they
//! reach the interpreter; acquisition of raw logs is out of scope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{BonusCard, CultTrack, Faction, ScoringTile};
use crate::notation::ParseError;

/// The one-time game configuration from the log header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Display name and faction per seat, in header order.
    pub players: Vec<(String, Faction)>,
    /// Starting victory-point overrides.
    pub starting_vp: BTreeMap<Faction, i32>,
    /// The six active scoring tiles in round order.
    pub scoring_tiles: Vec<ScoringTile>,
    /// The bonus-card roster for this game.
    pub bonus_cards: Vec<BonusCard>,
}

/// What one per-turn row contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// A compound action line, compiled lazily against the live state.
    Compound(String),
    /// An explicit accept/decline of a reward offer.
    Leech {
        /// `true` for accept, `false` for decline.
        accept: bool,
        /// Declared energy amount, when present.
        amount: Option<u32>,
        /// Declared source faction, when present.
        from: Option<Faction>,
    },
    /// An initial bonus-card selection (before round 1).
    SelectBonus(BonusCard),
    /// A standalone track-advance row (the Cultists' offer reward).
    CultAdvance(CultTrack),
    /// An informational row belonging before income is granted.
    PreIncome,
    /// An informational row between income and the first real move.
    PostIncome,
}

/// One item of the compiled log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogItem {
    /// The one-time settings header.
    Settings(Settings),
    /// A round header with the round number and verbatim turn order.
    RoundStart {
        /// Round number, 1–6.
        round: u32,
        /// Turn order as written in the log.
        turn_order: Vec<Faction>,
    },
    /// One player-turn row.
    Turn {
        /// Acting player.
        faction: Faction,
        /// Row payload.
        kind: TurnKind,
    },
}

/// Parse a full log into the item stream. The settings item is emitted
/// first even when header rows are interleaved.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the offending row; unknown turn-row
/// content is deferred to compilation and does not fail here.
pub fn parse_log(text: &str) -> Result<Vec<LogItem>, ParseError> {
    let mut settings = Settings::default();
    let mut items: Vec<LogItem> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Player:") {
            let (name, faction_name) =
                rest.split_once("->").ok_or_else(|| ParseError::BadHeader {
                    line: line.to_owned(),
                })?;
            let faction = Faction::from_name(faction_name.trim()).ok_or_else(|| {
                ParseError::UnknownFaction {
                    name: faction_name.trim().to_owned(),
                    line: line.to_owned(),
                }
            })?;
            settings.players.push((name.trim().to_owned(), faction));
            continue;
        }
        if let Some(rest) = line.strip_prefix("StartingVP:") {
            let (faction_name, vp) =
                rest.split_once("->").ok_or_else(|| ParseError::BadHeader {
                    line: line.to_owned(),
                })?;
            let faction = Faction::from_name(faction_name.trim()).ok_or_else(|| {
                ParseError::UnknownFaction {
                    name: faction_name.trim().to_owned(),
                    line: line.to_owned(),
                }
            })?;
            let vp = vp.trim().parse().map_err(|_| ParseError::BadHeader {
                line: line.to_owned(),
            })?;
            settings.starting_vp.insert(faction, vp);
            continue;
        }
        if let Some(rest) = line.strip_prefix("ScoringTiles:") {
            for code in rest.split(',') {
                let code = code.trim();
                if code.is_empty() {
                    continue;
                }
                let tile = ScoringTile::from_code(code).ok_or_else(|| ParseError::BadHeader {
                    line: line.to_owned(),
                })?;
                settings.scoring_tiles.push(tile);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("BonusCards:") {
            for code in rest.split(',') {
                let code = code.trim();
                if code.is_empty() {
                    continue;
                }
                let card = BonusCard::from_code(code).ok_or_else(|| ParseError::BadHeader {
                    line: line.to_owned(),
                })?;
                settings.bonus_cards.push(card);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("Round ") {
            let (number, order) = rest.split_once(':').ok_or_else(|| ParseError::BadHeader {
                line: line.to_owned(),
            })?;
            let round = number.trim().parse().map_err(|_| ParseError::BadHeader {
                line: line.to_owned(),
            })?;
            let mut turn_order = Vec::new();
            for name in order.split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let faction =
                    Faction::from_name(name).ok_or_else(|| ParseError::UnknownFaction {
                        name: name.to_owned(),
                        line: line.to_owned(),
                    })?;
                turn_order.push(faction);
            }
            items.push(LogItem::RoundStart { round, turn_order });
            continue;
        }

        // Everything else is a per-turn row: "<faction>: <content>".
        let (who, content) = line.split_once(':').ok_or_else(|| ParseError::BadHeader {
            line: line.to_owned(),
        })?;
        let faction = Faction::from_name(who.trim()).ok_or_else(|| ParseError::UnknownFaction {
            name: who.trim().to_owned(),
            line: line.to_owned(),
        })?;
        let kind = classify_turn_row(content.trim(), line)?;
        items.push(LogItem::Turn { faction, kind });
    }

    // Settings lead the stream even when no header rows were present;
    // the interpreter then reports what is missing.
    items.insert(0, LogItem::Settings(settings));
    Ok(items)
}

fn classify_turn_row(content: &str, line: &str) -> Result<TurnKind, ParseError> {
    if content == "cult_income" {
        return Ok(TurnKind::PreIncome);
    }
    if content == "income" {
        return Ok(TurnKind::PostIncome);
    }
    if let Some(rest) = content.strip_prefix("select ") {
        let card = BonusCard::from_code(rest.trim()).ok_or_else(|| ParseError::BadHeader {
            line: line.to_owned(),
        })?;
        return Ok(TurnKind::SelectBonus(card));
    }
    if let Some(kind) = parse_leech_row(content, line)? {
        return Ok(kind);
    }
    // A lone "+TRACK" row is the Cultists' logged track choice.
    if let Some(rest) = content.strip_prefix('+') {
        if !content.contains('.') {
            if let Some(track) = CultTrack::from_name(rest.trim()) {
                return Ok(TurnKind::CultAdvance(track));
            }
        }
    }
    Ok(TurnKind::Compound(content.to_owned()))
}

/// Parse `leech 2 from cultists` / `decline 2 from cultists` rows; the
/// amount and source are both optional.
fn parse_leech_row(content: &str, line: &str) -> Result<Option<TurnKind>, ParseError> {
    let (accept, rest) = if let Some(rest) = content.strip_prefix("leech") {
        (true, rest)
    } else if let Some(rest) = content.strip_prefix("decline") {
        (false, rest)
    } else {
        return Ok(None);
    };

    let mut amount = None;
    let mut from = None;
    let mut fields = rest.split_whitespace().peekable();
    if let Some(first) = fields.peek() {
        if let Ok(n) = first.parse::<u32>() {
            amount = Some(n);
            fields.next();
        }
    }
    match (fields.next(), fields.next()) {
        (None, _) => {}
        (Some("from"), Some(name)) => {
            let faction = Faction::from_name(name).ok_or_else(|| ParseError::UnknownFaction {
                name: name.to_owned(),
                line: line.to_owned(),
            })?;
            from = Some(faction);
        }
        _ => {
            return Err(ParseError::BadHeader {
                line: line.to_owned(),
            })
        }
    }
    Ok(Some(TurnKind::Leech {
        accept,
        amount,
        from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# fixture header
ScoringTiles: SCORE5, SCORE8, SCORE4, SCORE1, SCORE6, SCORE7
BonusCards: BON1, BON2, BON3, BON4, BON7, BON9, BON10
Player: Alice -> engineers
Player: Bob -> cultists
StartingVP: cultists -> 20

engineers: build E7
engineers: select BON4
Round 1: engineers, cultists
cultists: cult_income
engineers: income
engineers: burn 1. convert 1PW to 1C. advance ship
cultists: leech 1 from engineers
cultists: decline 2 from engineers
cultists: +FIRE
engineers: pass BON7
";

    #[test]
    fn test_settings_item_leads_the_stream() {
        let items = parse_log(SAMPLE).expect("parse");
        let LogItem::Settings(settings) = &items[0] else {
            panic!("first item must be settings");
        };
        assert_eq!(settings.players.len(), 2);
        assert_eq!(settings.players[0].1, Faction::Engineers);
        assert_eq!(settings.scoring_tiles.len(), 6);
        assert_eq!(settings.bonus_cards.len(), 7);
        assert_eq!(settings.starting_vp[&Faction::Cultists], 20);
    }

    #[test]
    fn test_round_header_carries_turn_order() {
        let items = parse_log(SAMPLE).expect("parse");
        let round = items
            .iter()
            .find_map(|i| match i {
                LogItem::RoundStart { round, turn_order } => Some((*round, turn_order.clone())),
                _ => None,
            })
            .expect("round header");
        assert_eq!(round.0, 1);
        assert_eq!(round.1, vec![Faction::Engineers, Faction::Cultists]);
    }

    #[test]
    fn test_turn_row_classification() {
        let items = parse_log(SAMPLE).expect("parse");
        let kinds: Vec<&TurnKind> = items
            .iter()
            .filter_map(|i| match i {
                LogItem::Turn { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert!(matches!(kinds[0], TurnKind::Compound(_))); // setup build
        assert!(matches!(kinds[1], TurnKind::SelectBonus(BonusCard::Bon4)));
        assert!(matches!(kinds[2], TurnKind::PreIncome));
        assert!(matches!(kinds[3], TurnKind::PostIncome));
        assert!(matches!(kinds[4], TurnKind::Compound(_)));
        assert!(matches!(
            kinds[5],
            TurnKind::Leech {
                accept: true,
                amount: Some(1),
                from: Some(Faction::Engineers),
            }
        ));
        assert!(matches!(kinds[6], TurnKind::Leech { accept: false, .. }));
        assert!(matches!(kinds[7], TurnKind::CultAdvance(CultTrack::Fire)));
        assert!(matches!(kinds[8], TurnKind::Compound(_)));
    }

    #[test]
    fn test_unknown_faction_is_fatal() {
        let err = parse_log("martians: pass BON1");
        assert!(matches!(err, Err(ParseError::UnknownFaction { .. })));
    }

    #[test]
    fn test_bad_header_is_fatal() {
        let err = parse_log("ScoringTiles: SCORE99");
        assert!(matches!(err, Err(ParseError::BadHeader { .. })));
        let err = parse_log("Round one: engineers");
        assert!(matches!(err, Err(ParseError::BadHeader { .. })));
    }

    #[test]
    fn test_missing_header_still_parses() {
        let items = parse_log("engineers: pass").expect("parse");
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], LogItem::Settings(_)));
    }
}
