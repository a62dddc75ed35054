//! Process-wide registry of replay sessions, one interpreter per game id.
//!
//! Calls on the same game id serialize on a per-session lock; different
//! game ids run independently.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::game::{BonusCard, Faction, ScoreBreakdown, ScoringTile};
use crate::notation::log::{LogItem, TurnKind};
use crate::notation::parse_log;
use crate::replay::interpreter::{Interpreter, StepOutcome};
use crate::replay::{MissingInfo, ReplayError};

/// Setup data supplied by an external caller after a missing-info signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidedInfo {
    /// The six scoring tiles, when the header lacked them.
    #[serde(default)]
    pub scoring_tiles: Vec<ScoringTile>,
    /// The bonus-card roster, when the header lacked it.
    #[serde(default)]
    pub bonus_cards: Vec<BonusCard>,
    /// Bonus-card selections: round → player → card. Round 0 holds the
    /// initial selections, rounds 1–5 the pass-time reselections.
    #[serde(default)]
    pub selections: BTreeMap<u32, BTreeMap<Faction, BonusCard>>,
}

/// A snapshot of a session's progress for external callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// The game id.
    pub game_id: String,
    /// Index of the next item to execute.
    pub index: usize,
    /// Total number of items.
    pub total: usize,
    /// Current round.
    pub round: u32,
    /// Whether replay has finished (final scores exist).
    pub finished: bool,
    /// Pending missing-info signal, if replay is suspended.
    pub missing: Option<MissingInfo>,
    /// Final scores, once the game ended.
    pub final_scores: Option<BTreeMap<Faction, ScoreBreakdown>>,
}

struct Session {
    game_id: String,
    interpreter: Interpreter,
    missing: Option<MissingInfo>,
}

impl Session {
    fn view(&self) -> SessionView {
        let state = self.interpreter.state();
        SessionView {
            game_id: self.game_id.clone(),
            index: self.interpreter.index(),
            total: self.interpreter.len(),
            round: state.round,
            finished: state.final_scores.is_some(),
            missing: self.missing.clone(),
            final_scores: state.final_scores.clone(),
        }
    }

    fn absorb(&mut self, outcome: StepOutcome) {
        self.missing = match outcome {
            StepOutcome::Missing(info) => Some(info),
            StepOutcome::Advanced | StepOutcome::EndOfLog => None,
        };
    }
}

/// Owns every active replay session.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.sessions.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("SessionManager").field("sessions", &count).finish()
    }
}

impl SessionManager {
    /// A manager with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a replay session from raw log text. The session
    /// is created suspended at index zero.
    ///
    /// # Errors
    ///
    /// Returns a parse failure for a malformed log.
    pub fn start(
        &self,
        game_id: &str,
        log_text: &str,
        restart: bool,
    ) -> Result<SessionView, ReplayError> {
        if !restart {
            if let Some(existing) = self.session(game_id) {
                let session = lock(&existing);
                return Ok(session.view());
            }
        }
        let items = parse_log(log_text)?;
        let session = Session {
            game_id: game_id.to_owned(),
            interpreter: Interpreter::new(items),
            missing: None,
        };
        let view = session.view();
        let mut sessions = self.sessions.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.insert(game_id.to_owned(), Arc::new(Mutex::new(session)));
        Ok(view)
    }

    /// Tear down a session.
    pub fn remove(&self, game_id: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.remove(game_id);
    }

    /// Advance a session by up to `steps` items, stopping early on a
    /// missing-info signal or the end of the log.
    ///
    /// # Errors
    ///
    /// Propagates fatal replay errors and unknown session ids.
    pub fn advance(&self, game_id: &str, steps: usize) -> Result<SessionView, ReplayError> {
        let handle = self
            .session(game_id)
            .ok_or_else(|| ReplayError::UnknownSession(game_id.to_owned()))?;
        let mut session = lock(&handle);
        for _ in 0..steps {
            let outcome = session.interpreter.step()?;
            session.absorb(outcome.clone());
            if !matches!(outcome, StepOutcome::Advanced) {
                break;
            }
        }
        Ok(session.view())
    }

    /// Jump to an absolute item index. Backward jumps reset and replay
    /// forward; the determinism guarantees are the same as stepping.
    ///
    /// # Errors
    ///
    /// Propagates fatal replay errors and unknown session ids.
    pub fn jump_to(&self, game_id: &str, index: usize) -> Result<SessionView, ReplayError> {
        let handle = self
            .session(game_id)
            .ok_or_else(|| ReplayError::UnknownSession(game_id.to_owned()))?;
        let mut session = lock(&handle);
        if index < session.interpreter.index() {
            session.interpreter.reset();
        }
        let outcome = session.interpreter.run_to(index)?;
        session.absorb(outcome);
        Ok(session.view())
    }

    /// Supply missing setup information, then reset and fast-forward to
    /// the previously reached index. A fresh missing-info signal stops
    /// the fast-forward early instead of erroring.
    ///
    /// # Errors
    ///
    /// Propagates fatal replay errors and unknown session ids.
    pub fn provide_info(
        &self,
        game_id: &str,
        info: &ProvidedInfo,
    ) -> Result<SessionView, ReplayError> {
        let handle = self
            .session(game_id)
            .ok_or_else(|| ReplayError::UnknownSession(game_id.to_owned()))?;
        let mut session = lock(&handle);

        let target = session.interpreter.index();
        let mut items = session.interpreter.items().to_vec();
        let mut overrides: BTreeMap<(u32, Faction), BonusCard> = BTreeMap::new();

        // 1. Header-level settings.
        if let Some(LogItem::Settings(settings)) = items.first_mut() {
            if !info.scoring_tiles.is_empty() {
                settings.scoring_tiles.clone_from(&info.scoring_tiles);
            }
            if !info.bonus_cards.is_empty() {
                settings.bonus_cards.clone_from(&info.bonus_cards);
            }
        }

        // 2. Initial selections splice in before round 1; pass-time
        // selections become overrides.
        for (&round, picks) in &info.selections {
            if round == 0 {
                splice_initial_selections(&mut items, picks);
            } else {
                for (&faction, &card) in picks {
                    overrides.insert((round, faction), card);
                }
            }
        }

        // 3. Full reset and forward replay to where we were.
        session.interpreter = Interpreter::with_overrides(items, overrides);
        let outcome = session.interpreter.run_to(target)?;
        session.absorb(outcome);
        Ok(session.view())
    }

    /// The view of an existing session.
    ///
    /// # Errors
    ///
    /// Returns an unknown-session error for an unregistered id.
    pub fn view(&self, game_id: &str) -> Result<SessionView, ReplayError> {
        let handle = self
            .session(game_id)
            .ok_or_else(|| ReplayError::UnknownSession(game_id.to_owned()))?;
        let session = lock(&handle);
        Ok(session.view())
    }

    fn session(&self, game_id: &str) -> Option<Arc<Mutex<Session>>> {
        let sessions = self.sessions.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.get(game_id).cloned()
    }
}

fn lock(handle: &Arc<Mutex<Session>>) -> std::sync::MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Insert initial bonus-card selections before the first round header,
/// skipping players that already have one in the stream.
fn splice_initial_selections(items: &mut Vec<LogItem>, picks: &BTreeMap<Faction, BonusCard>) {
    let already: Vec<Faction> = items
        .iter()
        .filter_map(|item| match item {
            LogItem::Turn {
                faction,
                kind: TurnKind::SelectBonus(_),
            } => Some(*faction),
            _ => None,
        })
        .collect();

    let insert_at = items
        .iter()
        .position(|item| matches!(item, LogItem::RoundStart { round: 1, .. }))
        .unwrap_or(items.len());

    let mut new_items = Vec::new();
    for (&faction, &card) in picks {
        if !already.contains(&faction) {
            new_items.push(LogItem::Turn {
                faction,
                kind: TurnKind::SelectBonus(card),
            });
        }
    }
    items.splice(insert_at..insert_at, new_items);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::MissingInfoKind;

    const LOG: &str = "\
ScoringTiles: SCORE5, SCORE8, SCORE4, SCORE1, SCORE6, SCORE7
BonusCards: BON1, BON2, BON3, BON4, BON7, BON9, BON10
Player: Alice -> engineers
Player: Bob -> cultists
engineers: build E7
cultists: build F5
Round 1: engineers, cultists
engineers: pass BON1
cultists: pass BON3
";

    #[test]
    fn test_start_is_idempotent_without_restart() {
        let manager = SessionManager::new();
        let first = manager.start("g1", LOG, false).expect("start");
        assert_eq!(first.index, 0);
        let advanced = manager.advance("g1", 3).expect("advance");
        assert_eq!(advanced.index, 3);
        // Starting again without restart keeps the session.
        let again = manager.start("g1", LOG, false).expect("start");
        assert_eq!(again.index, 3);
        // Restart rebuilds from scratch.
        let fresh = manager.start("g1", LOG, true).expect("restart");
        assert_eq!(fresh.index, 0);
    }

    #[test]
    fn test_unknown_session_errors() {
        let manager = SessionManager::new();
        assert!(matches!(
            manager.advance("nope", 1),
            Err(ReplayError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_missing_info_then_provide_resumes_past_block() {
        let manager = SessionManager::new();
        manager.start("g2", LOG, false).expect("start");
        // Run to the end: blocks on the round-1 initial-card gate.
        let view = manager.advance("g2", usize::MAX).expect("advance");
        let missing = view.missing.expect("suspended on missing info");
        assert_eq!(missing.kind, MissingInfoKind::InitialBonusCard);
        let blocked_at = view.index;

        let mut picks = BTreeMap::new();
        picks.insert(Faction::Engineers, BonusCard::Bon4);
        picks.insert(Faction::Cultists, BonusCard::Bon7);
        let info = ProvidedInfo {
            selections: BTreeMap::from([(0, picks)]),
            ..ProvidedInfo::default()
        };
        let view = manager.provide_info("g2", &info).expect("provide");
        // The spliced selections shifted indices; the session reached the
        // previously blocked index without re-raising the same signal.
        assert!(view.missing.is_none());
        assert!(view.index >= blocked_at);

        let done = manager.advance("g2", usize::MAX).expect("finish");
        assert!(done.missing.is_none());
        assert_eq!(done.index, done.total);
    }

    #[test]
    fn test_jump_backward_resets_and_replays() {
        let manager = SessionManager::new();
        manager.start("g3", LOG, false).expect("start");
        let forward = manager.advance("g3", 3).expect("advance");
        assert_eq!(forward.index, 3);
        let back = manager.jump_to("g3", 1).expect("jump");
        assert_eq!(back.index, 1);
        let again = manager.jump_to("g3", 3).expect("jump");
        assert_eq!(again.index, 3);
    }
}
