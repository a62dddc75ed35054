//! The phase state machine that consumes the compiled item stream.

use std::collections::BTreeMap;

use crate::game::{Action, BonusCard, Faction, GameState, Phase, LAST_ROUND};
use crate::notation::compound::{compile_line, Component};
use crate::notation::log::{LogItem, Settings, TurnKind};
use crate::notation::tokenize;
use crate::replay::{MissingInfo, MissingInfoKind, ReplayError};

/// Result of advancing the interpreter by one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The item was consumed.
    Advanced,
    /// Replay is suspended until the caller supplies the missing data;
    /// the current item was not consumed.
    Missing(MissingInfo),
    /// The stream is exhausted (final scoring has run if it was due).
    EndOfLog,
}

/// A deterministic single-stepping replay of one game.
#[derive(Debug, Clone)]
pub struct Interpreter {
    items: Vec<LogItem>,
    index: usize,
    state: GameState,
    income_pending: bool,
    income_granted: bool,
    pass_overrides: BTreeMap<(u32, Faction), BonusCard>,
}

impl Interpreter {
    /// Build an interpreter over an item stream. The leading settings
    /// item (players, tiles, roster) is applied to the initial state.
    #[must_use]
    pub fn new(items: Vec<LogItem>) -> Self {
        Self::with_overrides(items, BTreeMap::new())
    }

    /// Build an interpreter with pass-reselection overrides supplied by
    /// an external caller.
    #[must_use]
    pub fn with_overrides(
        items: Vec<LogItem>,
        pass_overrides: BTreeMap<(u32, Faction), BonusCard>,
    ) -> Self {
        let mut state = GameState::new();
        for item in &items {
            if let LogItem::Settings(settings) = item {
                apply_settings(&mut state, settings);
                break;
            }
        }
        Self {
            items,
            index: 0,
            state,
            income_pending: false,
            income_granted: false,
            pass_overrides,
        }
    }

    /// The current game state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Index of the next item to execute.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of items in the stream.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item stream.
    #[must_use]
    pub fn items(&self) -> &[LogItem] {
        &self.items
    }

    /// Rewind to the initial state, keeping the stream and overrides.
    pub fn reset(&mut self) {
        *self = Self::with_overrides(
            std::mem::take(&mut self.items),
            std::mem::take(&mut self.pass_overrides),
        );
    }

    /// Execute the next item.
    ///
    /// # Errors
    ///
    /// Compilation and rule violations are fatal and abort the replay at
    /// this index; [`StepOutcome::Missing`] is a recoverable signal, not
    /// an error.
    pub fn step(&mut self) -> Result<StepOutcome, ReplayError> {
        if self.index >= self.items.len() {
            self.finish_at_log_end();
            return Ok(StepOutcome::EndOfLog);
        }

        let item = self.items[self.index].clone();
        match item {
            LogItem::Settings(_) => {
                // Applied during construction.
            }
            LogItem::RoundStart { round, turn_order } => {
                if round == 1 {
                    if let Some(missing) = self.missing_initial_selections() {
                        return Ok(StepOutcome::Missing(missing));
                    }
                }
                // A missed all-passed signal still forces cleanup.
                if self.state.phase == Phase::Action {
                    self.state.cleanup();
                }
                if round > 1 {
                    // The prior round's track reward books here, at the
                    // start of this round's income step.
                    self.state.apply_cult_rewards(round - 1);
                }
                self.state.start_round(round, &turn_order);
                self.income_pending = true;
                self.income_granted = false;
            }
            LogItem::Turn { faction, kind } => {
                if let Some(outcome) = self.buffer_income(&kind) {
                    self.index += 1;
                    return Ok(outcome);
                }
                if let Some(missing) = self.pass_gate(faction, &kind) {
                    return Ok(StepOutcome::Missing(missing));
                }
                self.execute_turn(faction, &kind)?;
            }
        }

        self.index += 1;
        Ok(StepOutcome::Advanced)
    }

    /// Advance until the target index, the end of the log, a missing-info
    /// signal, or a fatal error. Jumping backward is the caller's job
    /// (reset, then run forward).
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error.
    pub fn run_to(&mut self, target: usize) -> Result<StepOutcome, ReplayError> {
        while self.index < target.min(self.items.len()) {
            match self.step()? {
                StepOutcome::Advanced => {}
                other => return Ok(other),
            }
        }
        if self.index >= self.items.len() {
            self.finish_at_log_end();
        }
        Ok(StepOutcome::Advanced)
    }

    /// Replay the whole stream.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error.
    pub fn run_to_end(&mut self) -> Result<StepOutcome, ReplayError> {
        loop {
            match self.step()? {
                StepOutcome::Advanced => {}
                other => return Ok(other),
            }
        }
    }

    /// End-of-log handling: a final round without its explicit all-passed
    /// signal still ends the game exactly once.
    fn finish_at_log_end(&mut self) {
        if self.state.phase == Phase::Action
            && (self.state.all_passed() || self.state.round >= LAST_ROUND)
        {
            self.state.cleanup();
        }
    }

    /// The round-1 setup gate: every player needs an initial bonus card.
    fn missing_initial_selections(&self) -> Option<MissingInfo> {
        let missing: Vec<Faction> = self
            .state
            .players
            .iter()
            .map(|p| p.faction)
            .filter(|&f| self.state.bonus_cards.held_by(f).is_none())
            .collect();
        if missing.is_empty() {
            return None;
        }
        Some(MissingInfo {
            kind: MissingInfoKind::InitialBonusCard,
            round: 1,
            players: missing,
            remaining: BTreeMap::new(),
        })
    }

    /// Income buffering: pre-income rows hold income back, the first
    /// real move releases it and opens the action phase.
    ///
    /// Returns `Some` when the row was fully consumed here.
    fn buffer_income(&mut self, kind: &TurnKind) -> Option<StepOutcome> {
        if self.income_pending {
            match kind {
                TurnKind::PreIncome => return Some(StepOutcome::Advanced),
                TurnKind::PostIncome => {
                    self.state.grant_income();
                    self.income_pending = false;
                    self.income_granted = true;
                    return Some(StepOutcome::Advanced);
                }
                _ => {
                    self.state.grant_income();
                    self.income_pending = false;
                    self.income_granted = true;
                    self.state.start_action_phase();
                }
            }
        } else if self.income_granted && self.state.phase == Phase::Income {
            if matches!(kind, TurnKind::PostIncome) {
                return Some(StepOutcome::Advanced);
            }
            self.state.start_action_phase();
        } else if matches!(kind, TurnKind::PreIncome | TurnKind::PostIncome) {
            // Stray income markers outside the buffered window.
            return Some(StepOutcome::Advanced);
        }
        None
    }

    /// The pass-time gate: a pass without its reselection (outside the
    /// final round) suspends replay, reporting every remaining gap.
    fn pass_gate(&self, faction: Faction, kind: &TurnKind) -> Option<MissingInfo> {
        if self.state.round >= LAST_ROUND {
            return None;
        }
        let TurnKind::Compound(line) = kind else {
            return None;
        };
        if !line_has_bare_pass(line) {
            return None;
        }
        if self.pass_overrides.contains_key(&(self.state.round, faction)) {
            return None;
        }
        Some(MissingInfo {
            kind: MissingInfoKind::PassBonusCard,
            round: self.state.round,
            players: vec![faction],
            remaining: self.scan_missing_passes(),
        })
    }

    /// Pre-scan the remainder of the log for passes without reselections,
    /// so the caller can supply all of them at once.
    fn scan_missing_passes(&self) -> BTreeMap<u32, Vec<Faction>> {
        let mut missing: BTreeMap<u32, Vec<Faction>> = BTreeMap::new();
        let mut round = self.state.round;
        for item in &self.items[self.index..] {
            match item {
                LogItem::RoundStart { round: r, .. } => round = *r,
                LogItem::Turn {
                    faction,
                    kind: TurnKind::Compound(line),
                } => {
                    if round < LAST_ROUND
                        && line_has_bare_pass(line)
                        && !self.pass_overrides.contains_key(&(round, *faction))
                    {
                        missing.entry(round).or_default().push(*faction);
                    }
                }
                _ => {}
            }
        }
        missing
    }

    fn execute_turn(&mut self, faction: Faction, kind: &TurnKind) -> Result<(), ReplayError> {
        let index = self.index;
        match kind {
            TurnKind::Compound(line) => {
                let mut components = compile_line(faction, line, &self.state)
                    .map_err(|source| ReplayError::Compile { index, source })?;
                self.apply_pass_override(faction, &mut components);
                for component in &components {
                    component
                        .execute(&mut self.state, faction)
                        .map_err(|source| ReplayError::Action {
                            index,
                            line: line.clone(),
                            source,
                        })?;
                }
                Ok(())
            }
            TurnKind::Leech {
                accept,
                amount,
                from,
            } => {
                let action = if *accept {
                    Action::AcceptLeech {
                        faction,
                        amount: *amount,
                        from: *from,
                    }
                } else {
                    Action::DeclineLeech {
                        faction,
                        from: *from,
                    }
                };
                action
                    .execute(&mut self.state)
                    .map_err(|source| ReplayError::Action {
                        index,
                        line: format!("{kind:?}"),
                        source,
                    })
            }
            TurnKind::SelectBonus(card) => Action::SelectBonusCard {
                faction,
                card: *card,
            }
            .execute(&mut self.state)
            .map_err(|source| ReplayError::Action {
                index,
                line: format!("select {card}"),
                source,
            }),
            TurnKind::CultAdvance(track) => Action::CultReaction {
                faction,
                track: *track,
            }
            .execute(&mut self.state)
            .map_err(|source| ReplayError::Action {
                index,
                line: format!("+{track}"),
                source,
            }),
            TurnKind::PreIncome | TurnKind::PostIncome => Ok(()),
        }
    }

    /// Patch a compiled bare pass with an externally supplied card.
    fn apply_pass_override(&self, faction: Faction, components: &mut [Component]) {
        let Some(&card) = self.pass_overrides.get(&(self.state.round, faction)) else {
            return;
        };
        for component in components {
            if let Component::Main {
                action: Action::Pass { card: slot, .. },
                ..
            } = component
            {
                if slot.is_none() {
                    *slot = Some(card);
                }
            }
        }
    }
}

/// Whether a raw line contains a pass token without a card.
fn line_has_bare_pass(line: &str) -> bool {
    tokenize(line)
        .iter()
        .any(|t| t == "pass" || t == "Pass")
}

/// Seat players and configure pools from the settings header.
fn apply_settings(state: &mut GameState, settings: &Settings) {
    for (name, faction) in &settings.players {
        // Duplicate seats are a header mistake; first writer wins.
        let _ = state.add_player(*faction, name);
    }
    for (faction, vp) in &settings.starting_vp {
        if let Some(player) = state.player_mut(*faction) {
            player.vp = *vp;
        }
    }
    state.scoring.tiles = settings.scoring_tiles.clone();
    state.bonus_cards.set_roster(&settings.bonus_cards);
}
