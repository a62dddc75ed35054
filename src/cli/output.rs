//! Shared text rendering for CLI commands.

use std::collections::BTreeMap;

use tmreplay::game::{Faction, ScoreBreakdown};
use tmreplay::GameState;

/// Render final scores as an aligned table, winner first.
pub(crate) fn render_scores(scores: &BTreeMap<Faction, ScoreBreakdown>) -> String {
    let mut rows: Vec<(&Faction, &ScoreBreakdown)> = scores.iter().collect();
    rows.sort_by(|a, b| b.1.total_vp.cmp(&a.1.total_vp).then(a.0.cmp(b.0)));

    let mut out = String::new();
    out.push_str("faction          base  area  cult  res  total\n");
    for (faction, score) in rows {
        out.push_str(&format!(
            "{:<16} {:>4}  {:>4}  {:>4}  {:>3}  {:>5}\n",
            faction.name(),
            score.base_vp,
            score.area_vp,
            score.cult_vp,
            score.resource_vp,
            score.total_vp
        ));
    }
    out
}

/// Render a one-line-per-player state summary.
pub(crate) fn render_state(state: &GameState) -> String {
    let mut out = format!("round {} ({:?} phase)\n", state.round, state.phase);
    for player in &state.players {
        let wallet = player.wallet;
        out.push_str(&format!(
            "{:<16} {} VP  {}C {}W {}P  {}/{}/{} PW  ship {} dig {}{}\n",
            player.faction.name(),
            player.vp,
            wallet.coins,
            wallet.workers,
            wallet.priests,
            wallet.power.bowl1,
            wallet.power.bowl2,
            wallet.power.bowl3,
            player.shipping,
            player.digging,
            if player.passed { "  (passed)" } else { "" },
        ));
    }
    out
}
