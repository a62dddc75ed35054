//! End-to-end replay tests over a complete fixture log.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use tmreplay::game::{BonusCard, CultTrack, FavorTile, Phase};
use tmreplay::replay::{ProvidedInfo, SessionManager};
use tmreplay::{Faction, Interpreter, StepOutcome};

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn replay_fixture(name: &str) -> Interpreter {
    let items = tmreplay::parse_log(&fixture(name)).expect("fixture parses");
    let mut interpreter = Interpreter::new(items);
    let outcome = interpreter.run_to_end().expect("fixture replays cleanly");
    assert_eq!(outcome, StepOutcome::EndOfLog);
    interpreter
}

#[test]
fn test_fixture_reaches_end_phase() {
    let interpreter = replay_fixture("four_player_basic.log");
    assert_eq!(interpreter.state().phase, Phase::End);
    assert_eq!(interpreter.state().round, 6);
}

#[test]
fn test_fixture_final_totals_are_exact() {
    let interpreter = replay_fixture("four_player_basic.log");
    let scores = interpreter.state().final_scores.as_ref().expect("scored");

    let engineers = scores[&Faction::Engineers];
    assert_eq!(engineers.base_vp, 27);
    assert_eq!(engineers.area_vp, 18);
    assert_eq!(engineers.cult_vp, 0);
    assert_eq!(engineers.resource_vp, 12);
    assert_eq!(engineers.total_vp, 57);

    let cultists = scores[&Faction::Cultists];
    assert_eq!(cultists.base_vp, 26);
    assert_eq!(cultists.area_vp, 6);
    assert_eq!(cultists.cult_vp, 24);
    assert_eq!(cultists.resource_vp, 23);
    assert_eq!(cultists.total_vp, 79);

    let witches = scores[&Faction::Witches];
    assert_eq!(witches.base_vp, 20);
    assert_eq!(witches.area_vp, 6);
    assert_eq!(witches.cult_vp, 8);
    assert_eq!(witches.resource_vp, 37);
    assert_eq!(witches.total_vp, 71);

    let darklings = scores[&Faction::Darklings];
    assert_eq!(darklings.base_vp, 20);
    assert_eq!(darklings.area_vp, 6);
    assert_eq!(darklings.cult_vp, 8);
    assert_eq!(darklings.resource_vp, 35);
    assert_eq!(darklings.total_vp, 69);
}

#[test]
fn test_fixture_end_state_details() {
    let interpreter = replay_fixture("four_player_basic.log");
    let state = interpreter.state();

    // Engineers: stronghold at E7, the other two buildings upgraded or kept.
    let counts = state.building_counts(Faction::Engineers);
    assert_eq!(counts.strongholds, 1);
    assert_eq!(counts.trading_houses, 1);
    assert_eq!(counts.dwellings, 1);

    let cultists = state.player(Faction::Cultists).expect("seated");
    assert!(cultists.has_favor(FavorTile::Fav11));
    // The taken tile left the shared pool.
    assert_eq!(state.favor_pool.remaining(FavorTile::Fav11), 2);
    assert_eq!(state.cults.position(Faction::Cultists, CultTrack::Water), 5);
    assert_eq!(state.cults.position(Faction::Cultists, CultTrack::Fire), 4);
    assert_eq!(state.cults.parked_priests(Faction::Cultists), 3);

    let engineers = state.player(Faction::Engineers).expect("seated");
    assert_eq!(engineers.shipping, 1);
    assert_eq!(engineers.wallet.coins, 17);
    assert_eq!(engineers.wallet.workers, 5);

    // The bystanders only collected income and pass coins.
    let witches = state.player(Faction::Witches).expect("seated");
    assert_eq!(witches.wallet.coins, 31);
    assert_eq!(witches.wallet.workers, 24);
    let darklings = state.player(Faction::Darklings).expect("seated");
    assert_eq!(darklings.wallet.coins, 19);
    assert_eq!(darklings.wallet.workers, 25);
    assert_eq!(darklings.wallet.priests, 1);
}

#[test]
fn test_final_scoring_runs_exactly_once() {
    let items = tmreplay::parse_log(&fixture("four_player_basic.log")).expect("parse");
    let mut interpreter = Interpreter::new(items);
    interpreter.run_to_end().expect("replay");
    let first = interpreter.state().final_scores.clone();
    // Stepping past the end must not re-run scoring.
    assert_eq!(interpreter.step().expect("idempotent"), StepOutcome::EndOfLog);
    assert_eq!(&first, &interpreter.state().final_scores);
}

#[test]
fn test_jump_to_matches_stepping() {
    let items = tmreplay::parse_log(&fixture("four_player_basic.log")).expect("parse");

    let mut stepped = Interpreter::new(items.clone());
    for _ in 0..25 {
        stepped.step().expect("step");
    }

    let mut jumped = Interpreter::new(items);
    jumped.run_to(25).expect("jump");

    assert_eq!(stepped.index(), jumped.index());
    let a = stepped.state();
    let b = jumped.state();
    for faction in [Faction::Engineers, Faction::Cultists, Faction::Witches] {
        let pa = a.player(faction).expect("seated");
        let pb = b.player(faction).expect("seated");
        assert_eq!(pa.vp, pb.vp);
        assert_eq!(pa.wallet, pb.wallet);
    }
}

#[test]
fn test_session_manager_supply_missing_initial_cards() {
    // The same fixture without the initial selections blocks at round 1.
    let text = fixture("four_player_basic.log")
        .lines()
        .filter(|l| !l.contains("select "))
        .collect::<Vec<_>>()
        .join("\n");

    let manager = SessionManager::new();
    manager.start("fixture", &text, false).expect("start");
    let view = manager.advance("fixture", usize::MAX).expect("advance");
    let missing = view.missing.expect("blocked on initial cards");
    assert_eq!(missing.players.len(), 4);

    let mut picks = BTreeMap::new();
    picks.insert(Faction::Engineers, BonusCard::Bon4);
    picks.insert(Faction::Cultists, BonusCard::Bon7);
    picks.insert(Faction::Witches, BonusCard::Bon2);
    picks.insert(Faction::Darklings, BonusCard::Bon10);
    let info = ProvidedInfo {
        selections: BTreeMap::from([(0, picks)]),
        ..ProvidedInfo::default()
    };
    manager.provide_info("fixture", &info).expect("provide");

    // With the supplied picks the whole log replays to the same totals.
    let done = manager.advance("fixture", usize::MAX).expect("finish");
    assert!(done.missing.is_none());
    assert!(done.finished);
    let scores = done.final_scores.expect("scored");
    assert_eq!(scores[&Faction::Engineers].total_vp, 57);
    assert_eq!(scores[&Faction::Cultists].total_vp, 79);
}
