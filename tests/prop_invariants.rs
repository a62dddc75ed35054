//! Property tests for the resource and progression invariants.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use tmreplay::game::actions::Action;
use tmreplay::game::cult::{CultBoard, CultTrack, TRACK_TOP};
use tmreplay::game::resources::PowerBowls;
use tmreplay::game::{Faction, GameState, Phase, Terrain};
use tmreplay::notation::compile_line;

#[derive(Debug, Clone, Copy)]
enum BowlOp {
    Gain(u32),
    Spend(u32),
    Burn(u32),
}

fn bowl_op() -> impl Strategy<Value = BowlOp> {
    prop_oneof![
        (0u32..20).prop_map(BowlOp::Gain),
        (0u32..20).prop_map(BowlOp::Spend),
        (0u32..10).prop_map(BowlOp::Burn),
    ]
}

proptest! {
    /// Gains and spends conserve the energy total; burning destroys
    /// exactly the burned amount. Totals never go negative (they cannot:
    /// the bowls are unsigned and every operation is checked).
    #[test]
    fn prop_power_bowls_conserve_energy(
        start1 in 0u32..12,
        start2 in 0u32..12,
        ops in proptest::collection::vec(bowl_op(), 0..40),
    ) {
        let mut bowls = PowerBowls::new(start1, start2, 0);
        let mut expected_total = bowls.total();
        for op in ops {
            match op {
                BowlOp::Gain(n) => {
                    let gained = bowls.gain(n);
                    prop_assert!(gained <= n);
                }
                BowlOp::Spend(n) => {
                    if bowls.spend(n).is_err() {
                        prop_assert!(bowls.bowl3 < n);
                    }
                }
                BowlOp::Burn(n) => {
                    if bowls.burn(n).is_ok() {
                        expected_total -= n;
                    } else {
                        prop_assert!(bowls.bowl2 < n * 2);
                    }
                }
            }
            prop_assert_eq!(bowls.total(), expected_total);
        }
    }

    /// Track positions stay within [0, 10] under arbitrary advances, and
    /// milestone energy is paid at most once per milestone.
    #[test]
    fn prop_cult_positions_bounded(
        advances in proptest::collection::vec((0usize..4, 0u32..6, any::<bool>()), 0..60),
    ) {
        let tracks = [CultTrack::Fire, CultTrack::Water, CultTrack::Earth, CultTrack::Air];
        let mut board = CultBoard::new();
        board.init_player(Faction::Engineers);
        let mut total_power = 0u32;
        for (track_index, steps, key) in advances {
            let track = tracks[track_index];
            let advance = board.advance(Faction::Engineers, track, steps, key);
            total_power += advance.power;
            let position = board.position(Faction::Engineers, track);
            prop_assert!(position <= TRACK_TOP);
        }
        // Four tracks, milestones pay 1+2+2+3 at most once each.
        prop_assert!(total_power <= 4 * 8);
    }

    /// The wheel distance is symmetric and at most 3.
    #[test]
    fn prop_wheel_distance_bounds(a in 0usize..7, b in 0usize..7) {
        const LAND: [Terrain; 7] = [
            Terrain::Plains, Terrain::Swamp, Terrain::Lake, Terrain::Forest,
            Terrain::Mountain, Terrain::Wasteland, Terrain::Desert,
        ];
        let d1 = LAND[a].wheel_distance(LAND[b]).unwrap();
        let d2 = LAND[b].wheel_distance(LAND[a]).unwrap();
        prop_assert_eq!(d1, d2);
        prop_assert!(d1 <= 3);
        prop_assert_eq!(d1 == 0, a == b);
    }

    /// Declining a reward offer with none pending is a no-op exactly when
    /// both lower bowls are empty, and a hard error otherwise.
    #[test]
    fn prop_decline_without_offer(bowl1 in 0u32..5, bowl2 in 0u32..5) {
        let mut state = GameState::new();
        state.add_player(Faction::Witches, "w").unwrap();
        let player = state.player_mut(Faction::Witches).unwrap();
        player.wallet.power = PowerBowls::new(bowl1, bowl2, 3);
        let before = player.wallet;

        let result = Action::DeclineLeech { faction: Faction::Witches, from: None }
            .execute(&mut state);
        if bowl1 == 0 && bowl2 == 0 {
            prop_assert!(result.is_ok());
            let after = state.player(Faction::Witches).unwrap().wallet;
            prop_assert_eq!(before, after);
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// Compiling arbitrary junk never panics: it either classifies or
    /// reports the offending token.
    #[test]
    fn prop_compile_never_panics(line in "[ -~]{0,60}") {
        let mut state = GameState::new();
        state.add_player(Faction::Engineers, "a").unwrap();
        state.phase = Phase::Action;
        let _ = compile_line(Faction::Engineers, &line, &state);
    }
}
