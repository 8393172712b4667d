//! Board generation.
//!
//! A board is a shuffled array of card slots with a policy-determined subset
//! marked prize-bearing. Slot assignment is fixed here and immutable for the
//! life of the session.

use bingoo_types::CardSlot;
use tracing::warn;

use super::policy::{PrizePlan, VariantConfig, WinRule};
use crate::rng::GameRng;

/// Distinct decorative faces drawn for non-winning slots.
const DISTRACTOR_ART_COUNT: u32 = 12;

/// Art ids at and above this value are prize faces.
const PRIZE_ART_BASE: u8 = 128;

/// Generate the board for a new session.
///
/// Winning slots are placed uniformly at random without positional bias: the
/// winning entries are constructed first, padded with distractors, then the
/// whole array is Fisher-Yates shuffled. If the plan asks for more winning
/// slots than the grid can hold, the board is clamped to `grid_size - 1`
/// winners (never all-winning) and the clamp is logged.
pub fn generate_board(
    config: &VariantConfig,
    plan: &PrizePlan,
    rng: &mut GameRng,
) -> Vec<CardSlot> {
    let grid = config.grid_size;
    let mut values: Vec<u64> = plan.prize_values.clone();

    let requested = plan.winning_slots(config.win_rule);
    if requested >= grid {
        warn!(
            variant = ?config.variant,
            requested,
            grid,
            "winning slot count exceeds grid, clamping"
        );
        let per_unit = match config.win_rule {
            WinRule::PrizeSlot => 1,
            WinRule::MatchPair => 2,
        };
        let max_units = (grid - 1) / per_unit;
        values.truncate(max_units.max(1).min(values.len()));
    }

    let mut board = Vec::with_capacity(grid);
    for (unit, &value) in values.iter().enumerate() {
        let art = PRIZE_ART_BASE + unit as u8;
        match config.win_rule {
            WinRule::PrizeSlot => {
                board.push(CardSlot {
                    winning: true,
                    prize: Some(value),
                    pair: None,
                    art,
                    revealed: false,
                });
            }
            WinRule::MatchPair => {
                for _ in 0..2 {
                    board.push(CardSlot {
                        winning: true,
                        prize: Some(value),
                        pair: Some(unit as u8),
                        art,
                        revealed: false,
                    });
                }
            }
        }
    }

    while board.len() < grid {
        board.push(CardSlot::blank(rng.next_bounded(DISTRACTOR_ART_COUNT) as u8));
    }

    rng.shuffle(&mut board);
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::policy::PrizeValuePolicy;
    use bingoo_types::GameVariant;

    fn config(variant: GameVariant) -> VariantConfig {
        VariantConfig::default_for(variant)
    }

    fn plan(values: &[u64]) -> PrizePlan {
        PrizePlan {
            prize_values: values.to_vec(),
        }
    }

    #[test]
    fn board_has_exact_grid_size_and_no_reveals() {
        let config = config(GameVariant::Grid9);
        let mut rng = GameRng::new(1, 1);
        let board = generate_board(&config, &plan(&[40, 25]), &mut rng);

        assert_eq!(board.len(), 9);
        assert!(board.iter().all(|slot| !slot.revealed));
    }

    #[test]
    fn winning_slots_match_plan() {
        let config = config(GameVariant::Grid9);
        let mut rng = GameRng::new(2, 7);
        let board = generate_board(&config, &plan(&[40, 25, 10]), &mut rng);

        let winners: Vec<_> = board.iter().filter(|slot| slot.winning).collect();
        assert_eq!(winners.len(), 3);
        let mut prizes: Vec<u64> = winners.iter().filter_map(|slot| slot.prize).collect();
        prizes.sort_unstable();
        assert_eq!(prizes, vec![10, 25, 40]);
        assert!(board
            .iter()
            .filter(|slot| !slot.winning)
            .all(|slot| slot.prize.is_none()));
    }

    #[test]
    fn match_pair_boards_carry_paired_slots() {
        let config = config(GameVariant::Grid12);
        let mut rng = GameRng::new(3, 4);
        let board = generate_board(&config, &plan(&[100, 50]), &mut rng);

        assert_eq!(board.len(), 12);
        for unit in 0..2u8 {
            let half: Vec<_> = board
                .iter()
                .filter(|slot| slot.pair == Some(unit))
                .collect();
            assert_eq!(half.len(), 2, "pair {unit} incomplete");
            assert_eq!(half[0].prize, half[1].prize);
            assert_eq!(half[0].art, half[1].art);
        }
    }

    #[test]
    fn oversized_plan_is_clamped_below_grid() {
        let mut config = config(GameVariant::Grid9);
        config.value_policy = PrizeValuePolicy::Fixed(1);
        let values: Vec<u64> = vec![1; 20];
        let mut rng = GameRng::new(4, 4);
        let board = generate_board(&config, &plan(&values), &mut rng);

        assert_eq!(board.len(), 9);
        let winners = board.iter().filter(|slot| slot.winning).count();
        assert!(winners < 9, "board must never be all-winning");
        assert_eq!(winners, 8);
    }

    #[test]
    fn same_seed_generates_same_board() {
        let config = config(GameVariant::Grid16);
        let plan = plan(&[500, 200]);
        let board1 = generate_board(&config, &plan, &mut GameRng::new(9, 42));
        let board2 = generate_board(&config, &plan, &mut GameRng::new(9, 42));
        assert_eq!(board1, board2);
    }

    /// Over many boards every position should host a winner at a roughly
    /// uniform rate (statistical bound, not exact equality).
    #[test]
    fn winning_positions_are_roughly_uniform() {
        let config = config(GameVariant::Grid9);
        let plan = plan(&[50]);
        let trials = 9_000;
        let mut counts = [0u32; 9];

        for session in 0..trials {
            let board = generate_board(&config, &plan, &mut GameRng::new(99, session));
            let winner = board.iter().position(|slot| slot.winning).unwrap();
            counts[winner] += 1;
        }

        let expected = trials as f64 / 9.0;
        for (position, &count) in counts.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(
                deviation < 0.15,
                "position {position} hit {count} times (expected ~{expected:.0})"
            );
        }
    }
}
