//! Board vs target comparison: completion statistics and the correction list

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color_policy::ColorPolicy;
use crate::types::{ColorGrid, ColorId};

/// Board position of the target image's top-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub x: i64,
    pub y: i64,
}

/// How equal-priority corrections are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Uniform random draw per correction, spreads fixes across regions
    #[default]
    Random,
    /// Scan order (column-major over the target image), reproducible
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Percentage in [0, 100], two decimals
    pub completion: f64,
}

/// One wrong pixel; colors are raw board identifiers, not canonicalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    pub x: u32,
    pub y: u32,
    pub current: ColorId,
    pub target: ColorId,
    pub priority: u32,
}

/// Target cells that map onto the board and are not ignored on either side
///
/// Yields `(board_x, board_y, target_color, board_color)` with raw colors.
fn comparable_cells<'a>(
    board: &'a ColorGrid,
    target: &'a ColorGrid,
    origin: Origin,
    policy: &'a ColorPolicy,
) -> impl Iterator<Item = (u32, u32, ColorId, ColorId)> + 'a {
    target.iter().filter_map(move |(x, y, target_color)| {
        if policy.ignored_in_source(target_color) {
            return None;
        }
        let board_x = origin.x + x as i64;
        let board_y = origin.y + y as i64;
        let board_color = board.get_signed(board_x, board_y)?;
        if policy.ignored_in_board(board_color) {
            return None;
        }
        Some((board_x as u32, board_y as u32, target_color, board_color))
    })
}

pub fn image_stats(
    board: &ColorGrid,
    target: &ColorGrid,
    origin: Origin,
    policy: &ColorPolicy,
) -> ImageStats {
    let mut correct = 0;
    let mut incorrect = 0;
    for (_, _, target_color, board_color) in comparable_cells(board, target, origin, policy) {
        if policy.canonical(target_color) == policy.canonical(board_color) {
            correct += 1;
        } else {
            incorrect += 1;
        }
    }

    let total = correct + incorrect;
    let completion = if total > 0 {
        let percent = correct as f64 / total as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    } else {
        0.0
    };
    ImageStats {
        total,
        correct,
        incorrect,
        completion,
    }
}

/// Every mismatching cell, in scan order
pub fn find_corrections(
    board: &ColorGrid,
    target: &ColorGrid,
    origin: Origin,
    policy: &ColorPolicy,
) -> Vec<Correction> {
    comparable_cells(board, target, origin, policy)
        .filter(|&(_, _, target_color, board_color)| {
            policy.canonical(target_color) != policy.canonical(board_color)
        })
        .map(|(x, y, target_color, board_color)| Correction {
            x,
            y,
            current: board_color,
            target: target_color,
            priority: policy.priority_or_default(target_color),
        })
        .collect()
}

/// Sort by ascending priority, breaking ties per `tie_break`
pub fn order_corrections<R: Rng>(corrections: &mut [Correction], tie_break: TieBreak, rng: &mut R) {
    match tie_break {
        TieBreak::Random => corrections.sort_by_cached_key(|c| (c.priority, rng.r#gen::<u64>())),
        TieBreak::Stable => corrections.sort_by_key(|c| c.priority),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_policy::{PriorityTier, SimilarityGroup};
    use crate::constants::engine::DEFAULT_PRIORITY;
    use crate::types::Grid;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    const ORIGIN: Origin = Origin { x: 0, y: 0 };

    fn grid(columns: &[&[ColorId]]) -> ColorGrid {
        Grid::from_columns(columns.iter().map(|c| c.to_vec()).collect()).unwrap()
    }

    fn policy_with_tier(level: u32, colors: &[ColorId]) -> ColorPolicy {
        let mut policy = ColorPolicy::empty();
        policy.priorities = vec![PriorityTier { level, colors: colors.iter().copied().collect() }];
        policy
    }

    fn correction(x: u32, y: u32, priority: u32) -> Correction {
        Correction { x, y, current: 0, target: 0, priority }
    }

    #[test]
    fn test_two_pixel_scenario() {
        // target [4, 1] laid out horizontally, board (0,0)=4 (1,0)=2
        let target = grid(&[&[4], &[1]]);
        let board = grid(&[&[4], &[2]]);
        let policy = policy_with_tier(1, &[4]);

        let stats = image_stats(&board, &target, ORIGIN, &policy);
        assert_eq!(stats.correct, 1);
        assert_eq!(stats.incorrect, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completion, 50.0);

        let corrections = find_corrections(&board, &target, ORIGIN, &policy);
        assert_eq!(
            corrections,
            vec![Correction { x: 1, y: 0, current: 2, target: 1, priority: DEFAULT_PRIORITY }]
        );
    }

    #[test]
    fn test_completion_rounds_to_two_decimals() {
        let target = grid(&[&[1], &[1], &[1]]);
        let board = grid(&[&[1], &[2], &[2]]);
        let stats = image_stats(&board, &target, ORIGIN, &ColorPolicy::empty());
        assert_eq!(stats.completion, 33.33);
    }

    #[test]
    fn test_completion_is_zero_without_countable_cells() {
        let target = grid(&[&[1]]);
        let board = grid(&[&[1]]);
        let origin = Origin { x: 5, y: 5 };
        let stats = image_stats(&board, &target, origin, &ColorPolicy::empty());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion, 0.0);
    }

    #[test]
    fn test_origin_offsets_board_coordinates() {
        let target = grid(&[&[3]]);
        let board = grid(&[&[1, 1], &[1, 1], &[1, 1]]);
        let origin = Origin { x: 2, y: 1 };
        let corrections = find_corrections(&board, &target, origin, &ColorPolicy::empty());
        assert_eq!(corrections.len(), 1);
        assert_eq!((corrections[0].x, corrections[0].y), (2, 1));
    }

    #[test]
    fn test_out_of_bounds_cells_are_skipped() {
        // 2x2 target hanging off the left and bottom edges of a 2x2 board
        let target = grid(&[&[3, 3], &[3, 3]]);
        let board = grid(&[&[1, 1], &[1, 1]]);
        let origin = Origin { x: -1, y: 1 };
        let corrections = find_corrections(&board, &target, origin, &ColorPolicy::empty());
        assert_eq!(corrections, vec![Correction { x: 0, y: 1, current: 1, target: 3, priority: DEFAULT_PRIORITY }]);
        assert_eq!(image_stats(&board, &target, origin, &ColorPolicy::empty()).total, 1);
    }

    #[test]
    fn test_ignored_colors_never_produce_corrections() {
        let target = grid(&[&[5], &[6], &[6]]);
        let board = grid(&[&[1], &[0], &[1]]);
        let mut policy = ColorPolicy::empty();
        policy.ignored_source_colors = BTreeSet::from([5]);
        policy.ignored_board_colors = BTreeSet::from([0]);

        let corrections = find_corrections(&board, &target, ORIGIN, &policy);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].x, 2);

        let stats = image_stats(&board, &target, ORIGIN, &policy);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.incorrect, 1);
    }

    #[test]
    fn test_similar_colors_count_as_correct_and_keep_raw_ids() {
        let target = grid(&[&[12], &[13]]);
        let board = grid(&[&[14], &[4]]);
        let mut policy = ColorPolicy::empty();
        policy.similar_colors = vec![SimilarityGroup { main: 14, colors: BTreeSet::from([12, 13, 14]) }];
        policy.priorities = vec![PriorityTier { level: 2, colors: BTreeSet::from([13]) }];

        let stats = image_stats(&board, &target, ORIGIN, &policy);
        assert_eq!((stats.correct, stats.incorrect), (1, 1));

        let corrections = find_corrections(&board, &target, ORIGIN, &policy);
        assert_eq!(
            corrections,
            vec![Correction { x: 1, y: 0, current: 4, target: 13, priority: 2 }]
        );
    }

    #[test]
    fn test_incorrect_count_matches_corrections() {
        let target = grid(&[&[1, 2, 3], &[4, 5, 6]]);
        let board = grid(&[&[1, 1, 3], &[0, 5, 2]]);
        let mut policy = ColorPolicy::default();
        policy.ignored_board_colors = BTreeSet::from([0]);
        let stats = image_stats(&board, &target, ORIGIN, &policy);
        let corrections = find_corrections(&board, &target, ORIGIN, &policy);
        assert_eq!(stats.incorrect, corrections.len());
        assert_eq!(stats.total, 5);
    }

    #[test]
    fn test_order_is_non_decreasing_priority() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut corrections = vec![
            correction(0, 0, 999),
            correction(1, 0, 2),
            correction(2, 0, 1),
            correction(3, 0, 2),
            correction(4, 0, 1),
        ];
        order_corrections(&mut corrections, TieBreak::Random, &mut rng);
        assert!(corrections.windows(2).all(|w| w[0].priority <= w[1].priority));
        assert_eq!(corrections[4].x, 0);
    }

    #[test]
    fn test_stable_tie_break_keeps_scan_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut corrections = vec![correction(0, 0, 2), correction(1, 0, 1), correction(2, 0, 2)];
        order_corrections(&mut corrections, TieBreak::Stable, &mut rng);
        let xs: Vec<_> = corrections.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1, 0, 2]);
    }

    #[test]
    fn test_random_tie_break_is_uniform() {
        let trials = 2000;
        let mut first_counts = [0usize; 2];
        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut corrections = vec![correction(0, 0, 1), correction(1, 0, 1), correction(2, 0, 5)];
            order_corrections(&mut corrections, TieBreak::Random, &mut rng);
            assert_eq!(corrections[2].x, 2);
            first_counts[corrections[0].x as usize] += 1;
        }
        // Expected 1000 each; bounds are about 9 standard deviations wide
        for count in first_counts {
            assert!((800..=1200).contains(&count), "skewed tie-break: {first_counts:?}");
        }
    }
}
