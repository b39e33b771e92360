//! Color policy: priority tiers, similarity groups and ignore sets
//!
//! Constructed once at startup from the `[policy]` config table and never
//! mutated afterwards. All lookups are pure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::engine::DEFAULT_PRIORITY;
use crate::types::ColorId;

/// Urgency bucket; lower level is fixed first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTier {
    pub level: u32,
    pub colors: BTreeSet<ColorId>,
}

/// Colors treated as equivalent to `main` when comparing board and target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityGroup {
    pub main: ColorId,
    pub colors: BTreeSet<ColorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPolicy {
    /// Scanned in order; the first tier containing a color wins
    #[serde(default)]
    pub priorities: Vec<PriorityTier>,
    #[serde(default)]
    pub ignored_source_colors: BTreeSet<ColorId>,
    #[serde(default)]
    pub ignored_board_colors: BTreeSet<ColorId>,
    /// Scanned in order; the first group containing a color wins
    #[serde(default)]
    pub similar_colors: Vec<SimilarityGroup>,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            priorities: vec![
                PriorityTier { level: 1, colors: BTreeSet::from([4]) },
                PriorityTier { level: 2, colors: BTreeSet::from([1, 2]) },
                PriorityTier { level: 3, colors: BTreeSet::from([14]) },
            ],
            ignored_source_colors: BTreeSet::new(),
            ignored_board_colors: BTreeSet::new(),
            similar_colors: vec![SimilarityGroup {
                main: 14,
                colors: BTreeSet::from([12, 13, 14]),
            }],
        }
    }
}

impl ColorPolicy {
    /// Policy with no tiers, groups or ignores
    pub fn empty() -> Self {
        Self {
            priorities: Vec::new(),
            ignored_source_colors: BTreeSet::new(),
            ignored_board_colors: BTreeSet::new(),
            similar_colors: Vec::new(),
        }
    }

    pub fn priority_of(&self, color: ColorId) -> Option<u32> {
        self.priorities
            .iter()
            .find(|tier| tier.colors.contains(&color))
            .map(|tier| tier.level)
    }

    /// Priority with untiered colors mapped to the lowest urgency
    pub fn priority_or_default(&self, color: ColorId) -> u32 {
        self.priority_of(color).unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn canonical(&self, color: ColorId) -> ColorId {
        self.similar_colors
            .iter()
            .find(|group| group.colors.contains(&color))
            .map_or(color, |group| group.main)
    }

    pub fn ignored_in_source(&self, color: ColorId) -> bool {
        self.ignored_source_colors.contains(&color)
    }

    pub fn ignored_in_board(&self, color: ColorId) -> bool {
        self.ignored_board_colors.contains(&color)
    }
}
