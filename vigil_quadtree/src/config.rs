// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning knobs for [`Quadtree`](crate::Quadtree).

/// Configuration for a [`Quadtree`](crate::Quadtree).
///
/// # Example
///
/// ```rust
/// use vigil_quadtree::QuadtreeConfig;
///
/// let config = QuadtreeConfig::default()
///     .with_max_levels(6)
///     .with_churn_rebuild(0.25, 16);
/// assert_eq!(config.max_levels, 6);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadtreeConfig {
    /// Maximum node depth. The root is depth `0`; no node is created deeper than this.
    pub max_levels: u8,
    /// Fraction of the live entry count that inserts plus removals may reach
    /// before the next insert refits the tree from scratch.
    pub churn_rebuild_ratio: f64,
    /// Lower bound on the churn budget, so small trees are not rebuilt on every insert.
    pub churn_rebuild_min: usize,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            max_levels: 8,
            churn_rebuild_ratio: 0.5,
            churn_rebuild_min: 32,
        }
    }
}

impl QuadtreeConfig {
    /// Sets [`max_levels`](Self::max_levels).
    #[must_use]
    pub fn with_max_levels(mut self, max_levels: u8) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Sets the churn ratio and minimum that trigger a refitting rebuild.
    #[must_use]
    pub fn with_churn_rebuild(mut self, ratio: f64, min: usize) -> Self {
        self.churn_rebuild_ratio = ratio;
        self.churn_rebuild_min = min;
        self
    }

    /// Number of inserts plus removals tolerated for a tree holding `len` entries.
    pub(crate) fn churn_budget(&self, len: usize) -> usize {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "budget is a heuristic; saturating float-to-int is fine"
        )]
        let scaled = (len as f64 * self.churn_rebuild_ratio.max(0.0)) as usize;
        scaled.max(self.churn_rebuild_min)
    }
}
