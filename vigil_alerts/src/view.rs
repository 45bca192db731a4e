// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A filtered, sorted projection of the registry for presentation code.

use std::cmp::Reverse;
use std::fmt;
use std::rc::Rc;

use crate::change::{ChangeFeed, ListChange};
use crate::data::ConditionId;
use crate::filter::AlertFilter;
use crate::level::AlertLevel;
use crate::registry::AlertRegistry;

/// Row order of a [`FilteredAlertView`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Registry row order.
    #[default]
    Registry,
    /// Most severe first; registry order within a level.
    LevelDescending,
}

/// The registry rows that are enabled, pass every filter and currently match.
///
/// The view caches, per registry row, whether the row passes. The cache is
/// filled lazily and kept consistent with the registry on every read:
///
/// - a row whose data changed is re-tested on its own;
/// - replacing the filter set, or any filter bumping its revision, clears
///   the cache;
/// - any insertion or removal in the registry clears the cache, since row
///   indices shift.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use vigil_alerts::{AlertLevel, AlertRegistry, FilteredAlertView, LevelFilter};
///
/// let registry = AlertRegistry::default();
/// let mut view = FilteredAlertView::new(&registry);
/// let level = Rc::new(LevelFilter::new(AlertLevel::High));
/// view.apply_filters([level.clone() as Rc<dyn vigil_alerts::AlertFilter>]);
/// assert_eq!(view.row_count(), 0);
/// ```
pub struct FilteredAlertView {
    registry: AlertRegistry,
    feed: ChangeFeed,
    filters: Vec<Rc<dyn AlertFilter>>,
    seen_revisions: Vec<u64>,
    cache: Vec<Option<bool>>,
    sort: SortOrder,
    tests: u64,
}

impl fmt::Debug for FilteredAlertView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredAlertView")
            .field("filters", &self.filters.len())
            .field("cached_rows", &self.cached_rows())
            .field("sort", &self.sort)
            .finish_non_exhaustive()
    }
}

impl FilteredAlertView {
    /// Creates an unfiltered view over `registry`.
    #[must_use]
    pub fn new(registry: &AlertRegistry) -> Self {
        Self {
            feed: registry.subscribe(),
            registry: registry.clone(),
            filters: Vec::new(),
            seen_revisions: Vec::new(),
            cache: Vec::new(),
            sort: SortOrder::default(),
            tests: 0,
        }
    }

    /// Replaces the filter chain.
    pub fn apply_filters(&mut self, filters: impl IntoIterator<Item = Rc<dyn AlertFilter>>) {
        self.filters = filters.into_iter().collect();
        self.seen_revisions = self.filters.iter().map(|f| f.revision()).collect();
        self.cache.clear();
    }

    /// The current filter chain.
    #[must_use]
    pub fn filters(&self) -> &[Rc<dyn AlertFilter>] {
        &self.filters
    }

    /// Changes the row order.
    pub fn set_sort_order(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    /// The row order.
    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    /// Number of visible rows.
    pub fn row_count(&mut self) -> usize {
        self.rows().len()
    }

    /// Identity of the binding shown at visible row `row`.
    pub fn row_at(&mut self, row: usize) -> Option<ConditionId> {
        let source = self.source_row(row)?;
        self.registry.row_at(source)?.id()
    }

    /// Registry row shown at visible row `row`.
    pub fn source_row(&mut self, row: usize) -> Option<usize> {
        self.rows().get(row).copied()
    }

    /// Returns `true` if the binding with identity `id` is visible.
    pub fn contains(&mut self, id: ConditionId) -> bool {
        self.sync();
        self.registry
            .row_of(id)
            .is_some_and(|row| self.passes(row))
    }

    /// Identities of the visible rows, in view order.
    pub fn ids(&mut self) -> Vec<ConditionId> {
        self.rows()
            .into_iter()
            .filter_map(|row| self.registry.row_at(row)?.id())
            .collect()
    }

    /// Number of visible alerts at or above `level`.
    pub fn active_count_at_or_above(&mut self, level: AlertLevel) -> usize {
        self.rows()
            .into_iter()
            .filter(|row| {
                self.registry
                    .row_at(*row)
                    .is_some_and(|d| d.last_active() && d.level() >= level)
            })
            .count()
    }

    /// Number of registry rows with a cached result.
    #[must_use]
    pub fn cached_rows(&self) -> usize {
        self.cache.iter().filter(|c| c.is_some()).count()
    }

    /// How many times a row has been run through the filter chain.
    #[must_use]
    pub fn filter_tests(&self) -> u64 {
        self.tests
    }

    /// Visible registry rows, in view order.
    fn rows(&mut self) -> Vec<usize> {
        self.sync();
        let mut rows: Vec<usize> = (0..self.cache.len()).filter(|&row| self.passes(row)).collect();
        if self.sort == SortOrder::LevelDescending {
            rows.sort_by_key(|&row| Reverse(self.registry.row_at(row).map(|d| d.level())));
        }
        rows
    }

    /// Applies registry changes and filter revisions to the cache.
    fn sync(&mut self) {
        self.registry.flush();
        let changes = self.feed.drain();

        let revisions: Vec<u64> = self.filters.iter().map(|f| f.revision()).collect();
        if revisions != self.seen_revisions {
            self.seen_revisions = revisions;
            self.cache.clear();
        }

        if changes.iter().any(ListChange::is_structural) {
            self.cache.clear();
        } else {
            for change in changes {
                if let ListChange::Updated { first, last, .. } = change {
                    for row in first..=last {
                        self.retest(row);
                    }
                }
            }
        }
        self.cache.resize(self.registry.row_count(), None);
    }

    fn retest(&mut self, row: usize) {
        if self.cache.get(row).is_some_and(Option::is_some) {
            let passes = self.test(row);
            self.cache[row] = Some(passes);
        }
    }

    fn passes(&mut self, row: usize) -> bool {
        if let Some(Some(passes)) = self.cache.get(row).copied() {
            return passes;
        }
        let passes = self.test(row);
        if let Some(slot) = self.cache.get_mut(row) {
            *slot = Some(passes);
        }
        passes
    }

    fn test(&mut self, row: usize) -> bool {
        self.tests += 1;
        let prefilter = {
            let Some(data) = self.registry.row_at(row) else {
                return false;
            };
            data.is_enabled() && self.filters.iter().all(|f| f.passes_filter(&data))
        };
        prefilter && self.registry.matches_query(row) == Some(true)
    }
}
