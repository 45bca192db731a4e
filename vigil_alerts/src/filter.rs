// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Predicates over condition bindings, composed by [`FilteredAlertView`].
//!
//! A filter signals a change of its parameters by bumping its
//! [`revision`](AlertFilter::revision); views compare revisions to decide when
//! their cached results are stale.
//!
//! [`FilteredAlertView`]: crate::FilteredAlertView

use std::cell::{Cell, RefCell};
use std::fmt;

use hashbrown::HashSet;

use crate::data::{AlertConditionData, ConditionId};
use crate::level::AlertLevel;

/// A predicate over condition bindings.
pub trait AlertFilter {
    /// Whether `data` passes. Must depend only on `data` and the filter's own
    /// parameters.
    fn passes_filter(&self, data: &AlertConditionData) -> bool;

    /// Changes whenever the filter's parameters change.
    fn revision(&self) -> u64;
}

/// Passes bindings at or above a minimum severity.
pub struct LevelFilter {
    minimum: Cell<AlertLevel>,
    revision: Cell<u64>,
}

impl fmt::Debug for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelFilter")
            .field("minimum", &self.minimum.get())
            .field("revision", &self.revision.get())
            .finish()
    }
}

impl LevelFilter {
    /// Creates a filter passing `minimum` and above.
    #[must_use]
    pub fn new(minimum: AlertLevel) -> Self {
        Self {
            minimum: Cell::new(minimum),
            revision: Cell::new(0),
        }
    }

    /// The current minimum.
    #[must_use]
    pub fn minimum_level(&self) -> AlertLevel {
        self.minimum.get()
    }

    /// Changes the minimum.
    pub fn set_minimum_level(&self, level: AlertLevel) {
        if self.minimum.replace(level) != level {
            self.revision.set(self.revision.get() + 1);
        }
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(AlertLevel::Low)
    }
}

impl AlertFilter for LevelFilter {
    fn passes_filter(&self, data: &AlertConditionData) -> bool {
        data.level() >= self.minimum.get()
    }

    fn revision(&self) -> u64 {
        self.revision.get()
    }
}

/// Hides bindings by identity.
#[derive(Default)]
pub struct IdsFilter {
    excluded: RefCell<HashSet<ConditionId>>,
    revision: Cell<u64>,
}

impl fmt::Debug for IdsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdsFilter")
            .field("excluded", &self.excluded.borrow().len())
            .field("revision", &self.revision.get())
            .finish()
    }
}

impl IdsFilter {
    /// Creates a filter that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hides `id`. Returns `false` if it was already hidden.
    pub fn add_excluded_id(&self, id: ConditionId) -> bool {
        let added = self.excluded.borrow_mut().insert(id);
        if added {
            self.bump();
        }
        added
    }

    /// Shows `id` again. Returns `false` if it was not hidden.
    pub fn remove_excluded_id(&self, id: ConditionId) -> bool {
        let removed = self.excluded.borrow_mut().remove(&id);
        if removed {
            self.bump();
        }
        removed
    }

    /// Shows everything again.
    pub fn clear_excluded_ids(&self) {
        let mut excluded = self.excluded.borrow_mut();
        if !excluded.is_empty() {
            excluded.clear();
            drop(excluded);
            self.bump();
        }
    }

    /// Returns `true` if `id` is hidden.
    #[must_use]
    pub fn is_excluded(&self, id: ConditionId) -> bool {
        self.excluded.borrow().contains(&id)
    }

    /// Number of hidden ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.excluded.borrow().len()
    }

    /// Returns `true` if nothing is hidden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excluded.borrow().is_empty()
    }

    fn bump(&self) {
        self.revision.set(self.revision.get() + 1);
    }
}

impl AlertFilter for IdsFilter {
    fn passes_filter(&self, data: &AlertConditionData) -> bool {
        data.id().is_none_or(|id| !self.is_excluded(id))
    }

    fn revision(&self) -> u64 {
        self.revision.get()
    }
}
