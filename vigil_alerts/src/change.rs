// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! List change notifications published by the registry.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

bitflags::bitflags! {
    /// Which parts of a row changed in a [`ListChange::Updated`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct DataRoles: u8 {
        /// The active flag.
        const ACTIVE = 1 << 0;
        /// The viewed flag.
        const VIEWED = 1 << 1;
        /// The enabled flag.
        const ENABLED = 1 << 2;
        /// The highlight flag.
        const HIGHLIGHT = 1 << 3;
    }
}

/// A change to the registry's rows. Ranges are inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ListChange {
    /// Rows `first..=last` were inserted.
    Inserted {
        /// First inserted row.
        first: usize,
        /// Last inserted row.
        last: usize,
    },
    /// Rows `first..=last` were removed; later rows moved up.
    Removed {
        /// First removed row.
        first: usize,
        /// Last removed row.
        last: usize,
    },
    /// Data in rows `first..=last` changed.
    Updated {
        /// First changed row.
        first: usize,
        /// Last changed row.
        last: usize,
        /// What changed.
        roles: DataRoles,
    },
}

impl ListChange {
    /// Returns `true` for insertions and removals, which shift row indices.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Inserted { .. } | Self::Removed { .. })
    }
}

type Queue = RefCell<VecDeque<ListChange>>;

/// Subscription to a registry's [`ListChange`]s.
///
/// Changes accumulate until [drained](Self::drain). Dropping the feed
/// unsubscribes.
pub struct ChangeFeed {
    queue: Rc<Queue>,
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

impl ChangeFeed {
    /// Takes every change received so far, oldest first.
    pub fn drain(&self) -> Vec<ListChange> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Publisher side: the registry's list of live feeds.
#[derive(Default)]
pub(crate) struct Subscribers {
    feeds: RefCell<Vec<Weak<Queue>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self) -> ChangeFeed {
        let queue = Rc::new(Queue::default());
        self.feeds.borrow_mut().push(Rc::downgrade(&queue));
        ChangeFeed { queue }
    }

    pub(crate) fn publish(&self, changes: &[ListChange]) {
        if changes.is_empty() {
            return;
        }
        self.feeds.borrow_mut().retain(|feed| {
            let Some(queue) = feed.upgrade() else {
                return false;
            };
            queue.borrow_mut().extend(changes.iter().copied());
            true
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.feeds.borrow().iter().filter(|f| f.strong_count() > 0).count()
    }
}
